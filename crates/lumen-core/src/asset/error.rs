// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the error types raised by the cache's collaborators.
//!
//! None of these ever escape the cache's public operations: a [`FetchError`]
//! becomes an absent result and a [`DisposeError`] is logged and swallowed.

use thiserror::Error;

/// An error raised while bringing a resource into memory.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Reading a local file failed.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// The path that could not be read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The remote server answered with a non-success status.
    #[error("request to '{url}' returned HTTP {status}")]
    Http {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// The transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(String),
    /// The bytes were fetched but could not be decoded into a resource.
    #[error("failed to decode resource: {0}")]
    Decode(String),
    /// No fetcher understands the key's scheme.
    #[error("no fetcher for source '{0}'")]
    UnsupportedScheme(String),
    /// The fetch observed its cancellation token and aborted.
    #[error("fetch was cancelled")]
    Cancelled,
}

impl FetchError {
    /// Returns `true` if this error is the result of cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// An error raised while releasing the native memory behind a resource.
///
/// The entry has always been unindexed by the time this is observed; it only
/// signals that some native memory may have leaked.
#[derive(Debug, Error)]
#[error("failed to release native resource: {0}")]
pub struct DisposeError(pub String);
