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

//! Fetchers for the sources a cache key can point at.
//!
//! A key is a source path. `http://` and `https://` keys go to the network,
//! `file://` keys and bare paths go to the local file system. Keys with any
//! other scheme (such as `game://cover`) name resources that are only ever
//! installed with `put` and cannot be fetched.

mod file;
mod http;
mod mirror;
mod router;

pub use file::FileFetcher;
pub use http::HttpFetcher;
pub use mirror::MirroredFetcher;
pub use router::SourceRouter;

/// The kind of source a key designates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A local file, addressed by a `file://` URI or a bare path.
    File,
    /// A remote resource, addressed by an `http://` or `https://` URL.
    Http,
    /// Any other scheme.
    Unsupported,
}

impl SourceKind {
    /// Classifies a source path by its scheme.
    pub fn of(path: &str) -> Self {
        match path.split_once("://") {
            None => SourceKind::File,
            Some((scheme, _)) if scheme.eq_ignore_ascii_case("file") => SourceKind::File,
            Some((scheme, _))
                if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") =>
            {
                SourceKind::Http
            }
            Some(_) => SourceKind::Unsupported,
        }
    }
}
