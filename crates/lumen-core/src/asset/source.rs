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

//! Contracts for the collaborators injected into the cache.

use super::{CacheKey, DisposeError, FetchError, Resource};
use async_trait::async_trait;
use std::{error::Error, sync::Arc};
use tokio_util::sync::CancellationToken;

/// Brings the raw bytes of a resource into memory.
///
/// This is the "I/O plane" of resource loading: an HTTP GET, an on-disk read,
/// or a CDN-transformed URL variant. Retry and backoff belong to the
/// implementation, not to the cache.
///
/// Implementations should honor `cancel` and return [`FetchError::Cancelled`]
/// when it fires; the cache treats that as a clean abort.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetches the raw bytes addressed by `key`.
    async fn fetch(&self, key: &CacheKey, cancel: &CancellationToken)
        -> Result<Vec<u8>, FetchError>;
}

#[async_trait]
impl<F: ResourceFetcher + ?Sized> ResourceFetcher for Arc<F> {
    async fn fetch(
        &self,
        key: &CacheKey,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(key, cancel).await
    }
}

/// Turns raw bytes into the in-memory resource type `R`.
///
/// Implementors do the potentially CPU-intensive work of parsing and decoding
/// file data into a usable resource. Each decoder is specialized for a single
/// resource type.
pub trait ResourceDecoder<R: Resource>: Send + Sync {
    /// Parses a byte slice and converts it into an instance of `R`.
    ///
    /// # Returns
    /// The decoded resource on success, or a boxed, thread-safe error on failure.
    fn decode(&self, bytes: &[u8]) -> Result<R, Box<dyn Error + Send + Sync>>;
}

impl<R, F> ResourceDecoder<R> for F
where
    R: Resource,
    F: Fn(&[u8]) -> Result<R, Box<dyn Error + Send + Sync>> + Send + Sync,
{
    fn decode(&self, bytes: &[u8]) -> Result<R, Box<dyn Error + Send + Sync>> {
        self(bytes)
    }
}

/// Releases the native memory backing a resource.
///
/// The cache calls this exactly once per entry, after the entry has been
/// removed from every index. An error is logged and never retried.
pub trait ResourceDisposer<R: Resource>: Send + Sync {
    /// Releases `resource`.
    fn dispose(&self, resource: &R) -> Result<(), DisposeError>;
}

impl<R, F> ResourceDisposer<R> for F
where
    R: Resource,
    F: Fn(&R) -> Result<(), DisposeError> + Send + Sync,
{
    fn dispose(&self, resource: &R) -> Result<(), DisposeError> {
        self(resource)
    }
}

/// A disposer for resources that own nothing but Rust memory.
///
/// The memory is reclaimed when the last [`ResourceHandle`](super::ResourceHandle)
/// is dropped, so there is nothing to release eagerly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDisposer;

impl<R: Resource> ResourceDisposer<R> for NoopDisposer {
    fn dispose(&self, _resource: &R) -> Result<(), DisposeError> {
        Ok(())
    }
}
