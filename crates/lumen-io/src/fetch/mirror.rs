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

use async_trait::async_trait;
use lumen_core::{
    asset::{CacheKey, FetchError, ResourceFetcher},
    CancellationToken,
};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// Serves resources from an on-disk mirror, filling it from an inner fetcher.
///
/// Each key is mirrored in a file named after the BLAKE3 hash of the key. A
/// mirror hit skips the inner fetcher entirely. Mirror writes are best effort:
/// a failure is logged and the fetched bytes are still returned.
///
/// Nothing here ever deletes mirrored files; their retention is owned by
/// whoever owns the directory.
#[derive(Debug, Clone)]
pub struct MirroredFetcher<F> {
    inner: F,
    dir: PathBuf,
}

impl<F: ResourceFetcher> MirroredFetcher<F> {
    /// Wraps `inner` with a mirror stored in `dir`.
    pub fn new(inner: F, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }

    /// Returns the mirror file used for `key`.
    pub fn mirror_path(&self, key: &CacheKey) -> PathBuf {
        let digest = blake3::hash(key.as_str().as_bytes());
        self.dir.join(digest.to_hex().as_str())
    }

    async fn store(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let partial = path.with_extension("part");
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, path).await
    }
}

#[async_trait]
impl<F: ResourceFetcher> ResourceFetcher for MirroredFetcher<F> {
    async fn fetch(
        &self,
        key: &CacheKey,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let path = self.mirror_path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                log::trace!("MirroredFetcher: mirror hit for {key}");
                return Ok(bytes);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                log::warn!(
                    "MirroredFetcher: ignoring unreadable mirror '{}': {e}",
                    path.display()
                );
            }
        }

        let bytes = self.inner.fetch(key, cancel).await?;
        if let Err(e) = self.store(&path, &bytes).await {
            log::warn!(
                "MirroredFetcher: failed to mirror {key} to '{}': {e}",
                path.display()
            );
        }
        Ok(bytes)
    }
}
