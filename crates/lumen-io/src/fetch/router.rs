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

use super::{FileFetcher, HttpFetcher, MirroredFetcher, SourceKind};
use async_trait::async_trait;
use lumen_core::{
    asset::{CacheKey, FetchError, ResourceFetcher},
    CancellationToken,
};
use std::{path::PathBuf, sync::Arc};

/// Dispatches each key to the local or remote fetcher according to its scheme.
pub struct SourceRouter {
    local: Arc<dyn ResourceFetcher>,
    remote: Arc<dyn ResourceFetcher>,
}

impl SourceRouter {
    /// Creates a router over explicit local and remote fetchers.
    pub fn new(
        local: impl ResourceFetcher + 'static,
        remote: impl ResourceFetcher + 'static,
    ) -> Self {
        Self {
            local: Arc::new(local),
            remote: Arc::new(remote),
        }
    }

    /// Creates a router whose downloads through `remote` are mirrored on disk in `dir`.
    pub fn mirrored(remote: HttpFetcher, dir: impl Into<PathBuf>) -> Self {
        Self::new(FileFetcher::new(), MirroredFetcher::new(remote, dir))
    }
}

impl Default for SourceRouter {
    fn default() -> Self {
        Self::new(FileFetcher::new(), HttpFetcher::new())
    }
}

#[async_trait]
impl ResourceFetcher for SourceRouter {
    async fn fetch(
        &self,
        key: &CacheKey,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        match SourceKind::of(key.as_str()) {
            SourceKind::File => self.local.fetch(key, cancel).await,
            SourceKind::Http => self.remote.fetch(key, cancel).await,
            SourceKind::Unsupported => Err(FetchError::UnsupportedScheme(key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Labelled(&'static str);

    #[async_trait]
    impl ResourceFetcher for Labelled {
        async fn fetch(
            &self,
            _key: &CacheKey,
            _cancel: &CancellationToken,
        ) -> Result<Vec<u8>, FetchError> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    #[tokio::test]
    async fn test_routes_by_scheme() {
        let router = SourceRouter::new(Labelled("local"), Labelled("remote"));
        let token = CancellationToken::new();

        let local = router
            .fetch(&CacheKey::from("file:///levels/a/cover.png"), &token)
            .await
            .unwrap();
        let remote = router
            .fetch(&CacheKey::from("https://cdn.example/a.png"), &token)
            .await
            .unwrap();

        assert_eq!(local, b"local");
        assert_eq!(remote, b"remote");
    }

    #[tokio::test]
    async fn test_unknown_scheme_is_rejected() {
        let router = SourceRouter::new(Labelled("local"), Labelled("remote"));
        let err = router
            .fetch(&CacheKey::from("game://cover"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(_)));
    }

    #[tokio::test]
    async fn test_mirrored_router_reads_local_files_directly() {
        let sources = tempfile::tempdir().unwrap();
        let mirror = sources.path().join("mirror");
        let path = sources.path().join("cover.png");
        std::fs::write(&path, b"cover").unwrap();

        let router = SourceRouter::mirrored(HttpFetcher::new(), &mirror);
        let bytes = router
            .fetch(&CacheKey::new(path.display().to_string()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(bytes, b"cover");
        assert!(!mirror.exists());
    }
}
