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
use std::path::{Path, PathBuf};

/// Reads resources from the local file system.
///
/// Accepts `file://` URIs and bare paths. Relative paths are resolved against
/// the fetcher's root directory, if one was given.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    /// Creates a fetcher that resolves relative paths against the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher that resolves relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Maps a key to the file it designates.
    pub fn resolve(&self, key: &CacheKey) -> PathBuf {
        let raw = key.as_str();
        let raw = raw
            .get(..7)
            .filter(|scheme| scheme.eq_ignore_ascii_case("file://"))
            .map_or(raw, |_| &raw[7..]);
        let path = Path::new(raw);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl ResourceFetcher for FileFetcher {
    async fn fetch(
        &self,
        key: &CacheKey,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(key);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            read = tokio::fs::read(&path) => read.map_err(|source| FetchError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}
