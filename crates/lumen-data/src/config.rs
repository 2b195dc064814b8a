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

//! Capacity configuration of the cache.
//!
//! The per-tag limit table is supplied once, when the cache is constructed.
//! It can be built in code or read from a RON document such as:
//!
//! ```ron
//! (
//!     tag_limits: {
//!         "LocalLevelCoverThumbnail": 96,
//!         "RemoteLevelCoverThumbnail": 96,
//!         "Avatar": 100,
//!     },
//! )
//! ```

use lumen_core::asset::Tag;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path};
use thiserror::Error;

/// An error raised while loading a [`CacheConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read cache config '{path}': {source}")]
    Io {
        /// The path of the configuration file.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration is not valid RON for a [`CacheConfig`].
    #[error("invalid cache config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// The per-tag capacity table of the cache.
///
/// Tags absent from the table are unbounded. A limit of zero or below is not
/// an error: it means "always evict before insert", so such a tag keeps at
/// most its most recent entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries per tag.
    #[serde(default)]
    pub tag_limits: HashMap<Tag, i64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::unbounded()
            .with_limit(Tag::LOCAL_LEVEL_COVER_THUMBNAIL, 96)
            .with_limit(Tag::REMOTE_LEVEL_COVER_THUMBNAIL, 96)
            .with_limit(Tag::AVATAR, 100)
    }
}

impl CacheConfig {
    /// Creates a configuration in which every tag is unbounded.
    pub fn unbounded() -> Self {
        Self {
            tag_limits: HashMap::new(),
        }
    }

    /// Sets the entry limit of `tag`, replacing any previous value.
    pub fn with_limit(mut self, tag: impl Into<Tag>, limit: i64) -> Self {
        self.tag_limits.insert(tag.into(), limit);
        self
    }

    /// Returns the normalized limit of `tag`, or `None` if it is unbounded.
    ///
    /// Non-positive limits normalize to zero.
    pub fn limit_for(&self, tag: &Tag) -> Option<usize> {
        self.tag_limits
            .get(tag)
            .map(|&limit| usize::try_from(limit.max(0)).unwrap_or(usize::MAX))
    }

    /// Parses a configuration from a RON string.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    /// Reads and parses a RON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_ron_str(&source)?;
        log::info!(
            "CacheConfig: loaded {} tag limit(s) from '{}'",
            config.tag_limits.len(),
            path.display()
        );
        Ok(config)
    }
}
