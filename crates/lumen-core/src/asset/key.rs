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

//! Identifiers used to address cache entries.

use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt};

/// The source path of a resource, and the primary key of its cache entry.
///
/// Keys are compared verbatim. `https://cdn/a.png` and `https://cdn/a.png?w=64`
/// are two different entries, which is how transformed CDN variants are kept
/// apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from any string-like source path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// An opaque usage-group label partitioning the cache's capacity.
///
/// Many keys share a tag. Each tag may carry its own entry limit; a tag with
/// no configured limit is unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Thumbnails of level covers stored on the device.
    pub const LOCAL_LEVEL_COVER_THUMBNAIL: &'static str = "LocalLevelCoverThumbnail";
    /// Thumbnails of level covers served by the remote catalogue.
    pub const REMOTE_LEVEL_COVER_THUMBNAIL: &'static str = "RemoteLevelCoverThumbnail";
    /// Avatars of other players (leaderboards, level owners).
    pub const AVATAR: &'static str = "Avatar";
    /// The signed-in player's own avatar.
    pub const PLAYER_AVATAR: &'static str = "PlayerAvatar";
    /// Character previews on the tier selection screen.
    pub const CHARACTER_THUMBNAIL: &'static str = "CharacterThumbnail";
    /// Full-size cover of the level about to be played.
    pub const GAME_COVER: &'static str = "GameCover";
    /// Preview music of the selected level.
    pub const PREVIEW_MUSIC: &'static str = "PreviewMusic";

    /// Creates a tag from any string-like label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Returns the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for Tag {
    fn borrow(&self) -> &str {
        &self.0
    }
}
