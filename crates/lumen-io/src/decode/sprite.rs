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

//! Sprite decoding.

use anyhow::Context;
use lumen_core::asset::ResourceDecoder;
use lumen_data::assets::Sprite;
use std::error::Error;

/// Decodes PNG, JPEG and the other formats supported by `image` into RGBA8 sprites.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpriteDecoder {
    max_dimension: Option<u32>,
}

impl SpriteDecoder {
    /// Creates a decoder that keeps images at their native size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder that downscales images so neither side exceeds `max`,
    /// preserving the aspect ratio. Used for thumbnail tags.
    pub fn with_max_dimension(max: u32) -> Self {
        Self {
            max_dimension: Some(max),
        }
    }
}

impl ResourceDecoder<Sprite> for SpriteDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Sprite, Box<dyn Error + Send + Sync>> {
        let mut img = image::load_from_memory(bytes).context("Failed to decode image from memory")?;

        if let Some(max) = self.max_dimension {
            if img.width() > max || img.height() > max {
                img = img.thumbnail(max, max);
            }
        }

        // Keep sRGB; conversion happens on upload.
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Sprite {
            pixels: rgba.into_raw(),
            width,
            height,
        })
    }
}
