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

use lumen_core::asset::Resource;

/// A decoded, CPU-side image ready to be uploaded as a sprite texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    /// Tightly packed RGBA8 pixels, row by row, top row first.
    pub pixels: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Sprite {
    /// Returns the number of bytes held by the pixel buffer.
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns the width-to-height ratio, or `0.0` for a degenerate sprite.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl Resource for Sprite {}
