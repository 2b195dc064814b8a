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

//! WAV decoding.

use anyhow::anyhow;
use lumen_core::asset::ResourceDecoder;
use lumen_data::assets::SoundClip;
use std::{error::Error, io::Cursor};

/// Decodes uncompressed `.wav` data into a [`SoundClip`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl WavDecoder {
    /// Creates a new instance of `WavDecoder`.
    pub fn new() -> Self {
        Self
    }
}

impl ResourceDecoder<SoundClip> for WavDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<SoundClip, Box<dyn Error + Send + Sync>> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();

        let samples: Result<Vec<f32>, _> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect(),
            hound::SampleFormat::Int => {
                let shift = spec
                    .bits_per_sample
                    .checked_sub(1)
                    .filter(|&shift| shift < 32)
                    .ok_or_else(|| {
                        anyhow!("Unsupported WAV sample width: {} bits", spec.bits_per_sample)
                    })?;
                let max_value = (1i64 << shift) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|s| s as f32 / max_value))
                    .collect()
            }
        };
        let samples = samples.map_err(|e| anyhow!("Failed to parse WAV samples: {e}"))?;

        Ok(SoundClip {
            samples,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        })
    }
}
