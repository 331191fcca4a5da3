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

//! Defines CPU-side texture data and device texture handles.

/// Maximum number of texture stages a skin can bind.
pub const MAX_TEXTURE_STAGES: usize = 8;

/// The pixel formats a [`CpuTexture`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8 bits per channel, red first.
    Rgba8Unorm,
    /// A single 8-bit luminance channel.
    R8Unorm,
}

impl TextureFormat {
    /// Bytes per pixel.
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8Unorm => 4,
            TextureFormat::R8Unorm => 1,
        }
    }
}

/// Decoded pixel data ready to be uploaded to a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuTexture {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// The layout of `pixels`.
    pub format: TextureFormat,
    /// Tightly packed rows, `width * height * bytes_per_pixel` bytes.
    pub pixels: Vec<u8>,
}

impl CpuTexture {
    /// Creates an RGBA8 texture filled with one color.
    pub fn solid_rgba8(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            format: TextureFormat::Rgba8Unorm,
            pixels: rgba.repeat(count),
        }
    }

    /// Returns `true` if `pixels` has exactly the size implied by the dimensions.
    pub fn is_consistent(&self) -> bool {
        self.pixels.len()
            == self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// An opaque handle to a texture created on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceTextureId(pub usize);
