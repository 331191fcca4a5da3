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

//! CPU passes that add transparency to RGBA8 textures.

use ember_core::renderer::{CpuTexture, RenderError, RenderResult, TextureFormat};
use serde::{Deserialize, Serialize};

/// A color to make transparent, with channels in `[0, 1]`.
///
/// `r`, `g` and `b` select the pixels; `a` is the alpha they receive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorKey {
    /// Red channel of the keyed color.
    pub r: f32,
    /// Green channel of the keyed color.
    pub g: f32,
    /// Blue channel of the keyed color.
    pub b: f32,
    /// Alpha given to keyed pixels. Zero makes them fully transparent.
    pub a: f32,
}

impl ColorKey {
    /// Creates a color key.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// The opaque pixel value this key matches.
    fn matched(&self) -> [u8; 4] {
        [to_u8(self.r), to_u8(self.g), to_u8(self.b), 255]
    }

    /// The pixel value matched pixels are replaced with.
    fn replacement(&self) -> [u8; 4] {
        let a = to_u8(self.a);
        if a > 0 {
            [to_u8(self.r), to_u8(self.g), to_u8(self.b), a]
        } else {
            [0, 0, 0, 0]
        }
    }
}

/// How a texture is made transparent when it is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaSettings {
    /// Global transparency in `[0, 1]`; no pixel ends up more opaque than this.
    pub level: f32,
    /// Colors replaced before the global level is applied.
    #[serde(default)]
    pub color_keys: Vec<ColorKey>,
}

impl AlphaSettings {
    /// Transparency with a global level and no color keys.
    pub fn level(level: f32) -> Self {
        Self {
            level,
            color_keys: Vec::new(),
        }
    }

    /// Applies every color key, then the global level.
    ///
    /// Keys match fully opaque pixels, so they must run before the level
    /// lowers the alpha channel.
    pub fn apply(&self, texture: &mut CpuTexture) -> RenderResult<()> {
        for key in &self.color_keys {
            apply_color_key(texture, *key)?;
        }
        apply_transparency(texture, self.level)
    }
}

#[inline]
fn to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0) as u8
}

fn rgba8_pixels(texture: &mut CpuTexture) -> RenderResult<std::slice::ChunksExactMut<'_, u8>> {
    if texture.format != TextureFormat::Rgba8Unorm {
        return Err(RenderError::InvalidParameter(format!(
            "transparency requires an RGBA8 texture, got {:?}",
            texture.format
        )));
    }
    Ok(texture.pixels.chunks_exact_mut(4))
}

/// Replaces every pixel exactly equal to the key's opaque color with the key's
/// color at the key's alpha, or with transparent black when that alpha is zero.
///
/// # Errors
///
/// `InvalidParameter` if the texture is not RGBA8.
pub fn apply_color_key(texture: &mut CpuTexture, key: ColorKey) -> RenderResult<()> {
    let matched = key.matched();
    let replacement = key.replacement();
    for pixel in rgba8_pixels(texture)? {
        if *pixel == matched {
            pixel.copy_from_slice(&replacement);
        }
    }
    Ok(())
}

/// Lowers every pixel's alpha to at most `level * 255`. Alpha never increases.
///
/// # Errors
///
/// `InvalidParameter` if the texture is not RGBA8.
pub fn apply_transparency(texture: &mut CpuTexture, level: f32) -> RenderResult<()> {
    let ceiling = to_u8(level);
    for pixel in rgba8_pixels(texture)? {
        pixel[3] = pixel[3].min(ceiling);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pixels(a: [u8; 4], b: [u8; 4]) -> CpuTexture {
        CpuTexture {
            width: 2,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
            pixels: [a, b].concat(),
        }
    }

    #[test]
    fn test_color_key_replaces_exact_matches_only() {
        let mut tex = two_pixels([255, 0, 255, 255], [255, 0, 254, 255]);
        apply_color_key(&mut tex, ColorKey::new(1.0, 0.0, 1.0, 0.0)).unwrap();
        assert_eq!(tex.pixels, vec![0, 0, 0, 0, 255, 0, 254, 255]);
    }

    #[test]
    fn test_color_key_keeps_color_with_partial_alpha() {
        let mut tex = two_pixels([0, 255, 0, 255], [0, 255, 0, 128]);
        apply_color_key(&mut tex, ColorKey::new(0.0, 1.0, 0.0, 0.5)).unwrap();
        // The second pixel is not fully opaque, so it does not match.
        assert_eq!(tex.pixels, vec![0, 255, 0, 127, 0, 255, 0, 128]);
    }

    #[test]
    fn test_transparency_never_raises_alpha() {
        let mut tex = two_pixels([10, 10, 10, 255], [10, 10, 10, 20]);
        apply_transparency(&mut tex, 0.5).unwrap();
        assert_eq!(tex.pixels[3], 127);
        assert_eq!(tex.pixels[7], 20);
    }

    #[test]
    fn test_keys_run_before_global_level() {
        let mut tex = two_pixels([0, 0, 0, 255], [200, 200, 200, 255]);
        let settings = AlphaSettings {
            level: 0.8,
            color_keys: vec![ColorKey::new(0.0, 0.0, 0.0, 0.0)],
        };
        settings.apply(&mut tex).unwrap();
        assert_eq!(&tex.pixels[0..4], &[0, 0, 0, 0]);
        assert_eq!(tex.pixels[7], 204);
    }

    #[test]
    fn test_rejects_non_rgba8() {
        let mut tex = CpuTexture {
            width: 1,
            height: 1,
            format: TextureFormat::R8Unorm,
            pixels: vec![7],
        };
        assert!(matches!(
            apply_transparency(&mut tex, 0.5),
            Err(RenderError::InvalidParameter(_))
        ));
    }
}
