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

//! Defines the `LinearRgba` color type.

use serde::{Deserialize, Serialize};

/// A color with `f32` components, nominally in the `[0, 1]` range.
///
/// Used for material channels, ambient light, clear colors and wireframe colors.
/// Equality is exact component-wise comparison, which is what material
/// deduplication relies on.
#[derive(
    Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable, Serialize, Deserialize,
)]
#[repr(C)]
pub struct LinearRgba {
    /// The red component.
    pub r: f32,
    /// The green component.
    pub g: f32,
    /// The blue component.
    pub b: f32,
    /// The alpha (opacity) component.
    pub a: f32,
}

impl LinearRgba {
    /// Opaque red.
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    /// Opaque green.
    pub const GREEN: Self = Self::rgb(0.0, 1.0, 0.0);
    /// Opaque blue.
    pub const BLUE: Self = Self::rgb(0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// Fully transparent black, also the zeroed value.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Creates a new `LinearRgba` with explicit RGBA values.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a new opaque `LinearRgba` (alpha = 1.0).
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Creates a color from 8-bit channels.
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Converts to 8-bit channels, clamping out-of-range components.
    #[inline]
    pub fn to_rgba8(self) -> [u8; 4] {
        [
            channel_to_u8(self.r),
            channel_to_u8(self.g),
            channel_to_u8(self.b),
            channel_to_u8(self.a),
        ]
    }

    /// Packs the color as a `0xAARRGGBB` word, the layout of lit vertex colors.
    ///
    /// # Examples
    ///
    /// ```
    /// use ember_core::math::LinearRgba;
    /// assert_eq!(LinearRgba::RED.to_argb_u32(), 0xFFFF_0000);
    /// ```
    #[inline]
    pub fn to_argb_u32(self) -> u32 {
        let [r, g, b, a] = self.to_rgba8();
        u32::from_be_bytes([a, r, g, b])
    }
}

#[inline]
fn channel_to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba8_conversion() {
        let c = LinearRgba::from_rgba8(255, 0, 51, 255);
        assert_eq!(c.to_rgba8(), [255, 0, 51, 255]);
        assert_eq!(LinearRgba::new(2.0, -1.0, 0.5, 1.0).to_rgba8(), [255, 0, 127, 255]);
    }

    #[test]
    fn test_argb_packing() {
        assert_eq!(LinearRgba::BLUE.to_argb_u32(), 0xFF00_00FF);
        assert_eq!(LinearRgba::TRANSPARENT.to_argb_u32(), 0);
    }

    #[test]
    fn test_exact_equality() {
        assert_eq!(LinearRgba::rgb(0.2, 0.4, 0.6), LinearRgba::rgb(0.2, 0.4, 0.6));
        assert_ne!(LinearRgba::rgb(0.2, 0.4, 0.6), LinearRgba::rgb(0.2, 0.6, 0.4));
    }
}
