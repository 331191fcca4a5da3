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

use crate::math::LinearRgba;
use serde::{Deserialize, Serialize};

/// A fixed-function lighting material.
///
/// Two materials are the same material only if every channel and the power
/// compare exactly equal. The zeroed value (`Default`) is what lookups with an
/// unknown id return.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Material {
    /// Reflectance of ambient light.
    pub ambient: LinearRgba,
    /// Reflectance of direct light.
    pub diffuse: LinearRgba,
    /// Color of specular highlights.
    pub specular: LinearRgba,
    /// Light emitted by the surface itself.
    pub emissive: LinearRgba,
    /// Sharpness of specular highlights.
    pub power: f32,
}

impl Material {
    /// Creates a material from its four color channels and specular power.
    pub fn new(
        ambient: LinearRgba,
        diffuse: LinearRgba,
        specular: LinearRgba,
        emissive: LinearRgba,
        power: f32,
    ) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            emissive,
            power,
        }
    }

    /// The flat material used by wireframe shade modes: `color` as ambient and
    /// diffuse, black specular and emissive, power 1.
    pub fn wire(color: LinearRgba) -> Self {
        Self {
            ambient: color,
            diffuse: color,
            specular: LinearRgba::BLACK,
            emissive: LinearRgba::BLACK,
            power: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_equality_checks_every_channel() {
        let a = Material::new(
            LinearRgba::rgb(0.1, 0.2, 0.3),
            LinearRgba::RED,
            LinearRgba::WHITE,
            LinearRgba::BLACK,
            8.0,
        );
        let mut b = a;
        assert_eq!(a, b);
        b.ambient.g = 0.3;
        assert_ne!(a, b);
        b = a;
        b.power = 8.0001;
        assert_ne!(a, b);
    }

    #[test]
    fn test_wire_material() {
        let m = Material::wire(LinearRgba::GREEN);
        assert_eq!(m.diffuse, LinearRgba::GREEN);
        assert_eq!(m.ambient, LinearRgba::GREEN);
        assert_eq!(m.emissive, LinearRgba::BLACK);
        assert_eq!(m.power, 1.0);
    }

    #[test]
    fn test_default_is_zeroed() {
        let m = Material::default();
        assert_eq!(m.diffuse, LinearRgba::TRANSPARENT);
        assert_eq!(m.power, 0.0);
    }
}
