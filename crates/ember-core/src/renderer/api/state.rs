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

//! Fixed-function render states and draw topologies.

use serde::{Deserialize, Serialize};

/// How batched geometry is shaded and which topology its draw calls use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShadeMode {
    /// Vertices drawn as points.
    Points,
    /// Triangles drawn with a wireframe fill.
    TriangleWire,
    /// Indices interpreted as a list of line segments.
    Lines,
    /// Indices interpreted as one connected line strip (polygon hull).
    HullWire,
    /// Solid, textured triangles.
    #[default]
    Solid,
}

impl ShadeMode {
    /// Returns `true` for the modes drawn with the flat wire material.
    #[inline]
    pub fn is_wire(self) -> bool {
        !matches!(self, ShadeMode::Solid)
    }
}

/// Primitive topology of a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    /// One point per vertex.
    PointList,
    /// One segment per pair of vertices.
    LineList,
    /// One segment between each consecutive vertex.
    LineStrip,
    /// One triangle per triple of vertices.
    TriangleList,
}

/// Which faces are culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CullMode {
    /// Cull faces wound clockwise.
    Clockwise,
    /// Cull faces wound counter-clockwise.
    #[default]
    CounterClockwise,
    /// No culling.
    None,
}

/// How the depth buffer is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepthMode {
    /// Depth test and depth writes.
    #[default]
    ReadWrite,
    /// Depth test only.
    ReadOnly,
    /// Depth buffer disabled.
    None,
}

/// How polygons are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillMode {
    /// Only vertices are drawn.
    Point,
    /// Only edges are drawn.
    Wireframe,
    /// Polygons are filled.
    #[default]
    Solid,
}

/// A single fixed-function render state change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderState {
    /// Face culling.
    Cull(CullMode),
    /// Depth buffer usage.
    Depth(DepthMode),
    /// Polygon fill.
    Fill(FillMode),
    /// Size of rasterized points, in pixels.
    PointSize(f32),
    /// Fixed-function lighting on or off.
    Lighting(bool),
}

/// Alpha test and blend configuration derived from a skin's alpha flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlphaState {
    /// Enables both the alpha test and source-alpha blending.
    pub enabled: bool,
    /// Pixels with alpha below this reference are discarded.
    pub reference: u8,
}

impl AlphaState {
    /// Alpha reference used for skins with transparency.
    pub const DEFAULT_REFERENCE: u8 = 50;

    /// Alpha test and blending disabled.
    pub const OPAQUE: Self = Self {
        enabled: false,
        reference: 0,
    };

    /// Alpha test (`alpha >= 50`) and `SrcAlpha / InvSrcAlpha` blending enabled.
    pub const BLENDED: Self = Self {
        enabled: true,
        reference: Self::DEFAULT_REFERENCE,
    };

    /// Returns the state matching a skin's alpha flag.
    #[inline]
    pub fn for_alpha(alpha: bool) -> Self {
        if alpha {
            Self::BLENDED
        } else {
            Self::OPAQUE
        }
    }
}

/// The fixed-function transform slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformSlot {
    /// Object to world.
    World,
    /// World to camera.
    View,
    /// Camera to clip space.
    Projection,
}
