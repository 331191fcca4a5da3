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

//! Vertex layouts and their matching `#[repr(C)]` vertex structs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed-function vertex formats understood by the device.
///
/// The batching cache keeps one batch pool per layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexLayout {
    /// Untransformed, unlit: position, normal, one texture coordinate. See [`Vertex`].
    Unlit,
    /// Untransformed, pre-lit: position, packed diffuse color, one texture coordinate.
    /// See [`LitVertex`].
    Lit,
}

impl VertexLayout {
    /// Every layout, in pool order.
    pub const ALL: [VertexLayout; 2] = [VertexLayout::Unlit, VertexLayout::Lit];

    /// Size in bytes of one vertex of this layout.
    #[inline]
    pub const fn stride(self) -> usize {
        match self {
            VertexLayout::Unlit => std::mem::size_of::<Vertex>(),
            VertexLayout::Lit => std::mem::size_of::<LitVertex>(),
        }
    }
}

impl fmt::Display for VertexLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexLayout::Unlit => f.write_str("UU"),
            VertexLayout::Lit => f.write_str("UL"),
        }
    }
}

/// A vertex struct whose memory layout matches one [`VertexLayout`].
pub trait GpuVertex: bytemuck::Pod {
    /// The layout this struct is laid out as.
    const LAYOUT: VertexLayout;
}

/// An untransformed, unlit vertex (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Object-space normal.
    pub normal: [f32; 3],
    /// Texture coordinate.
    pub uv: [f32; 2],
}

impl Vertex {
    /// Creates a vertex.
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

impl GpuVertex for Vertex {
    const LAYOUT: VertexLayout = VertexLayout::Unlit;
}

/// An untransformed, pre-lit vertex (24 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct LitVertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Diffuse color packed as `0xAARRGGBB`.
    pub color: u32,
    /// Texture coordinate.
    pub uv: [f32; 2],
}

impl LitVertex {
    /// Creates a vertex.
    pub const fn new(position: [f32; 3], color: u32, uv: [f32; 2]) -> Self {
        Self {
            position,
            color,
            uv,
        }
    }
}

impl GpuVertex for LitVertex {
    const LAYOUT: VertexLayout = VertexLayout::Lit;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides() {
        assert_eq!(VertexLayout::Unlit.stride(), 32);
        assert_eq!(VertexLayout::Lit.stride(), 24);
        assert_eq!(Vertex::LAYOUT.stride(), std::mem::size_of::<Vertex>());
    }

    #[test]
    fn test_vertex_bytes() {
        let v = [LitVertex::new([1.0, 2.0, 3.0], 0xFFFF_0000, [0.5, 0.5]); 2];
        let bytes: &[u8] = bytemuck::cast_slice(&v);
        assert_eq!(bytes.len(), 2 * LitVertex::LAYOUT.stride());
        assert_eq!(&bytes[12..16], &0xFFFF_0000u32.to_ne_bytes());
    }
}
