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

use ember_core::asset::Material;
use ember_core::math::{LinearRgba, Mat4};
use ember_core::renderer::api::{
    AlphaState, BufferId, DeviceTextureId, LockHint, PrimitiveTopology, RenderState,
    TransformSlot, VertexLayout,
};

/// One accepted draw call, with the state it was drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// The assembled topology.
    pub topology: PrimitiveTopology,
    /// Number of primitives drawn.
    pub primitive_count: u32,
    /// `true` for `draw_indexed`.
    pub indexed: bool,
    /// First vertex (non-indexed) or base vertex (indexed).
    pub start_vertex: u32,
    /// First index read. Zero for non-indexed draws.
    pub start_index: u32,
    /// The vertex layout bound at draw time.
    pub layout: VertexLayout,
    /// The vertex stream bound at draw time.
    pub vertex_buffer: BufferId,
    /// The index buffer bound at draw time, for indexed draws.
    pub index_buffer: Option<BufferId>,
    /// The indices consumed, for indexed draws.
    pub indices: Vec<u16>,
    /// The material bound at draw time.
    pub material: Option<Material>,
    /// The texture bound on stage 0 at draw time.
    pub texture0: Option<DeviceTextureId>,
    /// The alpha state at draw time.
    pub alpha: AlphaState,
}

/// Everything a [`HeadlessDevice`](super::HeadlessDevice) was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// A buffer was created.
    CreateBuffer(BufferId),
    /// A buffer was destroyed.
    DestroyBuffer(BufferId),
    /// A buffer region was locked and written.
    Lock {
        /// The written buffer.
        buffer: BufferId,
        /// Byte offset of the region.
        offset: u64,
        /// Byte length of the region.
        size: u64,
        /// The hint the caller passed.
        hint: LockHint,
    },
    /// A texture was created.
    CreateTexture(DeviceTextureId),
    /// A texture was destroyed.
    DestroyTexture(DeviceTextureId),
    /// The vertex layout changed.
    SetVertexLayout(VertexLayout),
    /// A vertex stream was bound.
    SetVertexStream(BufferId, u32),
    /// The index buffer binding changed.
    SetIndexBuffer(Option<BufferId>),
    /// A material was set.
    SetMaterial(Material),
    /// A texture stage changed.
    SetTexture(usize, Option<DeviceTextureId>),
    /// The alpha state changed.
    SetAlphaState(AlphaState),
    /// A render state changed.
    SetRenderState(RenderState),
    /// A transform changed.
    SetTransform(TransformSlot, Mat4),
    /// The ambient light changed.
    SetAmbientLight(LinearRgba),
    /// A draw call was accepted.
    Draw(DrawRecord),
    /// A frame started.
    BeginFrame(Option<LinearRgba>),
    /// A frame ended.
    EndFrame,
    /// A frame was presented.
    Present,
}
