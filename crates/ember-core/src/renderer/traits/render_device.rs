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

use crate::asset::Material;
use crate::math::{LinearRgba, Mat4};
use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use std::fmt::Debug;

/// An immediate-mode, fixed-function graphics device.
///
/// State set through this trait sticks until it is set again, and draw calls
/// consume whatever is currently bound. All calls happen on one thread, in order.
pub trait RenderDevice: Debug + Send {
    /// Creates a new buffer.
    /// ## Arguments
    /// * `descriptor` - The size and usage of the buffer.
    /// ## Returns
    /// A `Result` containing the ID of the created buffer.
    /// ## Errors
    /// * `ResourceError::OutOfMemory` - If the device cannot allocate the buffer.
    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Destroys a buffer.
    /// ## Arguments
    /// * `id` - The ID of the buffer to be destroyed.
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If the buffer does not exist.
    fn destroy_buffer(&mut self, id: BufferId) -> Result<(), ResourceError>;

    /// Grants write access to `size` bytes of a buffer starting at `offset`.
    ///
    /// The region is acquired, handed to `writer`, and released before this
    /// method returns, whatever the outcome. The slice passed to `writer` is
    /// exactly `size` bytes long.
    /// ## Arguments
    /// * `id` - The buffer to write.
    /// * `offset` - Byte offset of the region.
    /// * `size` - Byte length of the region.
    /// * `hint` - How the device may treat the previous contents.
    /// * `writer` - Fills the locked region.
    /// ## Errors
    /// * `ResourceError::LockFailed` - If the device refuses access.
    /// * `ResourceError::OutOfBounds` - If the region does not fit the buffer.
    fn lock_buffer(
        &mut self,
        id: BufferId,
        offset: u64,
        size: u64,
        hint: LockHint,
        writer: &mut dyn FnMut(&mut [u8]),
    ) -> Result<(), ResourceError>;

    /// Copies `data` into a buffer at `offset` through a scoped lock.
    fn write_buffer(
        &mut self,
        id: BufferId,
        offset: u64,
        data: &[u8],
        hint: LockHint,
    ) -> Result<(), ResourceError> {
        self.lock_buffer(id, offset, data.len() as u64, hint, &mut |region| {
            region.copy_from_slice(data)
        })
    }

    /// Uploads decoded pixels as a new texture.
    /// ## Errors
    /// * `ResourceError::BackendError` - If the format or dimensions are unsupported.
    fn create_texture(&mut self, texture: &CpuTexture) -> Result<DeviceTextureId, ResourceError>;

    /// Destroys a texture.
    fn destroy_texture(&mut self, id: DeviceTextureId) -> Result<(), ResourceError>;

    /// Selects the vertex layout used to interpret the bound vertex stream.
    fn set_vertex_layout(&mut self, layout: VertexLayout) -> Result<(), ResourceError>;

    /// Binds `buffer` as the vertex stream with the given stride in bytes.
    fn set_vertex_stream(&mut self, buffer: BufferId, stride: u32) -> Result<(), ResourceError>;

    /// Binds a 16-bit index buffer, or unbinds it with `None`.
    fn set_index_buffer(&mut self, buffer: Option<BufferId>) -> Result<(), ResourceError>;

    /// Sets the fixed-function material.
    fn set_material(&mut self, material: &Material) -> Result<(), ResourceError>;

    /// Binds a texture to `stage`, or clears the stage with `None`.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `stage >= MAX_TEXTURE_STAGES`.
    fn set_texture(
        &mut self,
        stage: usize,
        texture: Option<DeviceTextureId>,
    ) -> Result<(), ResourceError>;

    /// Configures alpha test and blending.
    fn set_alpha_state(&mut self, state: &AlphaState) -> Result<(), ResourceError>;

    /// Applies one fixed-function render state.
    fn set_render_state(&mut self, state: RenderState) -> Result<(), ResourceError>;

    /// Sets one of the transform matrices.
    fn set_transform(&mut self, slot: TransformSlot, matrix: &Mat4) -> Result<(), ResourceError>;

    /// Sets the ambient light color.
    fn set_ambient_light(&mut self, color: LinearRgba) -> Result<(), ResourceError>;

    /// Draws non-indexed primitives from the bound vertex stream.
    /// ## Arguments
    /// * `topology` - How vertices are assembled.
    /// * `start_vertex` - First vertex to read.
    /// * `primitive_count` - Number of points, lines or triangles.
    fn draw(
        &mut self,
        topology: PrimitiveTopology,
        start_vertex: u32,
        primitive_count: u32,
    ) -> Result<(), ResourceError>;

    /// Draws indexed primitives from the bound vertex stream and index buffer.
    /// ## Arguments
    /// * `topology` - How indices are assembled.
    /// * `base_vertex` - Value added to every index.
    /// * `vertex_count` - Number of vertices the indices may reference.
    /// * `start_index` - First index to read.
    /// * `primitive_count` - Number of lines or triangles.
    fn draw_indexed(
        &mut self,
        topology: PrimitiveTopology,
        base_vertex: u32,
        vertex_count: u32,
        start_index: u32,
        primitive_count: u32,
    ) -> Result<(), ResourceError>;

    /// Starts a frame, optionally clearing the color target.
    fn begin_frame(&mut self, clear_color: Option<LinearRgba>) -> Result<(), ResourceError>;

    /// Ends the frame. No draw call may follow until the next `begin_frame`.
    fn end_frame(&mut self) -> Result<(), ResourceError>;

    /// Presents the finished frame.
    fn present(&mut self) -> Result<(), ResourceError>;
}

/// Lets a caller keep ownership of a device while lending it to an owner such
/// as a render agent.
impl<T: RenderDevice + ?Sized> RenderDevice for &mut T {
    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        (**self).create_buffer(descriptor)
    }

    fn destroy_buffer(&mut self, id: BufferId) -> Result<(), ResourceError> {
        (**self).destroy_buffer(id)
    }

    fn lock_buffer(
        &mut self,
        id: BufferId,
        offset: u64,
        size: u64,
        hint: LockHint,
        writer: &mut dyn FnMut(&mut [u8]),
    ) -> Result<(), ResourceError> {
        (**self).lock_buffer(id, offset, size, hint, writer)
    }

    fn create_texture(&mut self, texture: &CpuTexture) -> Result<DeviceTextureId, ResourceError> {
        (**self).create_texture(texture)
    }

    fn destroy_texture(&mut self, id: DeviceTextureId) -> Result<(), ResourceError> {
        (**self).destroy_texture(id)
    }

    fn set_vertex_layout(&mut self, layout: VertexLayout) -> Result<(), ResourceError> {
        (**self).set_vertex_layout(layout)
    }

    fn set_vertex_stream(&mut self, buffer: BufferId, stride: u32) -> Result<(), ResourceError> {
        (**self).set_vertex_stream(buffer, stride)
    }

    fn set_index_buffer(&mut self, buffer: Option<BufferId>) -> Result<(), ResourceError> {
        (**self).set_index_buffer(buffer)
    }

    fn set_material(&mut self, material: &Material) -> Result<(), ResourceError> {
        (**self).set_material(material)
    }

    fn set_texture(
        &mut self,
        stage: usize,
        texture: Option<DeviceTextureId>,
    ) -> Result<(), ResourceError> {
        (**self).set_texture(stage, texture)
    }

    fn set_alpha_state(&mut self, state: &AlphaState) -> Result<(), ResourceError> {
        (**self).set_alpha_state(state)
    }

    fn set_render_state(&mut self, state: RenderState) -> Result<(), ResourceError> {
        (**self).set_render_state(state)
    }

    fn set_transform(&mut self, slot: TransformSlot, matrix: &Mat4) -> Result<(), ResourceError> {
        (**self).set_transform(slot, matrix)
    }

    fn set_ambient_light(&mut self, color: LinearRgba) -> Result<(), ResourceError> {
        (**self).set_ambient_light(color)
    }

    fn draw(
        &mut self,
        topology: PrimitiveTopology,
        start_vertex: u32,
        primitive_count: u32,
    ) -> Result<(), ResourceError> {
        (**self).draw(topology, start_vertex, primitive_count)
    }

    fn draw_indexed(
        &mut self,
        topology: PrimitiveTopology,
        base_vertex: u32,
        vertex_count: u32,
        start_index: u32,
        primitive_count: u32,
    ) -> Result<(), ResourceError> {
        (**self).draw_indexed(topology, base_vertex, vertex_count, start_index, primitive_count)
    }

    fn begin_frame(&mut self, clear_color: Option<LinearRgba>) -> Result<(), ResourceError> {
        (**self).begin_frame(clear_color)
    }

    fn end_frame(&mut self) -> Result<(), ResourceError> {
        (**self).end_frame()
    }

    fn present(&mut self) -> Result<(), ResourceError> {
        (**self).present()
    }
}
