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

use super::submit::{bind_skin, select_draw, submit_draw};
use super::BatchContext;
use ember_core::asset::SkinId;
use ember_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, IdKind, LockHint, RenderDevice, RenderError,
    RenderResult, ResourceError, VertexLayout, INDEX_SIZE,
};
use std::borrow::Cow;
use std::fmt;

/// Handle of a static buffer. Handles are dense and start at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StaticBufferId(pub u32);

impl fmt::Display for StaticBufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "static#{}", self.0)
    }
}

/// Most static buffers a store can hold.
pub const MAX_STATIC_BUFFERS: usize = 65534;

const STATIC_BLOCK: usize = 25;

/// Immutable pre-baked geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticBuffer {
    /// Layout of the vertices.
    pub layout: VertexLayout,
    /// Skin the geometry is drawn with.
    pub skin: SkinId,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Number of indices. Zero without an index buffer.
    pub index_count: u32,
    /// Triangles drawn in solid mode.
    pub triangle_count: u32,
    /// Device buffer holding the vertices.
    pub vertex_buffer: BufferId,
    /// Device buffer holding the indices, if the geometry is indexed.
    pub index_buffer: Option<BufferId>,
}

/// Write-once geometry buffers, addressed by [`StaticBufferId`].
///
/// Buffers are never freed individually; [`release`](Self::release) destroys
/// them all.
#[derive(Debug, Default)]
pub struct StaticBufferStore {
    buffers: Vec<StaticBuffer>,
}

impl StaticBufferStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads geometry into exactly-sized, write-only device buffers.
    ///
    /// An empty or absent index list creates non-indexed geometry.
    ///
    /// # Errors
    ///
    /// * `OutOfMemory` - the store is full or cannot grow.
    /// * `InvalidParameter` - no vertices, misaligned bytes or out-of-range indices.
    /// * `BufferCreation` - the device could not allocate a buffer.
    /// * `BufferLock` - the device refused write access.
    ///
    /// Buffers created before a failure are destroyed.
    pub fn create(
        &mut self,
        device: &mut dyn RenderDevice,
        layout: VertexLayout,
        skin: SkinId,
        vertices: &[u8],
        indices: Option<&[u16]>,
    ) -> RenderResult<StaticBufferId> {
        if self.buffers.len() >= MAX_STATIC_BUFFERS {
            return Err(RenderError::OutOfMemory(format!(
                "static buffer limit of {MAX_STATIC_BUFFERS} reached"
            )));
        }
        let stride = layout.stride();
        if vertices.is_empty() || vertices.len() % stride != 0 {
            return Err(RenderError::InvalidParameter(format!(
                "{} vertex bytes do not form whole {layout} vertices ({stride} bytes each)",
                vertices.len()
            )));
        }
        let vertex_count = vertices.len() / stride;
        let indices = indices.filter(|i| !i.is_empty());
        if let Some(&index) = indices.and_then(|i| i.iter().find(|&&i| i as usize >= vertex_count)) {
            return Err(RenderError::InvalidParameter(format!(
                "index {index} references past the {vertex_count} vertices"
            )));
        }
        let vertex_count = u32::try_from(vertex_count).map_err(|_| {
            RenderError::InvalidParameter(format!("{vertex_count} vertices is too many"))
        })?;
        let index_count = indices.map_or(0, |i| i.len() as u32);

        if self.buffers.len() == self.buffers.capacity() {
            self.buffers
                .try_reserve_exact(STATIC_BLOCK)
                .map_err(|e| RenderError::OutOfMemory(format!("static buffer storage: {e}")))?;
        }
        let id = StaticBufferId(self.buffers.len() as u32);

        let index_buffer = match indices {
            Some(indices) => Some(upload(
                device,
                format!("{id} indices"),
                BufferUsage::INDEX | BufferUsage::WRITE_ONLY,
                bytemuck::cast_slice(indices),
            )?),
            None => None,
        };
        let vertex_buffer = upload(
            device,
            format!("{id} vertices"),
            BufferUsage::VERTEX | BufferUsage::WRITE_ONLY,
            vertices,
        )
        .inspect_err(|_| {
            if let Some(buffer) = index_buffer {
                destroy(device, buffer);
            }
        })?;

        let triangle_count = if index_count > 0 {
            index_count / 3
        } else {
            vertex_count / 3
        };
        self.buffers.push(StaticBuffer {
            layout,
            skin,
            vertex_count,
            index_count,
            triangle_count,
            vertex_buffer,
            index_buffer,
        });
        log::debug!(
            "StaticBufferStore: Created {id} ({layout}, {vertex_count} vertices, {index_count} indices, {skin})"
        );
        Ok(id)
    }

    /// Draws a static buffer, rebinding streams and skin state only when they changed.
    ///
    /// # Errors
    ///
    /// * `InvalidId` - `id` does not exist.
    /// * `Draw` - the device rejected the state changes or the draw call.
    pub fn render(&self, ctx: &mut BatchContext<'_>, id: StaticBufferId) -> RenderResult<()> {
        let buffer = self
            .get(id)
            .ok_or_else(|| RenderError::invalid_id(IdKind::StaticBuffer, id.0))?;
        ctx.state.bindings.active_batch = None;

        let result = Self::submit(ctx, id, buffer);
        match result {
            Ok(drawn) => {
                if drawn {
                    ctx.state.stats.draw_calls += 1;
                }
                Ok(())
            }
            Err(e) => {
                ctx.state.stats.failed_draws += 1;
                log::error!("StaticBufferStore: Draw of {id} failed: {e}");
                Err(RenderError::Draw(e))
            }
        }
    }

    fn submit(
        ctx: &mut BatchContext<'_>,
        id: StaticBufferId,
        buffer: &StaticBuffer,
    ) -> Result<bool, ResourceError> {
        if ctx.state.bindings.active_static != Some(id) {
            ctx.device.set_vertex_layout(buffer.layout)?;
            ctx.device.set_index_buffer(buffer.index_buffer)?;
            ctx.device
                .set_vertex_stream(buffer.vertex_buffer, buffer.layout.stride() as u32)?;
            ctx.state.bindings.active_static = Some(id);
            ctx.state.stats.state_rebinds += 1;
        }
        bind_skin(ctx, buffer.skin);

        let index_count = buffer.index_buffer.map(|_| buffer.index_count);
        let call = select_draw(ctx.state.modes.shade_mode, buffer.vertex_count, index_count);
        submit_draw(&mut *ctx.device, call, buffer.vertex_count)
    }

    /// Looks up a static buffer.
    pub fn get(&self, id: StaticBufferId) -> Option<&StaticBuffer> {
        self.buffers.get(id.0 as usize)
    }

    /// Number of static buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns `true` if no static buffer was created.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Destroys every device buffer and empties the store.
    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        for buffer in self.buffers.drain(..) {
            destroy(device, buffer.vertex_buffer);
            if let Some(index_buffer) = buffer.index_buffer {
                destroy(device, index_buffer);
            }
        }
    }
}

/// Creates a buffer sized to `data` and writes it once.
fn upload(
    device: &mut dyn RenderDevice,
    label: String,
    usage: BufferUsage,
    data: &[u8],
) -> RenderResult<BufferId> {
    let buffer = device
        .create_buffer(&BufferDescriptor {
            label: Some(Cow::Owned(label)),
            size: data.len() as u64,
            usage,
        })
        .map_err(RenderError::BufferCreation)?;

    if let Err(e) = device.write_buffer(buffer, 0, data, LockHint::None) {
        destroy(device, buffer);
        return Err(RenderError::BufferLock(e));
    }
    Ok(buffer)
}

fn destroy(device: &mut dyn RenderDevice, buffer: BufferId) {
    if let Err(e) = device.destroy_buffer(buffer) {
        log::warn!("StaticBufferStore: Failed to destroy buffer {buffer:?}: {e}");
    }
}
