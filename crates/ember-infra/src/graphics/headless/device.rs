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

use super::command::{DeviceCommand, DrawRecord};
use ember_core::asset::Material;
use ember_core::math::{LinearRgba, Mat4};
use ember_core::renderer::api::*;
use ember_core::renderer::{RenderDevice, ResourceError};
use std::collections::HashMap;

#[derive(Debug)]
struct HeadlessBuffer {
    label: Option<String>,
    usage: BufferUsage,
    data: Vec<u8>,
}

/// The state currently bound on a [`HeadlessDevice`].
#[derive(Debug, Clone, PartialEq)]
pub struct BoundState {
    /// The vertex layout.
    pub layout: Option<VertexLayout>,
    /// The vertex stream and its stride.
    pub vertex_stream: Option<(BufferId, u32)>,
    /// The index buffer.
    pub index_buffer: Option<BufferId>,
    /// The material.
    pub material: Option<Material>,
    /// One texture per stage.
    pub textures: [Option<DeviceTextureId>; MAX_TEXTURE_STAGES],
    /// Alpha test and blending.
    pub alpha: AlphaState,
    /// Face culling.
    pub cull: CullMode,
    /// Depth buffer usage.
    pub depth: DepthMode,
    /// Polygon fill.
    pub fill: FillMode,
    /// Point size in pixels.
    pub point_size: f32,
    /// Fixed-function lighting.
    pub lighting: bool,
    /// World transform.
    pub world: Mat4,
    /// View transform.
    pub view: Mat4,
    /// Projection transform.
    pub projection: Mat4,
    /// Ambient light.
    pub ambient: LinearRgba,
}

impl Default for BoundState {
    fn default() -> Self {
        Self {
            layout: None,
            vertex_stream: None,
            index_buffer: None,
            material: None,
            textures: [None; MAX_TEXTURE_STAGES],
            alpha: AlphaState::OPAQUE,
            cull: CullMode::CounterClockwise,
            depth: DepthMode::ReadWrite,
            fill: FillMode::Solid,
            point_size: 1.0,
            lighting: true,
            world: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            ambient: LinearRgba::BLACK,
        }
    }
}

/// An in-memory render device.
///
/// Buffers and textures live in hash maps keyed by monotonically increasing
/// ids. Every call is appended to a command log that tests inspect. Failures
/// can be injected for draws, locks and allocations.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    buffers: HashMap<BufferId, HeadlessBuffer>,
    textures: HashMap<DeviceTextureId, CpuTexture>,
    next_buffer_id: usize,
    next_texture_id: usize,
    allocated_bytes: u64,
    memory_budget: Option<u64>,
    fail_draws: bool,
    fail_locks: bool,
    in_frame: bool,
    frames_presented: u64,
    state: BoundState,
    commands: Vec<DeviceCommand>,
}

impl HeadlessDevice {
    /// Creates an empty device with no memory budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the total bytes of live buffers. `None` removes the limit.
    pub fn set_memory_budget(&mut self, budget: Option<u64>) {
        self.memory_budget = budget;
    }

    /// Makes every subsequent draw call fail while `fail` is `true`.
    pub fn set_fail_draws(&mut self, fail: bool) {
        self.fail_draws = fail;
    }

    /// Makes every subsequent buffer lock fail while `fail` is `true`.
    pub fn set_fail_locks(&mut self, fail: bool) {
        self.fail_locks = fail;
    }

    /// The currently bound state.
    pub fn state(&self) -> &BoundState {
        &self.state
    }

    /// Every command received since creation or the last [`clear_commands`](Self::clear_commands).
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Forgets the recorded commands. Resources and bound state are kept.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// The accepted draw calls, in submission order.
    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.commands.iter().filter_map(|c| match c {
            DeviceCommand::Draw(record) => Some(record),
            _ => None,
        })
    }

    /// Number of accepted draw calls.
    pub fn draw_count(&self) -> usize {
        self.draws().count()
    }

    /// Number of recorded commands matching `predicate`.
    pub fn count_commands(&self, predicate: impl Fn(&DeviceCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| predicate(c)).count()
    }

    /// The raw contents of a buffer.
    pub fn buffer_contents(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(|b| b.data.as_slice())
    }

    /// The contents of a buffer read as 16-bit indices.
    pub fn buffer_indices(&self, id: BufferId) -> Option<Vec<u16>> {
        self.buffer_contents(id).map(read_indices)
    }

    /// The debug label a buffer was created with.
    pub fn buffer_label(&self, id: BufferId) -> Option<&str> {
        self.buffers.get(&id).and_then(|b| b.label.as_deref())
    }

    /// A texture's pixels as uploaded.
    pub fn texture(&self, id: DeviceTextureId) -> Option<&CpuTexture> {
        self.textures.get(&id)
    }

    /// Number of buffers not yet destroyed.
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of textures not yet destroyed.
    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Total bytes held by live buffers.
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes
    }

    /// Number of frames presented.
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn vertex_capacity(&self) -> Result<(VertexLayout, BufferId, u64), ResourceError> {
        let layout = self
            .state
            .layout
            .ok_or_else(|| ResourceError::BackendError("no vertex layout bound".into()))?;
        let (buffer, stride) = self
            .state
            .vertex_stream
            .ok_or_else(|| ResourceError::BackendError("no vertex stream bound".into()))?;
        if stride as usize != layout.stride() {
            return Err(ResourceError::BackendError(format!(
                "stream stride {stride} does not match layout {layout} ({} bytes)",
                layout.stride()
            )));
        }
        let entry = self.buffers.get(&buffer).ok_or(ResourceError::InvalidHandle)?;
        if !entry.usage.contains(BufferUsage::VERTEX) {
            return Err(ResourceError::InvalidHandle);
        }
        Ok((layout, buffer, entry.data.len() as u64 / stride as u64))
    }

    fn record_draw(&mut self, record: DrawRecord) {
        log::trace!(
            "HeadlessDevice: draw {:?} x{} (indexed: {})",
            record.topology,
            record.primitive_count,
            record.indexed
        );
        self.commands.push(DeviceCommand::Draw(record));
    }
}

fn read_indices(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(INDEX_SIZE)
        .map(|c| u16::from_ne_bytes([c[0], c[1]]))
        .collect()
}

/// Number of vertices (or indices) consumed by `primitive_count` primitives.
fn elements_for(topology: PrimitiveTopology, primitive_count: u32) -> u64 {
    let n = primitive_count as u64;
    match topology {
        PrimitiveTopology::PointList => n,
        PrimitiveTopology::LineList => n * 2,
        PrimitiveTopology::LineStrip if n == 0 => 0,
        PrimitiveTopology::LineStrip => n + 1,
        PrimitiveTopology::TriangleList => n * 3,
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        if let Some(budget) = self.memory_budget {
            if self.allocated_bytes + descriptor.size > budget {
                log::warn!(
                    "HeadlessDevice: Allocation of {} bytes exceeds budget of {} bytes",
                    descriptor.size,
                    budget
                );
                return Err(ResourceError::OutOfMemory);
            }
        }

        let id = BufferId(self.next_buffer_id);
        self.next_buffer_id += 1;
        self.allocated_bytes += descriptor.size;
        self.buffers.insert(
            id,
            HeadlessBuffer {
                label: descriptor.label.as_ref().map(|l| l.to_string()),
                usage: descriptor.usage,
                data: vec![0; descriptor.size as usize],
            },
        );
        self.commands.push(DeviceCommand::CreateBuffer(id));
        log::debug!(
            "HeadlessDevice: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or("unlabeled"),
            id,
            descriptor.size
        );
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: BufferId) -> Result<(), ResourceError> {
        let entry = self.buffers.remove(&id).ok_or(ResourceError::InvalidHandle)?;
        self.allocated_bytes -= entry.data.len() as u64;
        if self.state.vertex_stream.map(|(b, _)| b) == Some(id) {
            self.state.vertex_stream = None;
        }
        if self.state.index_buffer == Some(id) {
            self.state.index_buffer = None;
        }
        self.commands.push(DeviceCommand::DestroyBuffer(id));
        log::debug!("HeadlessDevice: Destroyed buffer with ID: {id:?}");
        Ok(())
    }

    fn lock_buffer(
        &mut self,
        id: BufferId,
        offset: u64,
        size: u64,
        hint: LockHint,
        writer: &mut dyn FnMut(&mut [u8]),
    ) -> Result<(), ResourceError> {
        if self.fail_locks {
            return Err(ResourceError::LockFailed);
        }
        let entry = self.buffers.get_mut(&id).ok_or(ResourceError::InvalidHandle)?;
        let end = offset.checked_add(size).ok_or(ResourceError::OutOfBounds)?;
        if end > entry.data.len() as u64 {
            return Err(ResourceError::OutOfBounds);
        }
        writer(&mut entry.data[offset as usize..end as usize]);
        self.commands.push(DeviceCommand::Lock {
            buffer: id,
            offset,
            size,
            hint,
        });
        Ok(())
    }

    fn create_texture(&mut self, texture: &CpuTexture) -> Result<DeviceTextureId, ResourceError> {
        if !texture.is_consistent() || texture.width == 0 || texture.height == 0 {
            return Err(ResourceError::BackendError(format!(
                "inconsistent {}x{} texture with {} bytes",
                texture.width,
                texture.height,
                texture.pixels.len()
            )));
        }
        let id = DeviceTextureId(self.next_texture_id);
        self.next_texture_id += 1;
        self.textures.insert(id, texture.clone());
        self.commands.push(DeviceCommand::CreateTexture(id));
        Ok(id)
    }

    fn destroy_texture(&mut self, id: DeviceTextureId) -> Result<(), ResourceError> {
        self.textures.remove(&id).ok_or(ResourceError::InvalidHandle)?;
        for slot in self.state.textures.iter_mut() {
            if *slot == Some(id) {
                *slot = None;
            }
        }
        self.commands.push(DeviceCommand::DestroyTexture(id));
        Ok(())
    }

    fn set_vertex_layout(&mut self, layout: VertexLayout) -> Result<(), ResourceError> {
        self.state.layout = Some(layout);
        self.commands.push(DeviceCommand::SetVertexLayout(layout));
        Ok(())
    }

    fn set_vertex_stream(&mut self, buffer: BufferId, stride: u32) -> Result<(), ResourceError> {
        if !self.buffers.contains_key(&buffer) {
            return Err(ResourceError::InvalidHandle);
        }
        self.state.vertex_stream = Some((buffer, stride));
        self.commands.push(DeviceCommand::SetVertexStream(buffer, stride));
        Ok(())
    }

    fn set_index_buffer(&mut self, buffer: Option<BufferId>) -> Result<(), ResourceError> {
        if let Some(id) = buffer {
            let entry = self.buffers.get(&id).ok_or(ResourceError::InvalidHandle)?;
            if !entry.usage.contains(BufferUsage::INDEX) {
                return Err(ResourceError::InvalidHandle);
            }
        }
        self.state.index_buffer = buffer;
        self.commands.push(DeviceCommand::SetIndexBuffer(buffer));
        Ok(())
    }

    fn set_material(&mut self, material: &Material) -> Result<(), ResourceError> {
        self.state.material = Some(*material);
        self.commands.push(DeviceCommand::SetMaterial(*material));
        Ok(())
    }

    fn set_texture(
        &mut self,
        stage: usize,
        texture: Option<DeviceTextureId>,
    ) -> Result<(), ResourceError> {
        if stage >= MAX_TEXTURE_STAGES {
            return Err(ResourceError::OutOfBounds);
        }
        if let Some(id) = texture {
            if !self.textures.contains_key(&id) {
                return Err(ResourceError::InvalidHandle);
            }
        }
        self.state.textures[stage] = texture;
        self.commands.push(DeviceCommand::SetTexture(stage, texture));
        Ok(())
    }

    fn set_alpha_state(&mut self, state: &AlphaState) -> Result<(), ResourceError> {
        self.state.alpha = *state;
        self.commands.push(DeviceCommand::SetAlphaState(*state));
        Ok(())
    }

    fn set_render_state(&mut self, state: RenderState) -> Result<(), ResourceError> {
        match state {
            RenderState::Cull(mode) => self.state.cull = mode,
            RenderState::Depth(mode) => self.state.depth = mode,
            RenderState::Fill(mode) => self.state.fill = mode,
            RenderState::PointSize(size) => {
                if !(size > 0.0) {
                    return Err(ResourceError::BackendError(format!(
                        "invalid point size {size}"
                    )));
                }
                self.state.point_size = size;
            }
            RenderState::Lighting(enabled) => self.state.lighting = enabled,
        }
        self.commands.push(DeviceCommand::SetRenderState(state));
        Ok(())
    }

    fn set_transform(&mut self, slot: TransformSlot, matrix: &Mat4) -> Result<(), ResourceError> {
        match slot {
            TransformSlot::World => self.state.world = *matrix,
            TransformSlot::View => self.state.view = *matrix,
            TransformSlot::Projection => self.state.projection = *matrix,
        }
        self.commands.push(DeviceCommand::SetTransform(slot, *matrix));
        Ok(())
    }

    fn set_ambient_light(&mut self, color: LinearRgba) -> Result<(), ResourceError> {
        self.state.ambient = color;
        self.commands.push(DeviceCommand::SetAmbientLight(color));
        Ok(())
    }

    fn draw(
        &mut self,
        topology: PrimitiveTopology,
        start_vertex: u32,
        primitive_count: u32,
    ) -> Result<(), ResourceError> {
        if self.fail_draws {
            return Err(ResourceError::BackendError("injected draw failure".into()));
        }
        let (layout, vertex_buffer, capacity) = self.vertex_capacity()?;
        if start_vertex as u64 + elements_for(topology, primitive_count) > capacity {
            return Err(ResourceError::OutOfBounds);
        }
        let record = DrawRecord {
            topology,
            primitive_count,
            indexed: false,
            start_vertex,
            start_index: 0,
            layout,
            vertex_buffer,
            index_buffer: None,
            indices: Vec::new(),
            material: self.state.material,
            texture0: self.state.textures[0],
            alpha: self.state.alpha,
        };
        self.record_draw(record);
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        topology: PrimitiveTopology,
        base_vertex: u32,
        vertex_count: u32,
        start_index: u32,
        primitive_count: u32,
    ) -> Result<(), ResourceError> {
        if self.fail_draws {
            return Err(ResourceError::BackendError("injected draw failure".into()));
        }
        let (layout, vertex_buffer, capacity) = self.vertex_capacity()?;
        let index_buffer = self
            .state
            .index_buffer
            .ok_or_else(|| ResourceError::BackendError("no index buffer bound".into()))?;
        let bytes = self
            .buffers
            .get(&index_buffer)
            .map(|b| b.data.as_slice())
            .ok_or(ResourceError::InvalidHandle)?;

        let first = start_index as usize * INDEX_SIZE;
        let count = elements_for(topology, primitive_count) as usize;
        let end = first + count * INDEX_SIZE;
        if end > bytes.len() {
            return Err(ResourceError::OutOfBounds);
        }
        let indices = read_indices(&bytes[first..end]);
        let limit = (base_vertex as u64 + vertex_count as u64).min(capacity);
        if indices
            .iter()
            .any(|&i| base_vertex as u64 + i as u64 >= limit)
        {
            return Err(ResourceError::OutOfBounds);
        }

        let record = DrawRecord {
            topology,
            primitive_count,
            indexed: true,
            start_vertex: base_vertex,
            start_index,
            layout,
            vertex_buffer,
            index_buffer: Some(index_buffer),
            indices,
            material: self.state.material,
            texture0: self.state.textures[0],
            alpha: self.state.alpha,
        };
        self.record_draw(record);
        Ok(())
    }

    fn begin_frame(&mut self, clear_color: Option<LinearRgba>) -> Result<(), ResourceError> {
        if self.in_frame {
            return Err(ResourceError::BackendError("frame already started".into()));
        }
        self.in_frame = true;
        self.commands.push(DeviceCommand::BeginFrame(clear_color));
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), ResourceError> {
        if !self.in_frame {
            return Err(ResourceError::BackendError("no frame to end".into()));
        }
        self.in_frame = false;
        self.commands.push(DeviceCommand::EndFrame);
        Ok(())
    }

    fn present(&mut self) -> Result<(), ResourceError> {
        self.frames_presented += 1;
        self.commands.push(DeviceCommand::Present);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn vertex_buffer(device: &mut HeadlessDevice, size: u64) -> BufferId {
        device
            .create_buffer(&BufferDescriptor {
                label: Some(Cow::Borrowed("test vb")),
                size,
                usage: BufferUsage::VERTEX | BufferUsage::WRITE_ONLY,
            })
            .unwrap()
    }

    fn index_buffer(device: &mut HeadlessDevice, indices: &[u16]) -> BufferId {
        let id = device
            .create_buffer(&BufferDescriptor {
                label: None,
                size: (indices.len() * INDEX_SIZE) as u64,
                usage: BufferUsage::INDEX | BufferUsage::WRITE_ONLY,
            })
            .unwrap();
        device
            .write_buffer(id, 0, bytemuck::cast_slice(indices), LockHint::None)
            .unwrap();
        id
    }

    #[test]
    fn test_buffer_creation_and_write() {
        let mut device = HeadlessDevice::new();
        let vb = vertex_buffer(&mut device, 8);
        device
            .write_buffer(vb, 4, &[1, 2, 3, 4], LockHint::Discard)
            .unwrap();
        assert_eq!(device.buffer_contents(vb).unwrap(), &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(device.buffer_label(vb), Some("test vb"));
        assert_eq!(device.allocated_bytes(), 8);
        assert!(device.commands().contains(&DeviceCommand::Lock {
            buffer: vb,
            offset: 4,
            size: 4,
            hint: LockHint::Discard,
        }));
    }

    #[test]
    fn test_lock_out_of_bounds() {
        let mut device = HeadlessDevice::new();
        let vb = vertex_buffer(&mut device, 8);
        let result = device.write_buffer(vb, 6, &[0; 4], LockHint::None);
        assert_eq!(result, Err(ResourceError::OutOfBounds));
    }

    #[test]
    fn test_injected_lock_failure_never_runs_writer() {
        let mut device = HeadlessDevice::new();
        let vb = vertex_buffer(&mut device, 8);
        device.set_fail_locks(true);
        let mut called = false;
        let result = device.lock_buffer(vb, 0, 8, LockHint::None, &mut |_| called = true);
        assert_eq!(result, Err(ResourceError::LockFailed));
        assert!(!called);
    }

    #[test]
    fn test_memory_budget() {
        let mut device = HeadlessDevice::new();
        device.set_memory_budget(Some(100));
        vertex_buffer(&mut device, 64);
        let result = device.create_buffer(&BufferDescriptor {
            label: None,
            size: 64,
            usage: BufferUsage::VERTEX,
        });
        assert_eq!(result, Err(ResourceError::OutOfMemory));
        assert_eq!(device.live_buffer_count(), 1);
    }

    #[test]
    fn test_indexed_draw_records_indices() {
        let mut device = HeadlessDevice::new();
        let vb = vertex_buffer(&mut device, 6 * 32);
        let ib = index_buffer(&mut device, &[0, 1, 2, 3, 4, 5]);
        device.set_vertex_layout(VertexLayout::Unlit).unwrap();
        device.set_vertex_stream(vb, 32).unwrap();
        device.set_index_buffer(Some(ib)).unwrap();
        device
            .draw_indexed(PrimitiveTopology::TriangleList, 0, 6, 0, 2)
            .unwrap();

        let draw = device.draws().next().unwrap();
        assert_eq!(draw.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(draw.layout, VertexLayout::Unlit);
        assert_eq!(device.draw_count(), 1);
    }

    #[test]
    fn test_indexed_draw_rejects_indices_past_vertex_count() {
        let mut device = HeadlessDevice::new();
        let vb = vertex_buffer(&mut device, 6 * 32);
        let ib = index_buffer(&mut device, &[0, 1, 5]);
        device.set_vertex_layout(VertexLayout::Unlit).unwrap();
        device.set_vertex_stream(vb, 32).unwrap();
        device.set_index_buffer(Some(ib)).unwrap();
        let result = device.draw_indexed(PrimitiveTopology::TriangleList, 0, 3, 0, 1);
        assert_eq!(result, Err(ResourceError::OutOfBounds));
        assert_eq!(device.draw_count(), 0);
    }

    #[test]
    fn test_draw_requires_matching_stride() {
        let mut device = HeadlessDevice::new();
        let vb = vertex_buffer(&mut device, 96);
        device.set_vertex_layout(VertexLayout::Lit).unwrap();
        device.set_vertex_stream(vb, 32).unwrap();
        assert!(matches!(
            device.draw(PrimitiveTopology::PointList, 0, 1),
            Err(ResourceError::BackendError(_))
        ));
    }

    #[test]
    fn test_injected_draw_failure() {
        let mut device = HeadlessDevice::new();
        let vb = vertex_buffer(&mut device, 96);
        device.set_vertex_layout(VertexLayout::Unlit).unwrap();
        device.set_vertex_stream(vb, 32).unwrap();
        device.set_fail_draws(true);
        assert!(device.draw(PrimitiveTopology::TriangleList, 0, 1).is_err());
        device.set_fail_draws(false);
        assert!(device.draw(PrimitiveTopology::TriangleList, 0, 1).is_ok());
    }

    #[test]
    fn test_destroy_unbinds() {
        let mut device = HeadlessDevice::new();
        let vb = vertex_buffer(&mut device, 32);
        device.set_vertex_stream(vb, 32).unwrap();
        device.destroy_buffer(vb).unwrap();
        assert_eq!(device.state().vertex_stream, None);
        assert_eq!(device.live_buffer_count(), 0);
        assert_eq!(device.destroy_buffer(vb), Err(ResourceError::InvalidHandle));
    }

    #[test]
    fn test_texture_stages() {
        let mut device = HeadlessDevice::new();
        let tex = device
            .create_texture(&CpuTexture::solid_rgba8(1, 1, [255; 4]))
            .unwrap();
        device.set_texture(0, Some(tex)).unwrap();
        assert_eq!(device.state().textures[0], Some(tex));
        assert_eq!(
            device.set_texture(MAX_TEXTURE_STAGES, None),
            Err(ResourceError::OutOfBounds)
        );
        device.destroy_texture(tex).unwrap();
        assert_eq!(device.state().textures[0], None);
    }

    #[test]
    fn test_frame_lifecycle() {
        let mut device = HeadlessDevice::new();
        assert!(device.end_frame().is_err());
        device.begin_frame(Some(LinearRgba::BLACK)).unwrap();
        assert!(device.begin_frame(None).is_err());
        device.end_frame().unwrap();
        device.present().unwrap();
        assert_eq!(device.frames_presented(), 1);
    }
}
