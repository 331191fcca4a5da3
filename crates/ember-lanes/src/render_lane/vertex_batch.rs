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
use super::{BatchContext, BatchKey};
use ember_core::asset::SkinId;
use ember_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, LockHint, RenderDevice, RenderError, RenderResult,
    ResourceError, INDEX_SIZE,
};
use std::borrow::Cow;

/// A bounded, reusable buffer of vertices and 16-bit indices drawn with one skin.
///
/// Geometry appended with [`add`](Self::add) accumulates in device buffers
/// until [`flush`](Self::flush) draws it in a single call. Indices of every
/// append are offset by the vertices already in the batch, so the batch always
/// holds one continuous index space.
///
/// The batch owns its two device buffers. They are created once and must be
/// given back with [`release`](Self::release).
#[derive(Debug)]
pub struct VertexBatch {
    key: BatchKey,
    stride: usize,
    max_vertices: usize,
    max_indices: usize,
    vertex_count: usize,
    index_count: usize,
    skin: Option<SkinId>,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    scratch: Vec<u16>,
}

impl VertexBatch {
    /// Allocates the device buffers of a batch.
    ///
    /// # Errors
    ///
    /// `BufferCreation` if either buffer cannot be created. Nothing is leaked.
    pub fn new(
        device: &mut dyn RenderDevice,
        key: BatchKey,
        max_vertices: usize,
        max_indices: usize,
    ) -> RenderResult<Self> {
        let stride = key.layout.stride();
        let vertex_buffer = device
            .create_buffer(&BufferDescriptor {
                label: Some(Cow::Owned(format!("Batch {key} vertices"))),
                size: (max_vertices * stride) as u64,
                usage: BufferUsage::VERTEX | BufferUsage::DYNAMIC | BufferUsage::WRITE_ONLY,
            })
            .map_err(RenderError::BufferCreation)?;

        let index_buffer = device
            .create_buffer(&BufferDescriptor {
                label: Some(Cow::Owned(format!("Batch {key} indices"))),
                size: (max_indices * INDEX_SIZE) as u64,
                usage: BufferUsage::INDEX | BufferUsage::DYNAMIC | BufferUsage::WRITE_ONLY,
            })
            .map_err(|e| {
                if let Err(destroy) = device.destroy_buffer(vertex_buffer) {
                    log::warn!("VertexBatch({key}): Failed to destroy vertex buffer: {destroy}");
                }
                RenderError::BufferCreation(e)
            })?;

        Ok(Self {
            key,
            stride,
            max_vertices,
            max_indices,
            vertex_count: 0,
            index_count: 0,
            skin: None,
            vertex_buffer,
            index_buffer,
            scratch: Vec::with_capacity(max_indices),
        })
    }

    /// The pool and slot this batch occupies.
    pub fn key(&self) -> BatchKey {
        self.key
    }

    /// The skin the batch is bound to, if any.
    pub fn skin(&self) -> Option<SkinId> {
        self.skin
    }

    /// Returns `true` if the batch is bound to `skin`.
    #[inline]
    pub fn uses_skin(&self, skin: SkinId) -> bool {
        self.skin == Some(skin)
    }

    /// Vertices waiting to be drawn.
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Indices waiting to be drawn.
    pub fn index_count(&self) -> usize {
        self.index_count
    }

    /// Returns `true` if nothing is waiting to be drawn.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    /// Vertex capacity.
    pub fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    /// Index capacity.
    pub fn max_indices(&self) -> usize {
        self.max_indices
    }

    /// The device buffer holding the vertices.
    pub fn vertex_buffer(&self) -> BufferId {
        self.vertex_buffer
    }

    /// The device buffer holding the indices.
    pub fn index_buffer(&self) -> BufferId {
        self.index_buffer
    }

    /// Checks a submission against the batch's layout and capacity and
    /// returns its vertex and index counts.
    ///
    /// Without an index list, one index per vertex is counted.
    pub fn measure(&self, vertices: &[u8], indices: Option<&[u16]>) -> RenderResult<(usize, usize)> {
        if vertices.len() % self.stride != 0 {
            return Err(RenderError::InvalidParameter(format!(
                "{} vertex bytes is not a multiple of the {} stride ({} bytes)",
                vertices.len(),
                self.key.layout,
                self.stride
            )));
        }
        let vertex_count = vertices.len() / self.stride;
        let index_count = indices.map_or(vertex_count, <[u16]>::len);

        if vertex_count > self.max_vertices {
            return Err(RenderError::BufferTooSmall {
                requested: vertex_count,
                capacity: self.max_vertices,
            });
        }
        if index_count > self.max_indices {
            return Err(RenderError::BufferTooSmall {
                requested: index_count,
                capacity: self.max_indices,
            });
        }
        if let Some(&index) = indices.and_then(|i| i.iter().find(|&&i| i as usize >= vertex_count)) {
            return Err(RenderError::InvalidParameter(format!(
                "index {index} references past the {vertex_count} submitted vertices"
            )));
        }
        Ok((vertex_count, index_count))
    }

    /// Binds the batch to `skin`, flushing geometry drawn with the previous one.
    ///
    /// Rebinding forgets every known device binding, since the device skin
    /// state no longer matches any batch. The batch is rebound even if the
    /// flush fails; the flush error is returned afterwards.
    pub fn set_skin(&mut self, ctx: &mut BatchContext<'_>, skin: SkinId) -> RenderResult<()> {
        if self.uses_skin(skin) {
            return Ok(());
        }
        let flushed = self.flush(ctx);
        self.skin = Some(skin);
        ctx.state.bindings.invalidate();
        flushed
    }

    /// Appends vertices (raw bytes in the batch's layout) and optional indices.
    ///
    /// Without indices, one sequential index is generated per vertex. If the
    /// data does not fit in the remaining space the batch is flushed first.
    ///
    /// # Errors
    ///
    /// * `InvalidParameter` - misaligned vertex bytes or out-of-range indices.
    /// * `BufferTooSmall` - the data alone exceeds the batch capacity.
    /// * `BufferLock` - the device refused write access.
    ///
    /// The batch is left unchanged on error.
    pub fn add(
        &mut self,
        ctx: &mut BatchContext<'_>,
        vertices: &[u8],
        indices: Option<&[u16]>,
    ) -> RenderResult<()> {
        let (vertex_count, index_count) = self.measure(vertices, indices)?;
        if vertex_count == 0 {
            return Ok(());
        }

        if self.vertex_count + vertex_count > self.max_vertices
            || self.index_count + index_count > self.max_indices
        {
            // A failed draw is logged by flush and the space is reclaimed anyway.
            if let Err(e) = self.flush(ctx) {
                log::debug!("VertexBatch({}): Making room dropped geometry: {e}", self.key);
            }
        }

        let hint = if self.is_empty() {
            LockHint::Discard
        } else {
            LockHint::NoOverwrite
        };
        let base = self.vertex_count;

        ctx.device
            .write_buffer(
                self.vertex_buffer,
                (base * self.stride) as u64,
                vertices,
                hint,
            )
            .map_err(|e| self.lock_failed(e))?;

        self.scratch.clear();
        match indices {
            Some(indices) => self
                .scratch
                .extend(indices.iter().map(|&i| (base + i as usize) as u16)),
            None => self
                .scratch
                .extend((base..base + vertex_count).map(|i| i as u16)),
        }
        ctx.device
            .write_buffer(
                self.index_buffer,
                (self.index_count * INDEX_SIZE) as u64,
                bytemuck::cast_slice(&self.scratch),
                hint,
            )
            .map_err(|e| self.lock_failed(e))?;

        self.vertex_count += vertex_count;
        self.index_count += index_count;
        Ok(())
    }

    fn lock_failed(&self, e: ResourceError) -> RenderError {
        log::error!("VertexBatch({}): Buffer lock failed: {e}", self.key);
        RenderError::BufferLock(e)
    }

    /// Draws the pending geometry and empties the batch.
    ///
    /// Does nothing when the batch is empty. The batch is emptied even when
    /// the draw fails; that geometry is lost.
    ///
    /// # Errors
    ///
    /// `Draw` if the device rejected the state changes or the draw call.
    pub fn flush(&mut self, ctx: &mut BatchContext<'_>) -> RenderResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        let result = self.submit(ctx);
        ctx.state.stats.flushes += 1;
        self.vertex_count = 0;
        self.index_count = 0;

        match result {
            Ok(drawn) => {
                if drawn {
                    ctx.state.stats.draw_calls += 1;
                }
                Ok(())
            }
            Err(e) => {
                ctx.state.stats.failed_draws += 1;
                log::error!("VertexBatch({}): Draw failed, geometry dropped: {e}", self.key);
                Err(RenderError::Draw(e))
            }
        }
    }

    fn submit(&self, ctx: &mut BatchContext<'_>) -> Result<bool, ResourceError> {
        if ctx.state.bindings.active_batch != Some(self.key) {
            ctx.device.set_vertex_layout(self.key.layout)?;
            ctx.device.set_index_buffer(Some(self.index_buffer))?;
            ctx.device
                .set_vertex_stream(self.vertex_buffer, self.stride as u32)?;
            ctx.state.bindings.active_batch = Some(self.key);
            ctx.state.bindings.active_static = None;
            ctx.state.stats.state_rebinds += 1;
        }
        if let Some(skin) = self.skin {
            bind_skin(ctx, skin);
        }

        let vertex_count = self.vertex_count as u32;
        let call = select_draw(
            ctx.state.modes.shade_mode,
            vertex_count,
            Some(self.index_count as u32),
        );
        submit_draw(&mut *ctx.device, call, vertex_count)
    }

    /// Destroys the device buffers. Pending geometry is discarded.
    pub fn release(self, device: &mut dyn RenderDevice) {
        for buffer in [self.vertex_buffer, self.index_buffer] {
            if let Err(e) = device.destroy_buffer(buffer) {
                log::warn!("VertexBatch({}): Failed to destroy buffer {buffer:?}: {e}", self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::CacheState;
    use ember_core::math::LinearRgba;
    use ember_core::renderer::{ErrorKind, PrimitiveTopology, ShadeMode, Vertex, VertexLayout};
    use ember_data::skins::SkinRegistry;
    use ember_infra::graphics::headless::DeviceCommand;
    use ember_infra::HeadlessDevice;

    struct Fixture {
        device: HeadlessDevice,
        skins: SkinRegistry,
        state: CacheState,
        skin: SkinId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut skins = SkinRegistry::new();
            let skin = skins
                .add_skin(
                    LinearRgba::WHITE,
                    LinearRgba::RED,
                    LinearRgba::BLACK,
                    LinearRgba::BLACK,
                    1.0,
                )
                .unwrap();
            Self {
                device: HeadlessDevice::new(),
                skins,
                state: CacheState::default(),
                skin,
            }
        }

        fn ctx(&mut self) -> BatchContext<'_> {
            BatchContext::new(&mut self.device, &self.skins, &mut self.state)
        }

        fn batch(&mut self, max_vertices: usize, max_indices: usize) -> VertexBatch {
            let key = BatchKey {
                layout: VertexLayout::Unlit,
                slot: 0,
            };
            VertexBatch::new(&mut self.device, key, max_vertices, max_indices).unwrap()
        }
    }

    fn triangle() -> Vec<u8> {
        let vertices = [
            Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        bytemuck::cast_slice(&vertices).to_vec()
    }

    #[test]
    fn test_indices_are_rebased_by_running_vertex_count() {
        let mut fx = Fixture::new();
        let mut batch = fx.batch(16, 16);
        let tri = triangle();
        batch.add(&mut fx.ctx(), &tri, Some(&[0, 1, 2])).unwrap();
        batch.add(&mut fx.ctx(), &tri, Some(&[0, 1, 2])).unwrap();

        let indices = fx.device.buffer_indices(batch.index_buffer()).unwrap();
        assert_eq!(&indices[..6], &[0, 1, 2, 3, 4, 5]);
        assert_eq!((batch.vertex_count(), batch.index_count()), (6, 6));
    }

    #[test]
    fn test_missing_indices_are_generated_sequentially() {
        let mut fx = Fixture::new();
        let mut batch = fx.batch(16, 16);
        let tri = triangle();
        batch.add(&mut fx.ctx(), &tri, Some(&[2, 1, 0])).unwrap();
        batch.add(&mut fx.ctx(), &tri, None).unwrap();

        let indices = fx.device.buffer_indices(batch.index_buffer()).unwrap();
        assert_eq!(&indices[..6], &[2, 1, 0, 3, 4, 5]);
    }

    #[test]
    fn test_first_write_discards_and_appends_do_not_overwrite() {
        let mut fx = Fixture::new();
        let mut batch = fx.batch(16, 16);
        let tri = triangle();
        batch.add(&mut fx.ctx(), &tri, None).unwrap();
        batch.add(&mut fx.ctx(), &tri, None).unwrap();

        let hints: Vec<_> = fx
            .device
            .commands()
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::Lock { hint, .. } => Some(*hint),
                _ => None,
            })
            .collect();
        assert_eq!(
            hints,
            vec![
                LockHint::Discard,
                LockHint::Discard,
                LockHint::NoOverwrite,
                LockHint::NoOverwrite
            ]
        );
    }

    #[test]
    fn test_oversized_submission_leaves_batch_unchanged() {
        let mut fx = Fixture::new();
        let mut batch = fx.batch(4, 16);
        let tri = triangle();
        batch.add(&mut fx.ctx(), &tri, None).unwrap();

        let six = [tri.clone(), tri].concat();
        let err = batch.add(&mut fx.ctx(), &six, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BufferTooSmall);
        assert_eq!((batch.vertex_count(), batch.index_count()), (3, 3));

        let err = batch
            .add(&mut fx.ctx(), &triangle(), Some(&[0; 17]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BufferTooSmall);
        assert_eq!(fx.device.draw_count(), 0);
    }

    #[test]
    fn test_overflow_flushes_before_appending() {
        let mut fx = Fixture::new();
        let mut batch = fx.batch(4, 16);
        let skin = fx.skin;
        batch.set_skin(&mut fx.ctx(), skin).unwrap();
        let tri = triangle();
        batch.add(&mut fx.ctx(), &tri, None).unwrap();
        batch.add(&mut fx.ctx(), &tri, None).unwrap();

        assert_eq!(fx.device.draw_count(), 1);
        assert_eq!(batch.vertex_count(), 3);
        assert!(batch.vertex_count() <= batch.max_vertices());
    }

    #[test]
    fn test_flush_on_empty_batch_draws_nothing() {
        let mut fx = Fixture::new();
        let mut batch = fx.batch(8, 8);
        fx.device.clear_commands();
        batch.flush(&mut fx.ctx()).unwrap();
        assert!(fx.device.commands().is_empty());
        assert_eq!(fx.state.stats.flushes, 0);
    }

    #[test]
    fn test_flush_draws_triangles_with_skin_material() {
        let mut fx = Fixture::new();
        let mut batch = fx.batch(8, 8);
        let skin = fx.skin;
        batch.set_skin(&mut fx.ctx(), skin).unwrap();
        batch.add(&mut fx.ctx(), &triangle(), None).unwrap();
        batch.flush(&mut fx.ctx()).unwrap();

        let draw = fx.device.draws().next().unwrap();
        assert_eq!(draw.topology, PrimitiveTopology::TriangleList);
        assert_eq!(draw.primitive_count, 1);
        assert!(draw.indexed);
        assert_eq!(draw.material.unwrap().diffuse, LinearRgba::RED);
        assert!(batch.is_empty());
        assert_eq!(fx.state.bindings.active_skin, Some(skin));
        assert_eq!(fx.state.bindings.active_batch, Some(batch.key()));
    }

    #[test]
    fn test_points_mode_draws_vertices_directly() {
        let mut fx = Fixture::new();
        fx.state.modes.shade_mode = ShadeMode::Points;
        let mut batch = fx.batch(8, 8);
        batch.add(&mut fx.ctx(), &triangle(), None).unwrap();
        batch.flush(&mut fx.ctx()).unwrap();

        let draw = fx.device.draws().next().unwrap();
        assert_eq!(draw.topology, PrimitiveTopology::PointList);
        assert_eq!(draw.primitive_count, 3);
        assert!(!draw.indexed);
    }

    #[test]
    fn test_active_batch_skips_stream_rebinding() {
        let mut fx = Fixture::new();
        let mut batch = fx.batch(8, 8);
        for _ in 0..3 {
            batch.add(&mut fx.ctx(), &triangle(), None).unwrap();
            batch.flush(&mut fx.ctx()).unwrap();
        }
        let layouts =
            fx.device
                .count_commands(|c| matches!(c, DeviceCommand::SetVertexLayout(_)));
        assert_eq!(layouts, 1);
        assert_eq!(fx.device.draw_count(), 3);
    }

    #[test]
    fn test_draw_failure_still_empties_batch() {
        let mut fx = Fixture::new();
        let mut batch = fx.batch(8, 8);
        batch.add(&mut fx.ctx(), &triangle(), None).unwrap();
        fx.device.set_fail_draws(true);

        let err = batch.flush(&mut fx.ctx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Draw);
        assert!(batch.is_empty());
        assert_eq!(fx.state.stats.failed_draws, 1);
    }

    #[test]
    fn test_lock_failure_is_reported_without_counting() {
        let mut fx = Fixture::new();
        let mut batch = fx.batch(8, 8);
        fx.device.set_fail_locks(true);
        let err = batch.add(&mut fx.ctx(), &triangle(), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BufferLock);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_rejects_misaligned_bytes_and_stray_indices() {
        let mut fx = Fixture::new();
        let mut batch = fx.batch(8, 8);
        let tri = triangle();
        let err = batch.add(&mut fx.ctx(), &tri[..40], None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = batch.add(&mut fx.ctx(), &tri, Some(&[0, 1, 3])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_set_skin_flushes_and_invalidates() {
        let mut fx = Fixture::new();
        let other = fx.skins.add_skin_with_material(Default::default()).unwrap();
        let mut batch = fx.batch(8, 8);
        let skin = fx.skin;
        batch.set_skin(&mut fx.ctx(), skin).unwrap();
        batch.add(&mut fx.ctx(), &triangle(), None).unwrap();

        batch.set_skin(&mut fx.ctx(), other).unwrap();
        assert_eq!(fx.device.draw_count(), 1);
        assert!(batch.uses_skin(other));
        assert_eq!(fx.state.bindings, Default::default());

        batch.set_skin(&mut fx.ctx(), other).unwrap();
        assert_eq!(fx.device.draw_count(), 1);
    }

    #[test]
    fn test_release_destroys_both_buffers() {
        let mut fx = Fixture::new();
        let batch = fx.batch(8, 8);
        assert_eq!(fx.device.live_buffer_count(), 2);
        batch.release(&mut fx.device);
        assert_eq!(fx.device.live_buffer_count(), 0);
    }

    #[test]
    fn test_failed_index_allocation_frees_vertex_buffer() {
        let mut device = HeadlessDevice::new();
        device.set_memory_budget(Some(8 * 32));
        let key = BatchKey {
            layout: VertexLayout::Unlit,
            slot: 0,
        };
        let err = VertexBatch::new(&mut device, key, 8, 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
        assert_eq!(device.live_buffer_count(), 0);
    }
}
