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

//! The batch pool manager: admission, eviction and flushing of vertex batches.

use super::{
    BatchContext, BatchKey, BatchStats, BindingState, CacheConfig, CacheState, RenderModes,
    StaticBufferId, StaticBufferStore, VertexBatch,
};
use ember_core::asset::SkinId;
use ember_core::math::LinearRgba;
use ember_core::renderer::{
    GpuVertex, IdKind, RenderDevice, RenderError, RenderResult, ShadeMode, VertexLayout,
};
use ember_data::skins::SkinRegistry;

#[derive(Debug)]
struct BatchPool {
    layout: VertexLayout,
    batches: Vec<VertexBatch>,
}

/// A skin-keyed write-combining cache of draw calls.
///
/// Each configured vertex layout gets a fixed pool of [`VertexBatch`]es.
/// Geometry submitted with [`render`](Self::render) goes to the batch already
/// bound to its skin, else to the first empty batch, else to the fullest
/// batch, which is flushed and rebound first.
///
/// The manager owns the record of what is bound on the device, so it must be
/// the only code changing vertex streams, materials, textures or alpha state.
/// Its device buffers are returned with [`release`](Self::release).
#[derive(Debug)]
pub struct VertexCacheManager {
    config: CacheConfig,
    pools: Vec<BatchPool>,
    statics: StaticBufferStore,
    state: CacheState,
}

/// Treats a dropped draw as success: the failure was already logged and counted.
fn best_effort(result: RenderResult<()>) -> RenderResult<()> {
    match result {
        Err(RenderError::Draw(_)) => Ok(()),
        other => other,
    }
}

impl VertexCacheManager {
    /// Validates `config` and allocates every batch of every pool.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for an invalid configuration, `BufferCreation` if a
    /// batch cannot be allocated. Batches created before the failure are released.
    pub fn new(device: &mut dyn RenderDevice, config: CacheConfig) -> RenderResult<Self> {
        config.validate()?;

        let mut pools: Vec<BatchPool> = Vec::with_capacity(config.layouts.len());
        for &layout in &config.layouts {
            let mut batches = Vec::with_capacity(config.batches_per_pool);
            for slot in 0..config.batches_per_pool {
                let key = BatchKey { layout, slot };
                match VertexBatch::new(device, key, config.max_vertices, config.max_indices) {
                    Ok(batch) => batches.push(batch),
                    Err(e) => {
                        log::error!("VertexCacheManager: Failed to allocate batch {key}: {e}");
                        pools.push(BatchPool { layout, batches });
                        release_pools(device, &mut pools);
                        return Err(e);
                    }
                }
            }
            pools.push(BatchPool { layout, batches });
        }

        log::info!(
            "VertexCacheManager: {} pool(s) of {} batches ({} vertices, {} indices each)",
            pools.len(),
            config.batches_per_pool,
            config.max_vertices,
            config.max_indices
        );
        Ok(Self {
            config,
            pools,
            statics: StaticBufferStore::new(),
            state: CacheState::default(),
        })
    }

    fn pool_index(&self, layout: VertexLayout) -> RenderResult<usize> {
        self.pools
            .iter()
            .position(|pool| pool.layout == layout)
            .ok_or_else(|| RenderError::invalid_id(IdKind::VertexLayout, layout as u32))
    }

    /// Queues geometry drawn with `skin`.
    ///
    /// `vertices` holds whole vertices of `layout`. Without `indices`, the
    /// vertices are drawn in order.
    ///
    /// # Errors
    ///
    /// * `InvalidId` - no pool for `layout`, or `skin` is not registered.
    /// * `InvalidParameter` / `BufferTooSmall` - the geometry does not fit a batch.
    /// * `BufferLock` - the device refused write access.
    ///
    /// Draws dropped while making room are logged and not reported.
    pub fn render(
        &mut self,
        device: &mut dyn RenderDevice,
        skins: &SkinRegistry,
        layout: VertexLayout,
        skin: SkinId,
        vertices: &[u8],
        indices: Option<&[u16]>,
    ) -> RenderResult<()> {
        let pool_index = self.pool_index(layout)?;
        if skins.skin(skin).is_none() {
            return Err(RenderError::invalid_id(IdKind::Skin, skin.0));
        }
        let pool = &mut self.pools[pool_index];
        if let Some(first) = pool.batches.first() {
            first.measure(vertices, indices)?;
        }

        self.state.bindings.active_static = None;
        let mut ctx = BatchContext::new(device, skins, &mut self.state);

        let mut empty = None;
        let mut fullest = 0;
        let mut fullest_count = 0;
        for (slot, batch) in pool.batches.iter_mut().enumerate() {
            if batch.uses_skin(skin) {
                ctx.state.stats.skin_hits += 1;
                return batch.add(&mut ctx, vertices, indices);
            }
            if empty.is_none() && batch.is_empty() {
                empty = Some(slot);
            }
            if batch.vertex_count() > fullest_count {
                fullest = slot;
                fullest_count = batch.vertex_count();
            }
        }

        let slot = match empty {
            Some(slot) => slot,
            None => {
                ctx.state.stats.evictions += 1;
                log::trace!(
                    "VertexCacheManager: Evicting {} ({} vertices) for {}",
                    pool.batches[fullest].key(),
                    fullest_count,
                    skin
                );
                fullest
            }
        };
        let batch = &mut pool.batches[slot];
        best_effort(batch.set_skin(&mut ctx, skin))?;
        batch.add(&mut ctx, vertices, indices)
    }

    /// Typed form of [`render`](Self::render) for a [`GpuVertex`] slice.
    pub fn render_vertices<V: GpuVertex>(
        &mut self,
        device: &mut dyn RenderDevice,
        skins: &SkinRegistry,
        skin: SkinId,
        vertices: &[V],
        indices: Option<&[u16]>,
    ) -> RenderResult<()> {
        self.render(
            device,
            skins,
            V::LAYOUT,
            skin,
            bytemuck::cast_slice(vertices),
            indices,
        )
    }

    /// Draws a static buffer immediately.
    ///
    /// Pending batches are not flushed; call [`forced_flush_all`](Self::forced_flush_all)
    /// first if draw order between them matters.
    ///
    /// # Errors
    ///
    /// `InvalidId` for an unknown buffer, `Draw` if the device rejected the draw.
    pub fn render_static(
        &mut self,
        device: &mut dyn RenderDevice,
        skins: &SkinRegistry,
        id: StaticBufferId,
    ) -> RenderResult<()> {
        let mut ctx = BatchContext::new(device, skins, &mut self.state);
        self.statics.render(&mut ctx, id)
    }

    /// Uploads pre-baked geometry into a new static buffer.
    ///
    /// # Errors
    ///
    /// `InvalidId` for an unregistered skin, plus the errors of
    /// [`StaticBufferStore::create`].
    pub fn create_static_buffer(
        &mut self,
        device: &mut dyn RenderDevice,
        skins: &SkinRegistry,
        layout: VertexLayout,
        skin: SkinId,
        vertices: &[u8],
        indices: Option<&[u16]>,
    ) -> RenderResult<StaticBufferId> {
        if skins.skin(skin).is_none() {
            return Err(RenderError::invalid_id(IdKind::Skin, skin.0));
        }
        self.statics.create(device, layout, skin, vertices, indices)
    }

    /// Flushes every batch of one pool.
    ///
    /// Every batch is flushed even if some fail; the first failure is returned.
    pub fn forced_flush(
        &mut self,
        device: &mut dyn RenderDevice,
        skins: &SkinRegistry,
        layout: VertexLayout,
    ) -> RenderResult<()> {
        let pool_index = self.pool_index(layout)?;
        let mut ctx = BatchContext::new(device, skins, &mut self.state);
        flush_batches(&mut ctx, &mut self.pools[pool_index].batches)
    }

    /// Flushes every non-empty batch of every pool, in pool order.
    ///
    /// Must run before anything changes state that queued geometry would be
    /// drawn with. Every batch is flushed even if some fail; the first failure
    /// is returned.
    pub fn forced_flush_all(
        &mut self,
        device: &mut dyn RenderDevice,
        skins: &SkinRegistry,
    ) -> RenderResult<()> {
        let mut ctx = BatchContext::new(device, skins, &mut self.state);
        let mut first_error = None;
        for pool in &mut self.pools {
            if let Err(e) = flush_batches(&mut ctx, &mut pool.batches) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Forgets every known device binding so the next draw rebinds everything.
    pub fn invalidate_states(&mut self) {
        self.state.bindings.invalidate();
    }

    /// The known device bindings.
    pub fn bindings(&self) -> &BindingState {
        &self.state.bindings
    }

    /// The shading options.
    pub fn modes(&self) -> &RenderModes {
        &self.state.modes
    }

    /// Changes the shade mode used by subsequent flushes. Does not flush or invalidate.
    pub fn set_shade_mode(&mut self, mode: ShadeMode) {
        self.state.modes.shade_mode = mode;
    }

    /// Changes the wire material color. Does not flush or invalidate.
    pub fn set_wire_color(&mut self, color: LinearRgba) {
        self.state.modes.wire_color = color;
    }

    /// Enables or disables texturing in solid mode. Does not flush or invalidate.
    pub fn set_use_textures(&mut self, enabled: bool) {
        self.state.modes.use_textures = enabled;
    }

    /// Batching counters since the last reset.
    pub fn stats(&self) -> &BatchStats {
        &self.state.stats
    }

    /// Returns the counters and zeroes them.
    pub fn take_stats(&mut self) -> BatchStats {
        std::mem::take(&mut self.state.stats)
    }

    /// The configuration the cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The batches of one pool, in slot order.
    pub fn batches(&self, layout: VertexLayout) -> &[VertexBatch] {
        self.pools
            .iter()
            .find(|pool| pool.layout == layout)
            .map(|pool| pool.batches.as_slice())
            .unwrap_or(&[])
    }

    /// The static buffers.
    pub fn static_buffers(&self) -> &StaticBufferStore {
        &self.statics
    }

    /// Destroys every batch and static buffer. Pending geometry is discarded.
    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        release_pools(device, &mut self.pools);
        self.statics.release(device);
        self.state.bindings.invalidate();
    }
}

fn flush_batches(ctx: &mut BatchContext<'_>, batches: &mut [VertexBatch]) -> RenderResult<()> {
    let mut first_error = None;
    for batch in batches.iter_mut().filter(|b| !b.is_empty()) {
        if let Err(e) = batch.flush(ctx) {
            log::warn!("VertexCacheManager: Forced flush of {} failed: {e}", batch.key());
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn release_pools(device: &mut dyn RenderDevice, pools: &mut Vec<BatchPool>) {
    for pool in pools.drain(..) {
        for batch in pool.batches {
            batch.release(device);
        }
    }
}
