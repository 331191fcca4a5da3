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

//! Defines the RenderAgent, the owner of everything the renderer draws with.

use super::EngineConfig;
use ember_core::asset::{Material, MaterialId, Skin, SkinId, TextureId};
use ember_core::math::{LinearRgba, Mat4, Plane, Vec3, Vec4};
use ember_core::renderer::{
    CpuTexture, CullMode, DepthMode, FillMode, GpuVertex, RenderDevice, RenderError, RenderResult,
    RenderState, ShadeMode, TransformSlot, VertexLayout,
};
use ember_data::skins::{AlphaSettings, SkinRegistry};
use ember_lanes::render_lane::{BatchStats, StaticBufferId, VertexCacheManager};
use std::path::Path;

/// Index of each plane in the array returned by [`RenderAgent::frustum_planes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumSide {
    /// `x >= -w` in clip space.
    Left = 0,
    /// `x <= w`.
    Right = 1,
    /// `y >= -w`.
    Bottom = 2,
    /// `y <= w`.
    Top = 3,
    /// `z >= 0`.
    Near = 4,
    /// `z <= w`.
    Far = 5,
}

/// The agent responsible for the device, the skins and the vertex cache.
///
/// Every method that changes state seen by queued geometry (transforms, shade
/// mode, lighting, culling, depth) first flushes the cache, so geometry is
/// always drawn with the state it was submitted under.
///
/// Dropping the agent releases every batch buffer, static buffer and texture
/// through the device.
#[derive(Debug)]
pub struct RenderAgent<D: RenderDevice> {
    device: D,
    skins: SkinRegistry,
    cache: VertexCacheManager,
    // Kept to extract the view frustum.
    view: Mat4,
    projection: Mat4,
    point_size: f32,
    clear_color: Option<LinearRgba>,
    // Counters of the last finished frame.
    last_frame_stats: BatchStats,
    frame_count: u64,
}

impl<D: RenderDevice> RenderAgent<D> {
    /// Builds the vertex cache on `device` and applies the initial render modes.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for an invalid cache configuration, or any error
    /// raised while allocating the batches or applying the initial state.
    pub fn new(mut device: D, config: EngineConfig) -> RenderResult<Self> {
        let mut cache = VertexCacheManager::new(&mut device, config.cache)?;
        cache.set_wire_color(config.wire_color);
        cache.set_use_textures(config.use_textures);

        let mut agent = Self {
            device,
            skins: SkinRegistry::new(),
            cache,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            point_size: config.point_size,
            clear_color: config.clear_color,
            last_frame_stats: BatchStats::default(),
            frame_count: 0,
        };
        agent.apply_shade_mode(config.shade_mode, config.point_size)?;
        log::info!(
            "RenderAgent: Initialized in {:?} mode",
            agent.cache.modes().shade_mode
        );
        Ok(agent)
    }

    /// The device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the device.
    ///
    /// State changed through this reference is invisible to the cache; call
    /// [`invalidate_states`](Self::invalidate_states) afterwards.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// The skin registry.
    pub fn skins(&self) -> &SkinRegistry {
        &self.skins
    }

    /// The vertex cache.
    pub fn cache(&self) -> &VertexCacheManager {
        &self.cache
    }

    // --- Skins ---

    /// Registers a skin. See [`SkinRegistry::add_skin`].
    pub fn add_skin(
        &mut self,
        ambient: LinearRgba,
        diffuse: LinearRgba,
        specular: LinearRgba,
        emissive: LinearRgba,
        power: f32,
    ) -> RenderResult<SkinId> {
        self.skins
            .add_skin(ambient, diffuse, specular, emissive, power)
    }

    /// Registers a skin from a complete material.
    pub fn add_skin_with_material(&mut self, material: Material) -> RenderResult<SkinId> {
        self.skins.add_skin_with_material(material)
    }

    /// Loads a texture file into a skin. See [`SkinRegistry::add_texture`].
    pub fn add_texture(
        &mut self,
        skin: SkinId,
        path: impl AsRef<Path>,
        alpha: Option<&AlphaSettings>,
    ) -> RenderResult<TextureId> {
        self.skins.add_texture(&mut self.device, skin, path, alpha)
    }

    /// Adds in-memory pixels to a skin. See [`SkinRegistry::add_texture_from_pixels`].
    pub fn add_texture_from_pixels(
        &mut self,
        skin: SkinId,
        name: &str,
        texture: CpuTexture,
        alpha: Option<&AlphaSettings>,
    ) -> RenderResult<TextureId> {
        self.skins
            .add_texture_from_pixels(&mut self.device, skin, name, texture, alpha)
    }

    /// A copy of a skin, zeroed if unknown.
    pub fn get_skin(&self, id: SkinId) -> Skin {
        self.skins.get_skin(id)
    }

    /// A copy of a material, zeroed if unknown.
    pub fn get_material(&self, id: MaterialId) -> Material {
        self.skins.get_material(id)
    }

    // --- Geometry ---

    /// Queues dynamic geometry. See [`VertexCacheManager::render`].
    pub fn render(
        &mut self,
        layout: VertexLayout,
        skin: SkinId,
        vertices: &[u8],
        indices: Option<&[u16]>,
    ) -> RenderResult<()> {
        self.cache
            .render(&mut self.device, &self.skins, layout, skin, vertices, indices)
    }

    /// Queues typed dynamic geometry.
    pub fn render_vertices<V: GpuVertex>(
        &mut self,
        skin: SkinId,
        vertices: &[V],
        indices: Option<&[u16]>,
    ) -> RenderResult<()> {
        self.cache
            .render_vertices(&mut self.device, &self.skins, skin, vertices, indices)
    }

    /// Uploads pre-baked geometry. See [`VertexCacheManager::create_static_buffer`].
    pub fn create_static_buffer(
        &mut self,
        layout: VertexLayout,
        skin: SkinId,
        vertices: &[u8],
        indices: Option<&[u16]>,
    ) -> RenderResult<StaticBufferId> {
        self.cache
            .create_static_buffer(&mut self.device, &self.skins, layout, skin, vertices, indices)
    }

    /// Draws a static buffer. See [`VertexCacheManager::render_static`].
    pub fn render_static(&mut self, id: StaticBufferId) -> RenderResult<()> {
        self.cache.render_static(&mut self.device, &self.skins, id)
    }

    /// Flushes one pool.
    pub fn forced_flush(&mut self, layout: VertexLayout) -> RenderResult<()> {
        self.cache.forced_flush(&mut self.device, &self.skins, layout)
    }

    /// Flushes every pool.
    pub fn forced_flush_all(&mut self) -> RenderResult<()> {
        self.cache.forced_flush_all(&mut self.device, &self.skins)
    }

    /// Forgets every known device binding.
    pub fn invalidate_states(&mut self) {
        self.cache.invalidate_states();
    }

    /// Flushes queued geometry ahead of a state change. Dropped draws were
    /// already logged by the cache and do not stop the change.
    fn flush_pending(&mut self) {
        if let Err(e) = self.cache.forced_flush_all(&mut self.device, &self.skins) {
            log::warn!("RenderAgent: Flush before state change failed: {e}");
        }
    }

    // --- Render states ---

    /// The current shade mode.
    pub fn shade_mode(&self) -> ShadeMode {
        self.cache.modes().shade_mode
    }

    /// Switches the shade mode.
    ///
    /// `point_size` is applied in points mode. A `wire_color` replaces the
    /// flat material color of the wire modes.
    pub fn set_shade_mode(
        &mut self,
        mode: ShadeMode,
        point_size: f32,
        wire_color: Option<LinearRgba>,
    ) -> RenderResult<()> {
        self.flush_pending();
        if let Some(color) = wire_color {
            self.cache.set_wire_color(color);
            self.cache.invalidate_states();
        }
        self.apply_shade_mode(mode, point_size)
    }

    fn apply_shade_mode(&mut self, mode: ShadeMode, point_size: f32) -> RenderResult<()> {
        // Rejected before any device call so a failed switch changes nothing.
        if mode == ShadeMode::Points {
            validate_point_size(point_size)?;
        }
        if mode == self.cache.modes().shade_mode {
            if mode == ShadeMode::Points {
                self.set_point_size(point_size)?;
            }
            return Ok(());
        }

        let fill = match mode {
            ShadeMode::Solid => FillMode::Solid,
            ShadeMode::TriangleWire | ShadeMode::HullWire | ShadeMode::Lines => {
                FillMode::Wireframe
            }
            ShadeMode::Points => FillMode::Point,
        };
        self.device.set_render_state(RenderState::Fill(fill))?;
        if mode == ShadeMode::Points {
            self.set_point_size(point_size)?;
        }
        self.cache.set_shade_mode(mode);
        self.cache.invalidate_states();
        log::debug!("RenderAgent: Shade mode set to {mode:?}");
        Ok(())
    }

    fn set_point_size(&mut self, size: f32) -> RenderResult<()> {
        self.device.set_render_state(RenderState::PointSize(size))?;
        self.point_size = size;
        Ok(())
    }

    /// The point size last applied in points mode.
    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    /// Enables or disables skin textures in solid mode. Does nothing if unchanged.
    pub fn use_textures(&mut self, enabled: bool) {
        if self.cache.modes().use_textures == enabled {
            return;
        }
        self.flush_pending();
        self.cache.invalidate_states();
        self.cache.set_use_textures(enabled);
    }

    /// Selects which faces are culled.
    pub fn set_backface_culling(&mut self, mode: CullMode) -> RenderResult<()> {
        self.flush_pending();
        self.device.set_render_state(RenderState::Cull(mode))?;
        Ok(())
    }

    /// Selects how the depth buffer is used.
    pub fn set_depth_buffer_mode(&mut self, mode: DepthMode) -> RenderResult<()> {
        self.flush_pending();
        self.device.set_render_state(RenderState::Depth(mode))?;
        Ok(())
    }

    /// Sets the ambient light color.
    pub fn set_ambient_light(&mut self, color: LinearRgba) -> RenderResult<()> {
        self.flush_pending();
        self.device.set_ambient_light(color)?;
        Ok(())
    }

    // --- Transforms ---

    /// Sets the object-to-world transform. `None` resets it to identity.
    pub fn set_world_transform(&mut self, world: Option<&Mat4>) -> RenderResult<()> {
        self.flush_pending();
        self.device
            .set_transform(TransformSlot::World, world.unwrap_or(&Mat4::IDENTITY))?;
        Ok(())
    }

    /// Sets the world-to-camera transform.
    pub fn set_view_transform(&mut self, view: &Mat4) -> RenderResult<()> {
        self.flush_pending();
        self.device.set_transform(TransformSlot::View, view)?;
        self.view = *view;
        Ok(())
    }

    /// Builds a left-handed view transform looking from `eye` at `target`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `eye` equals `target` or `up` is parallel to the
    /// view direction.
    pub fn set_view_look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) -> RenderResult<()> {
        let view = Mat4::look_at_lh(eye, target, up).ok_or_else(|| {
            RenderError::InvalidParameter(format!(
                "degenerate view: eye {eye:?}, target {target:?}, up {up:?}"
            ))
        })?;
        self.set_view_transform(&view)
    }

    /// Sets the camera-to-clip transform.
    pub fn set_projection(&mut self, projection: &Mat4) -> RenderResult<()> {
        self.flush_pending();
        self.device
            .set_transform(TransformSlot::Projection, projection)?;
        self.projection = *projection;
        Ok(())
    }

    /// Sets a left-handed perspective projection.
    pub fn set_perspective(
        &mut self,
        fov_y: f32,
        aspect_ratio: f32,
        z_near: f32,
        z_far: f32,
    ) -> RenderResult<()> {
        if !(z_near > 0.0 && z_far > z_near && aspect_ratio > 0.0) {
            return Err(RenderError::InvalidParameter(format!(
                "invalid perspective: aspect {aspect_ratio}, near {z_near}, far {z_far}"
            )));
        }
        self.set_projection(&Mat4::perspective_lh(fov_y, aspect_ratio, z_near, z_far))
    }

    /// The six planes bounding the visible volume, normals pointing inwards,
    /// indexed by [`FrustumSide`].
    pub fn frustum_planes(&self) -> [Plane; 6] {
        let m = self.projection * self.view;
        let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));
        [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2].map(plane_from_row)
    }

    // --- Frames ---

    /// Starts a frame, clearing to the configured clear color.
    pub fn begin_frame(&mut self) -> RenderResult<()> {
        self.device.begin_frame(self.clear_color)?;
        Ok(())
    }

    /// Flushes everything still queued, ends the frame and presents it.
    ///
    /// Flush failures are logged; the frame is still presented.
    pub fn end_frame(&mut self) -> RenderResult<()> {
        self.flush_pending();
        self.device.end_frame()?;
        self.device.present()?;

        self.last_frame_stats = self.cache.take_stats();
        self.frame_count += 1;
        log::debug!(
            "RenderAgent: Frame {} - {}",
            self.frame_count,
            self.last_frame_stats
        );
        Ok(())
    }

    /// Batching counters of the last presented frame.
    pub fn last_frame_stats(&self) -> &BatchStats {
        &self.last_frame_stats
    }

    /// Number of frames presented.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

fn validate_point_size(size: f32) -> RenderResult<()> {
    if size > 0.0 {
        Ok(())
    } else {
        Err(RenderError::InvalidParameter(format!(
            "point size must be positive, got {size}"
        )))
    }
}

fn plane_from_row(row: Vec4) -> Plane {
    Plane::from_normal_distance(row.truncate(), row.w).normalized()
}

impl<D: RenderDevice> Drop for RenderAgent<D> {
    fn drop(&mut self) {
        self.cache.release(&mut self.device);
        self.skins.release(&mut self.device);
        log::info!(
            "RenderAgent: Released device resources after {} frame(s)",
            self.frame_count
        );
    }
}
