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

//! Device binding state shared by every batch and static buffer.

use super::{BatchStats, StaticBufferId};
use ember_core::asset::SkinId;
use ember_core::math::LinearRgba;
use ember_core::renderer::{RenderDevice, ShadeMode, VertexLayout};
use ember_data::skins::SkinRegistry;
use std::fmt;

/// Identifies one batch: its pool's layout and its slot within the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchKey {
    /// The layout of the pool the batch belongs to.
    pub layout: VertexLayout,
    /// The batch's index within its pool.
    pub slot: usize,
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.layout, self.slot)
    }
}

/// What is currently bound on the device, as far as the cache knows.
///
/// `None` means unknown: the next submission rebinds that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindingState {
    /// The batch whose buffers are bound as vertex and index streams.
    pub active_batch: Option<BatchKey>,
    /// The static buffer whose buffers are bound.
    pub active_static: Option<StaticBufferId>,
    /// The skin whose material, textures and alpha state are bound.
    pub active_skin: Option<SkinId>,
}

impl BindingState {
    /// Forgets every binding.
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }
}

/// Global shading options consulted when batches are drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderModes {
    /// Selects the draw topology and solid or wire materials.
    pub shade_mode: ShadeMode,
    /// Color of the flat material used by the wire modes.
    pub wire_color: LinearRgba,
    /// Whether skin textures are bound in solid mode.
    pub use_textures: bool,
}

impl Default for RenderModes {
    fn default() -> Self {
        Self {
            shade_mode: ShadeMode::Solid,
            wire_color: LinearRgba::WHITE,
            use_textures: true,
        }
    }
}

/// The mutable state owned by the cache and threaded through every flush.
#[derive(Debug, Clone, Default)]
pub struct CacheState {
    /// Known device bindings.
    pub bindings: BindingState,
    /// Shading options.
    pub modes: RenderModes,
    /// Batching counters.
    pub stats: BatchStats,
    /// Number of leading texture stages the cache left a texture bound on.
    pub textured_stages: usize,
}

/// Everything a batch needs to submit itself: the device, the skins it may
/// bind, and the cache state it reads and updates.
pub struct BatchContext<'a> {
    /// The device receiving state changes and draws.
    pub device: &'a mut dyn RenderDevice,
    /// Resolves skin ids to materials and textures.
    pub skins: &'a SkinRegistry,
    /// Bindings, modes and counters.
    pub state: &'a mut CacheState,
}

impl<'a> BatchContext<'a> {
    /// Bundles the pieces a flush needs.
    pub fn new(
        device: &'a mut dyn RenderDevice,
        skins: &'a SkinRegistry,
        state: &'a mut CacheState,
    ) -> Self {
        Self {
            device,
            skins,
            state,
        }
    }
}
