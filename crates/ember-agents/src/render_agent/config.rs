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

use anyhow::{Context, Result};
use ember_core::math::LinearRgba;
use ember_core::renderer::ShadeMode;
use ember_lanes::render_lane::CacheConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Startup settings of a [`RenderAgent`](super::RenderAgent).
///
/// Every field has a default, so a RON file only lists what it changes:
///
/// ```
/// use ember_agents::render_agent::EngineConfig;
/// use ember_core::renderer::ShadeMode;
///
/// let config = EngineConfig::from_ron_str("(shade_mode: Points, point_size: 4.0)").unwrap();
/// assert_eq!(config.shade_mode, ShadeMode::Points);
/// assert_eq!(config.cache.batches_per_pool, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sizing of the vertex cache.
    pub cache: CacheConfig,
    /// Initial shade mode.
    pub shade_mode: ShadeMode,
    /// Point size in pixels, used in points mode.
    pub point_size: f32,
    /// Color of the wire modes' flat material.
    pub wire_color: LinearRgba,
    /// Color the target is cleared to at the start of each frame. `None` keeps it.
    pub clear_color: Option<LinearRgba>,
    /// Whether skin textures are bound in solid mode.
    pub use_textures: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            shade_mode: ShadeMode::Solid,
            point_size: 1.0,
            wire_color: LinearRgba::WHITE,
            clear_color: Some(LinearRgba::BLACK),
            use_textures: true,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a configuration written in RON.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).context("Failed to parse engine configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a `.ron` configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_ron_str(&text).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Checks the cache sizing and the point size.
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        anyhow::ensure!(
            self.point_size > 0.0,
            "point_size must be positive, got {}",
            self.point_size
        );
        Ok(())
    }
}
