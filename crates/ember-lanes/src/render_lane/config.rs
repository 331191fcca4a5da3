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

use ember_core::renderer::{RenderError, RenderResult, VertexLayout};
use serde::{Deserialize, Serialize};

/// Sizing of the vertex cache.
///
/// Every batch of every pool is allocated up front with these capacities and
/// reused for the lifetime of the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of batches in each per-layout pool.
    pub batches_per_pool: usize,
    /// Vertex capacity of one batch.
    pub max_vertices: usize,
    /// Index capacity of one batch.
    pub max_indices: usize,
    /// The vertex layouts that get a pool, in pool order.
    pub layouts: Vec<VertexLayout>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            batches_per_pool: 10,
            max_vertices: 4096,
            max_indices: 12288,
            layouts: VertexLayout::ALL.to_vec(),
        }
    }
}

impl CacheConfig {
    /// Largest vertex capacity a batch can have. Indices are 16-bit.
    pub const MAX_BATCH_VERTICES: usize = u16::MAX as usize + 1;

    /// Checks that the configuration describes a usable cache.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for zero-sized pools or capacities, vertex
    /// capacities above [`Self::MAX_BATCH_VERTICES`], and missing or
    /// repeated layouts.
    pub fn validate(&self) -> RenderResult<()> {
        if self.batches_per_pool == 0 {
            return Err(RenderError::InvalidParameter(
                "batches_per_pool must be at least 1".to_string(),
            ));
        }
        if self.max_vertices == 0 || self.max_indices == 0 {
            return Err(RenderError::InvalidParameter(format!(
                "batch capacity must be non-zero (vertices: {}, indices: {})",
                self.max_vertices, self.max_indices
            )));
        }
        if self.max_vertices > Self::MAX_BATCH_VERTICES {
            return Err(RenderError::InvalidParameter(format!(
                "max_vertices {} exceeds the 16-bit index range ({})",
                self.max_vertices,
                Self::MAX_BATCH_VERTICES
            )));
        }
        if self.layouts.is_empty() {
            return Err(RenderError::InvalidParameter(
                "at least one vertex layout is required".to_string(),
            ));
        }
        for (i, layout) in self.layouts.iter().enumerate() {
            if self.layouts[..i].contains(layout) {
                return Err(RenderError::InvalidParameter(format!(
                    "vertex layout {layout} is listed twice"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = CacheConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batches_per_pool, 10);
        assert_eq!(config.layouts, vec![VertexLayout::Unlit, VertexLayout::Lit]);
    }

    #[test]
    fn test_rejects_zero_sizes() {
        for config in [
            CacheConfig {
                batches_per_pool: 0,
                ..Default::default()
            },
            CacheConfig {
                max_vertices: 0,
                ..Default::default()
            },
            CacheConfig {
                max_indices: 0,
                ..Default::default()
            },
        ] {
            assert!(matches!(
                config.validate(),
                Err(RenderError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_rejects_vertex_capacity_beyond_index_range() {
        let mut config = CacheConfig {
            max_vertices: CacheConfig::MAX_BATCH_VERTICES,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        config.max_vertices += 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_layouts() {
        let config = CacheConfig {
            layouts: vec![VertexLayout::Lit, VertexLayout::Lit],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config: CacheConfig = ron::from_str("(batches_per_pool: 4, layouts: [Lit])").unwrap();
        assert_eq!(config.batches_per_pool, 4);
        assert_eq!(config.max_vertices, 4096);
        assert_eq!(config.layouts, vec![VertexLayout::Lit]);
    }
}
