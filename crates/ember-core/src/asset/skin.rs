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

use crate::renderer::api::MAX_TEXTURE_STAGES;
use std::fmt;

/// Identifies a skin in the skin registry. Skins are the batching key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SkinId(pub u32);

/// Identifies a deduplicated material in the skin registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MaterialId(pub u32);

/// Identifies a deduplicated texture in the skin registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

impl fmt::Display for SkinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skin#{}", self.0)
    }
}

/// A unique material and texture-set combination.
///
/// Texture slots fill from slot 0 without gaps; the first empty slot ends the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Skin {
    /// The material drawn with.
    pub material: MaterialId,
    /// Bound textures, one per stage.
    pub textures: [Option<TextureId>; MAX_TEXTURE_STAGES],
    /// Whether alpha test and blending are enabled for this skin.
    pub alpha: bool,
}

impl Skin {
    /// Creates a skin with no textures and alpha disabled.
    pub fn new(material: MaterialId) -> Self {
        Self {
            material,
            textures: [None; MAX_TEXTURE_STAGES],
            alpha: false,
        }
    }

    /// Iterates over the bound textures in stage order.
    pub fn textures(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.textures.iter().map_while(|slot| *slot)
    }

    /// Number of bound textures.
    pub fn texture_count(&self) -> usize {
        self.textures().count()
    }

    /// The first empty texture slot, or `None` if all stages are used.
    pub fn first_free_slot(&self) -> Option<usize> {
        self.textures.iter().position(Option::is_none)
    }

    /// Returns `true` if `texture` is bound to any stage.
    pub fn has_texture(&self, texture: TextureId) -> bool {
        self.textures().any(|t| t == texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_skin_is_empty() {
        let skin = Skin::new(MaterialId(3));
        assert_eq!(skin.texture_count(), 0);
        assert_eq!(skin.first_free_slot(), Some(0));
        assert!(!skin.alpha);
    }

    #[test]
    fn test_texture_list_ends_at_first_gap() {
        let mut skin = Skin::new(MaterialId(0));
        skin.textures[0] = Some(TextureId(4));
        skin.textures[1] = Some(TextureId(9));
        assert_eq!(skin.textures().collect::<Vec<_>>(), vec![TextureId(4), TextureId(9)]);
        assert_eq!(skin.first_free_slot(), Some(2));
        assert!(skin.has_texture(TextureId(9)));
        assert!(!skin.has_texture(TextureId(5)));
    }

    #[test]
    fn test_full_skin_has_no_free_slot() {
        let mut skin = Skin::new(MaterialId(0));
        for (i, slot) in skin.textures.iter_mut().enumerate() {
            *slot = Some(TextureId(i as u32));
        }
        assert_eq!(skin.first_free_slot(), None);
        assert_eq!(skin.texture_count(), MAX_TEXTURE_STAGES);
    }
}
