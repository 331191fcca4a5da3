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

use super::loader::load_texture_file;
use super::transparency::AlphaSettings;
use ember_core::asset::{Material, MaterialId, Skin, SkinId, TextureId};
use ember_core::math::LinearRgba;
use ember_core::renderer::{
    CpuTexture, DeviceTextureId, IdKind, RenderDevice, RenderError, RenderResult,
    MAX_TEXTURE_STAGES,
};
use std::collections::HashMap;
use std::path::Path;

const SKIN_BLOCK: usize = 25;
const MATERIAL_BLOCK: usize = 50;
const TEXTURE_BLOCK: usize = 25;

/// A texture known to the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureRecord {
    /// The name the texture was registered under; the deduplication key.
    pub name: String,
    /// The device texture holding the pixels.
    pub handle: DeviceTextureId,
    /// The transparency applied when the texture was loaded, if any.
    pub alpha: Option<AlphaSettings>,
}

/// A deduplicated store of materials and textures, combined into skins.
///
/// Materials are shared between skins with identical lighting values, and
/// textures between skins naming the same file. Skins themselves are never
/// shared: every `add_skin` call yields a fresh id.
///
/// The registry owns the device textures it creates. Call [`release`](Self::release)
/// with the device before dropping it.
#[derive(Debug, Default)]
pub struct SkinRegistry {
    skins: Vec<Skin>,
    materials: Vec<Material>,
    textures: Vec<TextureRecord>,
    texture_lookup: HashMap<String, TextureId>,
}

/// Grows `storage` by `block` elements when it is full.
///
/// A failed reservation leaves the vector untouched.
fn reserve_block<T>(storage: &mut Vec<T>, block: usize, what: &str) -> RenderResult<()> {
    if storage.len() == storage.capacity() {
        storage
            .try_reserve_exact(block)
            .map_err(|e| RenderError::OutOfMemory(format!("{what} storage: {e}")))?;
    }
    Ok(())
}

fn next_id(len: usize, what: &str) -> RenderResult<u32> {
    u32::try_from(len).map_err(|_| RenderError::OutOfMemory(format!("{what} ids exhausted")))
}

impl SkinRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new skin with the given material values.
    ///
    /// The material is shared with any existing material whose channels and
    /// power are exactly equal. The returned skin id is always new.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if storage cannot grow. Nothing is modified in that case.
    pub fn add_skin(
        &mut self,
        ambient: LinearRgba,
        diffuse: LinearRgba,
        specular: LinearRgba,
        emissive: LinearRgba,
        power: f32,
    ) -> RenderResult<SkinId> {
        self.add_skin_with_material(Material::new(ambient, diffuse, specular, emissive, power))
    }

    /// Registers a new skin drawn with `material`. See [`add_skin`](Self::add_skin).
    pub fn add_skin_with_material(&mut self, material: Material) -> RenderResult<SkinId> {
        let skin_id = SkinId(next_id(self.skins.len(), "skin")?);
        reserve_block(&mut self.skins, SKIN_BLOCK, "skin")?;
        let material_id = self.find_or_insert_material(material)?;

        self.skins.push(Skin::new(material_id));
        log::debug!("SkinRegistry: Added {skin_id} using material {}", material_id.0);
        Ok(skin_id)
    }

    fn find_or_insert_material(&mut self, material: Material) -> RenderResult<MaterialId> {
        if let Some(index) = self.materials.iter().position(|m| *m == material) {
            return Ok(MaterialId(index as u32));
        }
        let id = MaterialId(next_id(self.materials.len(), "material")?);
        reserve_block(&mut self.materials, MATERIAL_BLOCK, "material")?;
        self.materials.push(material);
        Ok(id)
    }

    /// Loads the image at `path` and appends it to the skin's texture list.
    ///
    /// A path already registered reuses the existing texture without touching
    /// the file. With `alpha`, a newly loaded texture gets its color keys and
    /// global transparency applied and the skin is marked as alpha-blended.
    ///
    /// # Errors
    ///
    /// * `InvalidId` - `skin` does not exist.
    /// * `BufferTooSmall` - the skin already holds [`MAX_TEXTURE_STAGES`] textures.
    /// * `NotFound` / `Texture` - the file is missing or cannot be decoded.
    pub fn add_texture(
        &mut self,
        device: &mut dyn RenderDevice,
        skin: SkinId,
        path: impl AsRef<Path>,
        alpha: Option<&AlphaSettings>,
    ) -> RenderResult<TextureId> {
        let path = path.as_ref();
        let name = path.to_string_lossy().into_owned();
        self.attach_texture(device, skin, name, alpha, || load_texture_file(path))
    }

    /// Like [`add_texture`](Self::add_texture), for pixels built in memory and
    /// registered under `name`.
    pub fn add_texture_from_pixels(
        &mut self,
        device: &mut dyn RenderDevice,
        skin: SkinId,
        name: &str,
        texture: CpuTexture,
        alpha: Option<&AlphaSettings>,
    ) -> RenderResult<TextureId> {
        self.attach_texture(device, skin, name.to_owned(), alpha, move || Ok(texture))
    }

    fn attach_texture(
        &mut self,
        device: &mut dyn RenderDevice,
        skin: SkinId,
        name: String,
        alpha: Option<&AlphaSettings>,
        load: impl FnOnce() -> RenderResult<CpuTexture>,
    ) -> RenderResult<TextureId> {
        let index = self.skin_index(skin)?;
        let slot = self.skins[index]
            .first_free_slot()
            .ok_or_else(|| {
                log::warn!("SkinRegistry: {skin} has no free texture slot for '{name}'");
                RenderError::BufferTooSmall {
                    requested: MAX_TEXTURE_STAGES + 1,
                    capacity: MAX_TEXTURE_STAGES,
                }
            })?;

        let texture_id = match self.texture_lookup.get(&name) {
            Some(&id) => id,
            None => self.create_texture(device, name, alpha, load)?,
        };
        let blended = self.textures[texture_id.0 as usize].alpha.is_some();

        let entry = &mut self.skins[index];
        entry.textures[slot] = Some(texture_id);
        entry.alpha |= blended;
        Ok(texture_id)
    }

    fn create_texture(
        &mut self,
        device: &mut dyn RenderDevice,
        name: String,
        alpha: Option<&AlphaSettings>,
        load: impl FnOnce() -> RenderResult<CpuTexture>,
    ) -> RenderResult<TextureId> {
        let id = TextureId(next_id(self.textures.len(), "texture")?);
        reserve_block(&mut self.textures, TEXTURE_BLOCK, "texture")?;

        let mut pixels = load().inspect_err(|e| {
            log::error!("SkinRegistry: Unable to load texture '{name}': {e}");
        })?;
        if let Some(settings) = alpha {
            settings.apply(&mut pixels)?;
        }
        let handle = device.create_texture(&pixels)?;

        log::info!(
            "SkinRegistry: Loaded texture '{}' ({}x{}) as {:?}",
            name,
            pixels.width,
            pixels.height,
            handle
        );
        self.texture_lookup.insert(name.clone(), id);
        self.textures.push(TextureRecord {
            name,
            handle,
            alpha: alpha.cloned(),
        });
        Ok(id)
    }

    fn skin_index(&self, skin: SkinId) -> RenderResult<usize> {
        let index = skin.0 as usize;
        if index < self.skins.len() {
            Ok(index)
        } else {
            Err(RenderError::invalid_id(IdKind::Skin, skin.0))
        }
    }

    /// Returns a copy of the skin, or a zeroed skin if `id` is unknown.
    pub fn get_skin(&self, id: SkinId) -> Skin {
        self.skin(id).copied().unwrap_or_default()
    }

    /// Returns a copy of the material, or a zeroed material if `id` is unknown.
    pub fn get_material(&self, id: MaterialId) -> Material {
        self.material(id).copied().unwrap_or_default()
    }

    /// Looks up a skin.
    pub fn skin(&self, id: SkinId) -> Option<&Skin> {
        self.skins.get(id.0 as usize)
    }

    /// Looks up a material.
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)
    }

    /// Looks up a texture.
    pub fn texture(&self, id: TextureId) -> Option<&TextureRecord> {
        self.textures.get(id.0 as usize)
    }

    /// Finds a texture by the name it was registered under.
    pub fn find_texture(&self, name: &str) -> Option<TextureId> {
        self.texture_lookup.get(name).copied()
    }

    /// Number of skins.
    pub fn skin_count(&self) -> usize {
        self.skins.len()
    }

    /// Number of distinct materials.
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Number of distinct textures.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Destroys every device texture and empties the registry.
    ///
    /// Failures are logged; the remaining textures are still released.
    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        for record in self.textures.drain(..) {
            if let Err(e) = device.destroy_texture(record.handle) {
                log::warn!(
                    "SkinRegistry: Failed to destroy texture '{}': {:?}",
                    record.name,
                    e
                );
            }
        }
        self.texture_lookup.clear();
        self.skins.clear();
        self.materials.clear();
    }
}
