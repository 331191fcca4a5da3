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

//! Texture file decoding.

use ember_core::renderer::{CpuTexture, RenderError, RenderResult, TextureFormat};
use std::path::Path;

/// Decodes an encoded image (PNG, BMP, JPEG, ...) into an RGBA8 [`CpuTexture`].
pub fn decode_texture(bytes: &[u8]) -> RenderResult<CpuTexture> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| RenderError::Texture(format!("Failed to decode image: {e}")))?;

    let rgba_img = img.to_rgba8();
    let (width, height) = rgba_img.dimensions();

    Ok(CpuTexture {
        width,
        height,
        format: TextureFormat::Rgba8Unorm,
        pixels: rgba_img.into_raw(),
    })
}

/// Reads and decodes a texture file.
///
/// # Errors
///
/// `NotFound` if the file does not exist, `Texture` if it cannot be read or decoded.
pub(crate) fn load_texture_file(path: &Path) -> RenderResult<CpuTexture> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RenderError::NotFound(path.display().to_string()),
        _ => RenderError::Texture(format!("{}: {e}", path.display())),
    })?;
    decode_texture(&bytes).map_err(|e| match e {
        RenderError::Texture(reason) => {
            RenderError::Texture(format!("{}: {reason}", path.display()))
        }
        other => other,
    })
}
