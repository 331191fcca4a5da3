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

//! Skin binding and draw call selection shared by batches and static buffers.

use super::BatchContext;
use ember_core::asset::{Material, SkinId};
use ember_core::renderer::{
    AlphaState, DeviceTextureId, PrimitiveTopology, RenderDevice, ResourceError, ShadeMode,
    MAX_TEXTURE_STAGES,
};

/// A draw call ready to be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrawCall {
    /// Reads vertices in order.
    Direct {
        topology: PrimitiveTopology,
        primitive_count: u32,
    },
    /// Reads vertices through the bound index buffer.
    Indexed {
        topology: PrimitiveTopology,
        primitive_count: u32,
    },
}

impl DrawCall {
    pub(crate) fn primitive_count(self) -> u32 {
        match self {
            DrawCall::Direct {
                primitive_count, ..
            }
            | DrawCall::Indexed {
                primitive_count, ..
            } => primitive_count,
        }
    }
}

/// Picks the topology and primitive count for the current shade mode.
///
/// `index_count` is `None` for geometry without an index buffer. Points are
/// always drawn straight from the vertex stream.
pub(crate) fn select_draw(mode: ShadeMode, vertex_count: u32, index_count: Option<u32>) -> DrawCall {
    let Some(indices) = index_count else {
        let (topology, primitive_count) = match mode {
            ShadeMode::Points => (PrimitiveTopology::PointList, vertex_count),
            ShadeMode::Lines => (PrimitiveTopology::LineList, vertex_count / 2),
            ShadeMode::HullWire => (PrimitiveTopology::LineStrip, vertex_count.saturating_sub(1)),
            ShadeMode::TriangleWire | ShadeMode::Solid => {
                (PrimitiveTopology::TriangleList, vertex_count / 3)
            }
        };
        return DrawCall::Direct {
            topology,
            primitive_count,
        };
    };

    match mode {
        ShadeMode::Points => DrawCall::Direct {
            topology: PrimitiveTopology::PointList,
            primitive_count: vertex_count,
        },
        ShadeMode::Lines => DrawCall::Indexed {
            topology: PrimitiveTopology::LineList,
            primitive_count: indices / 2,
        },
        ShadeMode::HullWire => DrawCall::Indexed {
            topology: PrimitiveTopology::LineStrip,
            primitive_count: indices.saturating_sub(1),
        },
        ShadeMode::TriangleWire | ShadeMode::Solid => DrawCall::Indexed {
            topology: PrimitiveTopology::TriangleList,
            primitive_count: indices / 3,
        },
    }
}

/// Issues `call` against the bound streams. Calls with no primitives are skipped.
///
/// Returns `true` if a draw reached the device.
pub(crate) fn submit_draw(
    device: &mut dyn RenderDevice,
    call: DrawCall,
    vertex_count: u32,
) -> Result<bool, ResourceError> {
    if call.primitive_count() == 0 {
        return Ok(false);
    }
    match call {
        DrawCall::Direct {
            topology,
            primitive_count,
        } => device.draw(topology, 0, primitive_count)?,
        DrawCall::Indexed {
            topology,
            primitive_count,
        } => device.draw_indexed(topology, 0, vertex_count, 0, primitive_count)?,
    }
    Ok(true)
}

/// Binds the material, textures and alpha state of `skin` unless it is
/// already the active skin.
///
/// Solid mode uses the skin's material and, when textures are enabled, its
/// textures up to the first empty slot. The wire modes use a flat material in
/// the wire color and no texture. Failed state changes are logged and skipped.
pub(crate) fn bind_skin(ctx: &mut BatchContext<'_>, skin_id: SkinId) {
    if ctx.state.bindings.active_skin == Some(skin_id) {
        return;
    }
    let skin = ctx.skins.get_skin(skin_id);
    let modes = ctx.state.modes;

    let mut handles = [None; MAX_TEXTURE_STAGES];
    if modes.shade_mode.is_wire() {
        warn_on_failure(
            ctx.device.set_material(&Material::wire(modes.wire_color)),
            skin_id,
            "wire material",
        );
    } else {
        let material = ctx.skins.get_material(skin.material);
        warn_on_failure(ctx.device.set_material(&material), skin_id, "material");

        if modes.use_textures {
            for (stage, handle) in handles.iter_mut().enumerate() {
                *handle = skin.textures[stage]
                    .and_then(|texture| ctx.skins.texture(texture))
                    .map(|record| record.handle);
                if handle.is_none() {
                    break;
                }
            }
        }
    }
    bind_texture_stages(ctx, skin_id, &handles);

    warn_on_failure(
        ctx.device.set_alpha_state(&AlphaState::for_alpha(skin.alpha)),
        skin_id,
        "alpha state",
    );
    ctx.state.bindings.active_skin = Some(skin_id);
    ctx.state.stats.state_rebinds += 1;
}

/// Binds the leading textures of `handles` and clears every stage after them
/// that still holds a texture from an earlier skin, or at least the first
/// empty stage.
fn bind_texture_stages(
    ctx: &mut BatchContext<'_>,
    skin_id: SkinId,
    handles: &[Option<DeviceTextureId>; MAX_TEXTURE_STAGES],
) {
    let textured = handles.iter().take_while(|h| h.is_some()).count();
    let stale = ctx.state.textured_stages.max(textured + 1).min(MAX_TEXTURE_STAGES);
    for (stage, &handle) in handles.iter().enumerate().take(stale) {
        warn_on_failure(ctx.device.set_texture(stage, handle), skin_id, "texture");
    }
    ctx.state.textured_stages = textured;
}

fn warn_on_failure(result: Result<(), ResourceError>, skin: SkinId, what: &str) {
    if let Err(e) = result {
        log::warn!("Failed to set {what} for {skin}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed(topology: PrimitiveTopology, primitive_count: u32) -> DrawCall {
        DrawCall::Indexed {
            topology,
            primitive_count,
        }
    }

    fn direct(topology: PrimitiveTopology, primitive_count: u32) -> DrawCall {
        DrawCall::Direct {
            topology,
            primitive_count,
        }
    }

    #[test]
    fn test_indexed_selection_per_mode() {
        use PrimitiveTopology::*;
        assert_eq!(select_draw(ShadeMode::Solid, 6, Some(9)), indexed(TriangleList, 3));
        assert_eq!(select_draw(ShadeMode::TriangleWire, 6, Some(9)), indexed(TriangleList, 3));
        assert_eq!(select_draw(ShadeMode::Lines, 6, Some(8)), indexed(LineList, 4));
        assert_eq!(select_draw(ShadeMode::HullWire, 6, Some(8)), indexed(LineStrip, 7));
        assert_eq!(select_draw(ShadeMode::Points, 6, Some(9)), direct(PointList, 6));
    }

    #[test]
    fn test_direct_selection_per_mode() {
        use PrimitiveTopology::*;
        assert_eq!(select_draw(ShadeMode::Solid, 9, None), direct(TriangleList, 3));
        assert_eq!(select_draw(ShadeMode::Lines, 9, None), direct(LineList, 4));
        assert_eq!(select_draw(ShadeMode::HullWire, 9, None), direct(LineStrip, 8));
        assert_eq!(select_draw(ShadeMode::Points, 9, None), direct(PointList, 9));
    }

    #[test]
    fn test_degenerate_strip_has_no_primitives() {
        assert_eq!(select_draw(ShadeMode::HullWire, 0, Some(0)).primitive_count(), 0);
        assert_eq!(select_draw(ShadeMode::HullWire, 1, None).primitive_count(), 0);
    }
}
