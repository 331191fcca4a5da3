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

// Ember Sandbox
// Renders a few frames of a small scene on the headless device and logs
// how well the geometry batched.

use anyhow::Result;
use ember_agents::render_agent::{EngineConfig, RenderAgent};
use ember_core::asset::SkinId;
use ember_core::math::{LinearRgba, Mat4, Vec3, FRAC_PI_4};
use ember_core::renderer::{
    CpuTexture, CullMode, LitVertex, RenderDevice, ShadeMode, TextureFormat, Vertex, VertexLayout,
};
use ember_data::skins::{AlphaSettings, ColorKey};
use ember_infra::HeadlessDevice;

const FRAMES: u32 = 4;
const GRID: i32 = 6;

/// A 4x4 two-color checkerboard, magenta and white.
fn checker() -> CpuTexture {
    let mut pixels = Vec::with_capacity(4 * 4 * 4);
    for y in 0..4 {
        for x in 0..4 {
            let texel = if (x + y) % 2 == 0 {
                [255, 0, 255, 255]
            } else {
                [255, 255, 255, 255]
            };
            pixels.extend_from_slice(&texel);
        }
    }
    CpuTexture {
        width: 4,
        height: 4,
        format: TextureFormat::Rgba8Unorm,
        pixels,
    }
}

fn quad(x: f32, z: f32) -> ([Vertex; 4], [u16; 6]) {
    let n = [0.0, 1.0, 0.0];
    (
        [
            Vertex::new([x, 0.0, z], n, [0.0, 0.0]),
            Vertex::new([x + 1.0, 0.0, z], n, [1.0, 0.0]),
            Vertex::new([x + 1.0, 0.0, z + 1.0], n, [1.0, 1.0]),
            Vertex::new([x, 0.0, z + 1.0], n, [0.0, 1.0]),
        ],
        [0, 1, 2, 0, 2, 3],
    )
}

fn skin<D: RenderDevice>(agent: &mut RenderAgent<D>, diffuse: LinearRgba) -> Result<SkinId> {
    Ok(agent.add_skin(
        LinearRgba::WHITE,
        diffuse,
        LinearRgba::BLACK,
        LinearRgba::BLACK,
        1.0,
    )?)
}

fn run(device: &mut HeadlessDevice) -> Result<()> {
    let mut agent = RenderAgent::new(device, EngineConfig::default())?;

    let floor = skin(&mut agent, LinearRgba::WHITE)?;
    let red = skin(&mut agent, LinearRgba::RED)?;
    let blue = skin(&mut agent, LinearRgba::BLUE)?;
    let keyed = AlphaSettings {
        level: 0.9,
        color_keys: vec![ColorKey::new(1.0, 0.0, 1.0, 0.0)],
    };
    agent.add_texture_from_pixels(floor, "checker", checker(), Some(&keyed))?;

    // Ground plane, uploaded once and drawn every frame.
    let ground = [
        LitVertex::new([-10.0, -0.1, -10.0], 0xFF40_4040, [0.0, 0.0]),
        LitVertex::new([10.0, -0.1, -10.0], 0xFF40_4040, [1.0, 0.0]),
        LitVertex::new([10.0, -0.1, 10.0], 0xFF40_4040, [1.0, 1.0]),
        LitVertex::new([-10.0, -0.1, 10.0], 0xFF40_4040, [0.0, 1.0]),
    ];
    let ground = agent.create_static_buffer(
        VertexLayout::Lit,
        floor,
        bytemuck::cast_slice(&ground),
        Some(&[0, 1, 2, 0, 2, 3]),
    )?;

    agent.set_view_look_at(Vec3::new(0.0, 8.0, -12.0), Vec3::ZERO, Vec3::Y)?;
    agent.set_perspective(FRAC_PI_4, 16.0 / 9.0, 0.5, 100.0)?;
    agent.set_backface_culling(CullMode::None)?;
    agent.set_ambient_light(LinearRgba::rgb(0.25, 0.25, 0.25))?;

    for frame in 0..FRAMES {
        if frame == FRAMES - 1 {
            agent.set_shade_mode(ShadeMode::TriangleWire, 1.0, Some(LinearRgba::GREEN))?;
        }
        agent.begin_frame()?;
        agent.set_world_transform(None)?;
        agent.render_static(ground)?;

        agent.set_world_transform(Some(&Mat4::from_rotation_y(frame as f32 * 0.1)))?;
        for x in -GRID..GRID {
            for z in -GRID..GRID {
                let tile = match (x + z).rem_euclid(3) {
                    0 => floor,
                    1 => red,
                    _ => blue,
                };
                let (vertices, indices) = quad(x as f32, z as f32);
                agent.render_vertices(tile, &vertices, Some(&indices))?;
            }
        }
        agent.end_frame()?;
        log::info!("Frame {frame}: {}", agent.last_frame_stats());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut device = HeadlessDevice::new();
    run(&mut device)?;

    log::info!(
        "Sandbox: {} draw calls over {} frames, {} buffers left alive",
        device.draw_count(),
        device.frames_presented(),
        device.live_buffer_count()
    );
    Ok(())
}
