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

use anyhow::Result;
use ember_agents::render_agent::{EngineConfig, RenderAgent};
use ember_core::asset::{Material, SkinId};
use ember_core::math::{LinearRgba, Mat4, Vec3};
use ember_core::renderer::{PrimitiveTopology, RenderDevice, ShadeMode, Vertex, VertexLayout};
use ember_data::skins::{AlphaSettings, ColorKey};
use ember_infra::HeadlessDevice;
use std::path::{Path, PathBuf};

fn triangle() -> [Vertex; 3] {
    let n = [0.0, 0.0, -1.0];
    [
        Vertex::new([0.0, 0.0, 0.0], n, [0.0, 0.0]),
        Vertex::new([1.0, 0.0, 0.0], n, [1.0, 0.0]),
        Vertex::new([0.0, 1.0, 0.0], n, [0.0, 1.0]),
    ]
}

/// Writes a 2x2 PNG whose first pixel is magenta and the rest white.
fn write_keyed_png(dir: &Path) -> Result<PathBuf> {
    let mut img = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 255, 255, 255]));
    img.put_pixel(0, 0, image::Rgba([255, 0, 255, 255]));
    let path = dir.join("keyed.png");
    img.save(&path)?;
    Ok(path)
}

fn white_skin<D: RenderDevice>(agent: &mut RenderAgent<D>) -> Result<SkinId> {
    Ok(agent.add_skin(
        LinearRgba::WHITE,
        LinearRgba::WHITE,
        LinearRgba::BLACK,
        LinearRgba::BLACK,
        1.0,
    )?)
}

#[test]
fn textured_skin_draws_with_keyed_texture() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let png = write_keyed_png(dir.path())?;
    let mut device = HeadlessDevice::new();
    let mut agent = RenderAgent::new(&mut device, EngineConfig::default())?;

    let skin = white_skin(&mut agent)?;
    let settings = AlphaSettings {
        level: 1.0,
        color_keys: vec![ColorKey::new(1.0, 0.0, 1.0, 0.0)],
    };
    let texture = agent.add_texture(skin, &png, Some(&settings))?;
    let handle = agent.skins().texture(texture).map(|t| t.handle);
    assert!(agent.get_skin(skin).alpha);

    let pixels = handle
        .and_then(|h| agent.device().texture(h))
        .map(|t| t.pixels.clone())
        .unwrap_or_default();
    assert_eq!(&pixels[0..4], &[0, 0, 0, 0]);
    assert_eq!(&pixels[4..8], &[255, 255, 255, 255]);

    agent.begin_frame()?;
    agent.render_vertices(skin, &triangle(), None)?;
    agent.end_frame()?;

    let draw = agent.device().draws().next().cloned().expect("one draw");
    assert_eq!(draw.texture0, handle);
    assert!(draw.alpha.enabled);
    Ok(())
}

#[test]
fn skins_naming_the_same_file_share_one_texture() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let png = write_keyed_png(dir.path())?;
    let mut device = HeadlessDevice::new();
    let mut agent = RenderAgent::new(&mut device, EngineConfig::default())?;

    let first = white_skin(&mut agent)?;
    let second = white_skin(&mut agent)?;
    let a = agent.add_texture(first, &png, None)?;
    let b = agent.add_texture(second, &png, None)?;

    assert_eq!(a, b);
    assert_eq!(agent.skins().texture_count(), 1);
    assert_eq!(agent.device().live_texture_count(), 1);
    Ok(())
}

#[test]
fn dropping_the_agent_releases_device_resources() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let png = write_keyed_png(dir.path())?;
    let mut device = HeadlessDevice::new();
    {
        let mut agent = RenderAgent::new(&mut device, EngineConfig::default())?;
        let skin = white_skin(&mut agent)?;
        agent.add_texture(skin, &png, None)?;
        let mesh = agent.create_static_buffer(
            VertexLayout::Unlit,
            skin,
            bytemuck::cast_slice(&triangle()),
            Some(&[0, 1, 2]),
        )?;

        agent.begin_frame()?;
        agent.render_static(mesh)?;
        agent.render_vertices(skin, &triangle(), None)?;
        agent.end_frame()?;
        assert!(agent.device().live_buffer_count() > 0);
    }
    assert_eq!(device.live_buffer_count(), 0);
    assert_eq!(device.live_texture_count(), 0);
    assert_eq!(device.allocated_bytes(), 0);
    assert_eq!(device.frames_presented(), 1);
    Ok(())
}

#[test]
fn configured_line_mode_draws_segments_in_wire_color() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("engine.ron");
    std::fs::write(
        &path,
        "(shade_mode: Lines, wire_color: (r: 0.0, g: 1.0, b: 0.0, a: 1.0))",
    )?;
    let config = EngineConfig::load(&path)?;

    let mut device = HeadlessDevice::new();
    let mut agent = RenderAgent::new(&mut device, config)?;
    assert_eq!(agent.shade_mode(), ShadeMode::Lines);

    let skin = white_skin(&mut agent)?;
    let quad = [triangle()[0], triangle()[1], triangle()[2], triangle()[0]];
    agent.begin_frame()?;
    agent.render_vertices(skin, &quad, Some(&[0, 1, 2, 3]))?;
    agent.end_frame()?;

    let draws: Vec<_> = agent.device().draws().cloned().collect();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].topology, PrimitiveTopology::LineList);
    assert_eq!(draws[0].primitive_count, 2);
    assert_eq!(draws[0].material, Some(Material::wire(LinearRgba::GREEN)));
    Ok(())
}

#[test]
fn frame_statistics_cover_one_frame() -> Result<()> {
    let mut device = HeadlessDevice::new();
    let mut agent = RenderAgent::new(&mut device, EngineConfig::default())?;
    let skin = white_skin(&mut agent)?;

    agent.begin_frame()?;
    for _ in 0..3 {
        agent.render_vertices(skin, &triangle(), None)?;
    }
    agent.end_frame()?;
    assert_eq!(agent.last_frame_stats().draw_calls, 1);
    assert_eq!(agent.last_frame_stats().skin_hits, 2);
    assert_eq!(agent.frame_count(), 1);

    agent.begin_frame()?;
    agent.end_frame()?;
    assert_eq!(agent.last_frame_stats().draw_calls, 0);
    assert_eq!(agent.frame_count(), 2);
    assert_eq!(agent.device().frames_presented(), 2);

    assert!(agent.end_frame().is_err());
    Ok(())
}

#[test]
fn transform_changes_flush_queued_geometry() -> Result<()> {
    let mut device = HeadlessDevice::new();
    let mut agent = RenderAgent::new(&mut device, EngineConfig::default())?;
    let skin = white_skin(&mut agent)?;

    agent.begin_frame()?;
    agent.render_vertices(skin, &triangle(), None)?;
    assert_eq!(agent.device().draw_count(), 0);

    let moved = Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0));
    agent.set_world_transform(Some(&moved))?;
    assert_eq!(agent.device().draw_count(), 1);
    assert_eq!(agent.device().state().world, moved);

    agent.render_vertices(skin, &triangle(), None)?;
    agent.end_frame()?;
    assert_eq!(agent.device().draw_count(), 2);
    Ok(())
}
