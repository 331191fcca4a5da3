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
use ember_core::asset::SkinId;
use ember_core::math::LinearRgba;
use ember_core::renderer::{ShadeMode, Vertex, VertexLayout};
use ember_data::skins::SkinRegistry;
use ember_infra::HeadlessDevice;
use ember_lanes::render_lane::{CacheConfig, VertexCacheManager};

fn triangle(offset: f32) -> [Vertex; 3] {
    let n = [0.0, 0.0, -1.0];
    [
        Vertex::new([offset, 0.0, 0.0], n, [0.0, 0.0]),
        Vertex::new([offset + 1.0, 0.0, 0.0], n, [1.0, 0.0]),
        Vertex::new([offset, 1.0, 0.0], n, [0.0, 1.0]),
    ]
}

fn flat_skin(registry: &mut SkinRegistry, diffuse: LinearRgba) -> Result<SkinId> {
    Ok(registry.add_skin(
        LinearRgba::WHITE,
        diffuse,
        LinearRgba::BLACK,
        LinearRgba::BLACK,
        1.0,
    )?)
}

#[test]
fn interleaved_skins_share_batches() -> Result<()> {
    let mut device = HeadlessDevice::new();
    let mut registry = SkinRegistry::new();
    let red = flat_skin(&mut registry, LinearRgba::RED)?;
    let blue = flat_skin(&mut registry, LinearRgba::BLUE)?;

    let config = CacheConfig {
        batches_per_pool: 2,
        ..Default::default()
    };
    let mut cache = VertexCacheManager::new(&mut device, config)?;

    cache.render(
        &mut device,
        &registry,
        VertexLayout::Unlit,
        red,
        bytemuck::cast_slice(&triangle(0.0)),
        None,
    )?;
    cache.render_vertices(&mut device, &registry, blue, &triangle(2.0), None)?;
    cache.render_vertices(&mut device, &registry, red, &triangle(4.0), None)?;

    let batches = cache.batches(VertexLayout::Unlit);
    assert!(batches[0].uses_skin(red));
    assert_eq!(batches[0].vertex_count(), 6);
    assert_eq!(batches[1].vertex_count(), 3);
    assert_eq!(device.draw_count(), 0);

    cache.forced_flush_all(&mut device, &registry)?;

    let red_material = registry.get_material(registry.get_skin(red).material);
    let red_draws: Vec<_> = device
        .draws()
        .filter(|d| d.material == Some(red_material))
        .collect();
    assert_eq!(red_draws.len(), 1);
    assert_eq!(red_draws[0].primitive_count, 2);
    assert_eq!(red_draws[0].indices, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(device.draw_count(), 2);

    cache.release(&mut device);
    assert_eq!(device.live_buffer_count(), 0);
    Ok(())
}

#[test]
fn pool_keeps_running_through_many_frames() -> Result<()> {
    let mut device = HeadlessDevice::new();
    let mut registry = SkinRegistry::new();
    let skins = (0..5)
        .map(|i| flat_skin(&mut registry, LinearRgba::rgb(i as f32 / 5.0, 0.5, 0.5)))
        .collect::<Result<Vec<_>>>()?;

    let config = CacheConfig {
        batches_per_pool: 3,
        max_vertices: 12,
        max_indices: 12,
        layouts: vec![VertexLayout::Unlit],
    };
    let mut cache = VertexCacheManager::new(&mut device, config)?;

    for frame in 0..4 {
        for i in 0..20 {
            let skin = skins[(i * 7 + frame) % skins.len()];
            cache.render_vertices(&mut device, &registry, skin, &triangle(i as f32), None)?;
            for batch in cache.batches(VertexLayout::Unlit) {
                assert!(batch.vertex_count() <= batch.max_vertices());
                assert!(batch.index_count() <= batch.max_indices());
            }
        }
        cache.forced_flush_all(&mut device, &registry)?;
        let stats = cache.take_stats();
        assert_eq!(stats.failed_draws, 0);
        assert_eq!(stats.draw_calls, stats.flushes);
    }

    // 80 triangles were queued and every one of them reached the device.
    let triangles: u32 = device.draws().map(|d| d.primitive_count).sum();
    assert_eq!(triangles, 80);
    cache.release(&mut device);
    Ok(())
}

#[test]
fn hull_wire_draws_connected_strip() -> Result<()> {
    let mut device = HeadlessDevice::new();
    let mut registry = SkinRegistry::new();
    let skin = flat_skin(&mut registry, LinearRgba::GREEN)?;
    let mut cache = VertexCacheManager::new(&mut device, CacheConfig::default())?;
    cache.set_shade_mode(ShadeMode::HullWire);

    let outline = [0u16, 1, 2, 0];
    cache.render_vertices(&mut device, &registry, skin, &triangle(0.0), Some(&outline))?;
    cache.forced_flush_all(&mut device, &registry)?;

    let draw = device.draws().next().expect("one draw");
    assert_eq!(draw.primitive_count, 3);
    assert_eq!(draw.indices, vec![0, 1, 2, 0]);
    cache.release(&mut device);
    Ok(())
}
