use criterion::{criterion_group, criterion_main, Criterion};
use ember_core::asset::SkinId;
use ember_core::math::LinearRgba;
use ember_core::renderer::Vertex;
use ember_data::skins::SkinRegistry;
use ember_infra::HeadlessDevice;
use ember_lanes::render_lane::{CacheConfig, VertexCacheManager};
use std::hint::black_box;

fn bench_admission(c: &mut Criterion) {
    let mut device = HeadlessDevice::new();
    let mut registry = SkinRegistry::new();
    let skins: Vec<SkinId> = (0..16)
        .map(|i| {
            let shade = i as f32 / 16.0;
            registry
                .add_skin(
                    LinearRgba::WHITE,
                    LinearRgba::rgb(shade, shade, 1.0),
                    LinearRgba::BLACK,
                    LinearRgba::BLACK,
                    1.0,
                )
                .unwrap()
        })
        .collect();
    let mut cache = VertexCacheManager::new(&mut device, CacheConfig::default()).unwrap();
    let quad = [Vertex::default(); 4];
    let indices = [0u16, 1, 2, 0, 2, 3];

    let mut group = c.benchmark_group("Vertex Cache");

    group.bench_function("Skin hits (one skin)", |b| {
        b.iter(|| {
            for _ in 0..256 {
                cache
                    .render_vertices(&mut device, &registry, skins[0], black_box(&quad), Some(&indices))
                    .unwrap();
            }
            cache.forced_flush_all(&mut device, &registry).unwrap();
            device.clear_commands();
        });
    });

    // 16 skins against 10 batches forces evictions.
    group.bench_function("Evictions (16 skins, 10 batches)", |b| {
        b.iter(|| {
            for i in 0..256 {
                let skin = skins[i % skins.len()];
                cache
                    .render_vertices(&mut device, &registry, skin, black_box(&quad), Some(&indices))
                    .unwrap();
            }
            cache.forced_flush_all(&mut device, &registry).unwrap();
            device.clear_commands();
        });
    });

    group.finish();
    cache.release(&mut device);
    registry.release(&mut device);
}

criterion_group!(benches, bench_admission);
criterion_main!(benches);
