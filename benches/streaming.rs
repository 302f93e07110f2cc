use criterion::{criterion_group, criterion_main, Criterion, black_box};

use terrain_strip::streaming::{SegmentPool, PreallocatingFactory, TerrainStreamer, VelocityEstimator};
use terrain_strip::terrain::{
    PerlinNoise, SampleParams, SegmentMesh, TerrainConfig,
    build_mesh_into, sample_heights_into,
};

fn bench_sample_heights(c: &mut Criterion) {
    let params = SampleParams::from_config(&TerrainConfig::default());
    let noise = PerlinNoise::fractal(12345, 4);
    let mut points = Vec::with_capacity(params.point_count);

    c.bench_function("sample_heights_20pt_fbm4", |b| {
        let mut offset = 0.0f32;
        b.iter(|| {
            offset += 0.1;
            sample_heights_into(black_box(&params), &noise, black_box(offset), &mut points)
        });
    });
}

fn bench_build_mesh(c: &mut Criterion) {
    let params = SampleParams { point_count: 128, ..SampleParams::from_config(&TerrainConfig::default()) };
    let noise = PerlinNoise::new(7);
    let mut points = Vec::new();
    sample_heights_into(&params, &noise, 0.0, &mut points).expect("valid params");
    let mut mesh = SegmentMesh::default();

    c.bench_function("build_mesh_128pt", |b| {
        b.iter(|| build_mesh_into(black_box(&points), black_box(10.0), &mut mesh));
    });
}

fn bench_pool_churn(c: &mut Criterion) {
    let mut pool = SegmentPool::new(64).with_factory(PreallocatingFactory::new(20));
    pool.warm_up(64).expect("factory installed");

    c.bench_function("pool_acquire_release_64", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..64).filter_map(|_| pool.acquire().ok()).collect();
            for handle in handles {
                pool.release(black_box(handle));
            }
        });
    });
}

fn bench_streamer_walk(c: &mut Criterion) {
    c.bench_function("streamer_tick_walk", |b| {
        let mut streamer = TerrainStreamer::new(TerrainConfig::default()).expect("default config");
        let mut x = 0.0f32;
        b.iter(|| {
            x += 0.5;
            streamer.tick(black_box(x), 1.0 / 60.0)
        });
    });
}

fn bench_streamer_teleport(c: &mut Criterion) {
    let config = TerrainConfig {
        generation_distance: 2000.0,
        max_pool_size: 0,
        ..Default::default()
    };

    c.bench_function("streamer_teleport_rebuild_100", |b| {
        let mut streamer = TerrainStreamer::new(config.clone()).expect("valid config");
        let mut x = 0.0f32;
        b.iter(|| {
            x += 5000.0;
            if x > 1.0e6 {
                // Stay where f32 still places segments exactly
                x = 5000.0;
                streamer.reset().expect("reset");
            }
            streamer.tick(black_box(x), 1.0 / 60.0)
        });
    });
}

fn bench_velocity_estimation(c: &mut Criterion) {
    c.bench_function("velocity_estimation_30", |b| {
        b.iter(|| {
            let mut estimator = VelocityEstimator::new();
            for i in 0..30 {
                estimator.update(i as f32 * 0.2, black_box(1.0 / 60.0));
            }
            black_box(estimator.velocity());
        });
    });
}

criterion_group!(
    benches,
    bench_sample_heights,
    bench_build_mesh,
    bench_pool_churn,
    bench_streamer_walk,
    bench_streamer_teleport,
    bench_velocity_estimation,
);
criterion_main!(benches);
