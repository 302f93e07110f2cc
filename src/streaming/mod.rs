//! Terrain streaming: segment pooling and the spawn-ahead / retire-behind window

pub mod segment;
pub mod pool;
pub mod policy;
pub mod substrate;
pub mod motion;
pub mod streamer;

pub use segment::{Segment, SegmentHandle, SegmentState};
pub use pool::{PoolStats, PreallocatingFactory, SegmentFactory, SegmentPool};
pub use policy::{StreamingPolicy, WindowBounds, DEFAULT_MAX_SEGMENTS};
pub use substrate::{NullSubstrate, RecordingSubstrate, SubstrateEvent, TerrainSubstrate};
pub use motion::VelocityEstimator;
pub use streamer::{SegmentSnapshot, StreamerSnapshot, TerrainStreamer, TickReport};

#[cfg(test)]
mod tests {
    // End-to-end scenarios through the public streaming API

    use std::collections::HashSet;

    use super::*;
    use crate::terrain::{PerlinNoise, SampleParams, SegmentBuilder, TerrainConfig, build_mesh, sample_heights};

    #[test]
    fn test_sample_and_mesh_scenario() {
        let params = SampleParams {
            width: 20.0,
            point_count: 5,
            noise_scale: 0.1,
            min_height: -2.0,
            max_height: 8.0,
            smoothness: 0.5,
        };
        let noise = PerlinNoise::new(0);
        let points = sample_heights(&params, &noise, 0.0).unwrap();
        assert_eq!(points.iter().map(|p| p.x).collect::<Vec<_>>(), vec![0.0, 5.0, 10.0, 15.0, 20.0]);
        assert!(points.iter().all(|p| p.y >= -2.0 && p.y <= 8.0));
        assert_eq!(points, sample_heights(&params, &noise, 0.0).unwrap());

        let mesh = build_mesh(&points, 10.0).unwrap();
        assert_eq!(mesh.vertices.len(), 10);
        assert_eq!(mesh.indices.len(), 24);
        assert!(mesh.indices.iter().all(|&i| i <= 9));
    }

    #[test]
    fn test_long_run_recycles_slots() {
        let config = TerrainConfig::default();
        let mut streamer = TerrainStreamer::with_substrate(config, RecordingSubstrate::new()).unwrap();

        let mut x = 0.0;
        let mut total_spawned = streamer.active_len();
        let mut total_retired = 0;
        for _ in 0..10_000 {
            x += 0.2;
            let report = streamer.tick(x, 1.0 / 60.0).unwrap();
            assert!(!report.exhausted);
            total_spawned += report.spawned;
            total_retired += report.retired;

            let handles: Vec<_> = streamer.active_handles().collect();
            let unique: HashSet<_> = handles.iter().collect();
            assert_eq!(unique.len(), handles.len());
        }

        assert_eq!(total_spawned - total_retired, streamer.active_len());
        assert!(total_spawned > 90);
        let stats = streamer.pool_stats();
        assert!(stats.total <= 20);
        assert_eq!(stats.active + stats.free, stats.total);

        let substrate = streamer.substrate();
        assert_eq!(substrate.geometry_count(), total_spawned);
        assert_eq!(substrate.reset_count(), total_retired);
    }

    #[test]
    fn test_boundary_matches_surface() {
        let mut streamer = TerrainStreamer::with_substrate(TerrainConfig::default(), RecordingSubstrate::new()).unwrap();
        streamer.tick(5.0, 0.1).unwrap();
        for segment in streamer.active_segments() {
            assert_eq!(segment.boundary_points(), segment.points());
            assert_eq!(segment.points().first().map(|p| p.x), Some(0.0));
            assert_eq!(segment.points().last().map(|p| p.x), Some(segment.width()));
        }
        let boundaries = streamer
            .substrate()
            .events
            .iter()
            .filter(|e| matches!(e, SubstrateEvent::Boundary { point_count: 20, .. }))
            .count();
        assert_eq!(boundaries, streamer.substrate().geometry_count());
    }

    #[test]
    fn test_reset_after_ticks() {
        let mut streamer = TerrainStreamer::new(TerrainConfig::default()).unwrap();
        let initial_len = streamer.active_len();
        let initial_frontier = streamer.frontier_x();
        let initial_offset = streamer.noise_offset();

        for i in 0..300 {
            streamer.tick(i as f32 * 0.9, 1.0 / 60.0).unwrap();
        }
        assert!(streamer.frontier_x() > initial_frontier);

        streamer.reset().unwrap();
        assert_eq!(streamer.active_len(), initial_len);
        assert_eq!(streamer.frontier_x(), initial_frontier);
        assert_eq!(streamer.noise_offset(), initial_offset);

        // Reset is callable repeatedly
        streamer.reset().unwrap();
        assert_eq!(streamer.active_len(), initial_len);
    }

    #[test]
    fn test_height_scale_variant_range() {
        let config = TerrainConfig::default().with_height_scale(5.0);
        let streamer = TerrainStreamer::new(config).unwrap();
        for segment in streamer.active_segments() {
            assert!(segment.points().iter().all(|p| (0.0..=5.0).contains(&p.y)));
        }
    }

    #[test]
    fn test_custom_noise_source() {
        let config = TerrainConfig { min_height: 0.0, max_height: 10.0, ..Default::default() };
        let pool = SegmentPool::new(config.max_pool_size)
            .with_factory(PreallocatingFactory::new(config.points_per_segment));
        let flat = |_: f64, _: f64| -> f32 { 0.5 };
        let builder = SegmentBuilder::with_noise(&config, flat);
        let streamer = TerrainStreamer::from_parts(config, pool, builder, RecordingSubstrate::new()).unwrap();

        for segment in streamer.active_segments() {
            assert!(segment.points().iter().all(|p| p.y == 5.0));
            // Bottom row sits one depth below the surface
            assert!(segment.mesh().vertices[20..].iter().all(|v| v.y == -5.0));
        }
    }

    #[test]
    fn test_policy_from_json() {
        let config = TerrainConfig::from_json_str(
            r#"{ "policy": { "kind": "count_bounded", "max_segments": 4 }, "max_pool_size": 8, "initial_pool_size": 4 }"#,
        )
        .unwrap();
        assert_eq!(config.policy, StreamingPolicy::CountBounded { max_segments: 4 });
        let streamer = TerrainStreamer::new(config).unwrap();
        assert_eq!(streamer.active_len(), 4);
    }

    #[test]
    fn test_snapshot_serializes() {
        let streamer = TerrainStreamer::new(TerrainConfig::default()).unwrap();
        let snapshot = streamer.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: StreamerSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.segments.len(), streamer.active_len());
        assert_eq!(back.frontier_x, streamer.frontier_x());
    }
}
