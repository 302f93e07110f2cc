//! Procedural terrain: configuration, noise, segment geometry

pub mod config;
pub use config::TerrainConfig;

pub mod noise;
pub use noise::{CoherentNoise, PerlinNoise};

pub mod builder;
pub use builder::{
    SampleParams, SegmentBuilder, SegmentMesh, TerrainVertex,
    build_mesh, build_mesh_into, collision_boundary,
    sample_heights, sample_heights_into,
};
