//! Terrain Strip - endless side-scrolling terrain with pooled segment geometry
//!
//! A [`TerrainStreamer`](streaming::TerrainStreamer) keeps a window of
//! fixed-width segments around a moving observer. Segment storage comes from a
//! bounded [`SegmentPool`](streaming::SegmentPool) and is rebuilt in place from
//! seeded noise by [`SegmentBuilder`](terrain::SegmentBuilder).

pub mod core;
pub mod terrain;
pub mod streaming;

pub use crate::core::{Error, Result};
pub use crate::streaming::{TerrainStreamer, TickReport};
pub use crate::terrain::TerrainConfig;
