//! Rendering/collision substrate seam.
//!
//! The streamer never rasterizes or collides anything itself; it pushes
//! geometry and transforms through this trait.

use glam::Vec2;

use super::segment::SegmentHandle;
use crate::terrain::builder::SegmentMesh;

/// External owner of render meshes, collision polylines and transforms.
pub trait TerrainSubstrate {
    /// Upload the render mesh for a freshly built segment.
    fn apply_geometry(&mut self, handle: SegmentHandle, mesh: &SegmentMesh, material_id: Option<u32>);

    /// Upload the top-edge collision polyline (local coordinates).
    fn apply_boundary(&mut self, handle: SegmentHandle, points: &[Vec2]);

    fn set_world_position(&mut self, handle: SegmentHandle, x: f32, y: f32);

    /// Return the handle to its canonical zero pose and drop its geometry.
    fn reset_transform(&mut self, handle: SegmentHandle);
}

/// Substrate that ignores everything (headless runs, tests).
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSubstrate;

impl TerrainSubstrate for NullSubstrate {
    fn apply_geometry(&mut self, _: SegmentHandle, _: &SegmentMesh, _: Option<u32>) {}
    fn apply_boundary(&mut self, _: SegmentHandle, _: &[Vec2]) {}
    fn set_world_position(&mut self, _: SegmentHandle, _: f32, _: f32) {}
    fn reset_transform(&mut self, _: SegmentHandle) {}
}

/// One call received by a [`RecordingSubstrate`].
#[derive(Clone, Debug, PartialEq)]
pub enum SubstrateEvent {
    Geometry {
        handle: SegmentHandle,
        vertex_count: usize,
        index_count: usize,
        material_id: Option<u32>,
    },
    Boundary { handle: SegmentHandle, point_count: usize },
    Position { handle: SegmentHandle, x: f32, y: f32 },
    Reset { handle: SegmentHandle },
}

/// Substrate that logs every call, for inspection by tools and tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingSubstrate {
    pub events: Vec<SubstrateEvent>,
}

impl RecordingSubstrate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Number of geometry uploads seen.
    pub fn geometry_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SubstrateEvent::Geometry { .. }))
            .count()
    }

    /// Number of transform resets seen.
    pub fn reset_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SubstrateEvent::Reset { .. }))
            .count()
    }
}

impl TerrainSubstrate for RecordingSubstrate {
    fn apply_geometry(&mut self, handle: SegmentHandle, mesh: &SegmentMesh, material_id: Option<u32>) {
        self.events.push(SubstrateEvent::Geometry {
            handle,
            vertex_count: mesh.vertices.len(),
            index_count: mesh.indices.len(),
            material_id,
        });
    }

    fn apply_boundary(&mut self, handle: SegmentHandle, points: &[Vec2]) {
        self.events.push(SubstrateEvent::Boundary { handle, point_count: points.len() });
    }

    fn set_world_position(&mut self, handle: SegmentHandle, x: f32, y: f32) {
        self.events.push(SubstrateEvent::Position { handle, x, y });
    }

    fn reset_transform(&mut self, handle: SegmentHandle) {
        self.events.push(SubstrateEvent::Reset { handle });
    }
}
