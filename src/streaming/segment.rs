//! Segment - pooled container for one span of terrain geometry.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::terrain::builder::{SegmentBuilder, SegmentMesh};
use crate::terrain::noise::CoherentNoise;

/// Stable identity of a pool slot. Survives any number of reuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentHandle(u32);

impl SegmentHandle {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Slot index inside the pool arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Whether a slot is parked in the free list or part of the live window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SegmentState {
    #[default]
    Free,
    Active,
}

/// One fixed-width span of terrain.
///
/// Points are local to `origin`. Buffers are cleared on release but keep
/// their capacity, so a reused segment does not reallocate.
#[derive(Clone, Debug)]
pub struct Segment {
    handle: SegmentHandle,
    state: SegmentState,
    /// Spawn sequence number while active (ordering of the pool's active set).
    activation: u64,
    /// Times this slot has been handed out.
    uses: u32,
    origin: Vec2,
    width: f32,
    depth: f32,
    noise_offset: f32,
    points: Vec<Vec2>,
    mesh: SegmentMesh,
}

impl Segment {
    /// Create an inert segment with no preallocated buffers.
    pub fn new(handle: SegmentHandle) -> Self {
        Self::with_capacity(handle, 0)
    }

    /// Create an inert segment with room for `point_count` samples and the mesh built from them.
    pub fn with_capacity(handle: SegmentHandle, point_count: usize) -> Self {
        Self {
            handle,
            state: SegmentState::Free,
            activation: 0,
            uses: 0,
            origin: Vec2::ZERO,
            width: 0.0,
            depth: 0.0,
            noise_offset: 0.0,
            points: Vec::with_capacity(point_count),
            mesh: SegmentMesh {
                vertices: Vec::with_capacity(point_count * 2),
                indices: Vec::with_capacity(point_count.saturating_sub(1) * 6),
                uvs: Vec::with_capacity(point_count * 2),
            },
        }
    }

    pub fn handle(&self) -> SegmentHandle {
        self.handle
    }

    pub fn state(&self) -> SegmentState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SegmentState::Active
    }

    pub fn activation(&self) -> u64 {
        self.activation
    }

    pub fn uses(&self) -> u32 {
        self.uses
    }

    /// World-space position of the segment's left edge on the surface baseline.
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// World x of the right edge.
    pub fn end_x(&self) -> f32 {
        self.origin.x + self.width
    }

    /// Whether world `x` falls within `[origin, origin + width)`.
    pub fn spans(&self, x: f32) -> bool {
        x >= self.origin.x && x < self.end_x()
    }

    pub fn noise_offset(&self) -> f32 {
        self.noise_offset
    }

    /// Surface samples, local to the origin.
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Collision polyline. Same as the surface samples.
    pub fn boundary_points(&self) -> &[Vec2] {
        &self.points
    }

    /// Surface samples in world space.
    pub fn world_points(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.points.iter().map(move |p| *p + self.origin)
    }

    pub fn mesh(&self) -> &SegmentMesh {
        &self.mesh
    }

    pub(crate) fn activate(&mut self, sequence: u64) {
        self.state = SegmentState::Active;
        self.activation = sequence;
        self.uses += 1;
    }

    /// Assign the span this segment covers before building.
    pub(crate) fn place(&mut self, origin_x: f32, width: f32, depth: f32, noise_offset: f32) {
        self.origin = Vec2::new(origin_x, 0.0);
        self.width = width;
        self.depth = depth;
        self.noise_offset = noise_offset;
    }

    /// Resample and remesh in place.
    pub(crate) fn rebuild<N: CoherentNoise>(&mut self, builder: &SegmentBuilder<N>) -> Result<()> {
        builder.build_into(self.noise_offset, &mut self.points, &mut self.mesh)
    }

    /// Back to the canonical zero state. Capacity is kept.
    pub(crate) fn reset(&mut self) {
        self.state = SegmentState::Free;
        self.activation = 0;
        self.origin = Vec2::ZERO;
        self.width = 0.0;
        self.depth = 0.0;
        self.noise_offset = 0.0;
        self.points.clear();
        self.mesh.clear();
    }
}
