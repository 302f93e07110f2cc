//! Segment geometry: height sampling, extruded strip mesh, collision boundary.
//!
//! Everything here is pure: inputs in, geometry out. The `*_into` forms write
//! into caller-owned buffers so pooled segments keep their allocations.

use glam::{Vec2, Vec3};

use super::config::TerrainConfig;
use super::noise::{CoherentNoise, PerlinNoise};
use crate::core::{Error, Result};

/// Interleaved vertex for single-buffer uploads.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Render mesh of one segment: a top row of surface vertices and a bottom row
/// pushed down by the segment depth.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentMesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub uvs: Vec<Vec2>,
}

impl SegmentMesh {
    /// Drop contents, keep capacity.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.uvs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn interleaved(&self) -> Vec<TerrainVertex> {
        self.vertices
            .iter()
            .zip(&self.uvs)
            .map(|(p, uv)| TerrainVertex {
                position: p.to_array(),
                uv: uv.to_array(),
            })
            .collect()
    }
}

/// Parameters of the height sampler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleParams {
    pub width: f32,
    pub point_count: usize,
    pub noise_scale: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub smoothness: f32,
}

impl SampleParams {
    pub fn from_config(config: &TerrainConfig) -> Self {
        Self {
            width: config.segment_width,
            point_count: config.points_per_segment,
            noise_scale: config.noise_scale,
            min_height: config.min_height,
            max_height: config.max_height,
            smoothness: config.smoothness,
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn check_point_count(point_count: usize) -> Result<()> {
    if point_count < 2 {
        return Err(Error::InvalidConfiguration(format!(
            "segment needs at least 2 points, got {point_count}"
        )));
    }
    Ok(())
}

fn check_params(params: &SampleParams) -> Result<()> {
    check_point_count(params.point_count)?;
    fn fail(msg: String) -> Result<()> {
        Err(Error::InvalidConfiguration(msg))
    }

    if !(params.width.is_finite() && params.width > 0.0) {
        return fail(format!("segment width must be positive, got {}", params.width));
    }
    if !params.noise_scale.is_finite() {
        return fail(format!("noise scale must be finite, got {}", params.noise_scale));
    }
    if !(params.min_height.is_finite() && params.max_height.is_finite())
        || params.max_height < params.min_height
    {
        return fail(format!(
            "invalid height range [{}, {}]",
            params.min_height, params.max_height
        ));
    }
    if !(0.0..=1.0).contains(&params.smoothness) {
        return fail(format!("smoothness must be within [0, 1], got {}", params.smoothness));
    }
    Ok(())
}

/// Sample the surface of one segment.
///
/// Interior points are blended toward the previous, already smoothed point
/// (a causal left-to-right filter). Endpoints are left raw.
pub fn sample_heights_into(
    params: &SampleParams,
    noise: &impl CoherentNoise,
    noise_offset: f32,
    out: &mut Vec<Vec2>,
) -> Result<()> {
    check_params(params)?;
    out.clear();
    out.reserve(params.point_count);

    let last = params.point_count - 1;
    let step = params.width / last as f32;
    let (lo, hi) = (params.min_height, params.max_height);

    for i in 0..params.point_count {
        // Pin the last sample so the span ends exactly at `width`
        let x = if i == last { params.width } else { i as f32 * step };
        let nx = x as f64 * params.noise_scale as f64 + noise_offset as f64;
        let n = noise.sample(nx, 0.0);
        let mut height = lerp(lo, hi, n);

        if i > 0 && i < last {
            height = lerp(height, out[i - 1].y, params.smoothness);
        }

        // Rounding in lerp can leave the range by an ulp
        out.push(Vec2::new(x, height.clamp(lo, hi)));
    }
    Ok(())
}

/// Allocating form of [`sample_heights_into`].
pub fn sample_heights(
    params: &SampleParams,
    noise: &impl CoherentNoise,
    noise_offset: f32,
) -> Result<Vec<Vec2>> {
    let mut points = Vec::with_capacity(params.point_count);
    sample_heights_into(params, noise, noise_offset, &mut points)?;
    Ok(points)
}

/// Build the extruded strip mesh below `points`.
///
/// Vertex `i` is the surface sample, vertex `i + P` the same sample moved down
/// by `depth`. Each column pair emits two triangles with the same winding.
pub fn build_mesh_into(points: &[Vec2], depth: f32, mesh: &mut SegmentMesh) -> Result<()> {
    let count = points.len();
    check_point_count(count)?;
    mesh.clear();

    mesh.vertices.reserve(count * 2);
    mesh.vertices.extend(points.iter().map(|p| Vec3::new(p.x, p.y, 0.0)));
    mesh.vertices.extend(points.iter().map(|p| Vec3::new(p.x, p.y - depth, 0.0)));

    let p = count as u32;
    mesh.indices.reserve((count - 1) * 6);
    for i in 0..p - 1 {
        mesh.indices.extend_from_slice(&[i, i + 1, i + p, i + 1, i + 1 + p, i + p]);
    }

    let denom = (count - 1) as f32;
    mesh.uvs.reserve(count * 2);
    mesh.uvs.extend((0..count).map(|i| Vec2::new(i as f32 / denom, 1.0)));
    mesh.uvs.extend((0..count).map(|i| Vec2::new(i as f32 / denom, 0.0)));
    Ok(())
}

/// Allocating form of [`build_mesh_into`].
pub fn build_mesh(points: &[Vec2], depth: f32) -> Result<SegmentMesh> {
    let mut mesh = SegmentMesh::default();
    build_mesh_into(points, depth, &mut mesh)?;
    Ok(mesh)
}

/// The collision boundary is the surface polyline itself; the extrusion is render-only.
pub fn collision_boundary(points: &[Vec2]) -> &[Vec2] {
    points
}

/// Bundles sampler parameters, depth and a noise source.
pub struct SegmentBuilder<N: CoherentNoise = PerlinNoise> {
    params: SampleParams,
    depth: f32,
    noise: N,
}

impl SegmentBuilder<PerlinNoise> {
    /// Builder with seeded Perlin/FBM noise as configured.
    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::with_noise(config, PerlinNoise::fractal(config.seed, config.octaves))
    }
}

impl<N: CoherentNoise> SegmentBuilder<N> {
    pub fn with_noise(config: &TerrainConfig, noise: N) -> Self {
        Self {
            params: SampleParams::from_config(config),
            depth: config.segment_depth,
            noise,
        }
    }

    pub fn params(&self) -> &SampleParams {
        &self.params
    }

    pub fn noise(&self) -> &N {
        &self.noise
    }

    /// Sample and mesh one segment into the given buffers.
    pub fn build_into(
        &self,
        noise_offset: f32,
        points: &mut Vec<Vec2>,
        mesh: &mut SegmentMesh,
    ) -> Result<()> {
        sample_heights_into(&self.params, &self.noise, noise_offset, points)?;
        build_mesh_into(points, self.depth, mesh)
    }
}
