//! Deterministic coherent noise for height sampling

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

/// Coherent 2D noise with output in `[0, 1]`.
///
/// Implementations must be deterministic (same input, same output) and
/// continuous (nearby inputs give nearby outputs).
pub trait CoherentNoise: Send + Sync {
    fn sample(&self, x: f64, y: f64) -> f32;
}

enum Source {
    Single(Perlin),
    Fractal(Fbm<Perlin>),
}

/// Perlin noise remapped from `[-1, 1]` to `[0, 1]`, optionally fractal (FBM).
pub struct PerlinNoise {
    source: Source,
    seed: u32,
}

impl PerlinNoise {
    /// Single-octave Perlin noise.
    pub fn new(seed: u32) -> Self {
        Self { source: Source::Single(Perlin::new(seed)), seed }
    }

    /// FBM over `octaves` Perlin layers (persistence 0.5, lacunarity 2.0).
    /// One octave falls back to plain Perlin.
    pub fn fractal(seed: u32, octaves: u32) -> Self {
        if octaves <= 1 {
            return Self::new(seed);
        }
        let fbm = Fbm::<Perlin>::new(seed)
            .set_octaves(octaves as usize)
            .set_persistence(0.5)
            .set_lacunarity(2.0);
        Self { source: Source::Fractal(fbm), seed }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl CoherentNoise for PerlinNoise {
    fn sample(&self, x: f64, y: f64) -> f32 {
        let value = match &self.source {
            Source::Single(perlin) => perlin.get([x, y]),
            Source::Fractal(fbm) => fbm.get([x, y]),
        };
        // Perlin can slightly overshoot [-1, 1]
        (((value + 1.0) * 0.5) as f32).clamp(0.0, 1.0)
    }
}

impl<F: Fn(f64, f64) -> f32 + Send + Sync> CoherentNoise for F {
    fn sample(&self, x: f64, y: f64) -> f32 {
        self(x, y)
    }
}
