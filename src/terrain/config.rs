//! Terrain streaming configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::streaming::policy::StreamingPolicy;

/// Full configuration surface for the terrain streamer.
///
/// Every field has a default, so partial JSON files are accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Horizontal span of one segment in world units.
    pub segment_width: f32,
    /// Vertical extrusion below the surface line (render only).
    pub segment_depth: f32,
    /// Surface samples per segment, including both endpoints.
    pub points_per_segment: usize,
    pub min_height: f32,
    pub max_height: f32,
    /// Noise frequency along x; also the per-segment advance of the noise cursor.
    pub noise_scale: f32,
    /// Causal smoothing factor in [0, 1]; 0 = raw noise.
    pub smoothness: f32,
    pub initial_pool_size: usize,
    /// Upper bound on pooled segments. 0 = unbounded.
    pub max_pool_size: usize,
    /// Look-ahead margin ahead of the observer.
    pub generation_distance: f32,
    /// Look-behind margin behind the observer.
    pub retire_distance: f32,
    pub policy: StreamingPolicy,
    /// Noise seed.
    pub seed: u32,
    /// Fractal octaves (1 = plain Perlin).
    pub octaves: u32,
    /// Extra look-ahead in seconds of observed forward velocity.
    pub lookahead_seconds: f32,
    /// Spawns in a single tick at or above this count are built in parallel.
    pub parallel_build_threshold: usize,
    /// Material forwarded to the substrate along with geometry.
    pub material_id: Option<u32>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            segment_width: 20.0,
            segment_depth: 10.0,
            points_per_segment: 20,
            min_height: 0.0,
            max_height: 5.0,
            noise_scale: 0.1,
            smoothness: 0.5,
            initial_pool_size: 10,
            max_pool_size: 20,
            generation_distance: 60.0,
            retire_distance: 40.0,
            policy: StreamingPolicy::default(),
            seed: 0,
            octaves: 1,
            lookahead_seconds: 0.0,
            parallel_build_threshold: 4,
            material_id: None,
        }
    }
}

impl TerrainConfig {
    /// Heights are `noise * height_scale`, i.e. no lower remapping.
    pub fn with_height_scale(mut self, height_scale: f32) -> Self {
        self.min_height = 0.0;
        self.max_height = height_scale;
        self
    }

    /// Use the count-bounded policy with a fixed window of `max_segments`.
    pub fn count_bounded(mut self, max_segments: usize) -> Self {
        self.policy = StreamingPolicy::CountBounded { max_segments };
        self
    }

    /// Whether the pool enforces `max_pool_size`.
    pub fn pool_is_bounded(&self) -> bool {
        self.max_pool_size > 0
    }

    /// Check every parameter; the streamer refuses to start on failure.
    pub fn validate(&self) -> Result<()> {
        fn fail(msg: impl Into<String>) -> Result<()> {
            Err(Error::Configuration(msg.into()))
        }

        if self.points_per_segment < 2 {
            return fail(format!(
                "points_per_segment must be at least 2, got {}",
                self.points_per_segment
            ));
        }
        if !(self.segment_width.is_finite() && self.segment_width > 0.0) {
            return fail(format!("segment_width must be positive, got {}", self.segment_width));
        }
        if !(self.segment_depth.is_finite() && self.segment_depth >= 0.0) {
            return fail(format!("segment_depth must be non-negative, got {}", self.segment_depth));
        }
        if !self.min_height.is_finite() || !self.max_height.is_finite() {
            return fail("height range must be finite");
        }
        if self.max_height < self.min_height {
            return fail(format!(
                "max_height ({}) is below min_height ({})",
                self.max_height, self.min_height
            ));
        }
        if !self.noise_scale.is_finite() {
            return fail("noise_scale must be finite");
        }
        if !(0.0..=1.0).contains(&self.smoothness) {
            return fail(format!("smoothness must be within [0, 1], got {}", self.smoothness));
        }
        if self.pool_is_bounded() && self.initial_pool_size > self.max_pool_size {
            return fail(format!(
                "initial_pool_size ({}) exceeds max_pool_size ({})",
                self.initial_pool_size, self.max_pool_size
            ));
        }
        for (name, value) in [
            ("generation_distance", self.generation_distance),
            ("retire_distance", self.retire_distance),
            ("lookahead_seconds", self.lookahead_seconds),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return fail(format!("{name} must be non-negative, got {value}"));
            }
        }
        if self.octaves == 0 {
            return fail("octaves must be at least 1");
        }
        match self.policy {
            StreamingPolicy::CountBounded { max_segments } if max_segments == 0 => {
                return fail("count-bounded policy needs max_segments >= 1");
            }
            StreamingPolicy::DistanceBounded if self.retire_distance < self.segment_width => {
                // The segment under the observer starts up to one width behind it.
                return fail(format!(
                    "retire_distance ({}) must be at least segment_width ({})",
                    self.retire_distance, self.segment_width
                ));
            }
            _ => {}
        }
        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Save as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_is_valid() {
        TerrainConfig::default().validate().unwrap();
        assert_eq!(TerrainConfig::default().segment_width, 20.0);
        assert_eq!(TerrainConfig::default().points_per_segment, 20);
    }

    #[test]
    fn test_rejects_single_point() {
        let config = TerrainConfig { points_per_segment: 1, ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_rejects_inverted_heights() {
        let config = TerrainConfig { min_height: 3.0, max_height: 1.0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_smoothness_out_of_range() {
        let config = TerrainConfig { smoothness: 1.5, ..Default::default() };
        assert!(config.validate().is_err());
        let config = TerrainConfig { smoothness: -0.1, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_initial_above_max() {
        let config = TerrainConfig { initial_pool_size: 5, max_pool_size: 3, ..Default::default() };
        assert!(config.validate().is_err());
        // Unbounded pool accepts any warm-up size
        let config = TerrainConfig { initial_pool_size: 50, max_pool_size: 0, ..Default::default() };
        config.validate().unwrap();
    }

    #[test]
    fn test_retire_distance_must_cover_a_segment() {
        let config = TerrainConfig { retire_distance: 5.0, ..Default::default() };
        assert!(config.validate().is_err());
        // Count-bounded ignores the observer, so no such constraint
        config.count_bounded(5).validate().unwrap();
    }

    #[test]
    fn test_height_scale_variant() {
        let config = TerrainConfig { min_height: -4.0, ..Default::default() }.with_height_scale(5.0);
        assert_eq!(config.min_height, 0.0);
        assert_eq!(config.max_height, 5.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TerrainConfig::from_json_str(r#"{ "segment_width": 10.0, "retire_distance": 10.0 }"#).unwrap();
        assert_eq!(config.segment_width, 10.0);
        assert_eq!(config.points_per_segment, 20);
    }

    #[test]
    fn test_json_policy_tag() {
        let config = TerrainConfig::from_json_str(
            r#"{ "policy": { "kind": "count_bounded", "max_segments": 7 } }"#,
        )
        .unwrap();
        assert_eq!(config.policy, StreamingPolicy::CountBounded { max_segments: 7 });
    }

    #[test]
    fn test_invalid_json_file_is_rejected() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "points_per_segment": 1 }"#).unwrap();
        assert!(matches!(TerrainConfig::load(&path), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("nested").join("terrain.json");
        let config = TerrainConfig { seed: 42, octaves: 3, ..Default::default() };
        config.save(&path).unwrap();
        assert_eq!(TerrainConfig::load(&path).unwrap(), config);
    }
}
