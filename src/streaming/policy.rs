//! Window policies: how many segments to spawn and which to retire each tick.

use serde::{Deserialize, Serialize};

/// Window size of the count-bounded policy when none is given.
pub const DEFAULT_MAX_SEGMENTS: usize = 5;

/// Streaming window policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamingPolicy {
    /// Keep exactly `max_segments` alive, ignoring the observer.
    /// At most one spawn and one retirement per tick.
    CountBounded { max_segments: usize },
    /// Cover `[observer - retire_distance, observer + generation_distance]`.
    /// Spawns and retirements loop until the window is satisfied.
    #[default]
    DistanceBounded,
}

/// Geometry of the window at one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowBounds {
    /// Segments whose origin is below this are retired.
    pub retire_before: f32,
    /// The frontier must reach at least this x.
    pub generate_until: f32,
}

impl StreamingPolicy {
    pub fn count_bounded() -> Self {
        StreamingPolicy::CountBounded { max_segments: DEFAULT_MAX_SEGMENTS }
    }

    /// Segments spawned on initialisation (and after a reset).
    pub fn initial_spawns(&self, generation_distance: f32, segment_width: f32) -> usize {
        match *self {
            StreamingPolicy::CountBounded { max_segments } => max_segments,
            StreamingPolicy::DistanceBounded => spans_to_reach(0.0, generation_distance, segment_width),
        }
    }

    /// Window bounds for an observer at `observer_x`.
    ///
    /// The count-bounded policy keeps the fixed threshold `-segment_width`
    /// and has no generation target of its own.
    pub fn bounds(
        &self,
        observer_x: f32,
        generation_distance: f32,
        retire_distance: f32,
        segment_width: f32,
    ) -> WindowBounds {
        match self {
            StreamingPolicy::CountBounded { .. } => WindowBounds {
                retire_before: -segment_width,
                generate_until: f32::NEG_INFINITY,
            },
            StreamingPolicy::DistanceBounded => WindowBounds {
                retire_before: observer_x - retire_distance,
                generate_until: observer_x + generation_distance,
            },
        }
    }

    /// How many segments to spawn this tick.
    pub fn spawns_needed(
        &self,
        active_len: usize,
        frontier_x: f32,
        bounds: &WindowBounds,
        segment_width: f32,
    ) -> usize {
        match *self {
            StreamingPolicy::CountBounded { max_segments } => usize::from(active_len < max_segments),
            StreamingPolicy::DistanceBounded => {
                spans_to_reach(frontier_x, bounds.generate_until, segment_width)
            }
        }
    }

    /// Upper bound on retirements per tick.
    pub fn retire_limit(&self) -> usize {
        match self {
            StreamingPolicy::CountBounded { .. } => 1,
            StreamingPolicy::DistanceBounded => usize::MAX,
        }
    }

    pub fn should_retire(&self, origin_x: f32, bounds: &WindowBounds) -> bool {
        origin_x < bounds.retire_before
    }

    pub fn follows_observer(&self) -> bool {
        matches!(self, StreamingPolicy::DistanceBounded)
    }
}

/// Number of `width` steps from `from` until `from >= target`.
///
/// Computed in f64 rather than by stepping, so far-away targets cost nothing.
/// Returns 0 for a non-positive width or non-finite inputs.
pub fn spans_to_reach(from: f32, target: f32, width: f32) -> usize {
    if !(width > 0.0) || !from.is_finite() || !target.is_finite() || from >= target {
        return 0;
    }
    // `as` saturates, so absurd distances clamp instead of wrapping
    ((target as f64 - from as f64) / width as f64).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_to_reach() {
        assert_eq!(spans_to_reach(0.0, 60.0, 20.0), 3);
        assert_eq!(spans_to_reach(0.0, 61.0, 20.0), 4);
        assert_eq!(spans_to_reach(80.0, 60.0, 20.0), 0);
        assert_eq!(spans_to_reach(60.0, 60.0, 20.0), 0);
        assert_eq!(spans_to_reach(0.0, f32::NEG_INFINITY, 20.0), 0);
        assert_eq!(spans_to_reach(0.0, 10.0, 0.0), 0);
        assert_eq!(spans_to_reach(f32::NAN, 10.0, 20.0), 0);
        assert_eq!(spans_to_reach(0.0, f32::INFINITY, 20.0), 0);
    }

    #[test]
    fn test_spans_to_reach_far_target() {
        // Stepping would stall: 2e9 + 20 rounds back to 2e9 in f32
        assert_eq!(spans_to_reach(0.0, 2.0e9, 20.0), 100_000_000);
        assert_eq!(spans_to_reach(-40.0, 0.0, 20.0), 2);
    }

    #[test]
    fn test_count_bounded() {
        let policy = StreamingPolicy::count_bounded();
        assert_eq!(policy.initial_spawns(60.0, 20.0), 5);
        let bounds = policy.bounds(1000.0, 60.0, 40.0, 20.0);
        assert_eq!(bounds.retire_before, -20.0);
        assert_eq!(policy.spawns_needed(4, 80.0, &bounds, 20.0), 1);
        assert_eq!(policy.spawns_needed(5, 100.0, &bounds, 20.0), 0);
        assert_eq!(policy.retire_limit(), 1);
        assert!(!policy.follows_observer());
    }

    #[test]
    fn test_distance_bounded() {
        let policy = StreamingPolicy::DistanceBounded;
        assert_eq!(policy.initial_spawns(60.0, 20.0), 3);
        let bounds = policy.bounds(100.0, 60.0, 40.0, 20.0);
        assert_eq!(bounds, WindowBounds { retire_before: 60.0, generate_until: 160.0 });
        assert_eq!(policy.spawns_needed(3, 60.0, &bounds, 20.0), 5);
        assert!(policy.should_retire(40.0, &bounds));
        assert!(!policy.should_retire(60.0, &bounds));
        assert!(policy.follows_observer());
    }
}
