//! Observer velocity estimation for look-ahead generation.

use std::collections::VecDeque;

/// Sample of observer position and time.
#[derive(Clone, Copy, Debug)]
struct PositionSample {
    x: f32,
    time: f32,
}

/// Estimates horizontal observer velocity from `(position, dt)` updates.
pub struct VelocityEstimator {
    history: VecDeque<PositionSample>,
    max_history: usize,
    velocity: f32,
    current_time: f32,
}

impl Default for VelocityEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl VelocityEstimator {
    pub fn new() -> Self {
        Self::with_history(30) // ~0.5s at 60fps
    }

    pub fn with_history(max_history: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(max_history),
            max_history: max_history.max(2),
            velocity: 0.0,
            current_time: 0.0,
        }
    }

    /// Record the observer position after `delta_time` seconds.
    pub fn update(&mut self, x: f32, delta_time: f32) {
        self.current_time += delta_time.max(0.0);
        self.history.push_back(PositionSample { x, time: self.current_time });
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
        self.velocity = self.estimate();
    }

    /// Recency-weighted average of per-step velocities.
    fn estimate(&self) -> f32 {
        let mut total_velocity = 0.0;
        let mut total_weight = 0.0;
        let len = self.history.len() as f32;

        for (i, (prev, curr)) in self.history.iter().zip(self.history.iter().skip(1)).enumerate() {
            let dt = curr.time - prev.time;
            if dt > 0.0001 {
                let weight = (i + 1) as f32 / len;
                total_velocity += (curr.x - prev.x) / dt * weight;
                total_weight += weight;
            }
        }

        if total_weight > 0.0 { total_velocity / total_weight } else { 0.0 }
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Forward-only look-ahead distance for `seconds` of travel.
    pub fn lookahead(&self, seconds: f32) -> f32 {
        (self.velocity * seconds).max(0.0)
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.velocity = 0.0;
        self.current_time = 0.0;
    }
}
