//! Terrain Streamer - keeps a sliding window of segments around the observer
//!
//! Integrates SegmentPool and SegmentBuilder: each tick spawns ahead of the
//! frontier, then retires behind the window. All spawns of a tick (including a
//! parallel batch build) complete before retirement is evaluated.

use std::collections::VecDeque;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::motion::VelocityEstimator;
use super::policy::{WindowBounds, spans_to_reach};
use super::pool::{PoolStats, PreallocatingFactory, SegmentPool};
use super::segment::{Segment, SegmentHandle};
use super::substrate::{NullSubstrate, TerrainSubstrate};
use crate::core::{Error, Result};
use crate::terrain::builder::SegmentBuilder;
use crate::terrain::config::TerrainConfig;
use crate::terrain::noise::{CoherentNoise, PerlinNoise};

/// Velocity look-ahead never extends the window by more than this many
/// generation distances, so a single teleport frame cannot flood the pool.
const MAX_LOOKAHEAD_WINDOWS: f32 = 2.0;

/// What one tick (or forced spawn) did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub spawned: usize,
    pub retired: usize,
    /// Spans skipped because they would have been retired in the same tick.
    pub skipped: usize,
    /// A spawn was dropped because the pool was exhausted; retried next tick.
    pub exhausted: bool,
}

/// Serializable view of one active segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentSnapshot {
    pub handle: SegmentHandle,
    pub origin_x: f32,
    pub width: f32,
    pub noise_offset: f32,
    /// Local surface samples as `[x, y]`.
    pub points: Vec<[f32; 2]>,
}

/// Serializable view of the streamer's working set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamerSnapshot {
    pub frontier_x: f32,
    pub noise_offset: f32,
    pub observer_x: f32,
    pub segments: Vec<SegmentSnapshot>,
}

/// Streaming terrain window.
pub struct TerrainStreamer<S: TerrainSubstrate = NullSubstrate, N: CoherentNoise = PerlinNoise> {
    config: TerrainConfig,
    pool: SegmentPool,
    builder: SegmentBuilder<N>,
    substrate: S,
    /// Active window, ascending origin
    active: VecDeque<SegmentHandle>,
    /// Right edge of generated terrain; the next spawn's origin
    frontier_x: f32,
    /// Noise cursor for the next spawn
    noise_offset: f32,
    observer_x: f32,
    motion: VelocityEstimator,
}

impl TerrainStreamer {
    /// Headless streamer with seeded Perlin noise.
    pub fn new(config: TerrainConfig) -> Result<Self> {
        Self::with_substrate(config, NullSubstrate)
    }
}

impl<S: TerrainSubstrate> TerrainStreamer<S> {
    pub fn with_substrate(config: TerrainConfig, substrate: S) -> Result<Self> {
        config.validate()?;
        let builder = SegmentBuilder::from_config(&config);
        let pool = SegmentPool::new(config.max_pool_size)
            .with_factory(PreallocatingFactory::new(config.points_per_segment));
        Self::from_parts(config, pool, builder, substrate)
    }
}

impl<S: TerrainSubstrate, N: CoherentNoise> TerrainStreamer<S, N> {
    /// Assemble from an un-warmed pool, a builder and a substrate.
    ///
    /// Validates the config, warms the pool up to `initial_pool_size` and
    /// generates the initial window.
    pub fn from_parts(
        config: TerrainConfig,
        pool: SegmentPool,
        builder: SegmentBuilder<N>,
        substrate: S,
    ) -> Result<Self> {
        config.validate()?;
        if pool.max_size() != config.max_pool_size {
            return Err(Error::Configuration(format!(
                "pool max size {} does not match configured max_pool_size {}",
                pool.max_size(),
                config.max_pool_size
            )));
        }

        let mut streamer = Self {
            pool,
            builder,
            substrate,
            active: VecDeque::new(),
            frontier_x: 0.0,
            noise_offset: 0.0,
            observer_x: 0.0,
            motion: VelocityEstimator::new(),
            config,
        };
        streamer.pool.warm_up(streamer.config.initial_pool_size)?;
        let report = streamer.generate_initial()?;

        log::info!(
            "Terrain streamer ready: {:?}, {} segments, frontier at {}",
            streamer.config.policy,
            report.spawned,
            streamer.frontier_x
        );
        Ok(streamer)
    }

    fn generate_initial(&mut self) -> Result<TickReport> {
        let count = self
            .config
            .policy
            .initial_spawns(self.config.generation_distance, self.config.segment_width);
        let mut report = TickReport::default();
        self.spawn_batch(count, &mut report)?;
        Ok(report)
    }

    /// Force one spawn at the frontier.
    ///
    /// Returns `Ok(None)` if the pool is exhausted.
    pub fn generate_next(&mut self) -> Result<Option<SegmentHandle>> {
        let mut report = TickReport::default();
        self.spawn_batch(1, &mut report)?;
        Ok(if report.spawned == 1 { self.active.back().copied() } else { None })
    }

    /// Advance the window by one frame.
    ///
    /// `observer_x` is ignored by the count-bounded policy; `delta_time` only
    /// feeds velocity look-ahead.
    pub fn tick(&mut self, observer_x: f32, delta_time: f32) -> Result<TickReport> {
        if !observer_x.is_finite() || !delta_time.is_finite() {
            return Err(Error::Configuration(format!(
                "tick needs finite input, got observer_x={observer_x} delta_time={delta_time}"
            )));
        }
        let policy = self.config.policy;
        let width = self.config.segment_width;
        let max_lookahead = self.config.generation_distance * MAX_LOOKAHEAD_WINDOWS;
        if policy.follows_observer() {
            check_reachable(observer_x.abs() + self.config.generation_distance + max_lookahead, width)?;
        }

        self.observer_x = observer_x;
        self.motion.update(observer_x, delta_time);
        let lookahead = self.motion.lookahead(self.config.lookahead_seconds).min(max_lookahead);
        let generation = self.config.generation_distance + lookahead;
        let bounds = policy.bounds(observer_x, generation, self.config.retire_distance, width);
        let mut report = TickReport::default();

        if policy.follows_observer() {
            report.skipped = self.skip_stale_spans(&bounds);
        }

        let wanted = policy.spawns_needed(self.active.len(), self.frontier_x, &bounds, width);
        self.spawn_batch(wanted, &mut report)?;

        report.retired = self.retire(&bounds, policy.retire_limit());

        log::trace!(
            "tick observer={} window=[{}, {}] frontier={} active={} {:?}",
            observer_x,
            bounds.retire_before,
            bounds.generate_until,
            self.frontier_x,
            self.active.len(),
            report
        );
        Ok(report)
    }

    /// Release everything and regenerate from x = 0.
    pub fn reset(&mut self) -> Result<TickReport> {
        for handle in self.active.drain(..) {
            self.substrate.reset_transform(handle);
        }
        let released = self.pool.release_all();
        self.frontier_x = 0.0;
        self.noise_offset = 0.0;
        self.observer_x = 0.0;
        self.motion.reset();

        let report = self.generate_initial()?;
        log::info!("Terrain reset: released {}, regenerated {}", released, report.spawned);
        Ok(report)
    }

    /// Move the frontier past spans that the retire threshold would drop
    /// immediately (observer teleported far ahead). The noise cursor advances
    /// in step, so surviving segments are identical to spawn-then-retire.
    fn skip_stale_spans(&mut self, bounds: &WindowBounds) -> usize {
        if !self.active.is_empty() {
            // Live segments still need retiring in order first
            let Some(last) = self.active.back().and_then(|h| self.pool.get(*h)) else {
                return 0;
            };
            if last.origin().x >= bounds.retire_before {
                return 0;
            }
        }

        let width = self.config.segment_width;
        let skipped = spans_to_reach(self.frontier_x, bounds.retire_before, width)
            .min(spans_to_reach(self.frontier_x, bounds.generate_until, width));
        if skipped > 0 {
            let steps = skipped as f64;
            self.frontier_x = (self.frontier_x as f64 + steps * width as f64) as f32;
            self.noise_offset = (self.noise_offset as f64 + steps * self.config.noise_scale as f64) as f32;
            log::debug!("Skipped {} stale spans, frontier now {}", skipped, self.frontier_x);
        }
        skipped
    }

    /// Acquire, build and commit up to `count` segments at the frontier.
    fn spawn_batch(&mut self, count: usize, report: &mut TickReport) -> Result<()> {
        if count == 0 {
            return Ok(());
        }

        let width = self.config.segment_width;
        let depth = self.config.segment_depth;
        check_reachable(self.frontier_x + count as f32 * width, width)?;
        let mut x = self.frontier_x;
        let mut offset = self.noise_offset;
        let mut batch = Vec::with_capacity(count);

        for _ in 0..count {
            let handle = match self.pool.acquire() {
                Ok(handle) => handle,
                Err(Error::PoolExhausted { capacity }) => {
                    log::warn!(
                        "No available segments in pool (capacity {}), spawn at x={} deferred",
                        capacity,
                        x
                    );
                    report.exhausted = true;
                    break;
                }
                Err(e) => {
                    for handle in &batch {
                        self.pool.release(*handle);
                    }
                    return Err(e);
                }
            };
            if let Some(segment) = self.pool.get_mut(handle) {
                segment.place(x, width, depth, offset);
            }
            batch.push(handle);
            x += width;
            offset += self.config.noise_scale;
        }

        let results = self.build_batch(&batch);

        for (i, result) in results.into_iter().enumerate() {
            if let Err(e) = result {
                self.abandon_from(&batch[i..]);
                log::error!("Segment build failed: {}", e);
                return Err(e);
            }
            self.commit(batch[i]);
            report.spawned += 1;
        }

        self.frontier_x = x;
        self.noise_offset = offset;
        Ok(())
    }

    /// Build geometry for a batch. Large batches run on the rayon pool; the
    /// returned results are in batch order either way.
    fn build_batch(&mut self, batch: &[SegmentHandle]) -> Vec<Result<()>> {
        let builder = &self.builder;
        let segments = self.pool.segments_mut(batch);
        if batch.len() >= self.config.parallel_build_threshold.max(2) {
            segments.into_par_iter().map(|s| s.rebuild(builder)).collect()
        } else {
            segments.into_iter().map(|s| s.rebuild(builder)).collect()
        }
    }

    /// Return failed and not-yet-committed handles unused and rewind the cursors to the first of them.
    fn abandon_from(&mut self, handles: &[SegmentHandle]) {
        if let Some(first) = handles.first().and_then(|h| self.pool.get(*h)) {
            self.frontier_x = first.origin().x;
            self.noise_offset = first.noise_offset();
        }
        for handle in handles {
            self.pool.release(*handle);
        }
    }

    /// Hand a built segment to the substrate and append it to the window.
    fn commit(&mut self, handle: SegmentHandle) {
        let Some(segment) = self.pool.get(handle) else {
            return;
        };
        let origin = segment.origin();
        self.substrate.set_world_position(handle, origin.x, origin.y);
        self.substrate.apply_geometry(handle, segment.mesh(), self.config.material_id);
        self.substrate.apply_boundary(handle, segment.boundary_points());
        self.active.push_back(handle);
        log::debug!("Spawned segment {} at x={}", handle.index(), origin.x);
    }

    /// Pop from the front while the policy says so.
    fn retire(&mut self, bounds: &WindowBounds, limit: usize) -> usize {
        let mut retired = 0;
        while retired < limit {
            let Some(&front) = self.active.front() else {
                break;
            };
            let origin_x = self.pool.get(front).map(|s| s.origin().x);
            match origin_x {
                Some(x) if !self.config.policy.should_retire(x, bounds) => break,
                _ => {}
            }

            self.active.pop_front();
            self.substrate.reset_transform(front);
            self.pool.release(front);
            retired += 1;
            log::debug!("Retired segment {} at x={:?}", front.index(), origin_x);
        }
        retired
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn pool(&self) -> &SegmentPool {
        &self.pool
    }

    /// Change the pool bound at runtime. Refused below the slots already created.
    pub fn set_max_pool_size(&mut self, max_size: usize) -> Result<()> {
        self.pool.set_max_size(max_size)?;
        self.config.max_pool_size = max_size;
        Ok(())
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn builder(&self) -> &SegmentBuilder<N> {
        &self.builder
    }

    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    pub fn substrate_mut(&mut self) -> &mut S {
        &mut self.substrate
    }

    /// Active handles, ascending origin.
    pub fn active_handles(&self) -> impl Iterator<Item = SegmentHandle> + '_ {
        self.active.iter().copied()
    }

    /// Active segments, ascending origin.
    pub fn active_segments(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.active.iter().filter_map(|h| self.pool.get(*h))
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Segment whose span contains world `x`.
    pub fn segment_at(&self, x: f32) -> Option<&Segment> {
        self.active_segments().find(|s| s.spans(x))
    }

    pub fn frontier_x(&self) -> f32 {
        self.frontier_x
    }

    pub fn noise_offset(&self) -> f32 {
        self.noise_offset
    }

    pub fn observer_x(&self) -> f32 {
        self.observer_x
    }

    pub fn observer_velocity(&self) -> f32 {
        self.motion.velocity()
    }

    pub fn snapshot(&self) -> StreamerSnapshot {
        StreamerSnapshot {
            frontier_x: self.frontier_x,
            noise_offset: self.noise_offset,
            observer_x: self.observer_x,
            segments: self
                .active_segments()
                .map(|s| SegmentSnapshot {
                    handle: s.handle(),
                    origin_x: s.origin().x,
                    width: s.width(),
                    noise_offset: s.noise_offset(),
                    points: s.points().iter().map(|p| p.to_array()).collect(),
                })
                .collect(),
        }
    }
}

/// Fail when f32 can no longer step from `x` to `x + width` without
/// distorting the span; past that point frontier updates stall or drift.
fn check_reachable(x: f32, width: f32) -> Result<()> {
    let magnitude = x.abs();
    let step = (magnitude + width) - magnitude;
    if !magnitude.is_finite() || (step - width).abs() > width * 0.01 {
        return Err(Error::Configuration(format!(
            "x={x} is too far out to place segments of width {width}"
        )));
    }
    Ok(())
}

impl<S: TerrainSubstrate, N: CoherentNoise> Drop for TerrainStreamer<S, N> {
    fn drop(&mut self) {
        // Hand every live handle back so the substrate can tear down its side
        for handle in self.active.drain(..) {
            self.substrate.reset_transform(handle);
            self.pool.release(handle);
        }
    }
}
