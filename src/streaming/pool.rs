//! Segment Pool - bounded arena of reusable terrain segments
//!
//! - Slots are created once (warm-up or lazy growth) and never freed while the pool lives
//! - FIFO free list: the longest-parked slot is reused first
//! - Acquire and release are O(1); release of an inactive handle is a no-op

use std::collections::VecDeque;

use super::segment::{Segment, SegmentHandle};
use crate::core::{Error, Result};

/// Builds one inert segment for a new pool slot.
pub trait SegmentFactory: Send {
    fn create(&mut self, handle: SegmentHandle) -> Result<Segment>;
}

/// Default factory: reserves buffers sized for a fixed point count.
#[derive(Clone, Copy, Debug)]
pub struct PreallocatingFactory {
    point_count: usize,
}

impl PreallocatingFactory {
    pub fn new(point_count: usize) -> Self {
        Self { point_count }
    }
}

impl SegmentFactory for PreallocatingFactory {
    fn create(&mut self, handle: SegmentHandle) -> Result<Segment> {
        Ok(Segment::with_capacity(handle, self.point_count))
    }
}

/// Point-in-time pool counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub free: usize,
    pub active: usize,
    /// Slots ever created.
    pub total: usize,
    /// `max_size`, or 0 when unbounded.
    pub capacity: usize,
    /// Slots created on demand after warm-up.
    pub grown: usize,
}

/// Pool of segment slots.
pub struct SegmentPool {
    /// Arena; a handle is an index into it
    slots: Vec<Segment>,
    /// Parked handles, oldest release at the front
    free: VecDeque<SegmentHandle>,
    active_count: usize,
    /// Monotonic spawn counter giving the active set its insertion order
    next_activation: u64,
    /// 0 = unbounded
    max_size: usize,
    grown: usize,
    factory: Option<Box<dyn SegmentFactory>>,
}

impl SegmentPool {
    /// Empty pool without a factory. Call [`with_factory`](Self::with_factory) before warm-up.
    pub fn new(max_size: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: VecDeque::new(),
            active_count: 0,
            next_activation: 1,
            max_size,
            grown: 0,
            factory: None,
        }
    }

    /// Install the factory used for warm-up and growth.
    pub fn with_factory(mut self, factory: impl SegmentFactory + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.max_size > 0
    }

    fn at_capacity(&self) -> bool {
        self.is_bounded() && self.slots.len() >= self.max_size
    }

    /// Construct a slot through the factory; not yet in the free list.
    fn create_slot(&mut self) -> Result<SegmentHandle> {
        let factory = self.factory.as_mut().ok_or_else(|| {
            Error::Configuration("segment pool has no segment factory".to_string())
        })?;

        let handle = SegmentHandle::new(self.slots.len() as u32);
        let segment = factory.create(handle)?;
        if segment.handle() != handle || segment.is_active() {
            return Err(Error::Configuration(format!(
                "segment factory returned {:?} in state {:?} for slot {:?}",
                segment.handle(),
                segment.state(),
                handle
            )));
        }
        self.slots.push(segment);
        Ok(handle)
    }

    /// Pre-build `initial_size` inactive slots into the free list.
    ///
    /// Stops early (with a warning) if the pool bound is hit.
    pub fn warm_up(&mut self, initial_size: usize) -> Result<()> {
        if self.factory.is_none() {
            return Err(Error::Configuration(
                "cannot warm up segment pool without a segment factory".to_string(),
            ));
        }

        for _ in 0..initial_size {
            if self.at_capacity() {
                log::warn!("Segment pool size limit reached at {} slots", self.slots.len());
                break;
            }
            let handle = self.create_slot()?;
            self.free.push_back(handle);
        }

        log::info!(
            "Segment pool warmed up: {} slots (max {})",
            self.slots.len(),
            if self.is_bounded() { self.max_size.to_string() } else { "unbounded".to_string() }
        );
        Ok(())
    }

    /// Hand out a slot, growing the pool if allowed.
    ///
    /// Returns [`Error::PoolExhausted`] when every slot is active and the pool is at capacity.
    pub fn acquire(&mut self) -> Result<SegmentHandle> {
        let handle = match self.free.pop_front() {
            Some(handle) => handle,
            None => {
                if self.at_capacity() {
                    return Err(Error::PoolExhausted { capacity: self.max_size });
                }
                let handle = self.create_slot()?;
                self.grown += 1;
                log::debug!("Segment pool grew to {} slots", self.slots.len());
                handle
            }
        };

        let sequence = self.next_activation;
        self.next_activation += 1;
        self.slots[handle.index()].activate(sequence);
        self.active_count += 1;
        log::trace!("Acquired segment slot {}", handle.index());
        Ok(handle)
    }

    /// Reset a slot and park it at the back of the free list.
    ///
    /// Returns `false` (and changes nothing) if the handle is unknown or not active.
    pub fn release(&mut self, handle: SegmentHandle) -> bool {
        let Some(segment) = self.slots.get_mut(handle.index()) else {
            return false;
        };
        if !segment.is_active() {
            return false;
        }

        segment.reset();
        self.active_count -= 1;
        self.free.push_back(handle);
        log::trace!("Released segment slot {}", handle.index());
        true
    }

    /// Release every active slot. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let handles = self.active_handles();
        for handle in &handles {
            self.release(*handle);
        }
        handles.len()
    }

    pub fn get(&self, handle: SegmentHandle) -> Option<&Segment> {
        self.slots.get(handle.index())
    }

    pub fn get_mut(&mut self, handle: SegmentHandle) -> Option<&mut Segment> {
        self.slots.get_mut(handle.index())
    }

    pub fn is_active(&self, handle: SegmentHandle) -> bool {
        self.get(handle).is_some_and(Segment::is_active)
    }

    /// Disjoint mutable borrows of the given slots, in the order requested.
    /// Unknown or repeated handles are skipped.
    pub(crate) fn segments_mut(&mut self, handles: &[SegmentHandle]) -> Vec<&mut Segment> {
        let mut by_slot: Vec<Option<&mut Segment>> = self.slots.iter_mut().map(Some).collect();
        handles
            .iter()
            .filter_map(|h| by_slot.get_mut(h.index()).and_then(Option::take))
            .collect()
    }

    /// Active handles in spawn order.
    pub fn active_handles(&self) -> Vec<SegmentHandle> {
        let mut active: Vec<&Segment> = self.slots.iter().filter(|s| s.is_active()).collect();
        active.sort_by_key(|s| s.activation());
        active.iter().map(|s| s.handle()).collect()
    }

    /// Free handles in reuse order.
    pub fn free_handles(&self) -> impl Iterator<Item = SegmentHandle> + '_ {
        self.free.iter().copied()
    }

    pub fn active_len(&self) -> usize {
        self.active_count
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Slots ever created.
    pub fn total(&self) -> usize {
        self.slots.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the slot bound (0 = unbounded). Existing slots are never dropped,
    /// so a bound below [`total`](Self::total) is refused.
    pub fn set_max_size(&mut self, max_size: usize) -> Result<()> {
        if max_size > 0 && max_size < self.slots.len() {
            return Err(Error::Configuration(format!(
                "cannot shrink segment pool to {} slots, {} already exist",
                max_size,
                self.slots.len()
            )));
        }
        self.max_size = max_size;
        log::info!("Segment pool bound set to {}", max_size);
        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            free: self.free.len(),
            active: self.active_count,
            total: self.slots.len(),
            capacity: self.max_size,
            grown: self.grown,
        }
    }

    /// Pool utilization percentage (active / capacity, or active / total when unbounded)
    pub fn utilization(&self) -> f32 {
        let denom = if self.is_bounded() { self.max_size } else { self.slots.len() };
        if denom == 0 {
            return 0.0;
        }
        self.active_count as f32 / denom as f32 * 100.0
    }
}
