//! The pool's guarded state: the handle table, the idle queue, and the
//! monotone counters. Every field here lives behind one `Mutex` — see
//! `pool.rs`.

use std::collections::HashMap;
use std::path::PathBuf;

use linked_hash_map::LinkedHashMap;

use crate::backend::RrdHandle;
use crate::config::PoolConfig;
use crate::entry::Entry;

/// Everything the pool-wide monitor guards.
///
/// Invariant upheld by every method here: an entry's canonical path is a
/// key of `idle` iff that entry's `usage_count == 0`.
pub(crate) struct PoolState<H: RrdHandle> {
    pub(crate) table: HashMap<PathBuf, Entry<H>>,
    /// FIFO by release time: `pop_front` yields the oldest idle entry.
    pub(crate) idle: LinkedHashMap<PathBuf, ()>,
    pub(crate) capacity: usize,
    pub(crate) limited_capacity: bool,
    pub(crate) max_used_capacity: usize,
    pub(crate) hits: u64,
    pub(crate) requests: u64,
}

impl<H: RrdHandle> PoolState<H> {
    pub(crate) fn new(config: PoolConfig) -> Self {
        Self {
            table: HashMap::new(),
            idle: LinkedHashMap::new(),
            capacity: config.capacity,
            limited_capacity: config.limited_capacity,
            max_used_capacity: 0,
            hits: 0,
            requests: 0,
        }
    }

    /// Whether an unseen path may be admitted right now.
    pub(crate) fn has_room(&self) -> bool {
        !self.limited_capacity || self.table.len() < self.capacity
    }

    pub(crate) fn bump_high_water(&mut self) {
        if self.table.len() > self.max_used_capacity {
            self.max_used_capacity = self.table.len();
        }
    }

    /// Insert a freshly opened handle as a new, live (`usage_count == 1`)
    /// entry and update the high-water mark.
    pub(crate) fn insert_live(&mut self, canonical: PathBuf, handle: H) {
        self.table.insert(canonical, Entry::new(handle));
        self.bump_high_water();
    }

    /// Move an entry from idle to live by incrementing its usage count.
    /// Caller must have already confirmed `canonical` is in `table`.
    pub(crate) fn mark_in_use(&mut self, canonical: &PathBuf) {
        let entry = self
            .table
            .get_mut(canonical)
            .expect("mark_in_use called for missing entry");
        entry.usage_count += 1;
        if entry.usage_count == 1 {
            self.idle.remove(canonical);
        }
    }

    /// Decrement an entry's usage count; enqueue it onto the idle tail if
    /// it reached zero. Caller must have already confirmed `canonical` is
    /// in `table`.
    pub(crate) fn mark_released(&mut self, canonical: &PathBuf) {
        let entry = self
            .table
            .get_mut(canonical)
            .expect("mark_released called for missing entry");
        debug_assert!(entry.usage_count > 0);
        entry.usage_count -= 1;
        if entry.usage_count == 0 {
            self.idle.insert(canonical.clone(), ());
        }
    }

    /// Remove an entry from both structures, returning it for the caller
    /// to close outside the lock.
    pub(crate) fn remove(&mut self, canonical: &PathBuf) -> Option<Entry<H>> {
        self.idle.remove(canonical);
        self.table.remove(canonical)
    }

    /// Pop the oldest idle entry, if any, for the reclaimer.
    pub(crate) fn pop_oldest_idle(&mut self) -> Option<(PathBuf, Entry<H>)> {
        let (path, _) = self.idle.pop_front()?;
        let entry = self
            .table
            .remove(&path)
            .expect("idle queue referenced a path missing from the table");
        Some((path, entry))
    }

    /// Whether the reclaimer should run right now.
    pub(crate) fn over_capacity_with_idle(&self) -> bool {
        self.table.len() >= self.capacity && !self.idle.is_empty()
    }

    pub(crate) fn cached_paths(&self) -> Vec<PathBuf> {
        self.table.keys().cloned().collect()
    }
}
