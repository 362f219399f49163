//! Bounded record of recently served images.
//!
//! Each image set keeps its own FIFO of indices. Once a set holds more than
//! `capacity` entries the oldest ones are evicted.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::device::DeviceType;

/// Recently emitted indices, per image set.
#[derive(Debug, Clone)]
pub struct RecentHistory {
    capacity: usize,
    entries: HashMap<DeviceType, VecDeque<usize>>,
}

impl RecentHistory {
    /// Create an empty history keeping at most `capacity` indices per set.
    ///
    /// A capacity of zero records nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
        }
    }

    /// Number of indices currently remembered for `device`.
    pub fn len(&self, device: DeviceType) -> usize {
        self.entries.get(&device).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, device: DeviceType) -> bool {
        self.len(device) == 0
    }

    /// The `limit` newest indices for `device` that are below `len`.
    ///
    /// Indices at or above `len` refer to entries of a longer, older list and
    /// are skipped so they don't use up the budget.
    pub fn newest(&self, device: DeviceType, len: usize, limit: usize) -> HashSet<usize> {
        self.entries
            .get(&device)
            .map(|queue| {
                queue
                    .iter()
                    .rev()
                    .copied()
                    .filter(|&index| index < len)
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remember `indices` as just served, oldest-first eviction beyond capacity.
    ///
    /// An index already in the history is moved to the newest position.
    pub fn record(&mut self, device: DeviceType, indices: &[usize]) {
        if self.capacity == 0 || indices.is_empty() {
            return;
        }

        let queue = self.entries.entry(device).or_default();
        for &index in indices {
            if let Some(pos) = queue.iter().position(|&existing| existing == index) {
                queue.remove(pos);
            }
            queue.push_back(index);
        }

        while queue.len() > self.capacity {
            queue.pop_front();
        }
    }
}
