//! Random selection without replacement, with optional anti-repeat bias.
//!
//! Two strategies are used depending on how much of the list is requested:
//!
//! - **Partial Fisher–Yates** when the request covers at least
//!   `shuffle_threshold` of the list. Rejection sampling would waste most
//!   draws at that density.
//! - **Rejection sampling** otherwise. Each slot draws random indices,
//!   rejecting ones already chosen in this call and ones in the avoid set.
//!   After `max_retries` misses the slot falls back to a sequential scan from
//!   the last drawn index, so selection always terminates.
//!
//! The random source is any [`rand::Rng`]: a seeded `StdRng` in tests, the
//! thread-local CSPRNG from [`rand::rng`] in the server.

use std::collections::HashSet;

use rand::Rng;

use crate::HARD_COUNT_CAP;
use crate::device::DeviceType;
use crate::history::RecentHistory;

/// Default fraction of the list above which a shuffle is used.
const DEFAULT_SHUFFLE_THRESHOLD: f64 = 0.8;

/// Default number of random draws per slot before scanning sequentially.
const DEFAULT_MAX_RETRIES: usize = 10;

/// Tunables for a [`Sampler`].
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Upper bound on items returned per call.
    pub hard_cap: usize,
    /// Fraction of the list (0.0 - 1.0) at which the shuffle strategy kicks in.
    pub shuffle_threshold: f64,
    /// Random draws per slot before the sequential fallback.
    pub max_retries: usize,
    /// Whether [`Sampler::sample_with_history`] avoids and records history.
    pub avoid_recent: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            hard_cap: HARD_COUNT_CAP,
            shuffle_threshold: DEFAULT_SHUFFLE_THRESHOLD,
            max_retries: DEFAULT_MAX_RETRIES,
            avoid_recent: true,
        }
    }
}

impl SamplerConfig {
    /// Plain uniform selection, history is neither consulted nor updated.
    pub fn without_history() -> Self {
        Self {
            avoid_recent: false,
            ..Self::default()
        }
    }
}

/// Selects distinct indices from a list of known length.
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    config: SamplerConfig,
}

impl Sampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// Number of items a call asking for `count` out of `len` will return.
    pub fn effective_count(&self, len: usize, count: usize) -> usize {
        if len == 0 {
            return 0;
        }
        count.max(1).min(len).min(self.config.hard_cap.max(1))
    }

    /// Select distinct indices into a list of `len` items, in random order.
    ///
    /// Indices in `avoid` are skipped while enough other indices remain to
    /// fill the request; otherwise `avoid` is ignored. Returns fewer than
    /// `count` indices only when `len` (or the hard cap) is smaller.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        len: usize,
        count: usize,
        avoid: &HashSet<usize>,
        rng: &mut R,
    ) -> Vec<usize> {
        let count = self.effective_count(len, count);
        if count == 0 {
            return Vec::new();
        }

        if count as f64 >= len as f64 * self.config.shuffle_threshold {
            return partial_shuffle(len, count, rng);
        }

        let avoided = avoid.iter().filter(|&&index| index < len).count();
        let empty = HashSet::new();
        let avoid = if len - avoided >= count { avoid } else { &empty };

        let mut chosen = Vec::with_capacity(count);
        let mut taken = HashSet::with_capacity(count);

        while chosen.len() < count {
            let mut last = 0;
            let mut picked = None;

            for _ in 0..self.config.max_retries.max(1) {
                let candidate = rng.random_range(0..len);
                last = candidate;
                if !taken.contains(&candidate) && !avoid.contains(&candidate) {
                    picked = Some(candidate);
                    break;
                }
            }

            let index = picked
                .or_else(|| scan_from(last, len, |i| !taken.contains(&i) && !avoid.contains(&i)))
                .or_else(|| scan_from(last, len, |i| !taken.contains(&i)));

            match index {
                Some(index) => {
                    taken.insert(index);
                    chosen.push(index);
                }
                None => break,
            }
        }

        chosen
    }

    /// Sample while steering away from indices recently served for `device`,
    /// then record the new picks.
    ///
    /// Only the newest half of the spare entries (`len - count`) is avoided,
    /// so selection stays random even when the history outgrows the list.
    ///
    /// With `avoid_recent` disabled this is plain [`Sampler::sample`] and the
    /// history is left untouched.
    pub fn sample_with_history<R: Rng + ?Sized>(
        &self,
        device: DeviceType,
        len: usize,
        count: usize,
        history: &mut RecentHistory,
        rng: &mut R,
    ) -> Vec<usize> {
        if !self.config.avoid_recent {
            return self.sample(len, count, &HashSet::new(), rng);
        }

        let count = self.effective_count(len, count);
        let recent = history.newest(device, len, avoid_budget(len, count));
        let chosen = self.sample(len, count, &recent, rng);
        history.record(device, &chosen);
        chosen
    }
}

/// How many recent indices to avoid when picking `count` of `len`.
///
/// At least one while there is a spare entry, so the previous pick is never
/// repeated immediately.
fn avoid_budget(len: usize, count: usize) -> usize {
    if len > count {
        ((len - count) / 2).max(1)
    } else {
        0
    }
}

/// Shuffle the first `count` positions of `0..len` into place.
fn partial_shuffle<R: Rng + ?Sized>(len: usize, count: usize, rng: &mut R) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..len).collect();
    for i in 0..count {
        let j = rng.random_range(i..len);
        pool.swap(i, j);
    }
    pool.truncate(count);
    pool
}

/// First index at or after `start` (wrapping) that satisfies `accept`.
fn scan_from(start: usize, len: usize, accept: impl Fn(usize) -> bool) -> Option<usize> {
    (0..len)
        .map(|offset| (start + offset) % len)
        .find(|&index| accept(index))
}
