//! Seedable random source used by tile effects.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Random picks needed by the game. Implementations must be deterministic
/// for a given seed so that runs can be replayed.
pub trait RandomSource {
    /// One element chosen uniformly, or `None` for an empty slice.
    fn pick_one<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>;

    /// Up to `k` distinct elements chosen uniformly. Returns every element
    /// when `k` exceeds the slice length.
    fn pick_k_unique<T: Clone>(&mut self, items: &[T], k: usize) -> Vec<T>;
}

#[derive(Debug, Clone)]
pub struct SeededRandom {
    seed: u64,
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeds from the wall clock.
    pub fn from_clock() -> Self {
        Self::new(clock_seed())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRandom {
    fn pick_one<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    fn pick_k_unique<T: Clone>(&mut self, items: &[T], k: usize) -> Vec<T> {
        items.choose_multiple(&mut self.rng, k).cloned().collect()
    }
}

fn clock_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_nanos();
    (nanos & u64::MAX as u128) as u64
}
