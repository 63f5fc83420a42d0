//! Random number generator abstraction for determinism.
//!
//! In production, this wraps the thread RNG. In tests, a seeded or
//! sequence-backed implementation is injected.

use rand::Rng;

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;
}

/// Production RNG backed by `rand`'s thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRng;

impl DeterministicRng for ThreadRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        rand::rng().random_range(min..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_rng_stays_within_inclusive_bounds() {
        let mut rng = ThreadRng;
        for _ in 0..200 {
            let value = rng.next_u32_range(3, 5);
            assert!((3..=5).contains(&value));
        }
    }
}
