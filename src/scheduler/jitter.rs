//! Injectable randomness for day-interval jitter.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces the multiplicative factor applied to day intervals so that
/// items reviewed together do not all fall due on the same day.
pub trait JitterSource {
    /// A factor in `[low, high]`.
    fn sample(&mut self, low: f64, high: f64) -> f64;
}

/// Uniform jitter backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RandomJitter<R = StdRng> {
    rng: R,
}

impl RandomJitter<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible jitter: the same seed replays the same factors.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomJitter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> JitterSource for RandomJitter<R> {
    fn sample(&mut self, low: f64, high: f64) -> f64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Constant jitter, clamped into the requested range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&mut self, low: f64, high: f64) -> f64 {
        self.0.max(low).min(high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_jitter_stays_in_range() {
        let mut jitter = RandomJitter::seeded(7);
        for _ in 0..1_000 {
            let f = jitter.sample(0.95, 1.05);
            assert!((0.95..=1.05).contains(&f));
        }
    }

    #[test]
    fn test_seeded_jitter_replays() {
        let mut a = RandomJitter::seeded(42);
        let mut b = RandomJitter::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.sample(0.95, 1.05), b.sample(0.95, 1.05));
        }
    }

    #[test]
    fn test_degenerate_range_returns_low() {
        let mut jitter = RandomJitter::seeded(1);
        assert_eq!(jitter.sample(1.0, 1.0), 1.0);
    }

    #[test]
    fn test_fixed_jitter_clamps() {
        assert_eq!(FixedJitter(1.0).sample(0.95, 1.05), 1.0);
        assert_eq!(FixedJitter(2.0).sample(0.95, 1.05), 1.05);
        assert_eq!(FixedJitter(0.5).sample(0.95, 1.05), 0.95);
    }
}
