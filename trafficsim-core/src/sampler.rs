use crate::id::NodeId;
use rand_chacha::ChaChaRng;
use rand_core::{Rng, SeedableRng as _};
use std::time::Duration;
use thiserror::Error;

/// Memoryless inter-send delay generator.
///
/// Every call to [`IntervalSampler::next`] draws one value from an
/// exponential distribution of rate `λ` (mean `1/λ`). Each sampler owns
/// its own [`ChaChaRng`] seeded once at construction, so two samplers
/// built with the same seed yield the same sequence and no sampler
/// depends on another one's draws.
///
/// # Example
///
/// ```
/// use trafficsim_core::{IntervalSampler, NodeId};
/// use std::time::Duration;
///
/// let mut sampler = IntervalSampler::for_source(100.0, NodeId::new(3), 0).unwrap();
///
/// let interval = sampler.next_interval(Duration::from_secs(1));
/// assert!(interval < Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct IntervalSampler {
    rate: f64,
    rng: ChaChaRng,
}

/// Error returned when constructing an [`IntervalSampler`] with a rate
/// that is not a finite, strictly positive number.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("sampling rate must be finite and strictly positive, got {0}")]
pub struct RateError(f64);

impl IntervalSampler {
    /// Create a sampler of rate `rate` seeded with `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`RateError`] if `rate` is NaN, infinite, zero or negative.
    pub fn new(rate: f64, seed: u64) -> Result<Self, RateError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(RateError(rate));
        }

        Ok(Self {
            rate,
            rng: ChaChaRng::seed_from_u64(seed),
        })
    }

    /// Create the sampler of the traffic source `source`.
    ///
    /// The seed is the source's index offset by `base_seed` so that runs
    /// are reproducible source by source. With a `base_seed` of `0` the
    /// seed is exactly the index of the source.
    pub fn for_source(rate: f64, source: NodeId, base_seed: u64) -> Result<Self, RateError> {
        Self::new(rate, base_seed.wrapping_add(source.into_u64()))
    }

    /// the rate `λ` of the distribution
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// the expected value of the samples, `1/λ`
    #[inline]
    pub fn mean(&self) -> f64 {
        self.rate.recip()
    }

    /// Draw the next sample, in time units.
    ///
    /// The sample is obtained by inverse transform: with `u` uniform in
    /// `[0, 1)`, `-ln(1 - u) / λ` is exponentially distributed and never
    /// negative.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> f64 {
        // 53 random bits, the precision of an f64: `uniform` never reaches 1
        let bits = self.rng.next_u64() >> 11;
        let uniform = (bits as f64) * (1.0 / (1u64 << 53) as f64);

        -(-uniform).ln_1p() / self.rate
    }

    /// Draw the next sample and scale it to a [`Duration`], `unit` being
    /// the length of one time unit.
    ///
    /// An interval too long to be represented saturates to
    /// [`Duration::MAX`].
    pub fn next_interval(&mut self, unit: Duration) -> Duration {
        let secs = unit.as_secs_f64() * self.next().max(0.0);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_rejected() {
        assert!(IntervalSampler::new(0.0, 0).is_err());
        assert!(IntervalSampler::new(-1.0, 0).is_err());
        assert!(IntervalSampler::new(f64::NAN, 0).is_err());
        assert!(IntervalSampler::new(f64::INFINITY, 0).is_err());
    }

    #[test]
    fn error_display() {
        let err = IntervalSampler::new(-2.0, 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "sampling rate must be finite and strictly positive, got -2"
        );
    }

    #[test]
    fn samples_are_non_negative() {
        let mut sampler = IntervalSampler::new(100.0, 7).unwrap();
        for _ in 0..10_000 {
            assert!(sampler.next() >= 0.0);
        }
    }

    #[test]
    fn mean_converges() {
        for rate in [0.5, 1.0, 100.0] {
            let mut sampler = IntervalSampler::new(rate, 42).unwrap();
            let count = 100_000;
            let mean = (0..count).map(|_| sampler.next()).sum::<f64>() / count as f64;
            let expected = 1.0 / rate;

            assert!(
                (mean - expected).abs() < expected * 0.02,
                "mean {mean} not within 2% of {expected} (rate {rate})"
            );
        }
    }

    #[test]
    fn reproducible_with_same_seed() {
        let mut a = IntervalSampler::new(10.0, 99).unwrap();
        let mut b = IntervalSampler::new(10.0, 99).unwrap();
        for _ in 0..100 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn sources_have_distinct_streams() {
        let mut a = IntervalSampler::for_source(10.0, NodeId::new(0), 0).unwrap();
        let mut b = IntervalSampler::for_source(10.0, NodeId::new(1), 0).unwrap();

        let a: Vec<f64> = (0..10).map(|_| a.next()).collect();
        let b: Vec<f64> = (0..10).map(|_| b.next()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn for_source_uses_index_as_seed() {
        let mut by_index = IntervalSampler::for_source(5.0, NodeId::new(12), 0).unwrap();
        let mut by_seed = IntervalSampler::new(5.0, 12).unwrap();
        assert_eq!(by_index.next(), by_seed.next());
    }

    #[test]
    fn interval_scaled_by_unit() {
        let mut one = IntervalSampler::new(1.0, 3).unwrap();
        let mut ten = IntervalSampler::new(1.0, 3).unwrap();

        for _ in 0..100 {
            let a = one.next_interval(Duration::from_secs(1)).as_secs_f64();
            let b = ten.next_interval(Duration::from_secs(10)).as_secs_f64();
            assert!((b - 10.0 * a).abs() < 1e-6, "{b} != 10 * {a}");
        }
    }

    #[test]
    fn tiny_rate_saturates() {
        let mut sampler = IntervalSampler::new(1e-30, 0).unwrap();
        for _ in 0..100 {
            let interval = sampler.next_interval(Duration::from_secs(1));
            assert!(interval >= Duration::from_secs(1_000_000));
        }
    }

    #[test]
    fn large_unit_saturates() {
        let mut sampler = IntervalSampler::new(1e-3, 5).unwrap();
        let unit = Duration::MAX / 2;

        // samples above 2 time units overflow, a rate of 1e-3 makes them
        // the vast majority
        let saturated = (0..100)
            .map(|_| sampler.next_interval(unit))
            .filter(|interval| *interval == Duration::MAX)
            .count();
        assert!(saturated > 90, "only {saturated} saturated intervals");
    }

    #[test]
    fn mean_accessor() {
        let sampler = IntervalSampler::new(4.0, 0).unwrap();
        assert_eq!(sampler.rate(), 4.0);
        assert_eq!(sampler.mean(), 0.25);
    }
}
