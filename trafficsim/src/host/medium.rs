use rand_chacha::ChaChaRng;
use rand_core::{Rng, SeedableRng as _};
use std::time::Duration;
use trafficsim_core::{DataRate, SimTime};

/// The bus every host transmits on.
///
/// Only one frame is on the medium at a time. A frame occupies it for
/// its transmission time plus the propagation delay; a host sensing the
/// medium during that window finds it busy.
#[derive(Debug)]
pub struct SharedMedium {
    data_rate: DataRate,
    propagation_delay: Duration,
    busy_until: SimTime,
}

impl SharedMedium {
    pub fn new(data_rate: DataRate, propagation_delay: Duration) -> Self {
        Self {
            data_rate,
            propagation_delay,
            busy_until: SimTime::ZERO,
        }
    }

    #[inline]
    pub fn is_busy(&self, now: SimTime) -> bool {
        now < self.busy_until
    }

    /// Put a frame of `bytes` on the medium at `now`, returns the instant
    /// it is fully received at the other end.
    pub fn occupy(&mut self, now: SimTime, bytes: u64) -> SimTime {
        debug_assert!(!self.is_busy(now), "the medium is already in use");

        let until = now
            .saturating_add(self.data_rate.transmission_time(bytes))
            .saturating_add(self.propagation_delay);

        self.busy_until = until;

        until
    }
}

/// Binary exponential backoff of a deferred transmission.
///
/// After the `n`-th consecutive deferral a host waits a uniformly drawn
/// number of slots in `1..=2^min(n, ceiling) - 1` before sensing the
/// medium again.
#[derive(Debug, Clone)]
pub struct Backoff {
    slot: Duration,
    ceiling: u32,
    max_retries: u32,
    rng: ChaChaRng,
}

impl Backoff {
    pub fn new(slot: Duration, ceiling: u32, max_retries: u32, seed: u64) -> Self {
        Self {
            slot,
            ceiling,
            max_retries,
            rng: ChaChaRng::seed_from_u64(seed),
        }
    }

    /// `true` once a frame was deferred more times than allowed
    #[inline]
    pub fn exhausted(&self, retries: u32) -> bool {
        retries > self.max_retries
    }

    /// how long to wait after the `retries`-th deferral
    pub fn delay(&mut self, retries: u32) -> Duration {
        let exponent = retries.min(self.ceiling).min(63);
        let max_slots = ((1u64 << exponent) - 1).max(1);
        let slots = 1 + self.rng.next_u64() % max_slots;

        self.slot
            .saturating_mul(u32::try_from(slots).unwrap_or(u32::MAX))
    }
}
