use std::sync::atomic::{AtomicU64, Ordering};

/// Read-only view on the depth of a transmit queue.
///
/// A traffic source samples this synchronously every time it hands a
/// packet to its channel. The depth is a number of **packets** pending
/// transmission on the link segment of the source.
pub trait QueueDepth: Send + Sync {
    fn current_depth(&self) -> u64;
}

/// [`DepthGauge`] keeps track of how many packets currently occupy a
/// bounded transmit queue.
///
/// The gauge can be shared between the queue owner (which reserves and
/// frees slots) and any number of observers (which only read the depth)
/// as it is [`Sync`] and [`Send`] safe.
///
/// # Thread Safety
///
/// The gauge uses [`AtomicU64`] for both the maximum and the used
/// capacity. [`DepthGauge::reserve`] and [`DepthGauge::free`] are not a
/// single atomic operation: they loop on
/// [`AtomicU64::compare_exchange_weak`] until the used capacity is
/// updated from the value they computed against. The [ABA Problem] is
/// not handled, which is fine as only the resulting depth matters.
///
/// [ABA Problem]: https://en.wikipedia.org/wiki/ABA_problem
#[derive(Debug)]
pub struct DepthGauge {
    maximum_capacity: AtomicU64,
    used_capacity: AtomicU64,
}

const ORDERING: Ordering = Ordering::SeqCst;

const FETCH_ORDERING: Ordering = ORDERING;

const STORE_ORDERING: Ordering = ORDERING;

impl DepthGauge {
    /// create a [`DepthGauge`] with a infinite maximum capacity.
    ///
    /// ```
    /// # use trafficsim_core::queue::DepthGauge;
    /// let gauge = DepthGauge::new();
    /// # assert_eq!(gauge.maximum_capacity(), u64::MAX);
    /// // is equivalent to calling:
    /// let gauge = DepthGauge::with_capacity(u64::MAX);
    /// # assert_eq!(gauge.maximum_capacity(), u64::MAX);
    /// ```
    pub fn new() -> Self {
        Self::with_capacity(u64::MAX)
    }

    /// create a [`DepthGauge`] holding at most `maximum_capacity` packets.
    pub fn with_capacity(maximum_capacity: u64) -> Self {
        Self {
            maximum_capacity: AtomicU64::new(maximum_capacity),
            used_capacity: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn maximum_capacity(&self) -> u64 {
        self.maximum_capacity.load(FETCH_ORDERING)
    }

    /// the number of packets currently in the queue
    #[inline]
    pub fn used_capacity(&self) -> u64 {
        self.used_capacity.load(FETCH_ORDERING)
    }

    #[inline]
    pub fn remaining_capacity(&self) -> u64 {
        self.maximum_capacity().saturating_sub(self.used_capacity())
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.remaining_capacity() == 0
    }

    /// Reserve _up to_ `size` slots, returns the amount actually reserved.
    ///
    /// ```
    /// # use trafficsim_core::queue::DepthGauge;
    /// let gauge = DepthGauge::with_capacity(50);
    /// # let actual =
    /// gauge.reserve(48);
    /// # assert_eq!(actual, 48);
    /// let actual = gauge.reserve(5);
    /// assert_eq!(actual, 2);
    /// ```
    pub fn reserve(&self, size: u64) -> u64 {
        let mut prev = self.used_capacity();

        loop {
            let remaining_capacity = self.maximum_capacity().saturating_sub(prev);

            let actual_size = std::cmp::min(remaining_capacity, size);
            let next = prev.saturating_add(actual_size);

            match self.used_capacity.compare_exchange_weak(
                prev,
                next,
                STORE_ORDERING,
                FETCH_ORDERING,
            ) {
                Ok(_) => return actual_size,
                Err(next_prev) => prev = next_prev,
            }
        }
    }

    /// Free _up to_ `size` slots, returns the amount actually freed.
    ///
    /// ```
    /// # use trafficsim_core::queue::DepthGauge;
    /// let gauge = DepthGauge::with_capacity(50);
    /// # let actual =
    /// gauge.reserve(10);
    /// # assert_eq!(actual, 10);
    /// assert_eq!(gauge.free(9), 9);
    /// assert_eq!(gauge.free(2), 1);
    /// assert_eq!(gauge.free(0), 0);
    /// ```
    pub fn free(&self, size: u64) -> u64 {
        let mut prev = self.used_capacity();

        loop {
            let actual_size = std::cmp::min(prev, size);
            let next = prev.saturating_sub(actual_size);

            match self.used_capacity.compare_exchange_weak(
                prev,
                next,
                STORE_ORDERING,
                FETCH_ORDERING,
            ) {
                Ok(_) => return actual_size,
                Err(next_prev) => prev = next_prev,
            }
        }
    }
}

impl Default for DepthGauge {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueDepth for DepthGauge {
    fn current_depth(&self) -> u64 {
        self.used_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn upper_bound() {
        let gauge = DepthGauge::with_capacity(10);

        assert_eq!(gauge.reserve(0), 0);
        assert_eq!(gauge.reserve(10), 10);
        assert_eq!(gauge.reserve(10), 0);
        assert!(gauge.is_full());
    }

    #[test]
    fn lower_bound() {
        let gauge = DepthGauge::new();

        assert_eq!(gauge.free(10), 0);

        gauge.reserve(100);
        assert_eq!(gauge.free(90), 90);
        assert_eq!(gauge.free(20), 10);
        assert_eq!(gauge.free(20), 0);
    }

    #[test]
    fn zero_capacity_gauge_reserves_nothing() {
        let gauge = DepthGauge::with_capacity(0);
        assert_eq!(gauge.reserve(1), 0);
        assert_eq!(gauge.used_capacity(), 0);
    }

    #[test]
    fn depth_observed_through_trait() {
        let gauge = Arc::new(DepthGauge::with_capacity(50));
        let observer: Arc<dyn QueueDepth> = gauge.clone();

        gauge.reserve(3);
        assert_eq!(observer.current_depth(), 3);
        gauge.free(1);
        assert_eq!(observer.current_depth(), 2);
    }

    #[test]
    fn concurrent_reserve_never_exceeds_capacity() {
        let gauge = Arc::new(DepthGauge::with_capacity(1_000));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gauge = Arc::clone(&gauge);
                thread::spawn(move || (0..500).map(|_| gauge.reserve(1)).sum::<u64>())
            })
            .collect();

        let reserved: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(reserved, 1_000);
        assert_eq!(gauge.used_capacity(), 1_000);
    }
}
