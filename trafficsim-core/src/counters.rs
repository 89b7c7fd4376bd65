//! Process-wide event counters of a simulation run.
//!
//! [`EventCounters`] is the single aggregation context of a run. It is
//! created at setup with one slot per traffic source, shared (behind an
//! [`Arc`]) with every source and with the link layer through the
//! [`LinkObserver`] interface, and frozen with [`EventCounters::snapshot`]
//! once the run has stopped.
//!
//! [`Arc`]: std::sync::Arc

use crate::id::NodeId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Notifications emitted by the link layer about the traffic of a source.
///
/// Drops and contention backoffs are decided outside of the traffic
/// sources, the link layer only reports them. They are expected events,
/// not failures.
pub trait LinkObserver: Send + Sync {
    /// a packet sent by `source` was discarded before delivery
    fn on_drop(&self, source: NodeId);

    /// a transmission attempt of `source` was deferred because the
    /// medium was busy
    fn on_backoff(&self, source: NodeId);
}

/// Monotonic counters mutated during the run.
///
/// Every counter is an [`AtomicU64`]: on a single event timeline (the
/// normal case) this costs nothing and the counters stay correct if a
/// host delivers events from several threads. The per-source slots are
/// only written by the source owning them.
#[derive(Debug)]
pub struct EventCounters {
    total_sent: AtomicU64,
    total_dropped: AtomicU64,
    total_backoffs: AtomicU64,
    max_queue_depth: AtomicU64,
    sources: Box<[SourceSlot]>,
}

#[derive(Debug, Default)]
struct SourceSlot {
    queue_depth_sum: AtomicU64,
    sends: AtomicU64,
}

/// Frozen copy of the [`EventCounters`], read after the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub total_sent: u64,
    pub total_dropped: u64,
    pub total_backoffs: u64,
    pub max_queue_depth: u64,
    /// per-source queue samples, indexed by the source's [`NodeId`]
    pub sources: Vec<SourceSamples>,
}

/// Queue-depth samples accumulated by one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSamples {
    /// sum of the depths observed at each send attempt
    pub queue_depth_sum: u64,
    /// number of send attempts that sampled the queue
    pub sends: u64,
}

const ORDERING: Ordering = Ordering::SeqCst;

impl EventCounters {
    /// create zeroed counters with one slot for each of the `sources`
    /// traffic sources (indexed `0..sources`)
    pub fn new(sources: usize) -> Self {
        Self {
            total_sent: AtomicU64::new(0),
            total_dropped: AtomicU64::new(0),
            total_backoffs: AtomicU64::new(0),
            max_queue_depth: AtomicU64::new(0),
            sources: (0..sources).map(|_| SourceSlot::default()).collect(),
        }
    }

    /// number of per-source slots
    pub fn sources(&self) -> usize {
        self.sources.len()
    }

    /// `true` if `source` has a slot in these counters
    pub fn tracks(&self, source: NodeId) -> bool {
        source.index() < self.sources.len()
    }

    /// a packet of `source` was successfully handed to its channel
    pub fn record_sent(&self, _source: NodeId) {
        self.total_sent.fetch_add(1, ORDERING);
    }

    /// `source` observed `depth` packets in its queue while sending
    ///
    /// Samples of an untracked source are ignored.
    pub fn record_queue_sample(&self, source: NodeId, depth: u64) {
        let Some(slot) = self.sources.get(source.index()) else {
            tracing::warn!(%source, "queue sample for an untracked source");
            return;
        };

        slot.queue_depth_sum.fetch_add(depth, ORDERING);
        slot.sends.fetch_add(1, ORDERING);
        self.max_queue_depth.fetch_max(depth, ORDERING);
    }

    pub fn total_sent(&self) -> u64 {
        self.total_sent.load(ORDERING)
    }

    pub fn total_dropped(&self) -> u64 {
        self.total_dropped.load(ORDERING)
    }

    pub fn total_backoffs(&self) -> u64 {
        self.total_backoffs.load(ORDERING)
    }

    pub fn max_queue_depth(&self) -> u64 {
        self.max_queue_depth.load(ORDERING)
    }

    /// samples recorded so far by `source`, `None` if untracked
    pub fn source_samples(&self, source: NodeId) -> Option<SourceSamples> {
        self.sources.get(source.index()).map(SourceSlot::load)
    }

    /// Freeze the current values.
    ///
    /// Meant to be called once the run has stopped: counters are read
    /// one by one, a snapshot taken while events are still delivered
    /// may mix values of different instants.
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            total_sent: self.total_sent(),
            total_dropped: self.total_dropped(),
            total_backoffs: self.total_backoffs(),
            max_queue_depth: self.max_queue_depth(),
            sources: self.sources.iter().map(SourceSlot::load).collect(),
        }
    }

    /// set every counter back to zero before reusing the context
    pub fn reset(&self) {
        self.total_sent.store(0, ORDERING);
        self.total_dropped.store(0, ORDERING);
        self.total_backoffs.store(0, ORDERING);
        self.max_queue_depth.store(0, ORDERING);
        for slot in self.sources.iter() {
            slot.queue_depth_sum.store(0, ORDERING);
            slot.sends.store(0, ORDERING);
        }
    }
}

impl SourceSlot {
    fn load(&self) -> SourceSamples {
        SourceSamples {
            queue_depth_sum: self.queue_depth_sum.load(ORDERING),
            sends: self.sends.load(ORDERING),
        }
    }
}

impl SourceSamples {
    /// mean queue depth observed by the source, `None` without samples
    pub fn mean_depth(&self) -> Option<f64> {
        (self.sends > 0).then(|| self.queue_depth_sum as f64 / self.sends as f64)
    }
}

impl LinkObserver for EventCounters {
    fn on_drop(&self, source: NodeId) {
        tracing::trace!(source = %source.label(), "packet dropped");
        self.total_dropped.fetch_add(1, ORDERING);
    }

    fn on_backoff(&self, source: NodeId) {
        tracing::trace!(source = %source.label(), "transmission backed off");
        self.total_backoffs.fetch_add(1, ORDERING);
    }
}
