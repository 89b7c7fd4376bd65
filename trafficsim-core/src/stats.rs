//! End-of-run statistics.
//!
//! [`Statistics::aggregate`] is a pure function of a [`CountersSnapshot`]:
//! calling it twice on the same snapshot gives the same result. Ratios
//! whose denominator is zero are reported as [`DivisionUndefined`]
//! instead of a made up number.

use crate::counters::CountersSnapshot;
use std::fmt;
use thiserror::Error;

/// Reason why a ratio of the report has no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DivisionUndefined {
    #[error("no packet sent")]
    NoSends,
    #[error("no packet delivered")]
    NoDeliveries,
    #[error("no queue sample")]
    NoQueueSamples,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub total_sent: u64,
    pub total_dropped: u64,
    pub total_backoffs: u64,
    /// dropped / sent
    pub loss_rate: Result<f64, DivisionUndefined>,
    /// backoffs / (sent - dropped)
    pub mean_backoff_rate: Result<f64, DivisionUndefined>,
    /// Unweighted mean, over the sources that sampled the queue, of each
    /// source's mean queue depth.
    pub mean_queue_depth: Result<f64, DivisionUndefined>,
    pub max_queue_depth: u64,
    /// sources that never sampled the queue, left out of
    /// `mean_queue_depth`
    pub idle_sources: usize,
}

impl Statistics {
    pub fn aggregate(snapshot: &CountersSnapshot) -> Self {
        let sent = snapshot.total_sent;
        let dropped = snapshot.total_dropped;

        let loss_rate = if sent == 0 {
            Err(DivisionUndefined::NoSends)
        } else {
            Ok(dropped as f64 / sent as f64)
        };

        let mean_backoff_rate = match sent.checked_sub(dropped) {
            Some(delivered) if delivered > 0 => {
                Ok(snapshot.total_backoffs as f64 / delivered as f64)
            }
            _ => Err(DivisionUndefined::NoDeliveries),
        };

        let means: Vec<f64> = snapshot
            .sources
            .iter()
            .filter_map(|source| source.mean_depth())
            .collect();
        let idle_sources = snapshot.sources.len() - means.len();
        let mean_queue_depth = if means.is_empty() {
            Err(DivisionUndefined::NoQueueSamples)
        } else {
            Ok(means.iter().sum::<f64>() / means.len() as f64)
        };

        Self {
            total_sent: sent,
            total_dropped: dropped,
            total_backoffs: snapshot.total_backoffs,
            loss_rate,
            mean_backoff_rate,
            mean_queue_depth,
            max_queue_depth: snapshot.max_queue_depth,
            idle_sources,
        }
    }
}

struct Ratio<'a>(&'a Result<f64, DivisionUndefined>);

impl fmt::Display for Ratio<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Ok(value) => write!(f, "{value:.6}"),
            Err(reason) => write!(f, "n/a ({reason})"),
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total packets sent: {}", self.total_sent)?;
        writeln!(f, "Total packets dropped: {}", self.total_dropped)?;
        writeln!(f, "Loss rate: {}", Ratio(&self.loss_rate))?;
        writeln!(f, "Mean backoff rate: {}", Ratio(&self.mean_backoff_rate))?;
        writeln!(f, "Mean queue depth: {}", Ratio(&self.mean_queue_depth))?;
        write!(f, "Max queue depth: {}", self.max_queue_depth)
    }
}
