use std::time::Duration;
use thiserror::Error;
use trafficsim_core::{
    DataRate, IntervalSampler, NodeId, RateError,
    defaults::{
        DEFAULT_BACKOFF_CEILING, DEFAULT_BACKOFF_SLOT, DEFAULT_DATA_RATE, DEFAULT_HORIZON,
        DEFAULT_MAX_BACKOFF_RETRIES, DEFAULT_NODES, DEFAULT_PACKET_SIZE,
        DEFAULT_PROPAGATION_DELAY, DEFAULT_QUEUE_CAPACITY, DEFAULT_RATE, DEFAULT_SEED,
        DEFAULT_START, DEFAULT_TIME_UNIT,
    },
};

/// Parameters of a [`Simulation`] run.
///
/// ```
/// # use trafficsim::SimConfig;
/// # use std::time::Duration;
/// let config = SimConfig {
///     nodes: 10,
///     horizon: Duration::from_secs(2),
///     ..SimConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.sources(), 9);
/// ```
///
/// [`Simulation`]: crate::Simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// hosts on the bus, every one of them but the last runs a traffic
    /// source, the last one is the sink
    pub nodes: u32,
    /// end of the run, events due at or after the horizon never fire
    pub horizon: Duration,
    /// instant every source starts at
    pub start: Duration,
    /// instant every source stops at, the horizon if `None`
    pub stop: Option<Duration>,

    /// send rate λ of every source, in packets per `time_unit`
    pub rate: f64,
    pub time_unit: Duration,
    /// in bytes
    pub packet_size: u64,
    /// base seed of the interval samplers (source `i` uses `seed + i`)
    pub seed: u64,

    /// transmit queue capacity of every host, in packets
    pub queue_capacity: u64,
    pub data_rate: DataRate,
    pub propagation_delay: Duration,

    pub backoff_slot: Duration,
    pub backoff_ceiling: u32,
    pub max_backoff_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("At least 2 nodes are needed (one source and the sink), got {0}")]
    TooFewNodes(u32),
    #[error("Invalid send rate: {0}")]
    Rate(#[from] RateError),
    #[error("Sources cannot stop ({stop:?}) before they start ({start:?})")]
    StopBeforeStart { start: Duration, stop: Duration },
    #[error("The time unit cannot be zero")]
    ZeroTimeUnit,
    #[error("The data rate of the bus cannot be zero")]
    ZeroDataRate,
    #[error("The backoff slot cannot be zero")]
    ZeroBackoffSlot,
}

impl SimConfig {
    /// number of traffic sources
    pub fn sources(&self) -> u32 {
        self.nodes.saturating_sub(1)
    }

    /// the node receiving every packet
    pub fn sink(&self) -> NodeId {
        NodeId::new(self.sources())
    }

    pub fn stop_time(&self) -> Duration {
        self.stop.unwrap_or(self.horizon)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes < 2 {
            return Err(ConfigError::TooFewNodes(self.nodes));
        }

        IntervalSampler::new(self.rate, self.seed)?;

        let stop = self.stop_time();
        if stop < self.start {
            return Err(ConfigError::StopBeforeStart {
                start: self.start,
                stop,
            });
        }

        if self.time_unit.is_zero() {
            return Err(ConfigError::ZeroTimeUnit);
        }
        if self.data_rate.bits_per_second() == 0 {
            return Err(ConfigError::ZeroDataRate);
        }
        if self.backoff_slot.is_zero() {
            return Err(ConfigError::ZeroBackoffSlot);
        }

        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nodes: DEFAULT_NODES,
            horizon: DEFAULT_HORIZON,
            start: DEFAULT_START,
            stop: None,
            rate: DEFAULT_RATE,
            time_unit: DEFAULT_TIME_UNIT,
            packet_size: DEFAULT_PACKET_SIZE,
            seed: DEFAULT_SEED,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            data_rate: DEFAULT_DATA_RATE,
            propagation_delay: DEFAULT_PROPAGATION_DELAY,
            backoff_slot: DEFAULT_BACKOFF_SLOT,
            backoff_ceiling: DEFAULT_BACKOFF_CEILING,
            max_backoff_retries: DEFAULT_MAX_BACKOFF_RETRIES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = SimConfig::default();

        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.sources(), 89);
        assert_eq!(config.sink(), NodeId::new(89));
        assert_eq!(config.stop_time(), DEFAULT_HORIZON);
    }

    #[test]
    fn too_few_nodes() {
        let config = SimConfig {
            nodes: 1,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TooFewNodes(1)));
    }

    #[test]
    fn invalid_rate() {
        let config = SimConfig {
            rate: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Rate(_))));
    }

    #[test]
    fn stop_before_start() {
        let config = SimConfig {
            start: Duration::from_secs(2),
            stop: Some(Duration::from_secs(1)),
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::StopBeforeStart { .. })
        ));
    }

    #[test]
    fn zero_lifetime_is_valid() {
        let config = SimConfig {
            start: Duration::from_secs(1),
            stop: Some(Duration::from_secs(1)),
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn zero_values() {
        let zero_unit = SimConfig {
            time_unit: Duration::ZERO,
            ..SimConfig::default()
        };
        assert_eq!(zero_unit.validate(), Err(ConfigError::ZeroTimeUnit));

        let zero_rate = SimConfig {
            data_rate: DataRate::from_bps(0),
            ..SimConfig::default()
        };
        assert_eq!(zero_rate.validate(), Err(ConfigError::ZeroDataRate));

        let zero_slot = SimConfig {
            backoff_slot: Duration::ZERO,
            ..SimConfig::default()
        };
        assert_eq!(zero_slot.validate(), Err(ConfigError::ZeroBackoffSlot));
    }
}
