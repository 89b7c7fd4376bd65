use crate::data_rate::DataRate;
use std::time::Duration;

/// Default number of hosts on the bus
///
/// Every host but the last one runs a traffic source, the last one is
/// the sink.
pub const DEFAULT_NODES: u32 = 90;

/// Default end of the run, in simulated time
///
/// ```
/// # use trafficsim_core::defaults::*;
/// assert_eq!(DEFAULT_HORIZON.as_secs(), 10);
/// ```
pub const DEFAULT_HORIZON: Duration = Duration::from_secs(10);

/// Default instant at which the traffic sources start
pub const DEFAULT_START: Duration = Duration::from_secs(1);

/// Default send rate λ of a traffic source, in packets per time unit
///
/// ```
/// # use trafficsim_core::defaults::*;
/// // one packet every 10ms on average
/// assert_eq!(
///     DEFAULT_TIME_UNIT.mul_f64(1.0 / DEFAULT_RATE),
///     std::time::Duration::from_millis(10),
/// );
/// ```
pub const DEFAULT_RATE: f64 = 100.0;

/// Default length of the time unit the sampled intervals are expressed in
pub const DEFAULT_TIME_UNIT: Duration = Duration::from_secs(1);

/// Default size of a generated packet, in bytes
pub const DEFAULT_PACKET_SIZE: u64 = 1_500;

/// Default capacity of a host's transmit queue, in packets
///
/// A packet arriving on a full queue is dropped.
pub const DEFAULT_QUEUE_CAPACITY: u64 = 50;

/// Default data rate of the shared bus
///
/// ```
/// # use trafficsim_core::defaults::*;
/// assert_eq!(DEFAULT_DATA_RATE.to_string(), "100mbps");
/// ```
pub const DEFAULT_DATA_RATE: DataRate = DataRate::from_mbps(100);

/// Default propagation delay of the shared bus
///
/// ```
/// # use trafficsim_core::defaults::*;
/// assert_eq!(DEFAULT_PROPAGATION_DELAY.as_nanos(), 300);
/// ```
pub const DEFAULT_PROPAGATION_DELAY: Duration = Duration::from_nanos(300);

/// Default backoff slot: a deferred transmission waits a whole number of
/// slots before sensing the medium again
pub const DEFAULT_BACKOFF_SLOT: Duration = Duration::from_micros(1);

/// Default ceiling on the backoff exponent
pub const DEFAULT_BACKOFF_CEILING: u32 = 10;

/// Default number of deferrals after which the head of line packet is
/// dropped
pub const DEFAULT_MAX_BACKOFF_RETRIES: u32 = 1_000;

/// Default base seed, the sampler of the source `i` is seeded with
/// `DEFAULT_SEED + i`
pub const DEFAULT_SEED: u64 = 0;
