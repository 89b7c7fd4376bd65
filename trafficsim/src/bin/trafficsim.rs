use anyhow::Result;
use clap::Parser;
use trafficsim::{
    DataRate, SimConfig, SimTime, Simulation,
    defaults::{
        DEFAULT_BACKOFF_CEILING, DEFAULT_BACKOFF_SLOT, DEFAULT_DATA_RATE, DEFAULT_HORIZON,
        DEFAULT_MAX_BACKOFF_RETRIES, DEFAULT_NODES, DEFAULT_PACKET_SIZE,
        DEFAULT_PROPAGATION_DELAY, DEFAULT_QUEUE_CAPACITY, DEFAULT_RATE, DEFAULT_SEED,
        DEFAULT_START, DEFAULT_TIME_UNIT,
    },
};
use tracing_subscriber::EnvFilter;

/// Poisson traffic from every host to one sink over a shared bus
#[derive(Parser)]
#[command(version, about)]
struct Command {
    /// hosts on the bus, the last one is the sink
    #[arg(long, default_value_t = DEFAULT_NODES)]
    nodes: u32,

    /// end of the run in simulated time
    #[arg(long, default_value_t = SimTime::from_duration(DEFAULT_HORIZON))]
    horizon: SimTime,

    /// instant the sources start at
    #[arg(long, default_value_t = SimTime::from_duration(DEFAULT_START))]
    start: SimTime,

    /// instant the sources stop at (defaults to the horizon)
    #[arg(long)]
    stop: Option<SimTime>,

    /// packets per time unit sent by every source
    #[arg(long, default_value_t = DEFAULT_RATE)]
    rate: f64,

    #[arg(long, default_value_t = SimTime::from_duration(DEFAULT_TIME_UNIT))]
    time_unit: SimTime,

    /// in bytes
    #[arg(long, default_value_t = DEFAULT_PACKET_SIZE)]
    packet_size: u64,

    /// transmit queue capacity, in packets
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: u64,

    #[arg(long, default_value_t = DEFAULT_DATA_RATE)]
    data_rate: DataRate,

    /// propagation delay of the bus
    #[arg(long, default_value_t = SimTime::from_duration(DEFAULT_PROPAGATION_DELAY))]
    delay: SimTime,

    #[arg(long, default_value_t = SimTime::from_duration(DEFAULT_BACKOFF_SLOT))]
    backoff_slot: SimTime,

    #[arg(long, default_value_t = DEFAULT_BACKOFF_CEILING)]
    backoff_ceiling: u32,

    #[arg(long, default_value_t = DEFAULT_MAX_BACKOFF_RETRIES)]
    max_backoff_retries: u32,

    /// source `i` samples its intervals with the seed `seed + i`
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,trafficsim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Command::parse().into_config();

    let report = Simulation::new(config)?.run()?;
    println!("{report}");

    Ok(())
}

impl Command {
    fn into_config(self) -> SimConfig {
        SimConfig {
            nodes: self.nodes,
            horizon: self.horizon.elapsed(),
            start: self.start.elapsed(),
            stop: self.stop.map(SimTime::elapsed),
            rate: self.rate,
            time_unit: self.time_unit.elapsed(),
            packet_size: self.packet_size,
            seed: self.seed,
            queue_capacity: self.queue_capacity,
            data_rate: self.data_rate,
            propagation_delay: self.delay.elapsed(),
            backoff_slot: self.backoff_slot.elapsed(),
            backoff_ceiling: self.backoff_ceiling,
            max_backoff_retries: self.max_backoff_retries,
        }
    }
}
