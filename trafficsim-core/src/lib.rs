pub mod channel;
pub mod counters;
mod data_rate;
pub mod defaults;
mod id;
mod packet;
pub mod queue;
mod sampler;
pub mod scheduler;
pub mod source;
pub mod stats;
pub mod time;

pub use self::{
    channel::{Channel, ChannelError},
    counters::{CountersSnapshot, EventCounters, LinkObserver, SourceSamples},
    data_rate::DataRate,
    id::NodeId,
    packet::{Packet, PacketBuilder, PacketId, PacketIdGenerator},
    queue::{DepthGauge, QueueDepth},
    sampler::{IntervalSampler, RateError},
    scheduler::{EventId, Scheduler},
    source::{SendDue, SourceError, SourceState, Timer, TrafficSource},
    stats::{DivisionUndefined, Statistics},
    time::SimTime,
};
