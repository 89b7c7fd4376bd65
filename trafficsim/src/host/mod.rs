//! The reference host: a single shared bus, one drop-tail transmit
//! queue per host and a packet sink.
//!
//! The link layer decides drops (queue overflow, too many deferrals)
//! and backoffs (medium sensed busy) and reports them through the
//! [`LinkObserver`](trafficsim_core::LinkObserver) of the run.

mod medium;
mod sink;
mod station;

pub use self::{
    medium::{Backoff, SharedMedium},
    sink::PacketSink,
    station::{DropTailQueue, Station, StationChannel, StationState},
};
