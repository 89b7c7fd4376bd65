//! The traffic generation application.
//!
//! A [`TrafficSource`] emits fixed-size packets to a single destination
//! at exponentially distributed intervals. It never runs on its own: the
//! host's discrete-event clock calls [`TrafficSource::start`],
//! [`TrafficSource::on_send_due`] and [`TrafficSource::stop`], and the
//! source asks the clock (through the [`Timer`] trait) to wake it up for
//! the next send.
//!
//! ```text
//!          start()               stop()
//!   Idle ──────────► Active ──────────────► Stopped
//!     │               │  ▲                    ▲
//!     │               └──┘ on_send_due()      │
//!     └───────────────────────────────────────┘
//!                      stop()
//! ```

use crate::{
    channel::{Channel, ChannelError},
    counters::EventCounters,
    id::NodeId,
    packet::{Packet, PacketIdGenerator},
    queue::QueueDepth,
    sampler::IntervalSampler,
    scheduler::{EventId, Scheduler},
    time::SimTime,
};
use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;

/// The event a [`TrafficSource`] schedules for itself: time to send the
/// next packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SendDue {
    pub source: NodeId,
}

/// The part of the discrete-event clock a [`TrafficSource`] relies on.
pub trait Timer {
    fn now(&self) -> SimTime;

    /// wake `source` up with a [`SendDue`] `delay` after now
    fn schedule_send(&mut self, source: NodeId, delay: Duration) -> EventId;

    /// cancel a wake-up, `false` if it already fired or was cancelled
    fn cancel(&mut self, event: EventId) -> bool;
}

impl<E> Timer for Scheduler<E>
where
    E: From<SendDue>,
{
    fn now(&self) -> SimTime {
        Scheduler::now(self)
    }

    fn schedule_send(&mut self, source: NodeId, delay: Duration) -> EventId {
        self.schedule_in(delay, E::from(SendDue { source }))
    }

    fn cancel(&mut self, event: EventId) -> bool {
        Scheduler::cancel(self, event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceState {
    /// created and bound to its channel handle, not started yet
    Idle,
    /// sending packets
    Active,
    /// terminal
    Stopped,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Host {node} is not tracked by the event counters ({slots} slots)")]
    UnknownSource { node: NodeId, slots: usize },
    #[error("Host {node} is missing its {field}")]
    Incomplete { node: NodeId, field: &'static str },
    #[error("Host {node} is already active")]
    AlreadyStarted { node: NodeId },
    #[error("Host {node} failed to open its channel")]
    ChannelSetup {
        node: NodeId,
        #[source]
        error: ChannelError,
    },
    /// A send was attempted on a channel that is not bound or already
    /// closed. This is a lifecycle ordering bug of the host.
    #[error("Host {node} sent on an unavailable channel")]
    ChannelUnavailable {
        node: NodeId,
        #[source]
        error: ChannelError,
    },
    #[error("Host {node} failed to build a packet: {reason}")]
    Packet { node: NodeId, reason: String },
}

/// A traffic generating application attached to one host.
///
/// Owns its [`IntervalSampler`] and its [`Channel`]; shares the
/// queue-depth observable of its link segment and the run's
/// [`EventCounters`].
pub struct TrafficSource<C> {
    id: NodeId,
    label: String,
    destination: NodeId,
    packet_size: u64,
    time_unit: Duration,

    state: SourceState,
    packets_sent: u64,
    sequence: u64,
    send_event: Option<EventId>,

    channel: C,
    sampler: IntervalSampler,
    queue: Arc<dyn QueueDepth>,
    counters: Arc<EventCounters>,
    packet_ids: PacketIdGenerator,
}

/// Builder for a [`TrafficSource`], see [`TrafficSource::builder`].
pub struct TrafficSourceBuilder<C> {
    id: NodeId,
    destination: Option<NodeId>,
    packet_size: u64,
    time_unit: Duration,
    channel: Option<C>,
    sampler: Option<IntervalSampler>,
    queue: Option<Arc<dyn QueueDepth>>,
    counters: Option<Arc<EventCounters>>,
    packet_ids: Option<PacketIdGenerator>,
}

impl<C> TrafficSourceBuilder<C>
where
    C: Channel,
{
    pub fn destination(mut self, destination: NodeId) -> Self {
        self.destination = Some(destination);
        self
    }

    /// size in bytes of every packet, defaults to
    /// [`DEFAULT_PACKET_SIZE`](crate::defaults::DEFAULT_PACKET_SIZE)
    pub fn packet_size(mut self, packet_size: u64) -> Self {
        self.packet_size = packet_size;
        self
    }

    /// length of one sampler time unit, defaults to
    /// [`DEFAULT_TIME_UNIT`](crate::defaults::DEFAULT_TIME_UNIT)
    pub fn time_unit(mut self, time_unit: Duration) -> Self {
        self.time_unit = time_unit;
        self
    }

    pub fn channel(mut self, channel: C) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn sampler(mut self, sampler: IntervalSampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn queue(mut self, queue: Arc<dyn QueueDepth>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn counters(mut self, counters: Arc<EventCounters>) -> Self {
        self.counters = Some(counters);
        self
    }

    /// share a packet id generator between sources, a fresh one is
    /// used otherwise
    pub fn packet_ids(mut self, packet_ids: PacketIdGenerator) -> Self {
        self.packet_ids = Some(packet_ids);
        self
    }

    pub fn build(self) -> Result<TrafficSource<C>, SourceError> {
        let node = self.id;
        let missing = |field| SourceError::Incomplete { node, field };

        let destination = self.destination.ok_or_else(|| missing("destination"))?;
        let channel = self.channel.ok_or_else(|| missing("channel"))?;
        let sampler = self.sampler.ok_or_else(|| missing("sampler"))?;
        let queue = self.queue.ok_or_else(|| missing("queue"))?;
        let counters = self.counters.ok_or_else(|| missing("counters"))?;

        if !counters.tracks(node) {
            return Err(SourceError::UnknownSource {
                node,
                slots: counters.sources(),
            });
        }

        Ok(TrafficSource {
            id: node,
            label: node.label(),
            destination,
            packet_size: self.packet_size,
            time_unit: self.time_unit,
            state: SourceState::Idle,
            packets_sent: 0,
            sequence: 0,
            send_event: None,
            channel,
            sampler,
            queue,
            counters,
            packet_ids: self.packet_ids.unwrap_or_default(),
        })
    }
}

impl<C> TrafficSource<C>
where
    C: Channel,
{
    pub fn builder(id: NodeId) -> TrafficSourceBuilder<C> {
        TrafficSourceBuilder {
            id,
            destination: None,
            packet_size: crate::defaults::DEFAULT_PACKET_SIZE,
            time_unit: crate::defaults::DEFAULT_TIME_UNIT,
            channel: None,
            sampler: None,
            queue: None,
            counters: None,
            packet_ids: None,
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn state(&self) -> SourceState {
        self.state
    }

    /// packets handed to the channel since the last start
    #[inline]
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    /// the wake-up currently scheduled, if any
    #[inline]
    pub fn pending_event(&self) -> Option<EventId> {
        self.send_event
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Activate the source: open the channel to the destination and send
    /// the first packet right away.
    ///
    /// Starting a stopped source does nothing, the state is terminal.
    pub fn start<T>(&mut self, timer: &mut T) -> Result<(), SourceError>
    where
        T: Timer + ?Sized,
    {
        match self.state {
            SourceState::Idle => (),
            SourceState::Active => return Err(SourceError::AlreadyStarted { node: self.id }),
            SourceState::Stopped => {
                tracing::debug!(source = %self.label, "start ignored, source already stopped");
                return Ok(());
            }
        }

        let node = self.id;
        self.channel
            .bind()
            .and_then(|()| self.channel.connect(self.destination))
            .map_err(|error| SourceError::ChannelSetup { node, error })?;

        self.packets_sent = 0;
        self.state = SourceState::Active;
        self.send_event = Some(timer.schedule_send(self.id, Duration::ZERO));

        tracing::debug!(
            source = %self.label,
            destination = %self.destination,
            at = %timer.now(),
            "source started"
        );

        Ok(())
    }

    /// Handle a send-due wake-up: send one packet, sample the queue and
    /// schedule the next wake-up.
    ///
    /// A wake-up that is not the one currently pending, or that arrives
    /// while the source is not active, is ignored.
    pub fn on_send_due<T>(&mut self, event: EventId, timer: &mut T) -> Result<(), SourceError>
    where
        T: Timer + ?Sized,
    {
        if self.state != SourceState::Active || self.send_event != Some(event) {
            tracing::debug!(
                source = %self.label,
                %event,
                state = ?self.state,
                "stale send-due event ignored"
            );
            return Ok(());
        }
        self.send_event = None;

        let node = self.id;
        let packet = Packet::builder(&self.packet_ids)
            .from(node)
            .to(self.destination)
            .sequence(self.sequence)
            .bytes_size(self.packet_size)
            .build()
            .map_err(|error| SourceError::Packet {
                node,
                reason: error.to_string(),
            })?;
        self.sequence += 1;

        let id = packet.id();
        let sent = match self.channel.send(packet) {
            Ok(()) => {
                self.packets_sent += 1;
                self.counters.record_sent(node);
                tracing::trace!(source = %self.label, packet = %id, at = %timer.now(), "packet sent");
                true
            }
            Err(error) if error.is_unavailable() => {
                return Err(SourceError::ChannelUnavailable { node, error });
            }
            Err(error) => {
                tracing::warn!(source = %self.label, packet = %id, %error, "packet not sent");
                false
            }
        };

        self.schedule_next(sent, timer);

        Ok(())
    }

    /// Sample the queue after a successful send, then schedule the next
    /// wake-up. A refused packet is not sampled: the per-source sample
    /// count always equals the number of packets sent.
    fn schedule_next<T>(&mut self, sent: bool, timer: &mut T)
    where
        T: Timer + ?Sized,
    {
        if self.state != SourceState::Active {
            return;
        }

        if sent {
            let depth = self.queue.current_depth();
            self.counters.record_queue_sample(self.id, depth);
        }

        let interval = self.sampler.next_interval(self.time_unit);
        self.send_event = Some(timer.schedule_send(self.id, interval));
    }

    /// Deactivate the source: cancel the pending wake-up and close the
    /// channel. Stopping a stopped source does nothing.
    pub fn stop<T>(&mut self, timer: &mut T)
    where
        T: Timer + ?Sized,
    {
        match self.state {
            SourceState::Stopped => return,
            SourceState::Idle => {
                tracing::debug!(source = %self.label, "source stopped before it started");
            }
            SourceState::Active => {
                if let Some(event) = self.send_event.take() {
                    timer.cancel(event);
                }
                self.channel.close();
                tracing::debug!(
                    source = %self.label,
                    packets_sent = self.packets_sent,
                    at = %timer.now(),
                    "source stopped"
                );
            }
        }

        self.state = SourceState::Stopped;
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Active => f.write_str("active"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}
