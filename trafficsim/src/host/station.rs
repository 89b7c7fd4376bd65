use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use trafficsim_core::{
    Channel, ChannelError, DepthGauge, LinkObserver, NodeId, Packet, QueueDepth,
};

/// Bounded FIFO transmit queue of a host.
///
/// A packet arriving on a full queue is discarded and reported to the
/// [`LinkObserver`]. The occupancy is tracked by a [`DepthGauge`] so the
/// queue can be observed through [`QueueDepth`].
pub struct DropTailQueue {
    host: NodeId,
    packets: Mutex<VecDeque<Packet>>,
    gauge: DepthGauge,
    observer: Arc<dyn LinkObserver>,
}

impl DropTailQueue {
    pub fn new(host: NodeId, capacity: u64, observer: Arc<dyn LinkObserver>) -> Self {
        Self {
            host,
            packets: Mutex::new(VecDeque::new()),
            gauge: DepthGauge::with_capacity(capacity),
            observer,
        }
    }

    fn packets(&self) -> MutexGuard<'_, VecDeque<Packet>> {
        self.packets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `packet`, returns `false` if it was dropped.
    pub fn enqueue(&self, packet: Packet) -> bool {
        if self.gauge.reserve(1) == 0 {
            tracing::trace!(host = %self.host, packet = %packet.id(), "transmit queue full");
            self.observer.on_drop(packet.from());
            return false;
        }

        self.packets().push_back(packet);
        true
    }

    pub fn dequeue(&self) -> Option<Packet> {
        let packet = self.packets().pop_front()?;
        self.gauge.free(1);
        Some(packet)
    }

    /// Discard the head of line packet, reporting the drop.
    pub fn discard_head(&self) -> Option<Packet> {
        let packet = self.dequeue()?;
        self.observer.on_drop(packet.from());
        Some(packet)
    }

    pub fn head_size(&self) -> Option<u64> {
        self.packets().front().map(Packet::bytes_size)
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.gauge.used_capacity()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.gauge.maximum_capacity()
    }
}

impl QueueDepth for DropTailQueue {
    fn current_depth(&self) -> u64 {
        self.len()
    }
}

/// [`Channel`] of a traffic source, feeding its host's [`DropTailQueue`].
pub struct StationChannel {
    host: NodeId,
    queue: Arc<DropTailQueue>,
    bound: bool,
    destination: Option<NodeId>,
    closed: bool,
}

impl StationChannel {
    pub fn new(host: NodeId, queue: Arc<DropTailQueue>) -> Self {
        Self {
            host,
            queue,
            bound: false,
            destination: None,
            closed: false,
        }
    }
}

impl Channel for StationChannel {
    fn bind(&mut self) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        self.bound = true;
        Ok(())
    }

    fn connect(&mut self, destination: NodeId) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        if !self.bound {
            return Err(ChannelError::Unbound);
        }
        if destination == self.host {
            return Err(ChannelError::Refused {
                reason: format!("{} cannot send to itself", self.host.label()),
            });
        }

        self.destination = Some(destination);
        Ok(())
    }

    fn send(&mut self, packet: Packet) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        if !self.bound {
            return Err(ChannelError::Unbound);
        }
        let Some(destination) = self.destination else {
            return Err(ChannelError::NotConnected);
        };
        if packet.to() != destination {
            return Err(ChannelError::Refused {
                reason: format!("packet addressed to {}, connected to {destination}", packet.to()),
            });
        }

        // a full queue drops the packet, the send itself still succeeded
        self.queue.enqueue(packet);
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_open(&self) -> bool {
        self.bound && self.destination.is_some() && !self.closed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationState {
    /// nothing to transmit, or waiting to be woken up
    Idle,
    /// a transmit attempt is scheduled
    Contending,
    /// a frame of this host is on the medium
    Transmitting,
}

/// Link layer state of a host: its transmit queue and the contention
/// state of the head of line packet.
pub struct Station {
    id: NodeId,
    queue: Arc<DropTailQueue>,
    state: StationState,
    retries: u32,
}

impl Station {
    pub fn new(id: NodeId, queue: Arc<DropTailQueue>) -> Self {
        Self {
            id,
            queue,
            state: StationState::Idle,
            retries: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn queue(&self) -> &Arc<DropTailQueue> {
        &self.queue
    }

    #[inline]
    pub fn state(&self) -> StationState {
        self.state
    }

    pub fn set_state(&mut self, state: StationState) {
        self.state = state;
    }

    /// `true` if the station has packets and nothing scheduled to send them
    pub fn needs_wake_up(&self) -> bool {
        self.state == StationState::Idle && !self.queue.is_empty()
    }

    /// one more deferral of the head of line packet, returns the count
    pub fn defer(&mut self) -> u32 {
        self.retries = self.retries.saturating_add(1);
        self.retries
    }

    /// the head of line packet left the queue
    pub fn reset_retries(&mut self) {
        self.retries = 0;
    }
}
