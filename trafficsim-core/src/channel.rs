use crate::{id::NodeId, packet::Packet};
use thiserror::Error;

/// Outbound channel of a traffic source (a datagram socket in spirit).
///
/// The host simulation provides the implementation; the source owns its
/// channel exclusively. The lifecycle is `bind` → `connect` → `send`* →
/// `close`. [`Channel::send`] is fire-and-forget: a successful return
/// only means the packet was handed to the link layer, not that it
/// will be delivered. Discards happening later are reported through
/// the [`LinkObserver`].
///
/// [`LinkObserver`]: crate::counters::LinkObserver
pub trait Channel {
    fn bind(&mut self) -> Result<(), ChannelError>;

    fn connect(&mut self, destination: NodeId) -> Result<(), ChannelError>;

    fn send(&mut self, packet: Packet) -> Result<(), ChannelError>;

    /// release the channel, subsequent sends fail with [`ChannelError::Closed`]
    fn close(&mut self);

    /// `true` once connected and until closed
    fn is_open(&self) -> bool;
}

/// Error returned by a [`Channel`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The channel was used before [`Channel::bind`].
    #[error("channel is not bound")]
    Unbound,
    /// The channel was bound but no destination was set.
    #[error("channel is not connected to a destination")]
    NotConnected,
    /// The channel was used after [`Channel::close`].
    #[error("channel is closed")]
    Closed,
    /// The link layer refused the packet.
    #[error("packet refused: {reason}")]
    Refused { reason: String },
}

impl ChannelError {
    /// `true` when the error denotes a channel that cannot be used at all
    /// (as opposed to a single refused packet).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unbound | Self::NotConnected | Self::Closed)
    }
}
