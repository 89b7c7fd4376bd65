use crate::id::NodeId;
use anyhow::{Result, bail};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// a generator for monotonicaly increasing **unique** [`PacketId`]
///
/// Clones share the same counter so every source of a simulation can
/// hold its own handle.
#[derive(Debug, Clone)]
pub struct PacketIdGenerator(Arc<AtomicU64>);

/// # [`Packet`] Identifier
///
/// During the lifetime of the simulation, this identifier can uniquely
/// identify the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketId(u64);

/// # A generated packet
///
/// The payload itself is never materialised: only its size matters to
/// the medium. A packet carries the sending host, the destination, the
/// per-source sequence number and the size in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: PacketId,
    from: NodeId,
    to: NodeId,
    sequence: u64,
    bytes_size: u64,
}

pub struct PacketBuilder<'a> {
    generator: &'a PacketIdGenerator,
    from: Option<NodeId>,
    to: Option<NodeId>,
    sequence: u64,
    bytes_size: Option<u64>,
}

impl PacketIdGenerator {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU64::new(1)))
    }

    /// generate a new unique identifier
    pub fn generate(&self) -> PacketId {
        let id = self.0.fetch_add(1, Ordering::SeqCst);

        debug_assert!(
            id != 0,
            "The only case this can be equal to 0 is if the generator overflowed. If this \
            happens it means we have generated `u64::MAX` unique packet identifier and we \
            wrapped around on overflow. This shouldn't happen!"
        );

        PacketId(id)
    }
}

impl Default for PacketIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PacketBuilder<'a> {
    pub fn new(generator: &'a PacketIdGenerator) -> Self {
        Self {
            generator,
            from: None,
            to: None,
            sequence: 0,
            bytes_size: None,
        }
    }

    pub fn from(mut self, from: NodeId) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: NodeId) -> Self {
        self.to = Some(to);
        self
    }

    pub fn sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn bytes_size(mut self, bytes_size: u64) -> Self {
        self.bytes_size = Some(bytes_size);
        self
    }

    pub fn build(self) -> Result<Packet> {
        let Some(from) = self.from else {
            bail!("Missing sender information (`from')")
        };
        let Some(to) = self.to else {
            bail!("Missing recipient information (`to')")
        };
        let Some(bytes_size) = self.bytes_size else {
            bail!("Missing packet size (`bytes_size')")
        };

        Ok(Packet {
            id: self.generator.generate(),
            from,
            to,
            sequence: self.sequence,
            bytes_size,
        })
    }
}

impl Packet {
    pub fn builder(generator: &PacketIdGenerator) -> PacketBuilder<'_> {
        PacketBuilder::new(generator)
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn from(&self) -> NodeId {
        self.from
    }

    pub fn to(&self) -> NodeId {
        self.to
    }

    /// position of this packet in the sending source's stream, from `0`
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn bytes_size(&self) -> u64 {
        self.bytes_size
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_id_display() {
        assert_eq!(PacketId(0).to_string(), "0x0000000000000000");
        assert_eq!(PacketId(255).to_string(), "0x00000000000000ff");
    }

    #[test]
    fn generator_is_shared_between_clones() {
        let generator = PacketIdGenerator::new();
        let other = generator.clone();

        assert_eq!(generator.generate(), PacketId(1));
        assert_eq!(other.generate(), PacketId(2));
        assert_eq!(generator.generate(), PacketId(3));
    }

    #[test]
    fn builder_missing_from() {
        let Err(error) = Packet::builder(&PacketIdGenerator::new()).build() else {
            panic!("Expecting an error because missing the `from'")
        };

        assert_eq!(error.to_string(), "Missing sender information (`from')");
    }

    #[test]
    fn builder_missing_to() {
        let Err(error) = Packet::builder(&PacketIdGenerator::new())
            .from(NodeId::ZERO)
            .build()
        else {
            panic!("Expecting an error because missing the `to'")
        };

        assert_eq!(error.to_string(), "Missing recipient information (`to')");
    }

    #[test]
    fn builder_missing_size() {
        let Err(error) = Packet::builder(&PacketIdGenerator::new())
            .from(NodeId::ZERO)
            .to(NodeId::ONE)
            .build()
        else {
            panic!("Expecting an error because missing the `bytes_size'")
        };

        assert_eq!(error.to_string(), "Missing packet size (`bytes_size')");
    }

    #[test]
    fn builder() {
        let packet = Packet::builder(&PacketIdGenerator::new())
            .from(NodeId::ZERO)
            .to(NodeId::ONE)
            .sequence(4)
            .bytes_size(1_500)
            .build()
            .expect("all the fields are set");

        assert_eq!(packet.from(), NodeId::ZERO);
        assert_eq!(packet.to(), NodeId::ONE);
        assert_eq!(packet.sequence(), 4);
        assert_eq!(packet.bytes_size(), 1_500);
    }
}
