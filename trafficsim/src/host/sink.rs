use trafficsim_core::{NodeId, Packet};

/// The host every source sends to. It only counts what it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketSink {
    id: NodeId,
    packets: u64,
    bytes: u64,
}

impl PacketSink {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            packets: 0,
            bytes: 0,
        }
    }

    /// Receive a frame off the medium. Frames addressed to another host
    /// are ignored, returns `true` if the packet was accepted.
    pub fn receive(&mut self, packet: &Packet) -> bool {
        if packet.to() != self.id {
            return false;
        }

        self.packets += 1;
        self.bytes += packet.bytes_size();
        tracing::trace!(sink = %self.id.label(), packet = %packet.id(), from = %packet.from(), "packet received");
        true
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trafficsim_core::PacketIdGenerator;

    #[test]
    fn counts_own_packets() {
        let ids = PacketIdGenerator::new();
        let mut sink = PacketSink::new(NodeId::new(2));

        let mine = Packet::builder(&ids)
            .from(NodeId::ZERO)
            .to(NodeId::new(2))
            .bytes_size(1_500)
            .build()
            .unwrap();
        let other = Packet::builder(&ids)
            .from(NodeId::ZERO)
            .to(NodeId::ONE)
            .bytes_size(1_500)
            .build()
            .unwrap();

        assert!(sink.receive(&mine));
        assert!(!sink.receive(&other));
        assert_eq!(sink.packets(), 1);
        assert_eq!(sink.bytes(), 1_500);
    }
}
