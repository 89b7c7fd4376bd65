use std::{fmt, num::ParseIntError, str};

/// The identifier of a host attached to the shared medium.
///
/// Hosts are numbered from `0`. In the usual topology the traffic
/// sources use the indices `0..N-1` and the last host is the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
pub struct NodeId(u32);

impl NodeId {
    pub const ZERO: Self = NodeId::new(0);
    pub const ONE: Self = NodeId::new(1);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// the position of the host, to index per-host tables
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn into_u64(self) -> u64 {
        self.0 as u64
    }

    /// the human readable label of the host, e.g. `"Host 3"`
    pub fn label(self) -> String {
        format!("Host {}", self.0)
    }
}

impl str::FromStr for NodeId {
    type Err = ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
