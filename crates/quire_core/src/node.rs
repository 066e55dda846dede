//! Layout node identity
//!
//! Nodes are owned by the host's layout tree. The text layer only stores
//! which node a piece of text is attached to and reads per-node geometry
//! that the host passes in on every update.

/// Index of a layout node in the host's per-node geometry arrays
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Position of this node in per-node arrays
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for NodeId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}
