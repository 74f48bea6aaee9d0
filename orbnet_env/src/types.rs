//! Common types for the OrbNet environment abstraction.

use serde::{Deserialize, Serialize};

/// Unique identifier for a simulated node.
///
/// Every body in a registry maps to exactly one node with the same
/// numeric id, so the id doubles as the body id throughout the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Returns the raw numeric id.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a network interface on a node.
///
/// Interface 0 is the loopback; point-to-point devices start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceId(pub u32);

/// The loopback interface present on every node.
pub const LOOPBACK_INTERFACE: InterfaceId = InterfaceId(0);

impl InterfaceId {
    /// True for the loopback interface.
    pub fn is_loopback(&self) -> bool {
        *self == LOOPBACK_INTERFACE
    }
}

impl std::fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// Committed state of one interface as seen by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterfaceStatus {
    /// Interface is administratively up
    pub up: bool,

    /// One-way channel delay in seconds
    pub delay_secs: f64,

    /// Receive error rate in [0, 1]
    pub error_rate: f64,
}

impl InterfaceStatus {
    /// A freshly created interface: up, zero delay, no errors.
    pub fn initial() -> Self {
        Self {
            up: true,
            delay_secs: 0.0,
            error_rate: 0.0,
        }
    }

    /// True if this status already equals "up with these parameters".
    pub fn matches_up(&self, delay_secs: f64, error_rate: f64) -> bool {
        self.up && self.delay_secs == delay_secs && self.error_rate == error_rate
    }
}

impl Default for InterfaceStatus {
    fn default() -> Self {
        Self::initial()
    }
}

/// One row of the node ↔ interface ↔ peer table.
///
/// Established once when the topology is created and handed to the
/// trace post-processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceMapping {
    pub node: NodeId,
    pub interface: InterfaceId,
    pub peer: NodeId,
}
