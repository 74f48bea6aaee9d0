//! Error types for the OrbNet environment abstraction.

use crate::types::{InterfaceId, NodeId};
use thiserror::Error;

/// Errors a network simulator may report back for a command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    /// The node does not exist in the simulator
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// The node exists but has no such interface
    #[error("Unknown interface {interface} on node {node}")]
    UnknownInterface { node: NodeId, interface: InterfaceId },

    /// No interface on `node` leads to `peer`
    #[error("No interface on node {node} leads to peer {peer}")]
    NoRouteToPeer { node: NodeId, peer: NodeId },

    /// The simulator refused the command (e.g., invalid value)
    #[error("Command rejected: {0}")]
    CommandRejected(String),
}

impl EnvError {
    /// Creates a rejected-command error.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::CommandRejected(msg.into())
    }
}
