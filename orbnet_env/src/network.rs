//! Command surface of the external network simulator.

use crate::error::EnvError;
use crate::types::{InterfaceId, InterfaceMapping, InterfaceStatus, NodeId};
use serde::{Deserialize, Serialize};

/// Abstraction over the packet-level network simulator.
///
/// # Implementations
///
/// - **In-memory**: full-mesh point-to-point bookkeeping (`orbnet_sim`)
/// - **External**: adapters onto a packet-level discrete-event engine
///
/// # Execution Model
///
/// Every method is called from inside the simulator's own single-threaded
/// event-processing step, so implementations must return promptly and must
/// not block on I/O.
///
/// ```text
/// Update Loop                 NetworkSimulator
///   |-- set_interface_state ---->|
///   |-- set_link_delay --------->|
///   |-- set_link_error_rate ---->|
///   |-- request_routing_recompute|
/// ```
pub trait NetworkSimulator {
    /// Brings an interface up or down.
    fn set_interface_state(&mut self, node: NodeId, interface: InterfaceId, up: bool) -> Result<(), EnvError>;

    /// Sets the one-way propagation delay of the channel behind an interface.
    fn set_link_delay(&mut self, node: NodeId, interface: InterfaceId, seconds: f64) -> Result<(), EnvError>;

    /// Sets the receive error rate (probability in [0, 1]) of an interface.
    fn set_link_error_rate(&mut self, node: NodeId, interface: InterfaceId, rate: f64) -> Result<(), EnvError>;

    /// Asks the simulator to rebuild global routing state.
    ///
    /// Called once per tick, after every interface change has been applied.
    fn request_routing_recompute(&mut self);

    /// Returns the interface on `node` whose channel leads to `peer`.
    ///
    /// The mapping is fixed when the topology is created.
    fn interface_index_for(&self, node: NodeId, peer: NodeId) -> Result<InterfaceId, EnvError>;

    /// Returns the peer reached through `interface` on `node`.
    fn peer_of(&self, node: NodeId, interface: InterfaceId) -> Result<NodeId, EnvError>;

    /// Lists the device interfaces of a node (loopback excluded).
    fn device_interfaces(&self, node: NodeId) -> Result<Vec<InterfaceId>, EnvError>;

    /// Returns the currently committed state of an interface.
    fn interface_status(&self, node: NodeId, interface: InterfaceId) -> Result<InterfaceStatus, EnvError>;

    /// Lists every node known to the simulator, in ascending order.
    fn nodes(&self) -> Vec<NodeId>;

    /// Builds the node ↔ interface ↔ peer table for post-processing.
    fn interface_table(&self) -> Result<Vec<InterfaceMapping>, EnvError> {
        let mut rows = Vec::new();
        for node in self.nodes() {
            for interface in self.device_interfaces(node)? {
                rows.push(InterfaceMapping {
                    node,
                    interface,
                    peer: self.peer_of(node, interface)?,
                });
            }
        }
        Ok(rows)
    }
}

/// Kinds of command issued to a [`NetworkSimulator`], for accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    InterfaceUp,
    InterfaceDown,
    SetDelay,
    SetErrorRate,
    RoutingRecompute,
}

impl CommandKind {
    /// All command kinds in a stable order.
    pub fn all() -> [CommandKind; 5] {
        [
            CommandKind::InterfaceUp,
            CommandKind::InterfaceDown,
            CommandKind::SetDelay,
            CommandKind::SetErrorRate,
            CommandKind::RoutingRecompute,
        ]
    }

    /// Returns the command name.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::InterfaceUp => "interface_up",
            CommandKind::InterfaceDown => "interface_down",
            CommandKind::SetDelay => "set_delay",
            CommandKind::SetErrorRate => "set_error_rate",
            CommandKind::RoutingRecompute => "routing_recompute",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two nodes joined by a single channel.
    struct PairStub {
        status: [InterfaceStatus; 2],
    }

    impl PairStub {
        fn slot(&self, node: NodeId, interface: InterfaceId) -> Result<usize, EnvError> {
            if node.0 > 1 {
                return Err(EnvError::UnknownNode(node));
            }
            if interface != InterfaceId(1) {
                return Err(EnvError::UnknownInterface { node, interface });
            }
            Ok(node.0 as usize)
        }
    }

    impl NetworkSimulator for PairStub {
        fn set_interface_state(&mut self, node: NodeId, interface: InterfaceId, up: bool) -> Result<(), EnvError> {
            let slot = self.slot(node, interface)?;
            self.status[slot].up = up;
            Ok(())
        }

        fn set_link_delay(&mut self, node: NodeId, interface: InterfaceId, seconds: f64) -> Result<(), EnvError> {
            let slot = self.slot(node, interface)?;
            self.status[slot].delay_secs = seconds;
            Ok(())
        }

        fn set_link_error_rate(&mut self, node: NodeId, interface: InterfaceId, rate: f64) -> Result<(), EnvError> {
            let slot = self.slot(node, interface)?;
            self.status[slot].error_rate = rate;
            Ok(())
        }

        fn request_routing_recompute(&mut self) {}

        fn interface_index_for(&self, node: NodeId, peer: NodeId) -> Result<InterfaceId, EnvError> {
            if node.0 <= 1 && peer.0 <= 1 && node != peer {
                Ok(InterfaceId(1))
            } else {
                Err(EnvError::NoRouteToPeer { node, peer })
            }
        }

        fn peer_of(&self, node: NodeId, interface: InterfaceId) -> Result<NodeId, EnvError> {
            let slot = self.slot(node, interface)?;
            Ok(NodeId(1 - slot as u32))
        }

        fn device_interfaces(&self, node: NodeId) -> Result<Vec<InterfaceId>, EnvError> {
            self.slot(node, InterfaceId(1))?;
            Ok(vec![InterfaceId(1)])
        }

        fn interface_status(&self, node: NodeId, interface: InterfaceId) -> Result<InterfaceStatus, EnvError> {
            Ok(self.status[self.slot(node, interface)?])
        }

        fn nodes(&self) -> Vec<NodeId> {
            vec![NodeId(0), NodeId(1)]
        }
    }

    #[test]
    fn test_default_interface_table() {
        let stub = PairStub {
            status: [InterfaceStatus::initial(); 2],
        };
        let table = stub.interface_table().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].node, NodeId(0));
        assert_eq!(table[0].peer, NodeId(1));
        assert_eq!(table[1].node, NodeId(1));
        assert_eq!(table[1].peer, NodeId(0));
    }

    #[test]
    fn test_commands_reach_stub() {
        let mut stub = PairStub {
            status: [InterfaceStatus::initial(); 2],
        };
        stub.set_interface_state(NodeId(0), InterfaceId(1), false).unwrap();
        assert!(!stub.interface_status(NodeId(0), InterfaceId(1)).unwrap().up);

        let err = stub.set_link_delay(NodeId(9), InterfaceId(1), 1.0).unwrap_err();
        assert_eq!(err, EnvError::UnknownNode(NodeId(9)));
    }

    #[test]
    fn test_command_kind_names() {
        let names: Vec<&str> = CommandKind::all().iter().map(|k| k.name()).collect();
        assert_eq!(
            names,
            vec!["interface_up", "interface_down", "set_delay", "set_error_rate", "routing_recompute"]
        );
    }
}
