//! In-memory full-mesh point-to-point network.
//!
//! Stands in for the packet-level simulator: it keeps the committed state of
//! every interface, counts the commands it receives and rebuilds shortest-delay
//! routes (A* with a zero heuristic, i.e. Dijkstra) when asked to.

use orbnet_env::{
    CommandKind, EnvError, InterfaceId, InterfaceStatus, NetworkSimulator, NodeId, LOOPBACK_INTERFACE,
};
use petgraph::algo::astar;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Default data rate of every channel (bits per second).
pub const DEFAULT_DATA_RATE_BPS: u64 = 5_000_000;

/// One point-to-point device on a node.
#[derive(Debug, Clone)]
struct Device {
    peer: NodeId,
    status: InterfaceStatus,
}

/// A shortest-delay path between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Nodes visited, source and destination included
    pub hops: Vec<NodeId>,

    /// Sum of one-way channel delays along the path (seconds)
    pub total_delay: f64,
}

impl Route {
    /// The node after the source, if any.
    pub fn next_hop(&self) -> Option<NodeId> {
        self.hops.get(1).copied()
    }

    /// Number of channels traversed.
    pub fn hop_count(&self) -> usize {
        self.hops.len().saturating_sub(1)
    }
}

/// Full mesh of point-to-point channels between a fixed set of nodes.
///
/// Interface 0 on every node is the loopback. Devices are numbered from 1
/// in channel creation order, which walks pairs `(i, j)` with `i < j` in
/// ascending order, so each node's devices end up sorted by peer id.
pub struct PointToPointNetwork {
    /// Devices per node; index `k` is interface `k + 1`
    devices: BTreeMap<NodeId, Vec<Device>>,

    /// Channel data rate (bits per second)
    data_rate_bps: u64,

    /// Commands accepted, by kind
    commands: HashMap<CommandKind, u64>,

    /// Routing table from the last recompute, keyed by (source, destination)
    routes: BTreeMap<(NodeId, NodeId), Route>,

    /// Number of routing recomputes performed
    routing_epoch: u64,
}

impl PointToPointNetwork {
    /// Creates a channel between every unordered pair of `nodes`.
    ///
    /// Duplicate ids are ignored.
    pub fn full_mesh(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        let mut ids: Vec<NodeId> = nodes.into_iter().collect();
        ids.sort();
        ids.dedup();

        let mut devices: BTreeMap<NodeId, Vec<Device>> = ids.iter().map(|id| (*id, Vec::new())).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                for (node, peer) in [(*a, *b), (*b, *a)] {
                    if let Some(list) = devices.get_mut(&node) {
                        list.push(Device {
                            peer,
                            status: InterfaceStatus::initial(),
                        });
                    }
                }
            }
        }

        Self {
            devices,
            data_rate_bps: DEFAULT_DATA_RATE_BPS,
            commands: HashMap::new(),
            routes: BTreeMap::new(),
            routing_epoch: 0,
        }
    }

    /// Sets the channel data rate.
    pub fn with_data_rate(mut self, bps: u64) -> Self {
        self.data_rate_bps = bps;
        self
    }

    /// Channel data rate (bits per second).
    pub fn data_rate_bps(&self) -> u64 {
        self.data_rate_bps
    }

    /// Commands of `kind` accepted so far.
    pub fn command_count(&self, kind: CommandKind) -> u64 {
        self.commands.get(&kind).copied().unwrap_or(0)
    }

    /// All commands accepted so far.
    pub fn total_commands(&self) -> u64 {
        self.commands.values().sum()
    }

    /// Number of routing recomputes performed.
    pub fn routing_epoch(&self) -> u64 {
        self.routing_epoch
    }

    /// Shortest-delay route from the last recompute.
    ///
    /// Returns `None` if the destination was unreachable at that time, or if
    /// routing was never computed.
    pub fn route(&self, from: NodeId, to: NodeId) -> Option<&Route> {
        self.routes.get(&(from, to))
    }

    /// Number of interfaces currently up, loopback excluded.
    pub fn up_interface_count(&self) -> usize {
        self.devices.values().flatten().filter(|d| d.status.up).count()
    }

    fn device(&self, node: NodeId, interface: InterfaceId) -> Result<&Device, EnvError> {
        let list = self.devices.get(&node).ok_or(EnvError::UnknownNode(node))?;
        if interface.is_loopback() {
            return Err(EnvError::UnknownInterface { node, interface });
        }
        list.get(interface.0 as usize - 1)
            .ok_or(EnvError::UnknownInterface { node, interface })
    }

    fn device_mut(&mut self, node: NodeId, interface: InterfaceId) -> Result<&mut Device, EnvError> {
        let list = self.devices.get_mut(&node).ok_or(EnvError::UnknownNode(node))?;
        if interface.is_loopback() {
            return Err(EnvError::UnknownInterface { node, interface });
        }
        list.get_mut(interface.0 as usize - 1)
            .ok_or(EnvError::UnknownInterface { node, interface })
    }

    fn record(&mut self, kind: CommandKind) {
        *self.commands.entry(kind).or_insert(0) += 1;
    }

    /// Directed graph of usable channels (both ends up), weighted by the
    /// sender-side delay.
    fn routing_graph(&self) -> DiGraphMap<NodeId, f64> {
        let mut graph = DiGraphMap::new();
        for node in self.devices.keys() {
            graph.add_node(*node);
        }
        for (node, list) in &self.devices {
            for device in list.iter().filter(|d| d.status.up) {
                let reverse_up = self
                    .devices
                    .get(&device.peer)
                    .and_then(|peer_list| peer_list.iter().find(|p| p.peer == *node))
                    .is_some_and(|p| p.status.up);
                if reverse_up {
                    graph.add_edge(*node, device.peer, device.status.delay_secs);
                }
            }
        }
        graph
    }
}

impl NetworkSimulator for PointToPointNetwork {
    fn set_interface_state(&mut self, node: NodeId, interface: InterfaceId, up: bool) -> Result<(), EnvError> {
        self.device_mut(node, interface)?.status.up = up;
        self.record(if up {
            CommandKind::InterfaceUp
        } else {
            CommandKind::InterfaceDown
        });
        Ok(())
    }

    fn set_link_delay(&mut self, node: NodeId, interface: InterfaceId, seconds: f64) -> Result<(), EnvError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(EnvError::rejected(format!("invalid delay {} s on {} {}", seconds, node, interface)));
        }
        self.device_mut(node, interface)?.status.delay_secs = seconds;
        self.record(CommandKind::SetDelay);
        Ok(())
    }

    fn set_link_error_rate(&mut self, node: NodeId, interface: InterfaceId, rate: f64) -> Result<(), EnvError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(EnvError::rejected(format!("invalid error rate {} on {} {}", rate, node, interface)));
        }
        self.device_mut(node, interface)?.status.error_rate = rate;
        self.record(CommandKind::SetErrorRate);
        Ok(())
    }

    fn request_routing_recompute(&mut self) {
        let graph = self.routing_graph();
        let mut routes = BTreeMap::new();
        for source in self.devices.keys() {
            for destination in self.devices.keys().filter(|d| *d != source) {
                let found = astar(&graph, *source, |n| n == *destination, |e| *e.weight(), |_| 0.0);
                if let Some((total_delay, hops)) = found {
                    routes.insert((*source, *destination), Route { hops, total_delay });
                }
            }
        }
        self.routes = routes;
        self.routing_epoch += 1;
        self.record(CommandKind::RoutingRecompute);
    }

    fn interface_index_for(&self, node: NodeId, peer: NodeId) -> Result<InterfaceId, EnvError> {
        let list = self.devices.get(&node).ok_or(EnvError::UnknownNode(node))?;
        list.iter()
            .position(|d| d.peer == peer)
            .map(|k| InterfaceId(k as u32 + 1))
            .ok_or(EnvError::NoRouteToPeer { node, peer })
    }

    fn peer_of(&self, node: NodeId, interface: InterfaceId) -> Result<NodeId, EnvError> {
        Ok(self.device(node, interface)?.peer)
    }

    fn device_interfaces(&self, node: NodeId) -> Result<Vec<InterfaceId>, EnvError> {
        let list = self.devices.get(&node).ok_or(EnvError::UnknownNode(node))?;
        Ok((1..=list.len() as u32).map(InterfaceId).collect())
    }

    fn interface_status(&self, node: NodeId, interface: InterfaceId) -> Result<InterfaceStatus, EnvError> {
        if interface == LOOPBACK_INTERFACE && self.devices.contains_key(&node) {
            return Ok(InterfaceStatus::initial());
        }
        Ok(self.device(node, interface)?.status)
    }

    fn nodes(&self) -> Vec<NodeId> {
        self.devices.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(n: u32) -> PointToPointNetwork {
        PointToPointNetwork::full_mesh((0..n).map(NodeId))
    }

    #[test]
    fn test_full_mesh_interface_numbering() {
        let net = mesh(4);

        assert_eq!(net.nodes(), vec![NodeId(0), NodeId(1), NodeId(2), NodeId(3)]);
        assert_eq!(
            net.device_interfaces(NodeId(2)).unwrap(),
            vec![InterfaceId(1), InterfaceId(2), InterfaceId(3)]
        );

        // Devices are sorted by peer id
        assert_eq!(net.peer_of(NodeId(2), InterfaceId(1)).unwrap(), NodeId(0));
        assert_eq!(net.peer_of(NodeId(2), InterfaceId(2)).unwrap(), NodeId(1));
        assert_eq!(net.peer_of(NodeId(2), InterfaceId(3)).unwrap(), NodeId(3));
        assert_eq!(net.interface_index_for(NodeId(0), NodeId(3)).unwrap(), InterfaceId(3));
        assert_eq!(net.interface_index_for(NodeId(3), NodeId(0)).unwrap(), InterfaceId(1));
    }

    #[test]
    fn test_interface_table_is_consistent() {
        let net = mesh(3);
        let table = net.interface_table().unwrap();
        assert_eq!(table.len(), 6);
        for row in &table {
            assert_eq!(net.interface_index_for(row.node, row.peer).unwrap(), row.interface);
            assert!(!row.interface.is_loopback());
        }
    }

    #[test]
    fn test_unknown_lookups() {
        let net = mesh(2);
        assert_eq!(net.device_interfaces(NodeId(9)), Err(EnvError::UnknownNode(NodeId(9))));
        assert_eq!(
            net.peer_of(NodeId(0), InterfaceId(5)),
            Err(EnvError::UnknownInterface {
                node: NodeId(0),
                interface: InterfaceId(5)
            })
        );
        assert_eq!(
            net.interface_index_for(NodeId(0), NodeId(0)),
            Err(EnvError::NoRouteToPeer {
                node: NodeId(0),
                peer: NodeId(0)
            })
        );
        assert!(net.peer_of(NodeId(0), LOOPBACK_INTERFACE).is_err());
    }

    #[test]
    fn test_commands_update_status_and_counters() {
        let mut net = mesh(2);
        let iface = net.interface_index_for(NodeId(0), NodeId(1)).unwrap();

        net.set_interface_state(NodeId(0), iface, false).unwrap();
        net.set_link_delay(NodeId(0), iface, 0.25).unwrap();
        net.set_link_error_rate(NodeId(0), iface, 0.5).unwrap();

        let status = net.interface_status(NodeId(0), iface).unwrap();
        assert!(!status.up);
        assert_eq!(status.delay_secs, 0.25);
        assert_eq!(status.error_rate, 0.5);

        assert_eq!(net.command_count(CommandKind::InterfaceDown), 1);
        assert_eq!(net.command_count(CommandKind::SetDelay), 1);
        assert_eq!(net.command_count(CommandKind::InterfaceUp), 0);
        assert_eq!(net.total_commands(), 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut net = mesh(2);
        let iface = InterfaceId(1);
        assert!(matches!(
            net.set_link_delay(NodeId(0), iface, -1.0),
            Err(EnvError::CommandRejected(_))
        ));
        assert!(matches!(
            net.set_link_error_rate(NodeId(0), iface, 1.5),
            Err(EnvError::CommandRejected(_))
        ));
        assert_eq!(net.total_commands(), 0);
        assert_eq!(net.interface_status(NodeId(0), iface).unwrap(), InterfaceStatus::initial());
    }

    #[test]
    fn test_routing_prefers_low_delay_path() {
        let mut net = mesh(3);
        let set = |net: &mut PointToPointNetwork, a: u32, b: u32, delay: f64| {
            for (n, p) in [(a, b), (b, a)] {
                let iface = net.interface_index_for(NodeId(n), NodeId(p)).unwrap();
                net.set_link_delay(NodeId(n), iface, delay).unwrap();
            }
        };
        set(&mut net, 0, 2, 10.0);
        set(&mut net, 0, 1, 1.0);
        set(&mut net, 1, 2, 1.0);

        assert!(net.route(NodeId(0), NodeId(2)).is_none());
        net.request_routing_recompute();

        let route = net.route(NodeId(0), NodeId(2)).unwrap();
        assert_eq!(route.hops, vec![NodeId(0), NodeId(1), NodeId(2)]);
        assert_eq!(route.total_delay, 2.0);
        assert_eq!(route.next_hop(), Some(NodeId(1)));
        assert_eq!(route.hop_count(), 2);
        assert_eq!(net.routing_epoch(), 1);
    }

    #[test]
    fn test_routing_needs_both_ends_up() {
        let mut net = mesh(2);
        let iface = net.interface_index_for(NodeId(1), NodeId(0)).unwrap();
        net.set_interface_state(NodeId(1), iface, false).unwrap();
        net.request_routing_recompute();

        assert!(net.route(NodeId(0), NodeId(1)).is_none());
        assert!(net.route(NodeId(1), NodeId(0)).is_none());
    }
}
