//! Topology Snapshot - the immutable network state at one instant.

use crate::link::{evaluate_links, Link, LinkMap, LinkModel};
use crate::orbit::{resolve_all, Position, PositionMap};
use crate::registry::BodyRegistry;
use crate::BodyId;
use serde::{Deserialize, Serialize};

/// Positions of all bodies and links between all connectable pairs at `t`.
///
/// A pure function of the registry, the link model and `t`; nothing is
/// carried over from earlier snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    time: f64,
    positions: PositionMap,
    #[serde(with = "link_list")]
    links: LinkMap,
}

impl TopologySnapshot {
    /// Computes the snapshot for simulated time `t` (seconds).
    pub fn compute(registry: &BodyRegistry, model: &LinkModel, t: f64) -> Self {
        let positions = resolve_all(registry, t);
        let links = evaluate_links(registry, &positions, model);
        Self { time: t, positions, links }
    }

    /// Simulated time of this snapshot.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// All positions keyed by body id.
    pub fn positions(&self) -> &PositionMap {
        &self.positions
    }

    /// Position of one body.
    pub fn position(&self, id: BodyId) -> Option<&Position> {
        self.positions.get(&id)
    }

    /// The directed link `sender -> receiver`, if both are connectable.
    pub fn link(&self, sender: BodyId, receiver: BodyId) -> Option<&Link> {
        self.links.get(&(sender, receiver))
    }

    /// Every directed link, ordered by `(sender, receiver)`.
    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.values()
    }

    /// Directed links with line of sight.
    pub fn connected_links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.values().filter(|l| l.connected())
    }

    /// True if `sender -> receiver` exists and has line of sight.
    pub fn is_connected(&self, sender: BodyId, receiver: BodyId) -> bool {
        self.link(sender, receiver).is_some_and(|l| l.connected())
    }

    /// The body occluding `sender -> receiver`, if it is blocked.
    pub fn blocking_body(&self, sender: BodyId, receiver: BodyId) -> Option<BodyId> {
        self.link(sender, receiver).and_then(|l| l.blocked_by())
    }

    /// Bodies `id` currently has line of sight to.
    pub fn neighbors(&self, id: BodyId) -> Vec<BodyId> {
        self.links
            .range((id, BodyId(0))..=(id, BodyId(u32::MAX)))
            .filter(|(_, link)| link.connected())
            .map(|((_, receiver), _)| *receiver)
            .collect()
    }

    /// Number of unordered connected pairs.
    pub fn connected_pair_count(&self) -> usize {
        self.connected_links().filter(|l| l.sender < l.receiver).count()
    }
}

/// Computes the topology at `t`; re-callable at any `t`, always identical.
pub fn get_snapshot(registry: &BodyRegistry, model: &LinkModel, t: f64) -> TopologySnapshot {
    TopologySnapshot::compute(registry, model, t)
}

/// Links serialize as a flat list; map keys are rebuilt on load.
mod link_list {
    use super::{Link, LinkMap};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(links: &LinkMap, serializer: S) -> Result<S::Ok, S::Error> {
        let list: Vec<&Link> = links.values().collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LinkMap, D::Error> {
        let list = Vec::<Link>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|l| ((l.sender, l.receiver), l)).collect())
    }
}
