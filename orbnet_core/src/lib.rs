//! OrbNet Core - Physics-to-Topology Pipeline
//!
//! Turns a static registry of orbiting bodies into the connectivity graph of
//! an interplanetary network at any simulated instant:
//! 1. **Registry**: validated tree of circular orbits, loaded once
//! 2. **Orbit**: absolute 2-D position of every body at time `t`
//! 3. **Link**: line-of-sight occlusion, propagation delay and
//!    free-space-loss error rate for every connectable pair
//! 4. **Snapshot**: immutable aggregate of the above for one instant
//!
//! Everything here is pure: the same registry and `t` always yield a
//! bit-identical [`TopologySnapshot`].

pub mod link;
pub mod orbit;
pub mod registry;
pub mod snapshot;

// Re-export key types for convenience
pub use link::{Link, LinkModel, LinkQuality, LinkState, SPEED_OF_LIGHT};
pub use orbit::{resolve, resolve_all, Position, PositionMap};
pub use registry::{Body, BodyRegistry, OrbitDirection, RegistryError};
pub use snapshot::{get_snapshot, TopologySnapshot};

/// Bodies are addressed by the id of the network node they host.
pub use orbnet_env::NodeId as BodyId;
