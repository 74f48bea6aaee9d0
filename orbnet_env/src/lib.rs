//! OrbNet Environment Abstraction Layer
//!
//! This crate defines the narrow boundary between the topology pipeline and
//! the packet-level network simulator that consumes it.
//!
//! # Core Concept: Commands, not State
//!
//! The topology pipeline never owns device state. It only issues commands:
//! - Interface up/down
//! - Channel delay and receive error rate
//! - Global routing recomputation
//!
//! Any simulator that implements [`NetworkSimulator`] can be driven, whether
//! it is an in-memory stand-in used for tests or a full packet-level engine.
//!
//! # Example
//!
//! ```ignore
//! use orbnet_env::{NetworkSimulator, NodeId};
//!
//! fn take_down_all<N: NetworkSimulator>(net: &mut N, node: NodeId) -> Result<(), orbnet_env::EnvError> {
//!     for iface in net.device_interfaces(node)? {
//!         net.set_interface_state(node, iface, false)?;
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod network;
mod types;

pub use error::EnvError;
pub use network::{CommandKind, NetworkSimulator};
pub use types::{InterfaceId, InterfaceMapping, InterfaceStatus, NodeId, LOOPBACK_INTERFACE};
