//! OrbNet Simulation Harness
//!
//! Drives the topology pipeline of `orbnet_core` through simulated time and
//! translates every change into commands for a network simulator.
//!
//! # Core Principle: Recompute, then Diff
//!
//! Each tick computes a fresh [`TopologySnapshot`](orbnet_core::TopologySnapshot)
//! from scratch and compares it against the state the simulator has already
//! committed. Only the difference is sent, followed by one routing
//! recomputation. The only state carried from tick to tick is the simulated
//! clock in [`SimContext`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        SimWorld                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │ EventScheduler (virtual clock + event queue)       │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │        │ tick every time_step                            │
//! │  ┌─────▼──────────────┐        ┌──────────────────────┐  │
//! │  │  TopologyUpdater   │ ─────► │  NetworkSimulator    │  │
//! │  │ snapshot + diff    │ cmds   │ (PointToPointNetwork)│  │
//! │  └─────▲──────────────┘        └──────────────────────┘  │
//! │        │                                                 │
//! │  ┌─────┴──────────────────────────┐                      │
//! │  │ BodyRegistry + LinkModel       │                      │
//! │  └────────────────────────────────┘                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use orbnet_sim::{SimWorld, SimConfig};
//! use orbnet_core::BodyRegistry;
//!
//! let mut world = SimWorld::new(BodyRegistry::solar_system(), SimConfig::default());
//! let summary = world.run_update_loop(0.0, 60.0, 86_400.0)?;
//! ```

mod context;
mod error;
mod exporter;
mod network;
mod scheduler;
mod updater;
mod world;
pub mod scenarios;

pub use context::SimContext;
pub use error::SimError;
pub use exporter::{
    interface_table_json, write_interface_table_csv, BlockedFrame, BodyFrame, LinkFrame, SnapshotExport, SnapshotFrame,
};
pub use network::{PointToPointNetwork, Route};
pub use scheduler::{Event, EventScheduler};
pub use updater::{CommandCounts, LoopState, RunSummary, TickReport, TopologyUpdater};
pub use world::{SimConfig, SimWorld};
