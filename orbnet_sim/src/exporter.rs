//! JSON and CSV exporters for post-processing.
//!
//! Frames carry body positions and connected links per tick; the interface
//! table maps each (node, interface) to the peer behind it so packet traces
//! can be attributed to links.

use crate::updater::RunSummary;
use nalgebra::Point2;
use orbnet_core::{BodyId, BodyRegistry, TopologySnapshot};
use orbnet_env::InterfaceMapping;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFrame {
    /// Simulation time in seconds
    pub time: f64,

    /// Every body's position
    pub bodies: Vec<BodyFrame>,

    /// Connected links, one entry per unordered pair
    pub links: Vec<LinkFrame>,

    /// Blocked pairs with the occluding body
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub blocked: Vec<BlockedFrame>,
}

/// Position of a body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyFrame {
    pub id: BodyId,
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl BodyFrame {
    pub fn new(id: BodyId, name: &str, pos: &Point2<f64>) -> Self {
        Self {
            id,
            name: name.to_string(),
            x: pos.x,
            y: pos.y,
        }
    }
}

/// A connected pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkFrame {
    pub a: BodyId,
    pub b: BodyId,
    pub distance: f64,
    pub delay: f64,
    pub error_rate: f64,
}

/// A blocked pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedFrame {
    pub a: BodyId,
    pub b: BodyId,
    pub by: BodyId,
}

impl SnapshotFrame {
    /// Builds a frame from a snapshot.
    pub fn from_snapshot(registry: &BodyRegistry, snapshot: &TopologySnapshot) -> Self {
        let bodies = snapshot
            .positions()
            .iter()
            .map(|(id, pos)| {
                let name = registry.get(*id).map(|b| b.name.as_str()).unwrap_or("");
                BodyFrame::new(*id, name, pos)
            })
            .collect();

        let mut links = Vec::new();
        let mut blocked = Vec::new();
        for link in snapshot.links().filter(|l| l.sender < l.receiver) {
            if let Some(q) = link.quality() {
                links.push(LinkFrame {
                    a: link.sender,
                    b: link.receiver,
                    distance: q.distance,
                    delay: q.propagation_delay,
                    error_rate: q.error_rate,
                });
            } else if let Some(by) = link.blocked_by() {
                blocked.push(BlockedFrame {
                    a: link.sender,
                    b: link.receiver,
                    by,
                });
            }
        }

        Self {
            time: snapshot.time(),
            bodies,
            links,
            blocked,
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotExport {
    /// Scenario name
    pub scenario: String,

    /// Simulated time of the first frame
    pub start_time: f64,

    /// Seconds between frames
    pub time_step: f64,

    /// All frames
    pub frames: Vec<SnapshotFrame>,

    /// Run outcome, once known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
}

impl SnapshotExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, start_time: f64, time_step: f64) -> Self {
        Self {
            scenario: scenario.to_string(),
            start_time,
            time_step,
            frames: Vec::new(),
            summary: None,
        }
    }

    /// Appends a frame for `snapshot`.
    pub fn record(&mut self, registry: &BodyRegistry, snapshot: &TopologySnapshot) {
        self.frames.push(SnapshotFrame::from_snapshot(registry, snapshot));
    }

    /// Attaches the run summary.
    pub fn finalize(&mut self, summary: RunSummary) {
        self.summary = Some(summary);
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Writes the interface table as CSV (`Input Node,Interface,Output Node`).
pub fn write_interface_table_csv<W: Write>(rows: &[InterfaceMapping], out: W) -> csv::Result<()> {
    let mut w = csv::Writer::from_writer(out);
    w.write_record(["Input Node", "Interface", "Output Node"])?;
    for row in rows {
        w.write_record(&[
            row.node.as_u32().to_string(),
            row.interface.0.to_string(),
            row.peer.as_u32().to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Serializes the interface table as a JSON array of `{node, interface, peer}`.
pub fn interface_table_json(rows: &[InterfaceMapping]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(rows)
}
