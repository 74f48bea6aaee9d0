//! SimWorld - The simulation harness container.

use crate::context::SimContext;
use crate::error::SimError;
use crate::exporter::SnapshotExport;
use crate::network::{PointToPointNetwork, Route, DEFAULT_DATA_RATE_BPS};
use crate::scenarios::ScenarioId;
use crate::updater::{LoopState, RunSummary, TopologyUpdater};

use orbnet_core::link::DEFAULT_CARRIER_FREQUENCY_HZ;
use orbnet_core::{BodyRegistry, LinkModel, TopologySnapshot};
use orbnet_env::{InterfaceMapping, NetworkSimulator, NodeId};
use std::sync::Arc;
use tracing::info;

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Simulated time of the initial sync (seconds)
    pub start_time: f64,

    /// Seconds between ticks
    pub time_step: f64,

    /// Simulated seconds covered after `start_time`
    pub simulation_length: f64,

    /// Carrier frequency for the path-loss model (Hz)
    pub carrier_frequency_hz: f64,

    /// Data rate of every point-to-point channel (bits per second)
    pub data_rate_bps: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            time_step: 60.0,
            simulation_length: 86_400.0,
            carrier_frequency_hz: DEFAULT_CARRIER_FREQUENCY_HZ,
            data_rate_bps: DEFAULT_DATA_RATE_BPS,
        }
    }
}

impl SimConfig {
    pub fn with_start_time(mut self, seconds: f64) -> Self {
        self.start_time = seconds;
        self
    }

    pub fn with_time_step(mut self, seconds: f64) -> Self {
        self.time_step = seconds;
        self
    }

    pub fn with_simulation_length(mut self, seconds: f64) -> Self {
        self.simulation_length = seconds;
        self
    }

    pub fn with_carrier_frequency(mut self, hz: f64) -> Self {
        self.carrier_frequency_hz = hz;
        self
    }

    pub fn with_data_rate(mut self, bps: u64) -> Self {
        self.data_rate_bps = bps;
        self
    }

    /// The link model this configuration describes.
    pub fn link_model(&self) -> LinkModel {
        LinkModel::new(self.carrier_frequency_hz)
    }

    /// Checks the parts of the configuration that are not timing.
    ///
    /// # Errors
    /// [`SimError::InvalidLoopParameters`] for a non-finite or non-positive
    /// carrier frequency.
    pub fn validate(&self) -> Result<(), SimError> {
        if !self.carrier_frequency_hz.is_finite() || self.carrier_frequency_hz <= 0.0 {
            return Err(SimError::invalid_parameters(format!(
                "carrier_frequency_hz must be positive, got {}",
                self.carrier_frequency_hz
            )));
        }
        Ok(())
    }

    /// A fresh clock for one run.
    pub fn context(&self) -> Result<SimContext, SimError> {
        self.validate()?;
        SimContext::new(self.start_time, self.time_step, self.simulation_length)
    }
}

/// The SimWorld - registry, link model and full-mesh network in one place.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Scenario label used in exports
    label: String,

    /// Drives the network from geometry
    updater: TopologyUpdater<PointToPointNetwork>,
}

impl SimWorld {
    /// Creates a world with one node per body and a channel per pair.
    pub fn new(registry: BodyRegistry, config: SimConfig) -> Self {
        let network = PointToPointNetwork::full_mesh(registry.ids()).with_data_rate(config.data_rate_bps);
        info!(
            bodies = registry.len(),
            connectable = registry.connectable().count(),
            "Created full-mesh topology"
        );
        let updater = TopologyUpdater::new(Arc::new(registry), config.link_model(), network);
        Self {
            config,
            label: "custom".to_string(),
            updater,
        }
    }

    /// Creates a world from a built-in scenario.
    pub fn from_scenario(scenario: ScenarioId, config: SimConfig) -> Self {
        let mut world = Self::new(scenario.registry(), config);
        world.label = scenario.name().to_string();
        world
    }

    /// Sets the label written into exports.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn registry(&self) -> &BodyRegistry {
        self.updater.registry()
    }

    pub fn network(&self) -> &PointToPointNetwork {
        self.updater.network()
    }

    pub fn state(&self) -> LoopState {
        self.updater.state()
    }

    /// Pure topology at `t`; the network is left untouched.
    pub fn get_snapshot(&self, t: f64) -> TopologySnapshot {
        self.updater.get_snapshot(t)
    }

    /// Runs the update loop over `[start_time, start_time + simulation_length]`.
    ///
    /// # Errors
    /// [`SimError::InvalidLoopParameters`] if the parameters are unusable.
    pub fn run_update_loop(
        &mut self,
        start_time: f64,
        time_step: f64,
        simulation_length: f64,
    ) -> Result<RunSummary, SimError> {
        self.config.validate()?;
        let context = SimContext::new(start_time, time_step, simulation_length)?;
        Ok(self.updater.run_update_loop(context))
    }

    /// Runs the update loop with the configured timing.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        let context = self.config.context()?;
        Ok(self.updater.run_update_loop(context))
    }

    /// Runs with the configured timing and records one frame per tick.
    pub fn run_with_export(&mut self) -> Result<SnapshotExport, SimError> {
        let context = self.config.context()?;
        let export = SnapshotExport::new(&self.label, context.start_time(), context.time_step());

        self.updater.set_recorder(export);
        let summary = self.updater.run_update_loop(context);

        let mut export = self
            .updater
            .take_recording()
            .unwrap_or_else(|| SnapshotExport::new(&self.label, self.config.start_time, self.config.time_step));
        export.finalize(summary);
        Ok(export)
    }

    /// Halts the loop after the current tick.
    pub fn stop(&mut self) {
        self.updater.stop();
    }

    /// The node ↔ interface ↔ peer table of the mesh.
    pub fn interface_table(&self) -> Result<Vec<InterfaceMapping>, SimError> {
        Ok(self.network().interface_table()?)
    }

    /// Route between two bodies as of the last routing recompute.
    pub fn route(&self, from: NodeId, to: NodeId) -> Option<&Route> {
        self.network().route(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbnet_core::registry::solar;
    use orbnet_env::CommandKind;

    #[test]
    fn test_world_creation() {
        let world = SimWorld::new(BodyRegistry::solar_system(), SimConfig::default());

        assert_eq!(world.network().nodes().len(), 6);
        assert_eq!(world.interface_table().unwrap().len(), 30);
        assert_eq!(world.state(), LoopState::Idle);
        assert_eq!(world.network().data_rate_bps(), 5_000_000);
    }

    #[test]
    fn test_world_run_one_day() {
        let mut world = SimWorld::from_scenario(ScenarioId::SolarSystem, SimConfig::default());
        let summary = world.run().unwrap();

        assert_eq!(summary.ticks, 1_440);
        assert_eq!(summary.final_time, 86_400.0);
        assert_eq!(summary.commands.routing_recompute, 1_441);
        assert_eq!(world.state(), LoopState::Stopped);
        assert_eq!(
            world.network().command_count(CommandKind::RoutingRecompute),
            summary.commands.routing_recompute
        );
    }

    #[test]
    fn test_run_update_loop_rejects_bad_step() {
        let mut world = SimWorld::new(BodyRegistry::solar_system(), SimConfig::default());
        assert!(matches!(
            world.run_update_loop(0.0, 0.0, 100.0),
            Err(SimError::InvalidLoopParameters(_))
        ));
        assert_eq!(world.network().total_commands(), 0);
    }

    #[test]
    fn test_run_rejects_bad_carrier_frequency() {
        for hz in [0.0, -30.0e9, f64::NAN, f64::INFINITY] {
            let config = SimConfig::default().with_carrier_frequency(hz);
            let mut world = SimWorld::new(BodyRegistry::solar_system(), config);

            assert!(matches!(world.run(), Err(SimError::InvalidLoopParameters(_))), "carrier {}", hz);
            assert!(matches!(
                world.run_update_loop(0.0, 60.0, 120.0),
                Err(SimError::InvalidLoopParameters(_))
            ));
            assert!(world.run_with_export().is_err());
            assert_eq!(world.network().total_commands(), 0);
            assert_eq!(world.state(), LoopState::Idle);
        }
    }

    #[test]
    fn test_route_after_run() {
        let mut world = SimWorld::new(BodyRegistry::solar_system(), SimConfig::default());
        world.run_update_loop(0.0, 60.0, 120.0).unwrap();

        let snapshot = world.get_snapshot(120.0);
        match world.route(solar::ISS, solar::EARTH) {
            Some(route) => {
                assert_eq!(route.hops.first(), Some(&solar::ISS));
                assert_eq!(route.hops.last(), Some(&solar::EARTH));
                assert!(route.total_delay > 0.0);
            }
            None => assert!(!snapshot.is_connected(solar::ISS, solar::EARTH)),
        }
        // Non-connectable bodies are unreachable
        assert!(world.route(solar::ISS, solar::SUN).is_none());
        assert!(world.route(solar::MOON, solar::EARTH).is_none());
    }

    #[test]
    fn test_run_with_export() {
        let config = SimConfig::default().with_simulation_length(600.0);
        let mut world = SimWorld::from_scenario(ScenarioId::Occultation, config);
        let export = world.run_with_export().unwrap();

        assert_eq!(export.scenario, "occultation");
        assert_eq!(export.frames.len(), 11);
        let summary = export.summary.as_ref().unwrap();
        assert_eq!(summary.ticks, 10);
        // A-C stays blocked in every frame
        for frame in &export.frames {
            assert!(frame.blocked.iter().any(|b| b.a == NodeId(1) && b.b == NodeId(2)));
        }
        // The world keeps its network after the run
        assert_eq!(world.network().routing_epoch(), 11);
    }

    #[test]
    fn test_config_builders() {
        let config = SimConfig::default()
            .with_start_time(100.0)
            .with_time_step(30.0)
            .with_simulation_length(300.0)
            .with_carrier_frequency(2.0e9)
            .with_data_rate(1_000);

        assert_eq!(config.link_model().carrier_frequency_hz, 2.0e9);
        let context = config.context().unwrap();
        assert_eq!(context.total_ticks(), 10);
        assert_eq!(context.start_time(), 100.0);
    }
}
