//! The Topology Updater - recompute, diff, command.
//!
//! Every tick the updater:
//!
//! 1. Computes a fresh snapshot at the tick's simulated time
//! 2. Walks every device interface of every registered body
//! 3. Compares the desired state against the simulator's committed state
//! 4. Issues only the commands needed to close the gap
//! 5. Requests one routing recompute
//!
//! Collaborator failures are logged and counted; the tick carries on.

use crate::context::SimContext;
use crate::exporter::SnapshotExport;
use crate::scheduler::EventScheduler;
use orbnet_core::{BodyRegistry, LinkModel, LinkQuality, TopologySnapshot};
use orbnet_env::{CommandKind, EnvError, InterfaceId, NetworkSimulator, NodeId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of the update loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Not started
    Idle,
    /// Ticks are being scheduled
    Running,
    /// Finished or stopped; no further ticks run
    Stopped,
}

/// Commands issued, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandCounts {
    pub interface_up: u64,
    pub interface_down: u64,
    pub set_delay: u64,
    pub set_error_rate: u64,
    pub routing_recompute: u64,
}

impl CommandCounts {
    /// Counts one command.
    pub fn record(&mut self, kind: CommandKind) {
        *self.slot(kind) += 1;
    }

    /// Count for one kind.
    pub fn get(&self, kind: CommandKind) -> u64 {
        match kind {
            CommandKind::InterfaceUp => self.interface_up,
            CommandKind::InterfaceDown => self.interface_down,
            CommandKind::SetDelay => self.set_delay,
            CommandKind::SetErrorRate => self.set_error_rate,
            CommandKind::RoutingRecompute => self.routing_recompute,
        }
    }

    /// All commands of every kind.
    pub fn total(&self) -> u64 {
        CommandKind::all().iter().map(|k| self.get(*k)).sum()
    }

    /// Interface commands only (routing recomputes excluded).
    pub fn interface_commands(&self) -> u64 {
        self.total() - self.routing_recompute
    }

    fn merge(&mut self, other: &CommandCounts) {
        for kind in CommandKind::all() {
            *self.slot(kind) += other.get(kind);
        }
    }

    fn slot(&mut self, kind: CommandKind) -> &mut u64 {
        match kind {
            CommandKind::InterfaceUp => &mut self.interface_up,
            CommandKind::InterfaceDown => &mut self.interface_down,
            CommandKind::SetDelay => &mut self.set_delay,
            CommandKind::SetErrorRate => &mut self.set_error_rate,
            CommandKind::RoutingRecompute => &mut self.routing_recompute,
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick number; 0 is the initial sync
    pub tick: u64,

    /// Simulated time of the tick (seconds)
    pub time: f64,

    /// Unordered pairs with line of sight
    pub connected_pairs: usize,

    /// Commands issued this tick
    pub commands: CommandCounts,

    /// Interfaces that went from down to up
    pub links_raised: u64,

    /// Interfaces that went from up to down
    pub links_dropped: u64,

    /// Queries or commands the simulator refused
    pub rejected: u64,
}

impl TickReport {
    fn new(tick: u64, time: f64) -> Self {
        Self {
            tick,
            time,
            connected_pairs: 0,
            commands: CommandCounts::default(),
            links_raised: 0,
            links_dropped: 0,
            rejected: 0,
        }
    }
}

/// Aggregate outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Periodic ticks executed (the initial sync is not counted)
    pub ticks: u64,

    /// Simulated time of the initial sync
    pub start_time: f64,

    /// Simulated time of the last tick executed
    pub final_time: f64,

    /// Commands issued over the run, initial sync included
    pub commands: CommandCounts,

    pub links_raised: u64,
    pub links_dropped: u64,
    pub rejected: u64,

    /// Loop state when the run returned
    pub state: LoopState,
}

impl RunSummary {
    fn new(start_time: f64) -> Self {
        Self {
            ticks: 0,
            start_time,
            final_time: start_time,
            commands: CommandCounts::default(),
            links_raised: 0,
            links_dropped: 0,
            rejected: 0,
            state: LoopState::Idle,
        }
    }

    fn absorb(&mut self, report: &TickReport) {
        if report.tick > 0 {
            self.ticks += 1;
        }
        self.final_time = report.time;
        self.commands.merge(&report.commands);
        self.links_raised += report.links_raised;
        self.links_dropped += report.links_dropped;
        self.rejected += report.rejected;
    }
}

/// Drives a [`NetworkSimulator`] from geometry.
pub struct TopologyUpdater<N: NetworkSimulator> {
    registry: Arc<BodyRegistry>,
    model: LinkModel,
    network: N,
    context: Option<SimContext>,
    state: LoopState,
    summary: Option<RunSummary>,
    recorder: Option<SnapshotExport>,
}

impl<N: NetworkSimulator + 'static> TopologyUpdater<N> {
    /// Creates an idle updater over `network`.
    pub fn new(registry: Arc<BodyRegistry>, model: LinkModel, network: N) -> Self {
        Self {
            registry,
            model,
            network,
            context: None,
            state: LoopState::Idle,
            summary: None,
            recorder: None,
        }
    }

    /// Records a frame per tick into `export`.
    pub fn with_recorder(mut self, export: SnapshotExport) -> Self {
        self.set_recorder(export);
        self
    }

    pub fn set_recorder(&mut self, export: SnapshotExport) {
        self.recorder = Some(export);
    }

    pub fn registry(&self) -> &BodyRegistry {
        &self.registry
    }

    pub fn model(&self) -> &LinkModel {
        &self.model
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn into_network(self) -> N {
        self.network
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Clock of the current run, if one was started.
    pub fn context(&self) -> Option<&SimContext> {
        self.context.as_ref()
    }

    /// Takes the recorded frames out of the updater.
    pub fn take_recording(&mut self) -> Option<SnapshotExport> {
        self.recorder.take()
    }

    /// Computes the topology at `t` without touching the simulator.
    pub fn get_snapshot(&self, t: f64) -> TopologySnapshot {
        TopologySnapshot::compute(&self.registry, &self.model, t)
    }

    /// Halts the loop; no further ticks are scheduled.
    pub fn stop(&mut self) {
        if self.state != LoopState::Stopped {
            info!("Update loop stopped");
        }
        self.state = LoopState::Stopped;
        if let Some(summary) = self.summary.as_mut() {
            summary.state = LoopState::Stopped;
        }
    }

    /// Brings the simulator in line with the topology at `t`.
    pub fn sync(&mut self, tick: u64, t: f64) -> TickReport {
        let snapshot = self.get_snapshot(t);
        let mut report = TickReport::new(tick, t);
        report.connected_pairs = snapshot.connected_pair_count();

        let registry = Arc::clone(&self.registry);
        for body in registry.bodies() {
            let interfaces = match self.network.device_interfaces(body.id) {
                Ok(list) => list,
                Err(e) => {
                    warn!(body = %body.name, error = %e, "Cannot list interfaces");
                    report.rejected += 1;
                    continue;
                }
            };

            for interface in interfaces {
                let desired = if body.connectable {
                    match self.network.peer_of(body.id, interface) {
                        Ok(peer) => snapshot.link(body.id, peer).and_then(|l| l.quality()).copied(),
                        Err(e) => {
                            warn!(body = %body.name, %interface, error = %e, "Cannot resolve peer");
                            report.rejected += 1;
                            continue;
                        }
                    }
                } else {
                    // Non-connectable bodies never carry traffic
                    None
                };
                self.reconcile(body.id, interface, desired, &mut report);
            }
        }

        self.network.request_routing_recompute();
        report.commands.record(CommandKind::RoutingRecompute);

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(&self.registry, &snapshot);
        }

        debug!(
            tick,
            time = t,
            connected_pairs = report.connected_pairs,
            commands = report.commands.interface_commands(),
            "Tick complete"
        );
        report
    }

    /// Issues the commands that move one interface to `desired`.
    fn reconcile(&mut self, node: NodeId, interface: InterfaceId, desired: Option<LinkQuality>, report: &mut TickReport) {
        let current = match self.network.interface_status(node, interface) {
            Ok(status) => status,
            Err(e) => {
                warn!(%node, %interface, error = %e, "Cannot read interface status");
                report.rejected += 1;
                return;
            }
        };

        match desired {
            Some(quality) => {
                if current.matches_up(quality.propagation_delay, quality.error_rate) {
                    return;
                }
                if !current.up {
                    let result = self.network.set_interface_state(node, interface, true);
                    if self.apply(CommandKind::InterfaceUp, node, interface, result, report) {
                        report.links_raised += 1;
                    }
                }
                if current.delay_secs != quality.propagation_delay {
                    let result = self.network.set_link_delay(node, interface, quality.propagation_delay);
                    self.apply(CommandKind::SetDelay, node, interface, result, report);
                }
                if current.error_rate != quality.error_rate {
                    let result = self.network.set_link_error_rate(node, interface, quality.error_rate);
                    self.apply(CommandKind::SetErrorRate, node, interface, result, report);
                }
            }
            None => {
                if current.up {
                    let result = self.network.set_interface_state(node, interface, false);
                    if self.apply(CommandKind::InterfaceDown, node, interface, result, report) {
                        report.links_dropped += 1;
                    }
                }
            }
        }
    }

    /// Counts an accepted command or logs a refused one.
    fn apply(
        &self,
        kind: CommandKind,
        node: NodeId,
        interface: InterfaceId,
        result: Result<(), EnvError>,
        report: &mut TickReport,
    ) -> bool {
        match result {
            Ok(()) => {
                report.commands.record(kind);
                true
            }
            Err(e) => {
                warn!(%node, %interface, command = %kind, error = %e, "Command rejected");
                report.rejected += 1;
                false
            }
        }
    }

    /// Starts a run: initial sync at `start_time`, then one tick per step.
    ///
    /// Ticks are scheduled on `scheduler`; call [`EventScheduler::run`] to
    /// execute them.
    pub fn start(&mut self, context: SimContext, scheduler: &mut EventScheduler<Self>) {
        let mut summary = RunSummary::new(context.start_time());
        info!(
            start = context.start_time(),
            step = context.time_step(),
            ticks = context.total_ticks(),
            bodies = self.registry.len(),
            "Update loop starting"
        );

        self.state = LoopState::Running;
        let report = self.sync(0, context.start_time());
        summary.absorb(&report);
        summary.state = self.state;
        self.summary = Some(summary);

        let finished = context.is_finished();
        let next = context.next_time();
        self.context = Some(context);

        if finished {
            self.finish();
        } else {
            scheduler.schedule_at(next, Self::on_tick);
        }
    }

    /// Scheduled tick handler; re-arms itself until the run is over.
    fn on_tick(updater: &mut Self, scheduler: &mut EventScheduler<Self>) {
        if updater.state != LoopState::Running {
            return;
        }
        let Some((tick, t)) = updater.context.as_mut().map(|ctx| {
            let t = ctx.advance();
            (ctx.ticks(), t)
        }) else {
            return;
        };

        let report = updater.sync(tick, t);
        if let Some(summary) = updater.summary.as_mut() {
            summary.absorb(&report);
        }

        let next = updater
            .context
            .as_ref()
            .filter(|ctx| !ctx.is_finished())
            .map(SimContext::next_time);
        match next {
            Some(next) if updater.state == LoopState::Running => scheduler.schedule_at(next, Self::on_tick),
            _ => updater.finish(),
        }
    }

    fn finish(&mut self) {
        self.stop();
        if let Some(summary) = self.summary.as_ref() {
            info!(
                ticks = summary.ticks,
                final_time = summary.final_time,
                commands = summary.commands.total(),
                rejected = summary.rejected,
                "Update loop finished"
            );
        }
    }

    /// Summary of the current or last run.
    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    /// Runs a whole loop to completion and returns its summary.
    pub fn run_update_loop(&mut self, context: SimContext) -> RunSummary {
        let mut scheduler = EventScheduler::new(context.start_time());
        self.start(context, &mut scheduler);
        scheduler.run(self);

        let mut summary = self
            .summary
            .clone()
            .unwrap_or_else(|| RunSummary::new(scheduler.now()));
        summary.state = self.state;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::PointToPointNetwork;
    use orbnet_core::registry::{solar, Body};
    use orbnet_env::InterfaceMapping;

    fn updater(registry: BodyRegistry) -> TopologyUpdater<PointToPointNetwork> {
        let network = PointToPointNetwork::full_mesh(registry.ids());
        TopologyUpdater::new(Arc::new(registry), LinkModel::default(), network)
    }

    /// Earth and Mars on opposite sides of the Sun for the first ticks.
    fn opposition() -> BodyRegistry {
        BodyRegistry::new(vec![
            Body::root(0, "Sun", 695_508_000.0),
            Body::orbiting(1, "Earth", 0, 149_600_000_000.0, 31_558_149.0, 6_371_000.0).with_connectable(true),
            Body::orbiting(2, "Mars", 0, 228_000_000_000.0, 59_355_072.0, 3_389_500.0)
                .with_connectable(true)
                .with_phase(180.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_initial_sync_matches_snapshot() {
        let mut up = updater(BodyRegistry::solar_system());
        up.sync(0, 0.0);

        let snapshot = up.get_snapshot(0.0);
        let table: Vec<InterfaceMapping> = up.network().interface_table().unwrap();
        for row in table {
            let status = up.network().interface_status(row.node, row.interface).unwrap();
            let body = up.registry().get(row.node).unwrap();
            match snapshot.link(row.node, row.peer).and_then(|l| l.quality()) {
                Some(q) if body.connectable => {
                    assert!(status.matches_up(q.propagation_delay, q.error_rate));
                }
                _ => assert!(!status.up, "{} -> {} should be down", row.node, row.peer),
            }
        }
    }

    #[test]
    fn test_non_connectable_interfaces_forced_down() {
        let mut up = updater(BodyRegistry::solar_system());
        up.sync(0, 0.0);

        for id in [solar::SUN, solar::MOON] {
            for iface in up.network().device_interfaces(id).unwrap() {
                assert!(!up.network().interface_status(id, iface).unwrap().up);
            }
        }
    }

    #[test]
    fn test_second_sync_at_same_time_is_quiet() {
        let mut up = updater(BodyRegistry::solar_system());
        up.sync(0, 1_000.0);
        let report = up.sync(1, 1_000.0);

        assert_eq!(report.commands.interface_commands(), 0);
        assert_eq!(report.commands.routing_recompute, 1);
        assert_eq!(report.links_raised + report.links_dropped, 0);
    }

    #[test]
    fn test_blocked_link_goes_down() {
        let mut up = updater(opposition());
        let report = up.sync(0, 0.0);

        // Earth <-> Mars blocked; Sun not connectable: every interface down
        assert_eq!(report.connected_pairs, 0);
        assert_eq!(report.commands.interface_down, 6);
        assert_eq!(report.commands.interface_up, 0);
        assert_eq!(report.commands.set_delay, 0);
        assert_eq!(up.network().up_interface_count(), 0);
    }

    #[test]
    fn test_link_comes_back_up() {
        let mut up = updater(opposition());
        up.sync(0, 0.0);
        assert_eq!(up.network().up_interface_count(), 0);

        // Earth has moved well off the Sun-Mars line
        let t = 1.0e6;
        let report = up.sync(1, t);
        let (earth, mars) = (NodeId(1), NodeId(2));

        assert_eq!(report.connected_pairs, 1);
        assert_eq!(report.commands.interface_up, 2);
        assert_eq!(report.commands.set_delay, 2);
        assert_eq!(report.commands.set_error_rate, 2);
        assert_eq!(report.commands.interface_down, 0);
        assert_eq!(report.links_raised, 2);
        assert_eq!(report.links_dropped, 0);

        let snapshot = up.get_snapshot(t);
        for (node, peer) in [(earth, mars), (mars, earth)] {
            let quality = snapshot.link(node, peer).and_then(|l| l.quality()).copied().unwrap();
            let iface = up.network().interface_index_for(node, peer).unwrap();
            let status = up.network().interface_status(node, iface).unwrap();
            assert!(status.up);
            assert_eq!(status.delay_secs, quality.propagation_delay);
            assert_eq!(status.error_rate, quality.error_rate);
        }
        // Sun stays down
        assert_eq!(up.network().up_interface_count(), 2);
    }

    #[test]
    fn test_routing_recomputed_once_per_tick() {
        let mut up = updater(BodyRegistry::solar_system());
        let context = SimContext::new(0.0, 60.0, 600.0).unwrap();
        let summary = up.run_update_loop(context);

        assert_eq!(summary.ticks, 10);
        // Initial sync plus 10 ticks
        assert_eq!(summary.commands.routing_recompute, 11);
        assert_eq!(up.network().routing_epoch(), 11);
        assert_eq!(summary.final_time, 600.0);
        assert_eq!(summary.state, LoopState::Stopped);
        assert_eq!(up.state(), LoopState::Stopped);
    }

    #[test]
    fn test_summary_matches_network_counters() {
        let mut up = updater(BodyRegistry::solar_system().with_random_phases(5));
        let summary = up.run_update_loop(SimContext::new(0.0, 3_600.0, 86_400.0).unwrap());

        for kind in CommandKind::all() {
            assert_eq!(summary.commands.get(kind), up.network().command_count(kind), "{}", kind);
        }
        assert_eq!(summary.rejected, 0);
    }

    #[test]
    fn test_zero_length_runs_initial_sync_only() {
        let mut up = updater(BodyRegistry::solar_system());
        let summary = up.run_update_loop(SimContext::new(500.0, 60.0, 0.0).unwrap());

        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.final_time, 500.0);
        assert_eq!(summary.commands.routing_recompute, 1);
    }

    #[test]
    fn test_stop_halts_scheduling() {
        let mut up = updater(BodyRegistry::solar_system());
        let mut scheduler = EventScheduler::new(0.0);
        up.start(SimContext::new(0.0, 60.0, 6_000.0).unwrap(), &mut scheduler);

        scheduler.run_until(&mut up, 180.0);
        up.stop();
        scheduler.run(&mut up);

        let summary = up.summary().unwrap();
        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.final_time, 180.0);
        assert_eq!(up.state(), LoopState::Stopped);
    }

    #[test]
    fn test_tick_times_follow_context() {
        let registry = BodyRegistry::solar_system();
        let mut up = updater(registry.clone()).with_recorder(SnapshotExport::new("test", 100.0, 60.0));
        up.run_update_loop(SimContext::new(100.0, 60.0, 300.0).unwrap());

        let export = up.take_recording().unwrap();
        let times: Vec<f64> = export.frames.iter().map(|f| f.time).collect();
        assert_eq!(times, vec![100.0, 160.0, 220.0, 280.0, 340.0, 400.0]);
    }

    #[test]
    fn test_unknown_body_is_logged_not_fatal() {
        // The network only knows Earth and Mars; other bodies fail lookup
        let registry = BodyRegistry::solar_system();
        let network = PointToPointNetwork::full_mesh([solar::EARTH, solar::MARS]);
        let mut up = TopologyUpdater::new(Arc::new(registry), LinkModel::default(), network);

        let report = up.sync(0, 0.0);
        assert_eq!(report.rejected, 4);
        assert_eq!(report.commands.routing_recompute, 1);
    }
}
