//! OrbNet Simulator CLI
//!
//! Runs the topology update loop over a body registry and reports what the
//! network saw.

use clap::Parser;
use orbnet_core::{BodyId, BodyRegistry};
use orbnet_sim::scenarios::ScenarioId;
use orbnet_sim::{interface_table_json, write_interface_table_csv, RunSummary, SimConfig, SimError, SimWorld};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// OrbNet orbital network topology simulator
#[derive(Parser, Debug)]
#[command(name = "orbnet-sim")]
#[command(about = "Drive a network simulator from orbital geometry", long_about = None)]
struct Args {
    /// Built-in scenario (solar_system, occultation, earth_moon_relay)
    #[arg(short = 'S', long, default_value = "solar_system")]
    scenario: String,

    /// Load bodies from a JSON registry instead of a scenario
    #[arg(short, long)]
    bodies: Option<String>,

    /// Simulated start time in seconds
    #[arg(long, default_value = "0")]
    start: f64,

    /// Seconds between ticks
    #[arg(long, default_value = "60")]
    step: f64,

    /// Simulated seconds to run
    #[arg(short, long, default_value = "86400")]
    length: f64,

    /// Carrier frequency in GHz for the path-loss model
    #[arg(long, default_value = "30")]
    carrier_ghz: f64,

    /// Seed for random initial phases (0 = registry phases)
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Export per-tick frames to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Write the node/interface/peer table (CSV, or JSON if the path ends in .json)
    #[arg(long)]
    interface_table: Option<String>,

    /// Print the route between two bodies after the run (FROM:TO, names or ids)
    #[arg(long)]
    route: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,
}

fn load_registry(args: &Args) -> Result<(BodyRegistry, String), SimError> {
    let (registry, label) = match &args.bodies {
        Some(path) => (BodyRegistry::from_path(path)?, path.clone()),
        None => {
            let scenario: ScenarioId = args
                .scenario
                .parse()
                .map_err(|_| SimError::UnknownScenario(args.scenario.clone()))?;
            (scenario.registry(), scenario.name().to_string())
        }
    };
    if args.seed != 0 {
        info!("Randomizing initial phases with seed {}", args.seed);
        return Ok((registry.with_random_phases(args.seed), label));
    }
    Ok((registry, label))
}

/// Resolves a body by name (case-insensitive) or numeric id.
fn resolve_body(registry: &BodyRegistry, token: &str) -> Option<BodyId> {
    if let Ok(id) = token.parse::<u32>() {
        return registry.get(BodyId(id)).map(|b| b.id);
    }
    registry.find_by_name(token).map(|b| b.id)
}

fn write_interface_table(world: &SimWorld, path: &str) -> Result<(), SimError> {
    let rows = world.interface_table()?;
    if path.ends_with(".json") {
        let mut file = File::create(path)?;
        file.write_all(interface_table_json(&rows)?.as_bytes())?;
    } else {
        write_interface_table_csv(&rows, BufWriter::new(File::create(path)?))?;
    }
    info!("Wrote {} interface rows to {}", rows.len(), path);
    Ok(())
}

fn report(args: &Args, world: &SimWorld, summary: &RunSummary) -> Result<(), SimError> {
    let route = match &args.route {
        Some(pair) => {
            let (from, to) = pair
                .split_once(':')
                .ok_or_else(|| SimError::invalid_parameters(format!("--route expects FROM:TO, got {}", pair)))?;
            let registry = world.registry();
            let from_id = resolve_body(registry, from)
                .ok_or_else(|| SimError::invalid_parameters(format!("unknown body {}", from)))?;
            let to_id = resolve_body(registry, to)
                .ok_or_else(|| SimError::invalid_parameters(format!("unknown body {}", to)))?;
            Some((from_id, to_id, world.route(from_id, to_id).cloned()))
        }
        None => None,
    };

    if args.json {
        let output = serde_json::json!({
            "scenario": world.label(),
            "bodies": world.registry().len(),
            "summary": summary,
            "route": route.as_ref().map(|(from, to, r)| serde_json::json!({
                "from": from,
                "to": to,
                "route": r,
            })),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "{}: {} ticks, t = {:.0} s .. {:.0} s",
        world.label(),
        summary.ticks,
        summary.start_time,
        summary.final_time
    );
    info!(
        "Commands: up={} down={} delay={} error_rate={} routing={}",
        summary.commands.interface_up,
        summary.commands.interface_down,
        summary.commands.set_delay,
        summary.commands.set_error_rate,
        summary.commands.routing_recompute
    );
    info!(
        "Link transitions: {} raised, {} dropped; {} rejected",
        summary.links_raised, summary.links_dropped, summary.rejected
    );
    info!("Interfaces up at end: {}", world.network().up_interface_count());

    if let Some((from, to, route)) = route {
        match route {
            Some(r) => {
                let hops: Vec<String> = r.hops.iter().map(|h| h.to_string()).collect();
                info!(
                    "Route {} -> {}: {} ({:.3} s one-way)",
                    from,
                    to,
                    hops.join(" -> "),
                    r.total_delay
                );
            }
            None => info!("Route {} -> {}: unreachable at t = {:.0} s", from, to, summary.final_time),
        }
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), SimError> {
    let (registry, label) = load_registry(args)?;
    let config = SimConfig::default()
        .with_start_time(args.start)
        .with_time_step(args.step)
        .with_simulation_length(args.length)
        .with_carrier_frequency(args.carrier_ghz * 1.0e9);

    if !args.json {
        info!("OrbNet Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!(
            "Registry '{}': {} bodies, {} connectable",
            label,
            registry.len(),
            registry.connectable().count()
        );
    }

    let mut world = SimWorld::new(registry, config).with_label(&label);

    if let Some(path) = &args.interface_table {
        write_interface_table(&world, path)?;
    }

    let summary = match &args.export {
        Some(path) => {
            let export = world.run_with_export()?;
            export.write_to_file(path)?;
            info!("Exported {} frames to {}", export.frames.len(), path);
            export
                .summary
                .ok_or_else(|| SimError::invalid_parameters("export finished without a summary"))?
        }
        None => world.run()?,
    };

    report(args, &world, &summary)
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
