//! `uwb-positioning` CLI: run the tag simulator, the live tracker, or solve a single record.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uwb_positioning::{
    Fix, MeasurementCodec, MotionPattern, MultilaterationSolver, PositionTracker, Simulation,
    SystemConfig, UdpTransport,
};

#[derive(Parser)]
#[command(name = "uwb-positioning", about = "UWB multilateration and tag simulator")]
struct Cli {
    /// JSON configuration file; built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Broadcast simulated ranging records
    Simulate {
        /// circle (orbit) or random (random walk)
        #[arg(long, default_value = "circle")]
        movement: MotionPattern,
        /// Number of configured tags to simulate
        #[arg(long)]
        tags: Option<usize>,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Listen for ranging records and track tags
    Track {
        /// Log track snapshots and accuracy every N records
        #[arg(long, default_value_t = 100)]
        report_every: u64,
    },
    /// Solve one wire record read from a file
    Solve {
        record: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            movement,
            tags,
            seed,
            ticks,
        } => run_simulation(&config, movement, tags, seed, ticks),
        Commands::Track { report_every } => run_tracker(&config, report_every),
        Commands::Solve { record } => solve_record(&config, &record),
    }
}

fn load_config(path: Option<&Path>) -> Result<SystemConfig> {
    match path {
        Some(path) => SystemConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(SystemConfig::default()),
    }
}

fn run_simulation(
    config: &SystemConfig,
    movement: MotionPattern,
    tags: Option<usize>,
    seed: u64,
    ticks: Option<u64>,
) -> Result<()> {
    let mut simulation = Simulation::from_config(config, movement, tags, seed)?;
    let mut transport = UdpTransport::broadcaster(config.port)
        .with_context(|| format!("opening broadcast socket for port {}", config.port))?;

    info!(%movement, seed, port = config.port, "broadcasting simulated tags");
    simulation.run(&mut transport, ticks);
    Ok(())
}

fn run_tracker(config: &SystemConfig, report_every: u64) -> Result<()> {
    let mut tracker = PositionTracker::from_config(config)?;
    let mut transport = UdpTransport::listener(config.port, config.receive_timeout())
        .with_context(|| format!("binding UDP port {}", config.port))?;

    let report_every = report_every.max(1);
    let mut next_report = report_every;
    info!(port = config.port, "listening for ranging records");

    tracker.run(&mut transport, |tracker| {
        if tracker.stats().records_received >= next_report {
            next_report += report_every;
            report(tracker);
        }
        false
    });
    Ok(())
}

fn report(tracker: &PositionTracker) {
    for snapshot in tracker.tracks().snapshots() {
        match serde_json::to_string(&snapshot) {
            Ok(json) => info!(tag = %snapshot.tag_id, snapshot = %json, "track"),
            Err(e) => warn!(tag = %snapshot.tag_id, error = %e, "snapshot not serializable"),
        }
    }

    let stats = tracker.accuracy().statistics();
    if stats.sample_count > 0 {
        info!(
            samples = stats.sample_count,
            mean_m = stats.mean_error,
            rmse_m = stats.rmse,
            p95_m = stats.error_95_percentile,
            max_m = stats.max_error,
            "accuracy"
        );
    }
    let counters = tracker.stats();
    info!(
        received = counters.records_received,
        dropped = counters.records_dropped,
        fixes = counters.fixes,
        no_fixes = counters.no_fixes,
        "tracker counters"
    );
}

fn solve_record(config: &SystemConfig, path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let measurement = MeasurementCodec::new()
        .decode(&bytes)
        .with_context(|| format!("decoding {}", path.display()))?;

    let registry = config.registry()?;
    let solver = MultilaterationSolver::new().with_rank_tolerance(config.rank_tolerance);
    let estimate = solver.estimate(measurement, &registry);

    match estimate.fix {
        Fix::Position(solution) => {
            let p = solution.position;
            println!(
                "{}: x={:.2} m, y={:.2} m, z={:.2} m (residual {:.3}, {} anchors)",
                estimate.tag_id, p.x, p.y, p.z, solution.residual_rms, solution.anchors_used
            );
            if let Some(truth) = estimate.source.true_position {
                println!("{}: error {:.3} m against reported truth", estimate.tag_id, (p - truth).norm());
            }
        }
        Fix::NoFix(reason) => println!("{}: no fix ({})", estimate.tag_id, reason),
    }
    Ok(())
}
