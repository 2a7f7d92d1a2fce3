#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Path Defence session.
//!
//! Towers are placed up front, wave one is started by hand and later waves
//! start on their own until the run is won, lost or the tick limit is hit.

mod layout_transfer;

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use path_defence_core::{Event, GameConfig, LevelId, Point, RunOutcome, RunSummary, TowerKind};
use path_defence_system_simulation::Simulation;
use path_defence_world::query;
use serde::Serialize;

use crate::layout_transfer::TowerLayoutSnapshot;

/// One hour of play at the default tick rate.
const DEFAULT_MAX_TICKS: u64 = 216_000;

/// Runs a Path Defence session without a window.
#[derive(Debug, Parser)]
#[command(name = "path-defence", version)]
struct CliArgs {
    /// TOML file overriding the default game rules.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Level to play.
    #[arg(long, default_value = "grass")]
    level: LevelId,
    /// Seed for the enemy selection stream.
    #[arg(long)]
    seed: Option<u64>,
    /// Tower to place before the first wave, may be repeated.
    #[arg(long = "tower", value_name = "KIND@X,Y")]
    towers: Vec<TowerRequest>,
    /// Tower layout string produced by `--export-layout`.
    #[arg(long, value_name = "STRING")]
    layout: Option<String>,
    /// Print the placed towers as a layout string before the run starts.
    #[arg(long)]
    export_layout: bool,
    /// Stop after this many simulation ticks.
    #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
    max_ticks: u64,
    /// Print the final report as JSON.
    #[arg(long)]
    json: bool,
}

/// Tower placement requested on the command line.
#[derive(Clone, Copy, Debug, PartialEq)]
struct TowerRequest {
    kind: TowerKind,
    position: Point,
}

impl FromStr for TowerRequest {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (kind, coordinates) = value
            .split_once('@')
            .with_context(|| format!("expected KIND@X,Y, got `{value}`"))?;
        let (x, y) = coordinates
            .split_once(',')
            .with_context(|| format!("expected X,Y coordinates, got `{coordinates}`"))?;

        let kind = kind.parse::<TowerKind>()?;
        let x = x
            .trim()
            .parse::<f32>()
            .with_context(|| format!("invalid x coordinate `{x}`"))?;
        let y = y
            .trim()
            .parse::<f32>()
            .with_context(|| format!("invalid y coordinate `{y}`"))?;
        if !x.is_finite() || !y.is_finite() {
            bail!("coordinates must be finite, got `{coordinates}`");
        }

        Ok(Self {
            kind,
            position: Point::new(x, y),
        })
    }
}

/// Final report printed once the session stops.
#[derive(Debug, Serialize)]
struct RunReport {
    level: String,
    finished: bool,
    ticks: u64,
    towers_placed: usize,
    towers_rejected: usize,
    summary: RunSummary,
}

/// Entry point for the Path Defence command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let report = run(&args)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("failed to serialise run report")?;
        println!("{json}");
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run(args: &CliArgs) -> Result<RunReport> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }

    let mut level = args.level;
    let mut requests = Vec::new();
    if let Some(layout) = &args.layout {
        let snapshot =
            TowerLayoutSnapshot::decode(layout).context("failed to decode tower layout")?;
        level = snapshot
            .level
            .parse()
            .with_context(|| format!("layout refers to unknown level `{}`", snapshot.level))?;
        requests.extend(snapshot.towers.into_iter().map(|tower| TowerRequest {
            kind: tower.kind,
            position: tower.position,
        }));
    }
    requests.extend(args.towers.iter().copied());

    let mut simulation = Simulation::new(config, level.layout());
    if !args.json {
        println!("{}", query::welcome_banner(simulation.world()));
    }
    info!("playing {} ({})", level.title(), level);

    let mut towers_rejected = 0;
    for request in &requests {
        match simulation.place_tower_of(request.kind, request.position) {
            Ok(tower) => info!(
                "placed {} tower {tower:?} at ({}, {})",
                request.kind, request.position.x, request.position.y
            ),
            Err(reason) => {
                towers_rejected += 1;
                warn!(
                    "could not place {} tower at ({}, {}): {reason}",
                    request.kind, request.position.x, request.position.y
                );
            }
        }
    }

    let towers = query::tower_view(simulation.world());
    if args.export_layout {
        let snapshot = TowerLayoutSnapshot::capture(level.name(), &towers);
        let encoded = snapshot
            .encode()
            .context("failed to encode tower layout")?;
        println!("{encoded}");
    }

    simulation
        .start_wave()
        .context("failed to start the first wave")?;
    let _ = simulation.drain_events();

    while !simulation.is_over() && simulation.ticks() < args.max_ticks {
        simulation.step();
        for event in simulation.drain_events() {
            if let Event::WaveStarted { wave, size, .. } = event {
                info!("wave {wave} is coming with {size} enemies");
            }
        }
    }

    let summary = simulation.summary();
    let finished = summary.outcome.is_final();
    if !finished {
        warn!("stopped after {} ticks without a result", simulation.ticks());
    }

    Ok(RunReport {
        level: level.name().to_owned(),
        finished,
        ticks: simulation.ticks(),
        towers_placed: towers.iter().count(),
        towers_rejected,
        summary,
    })
}

fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

fn print_report(report: &RunReport) {
    let summary = &report.summary;
    let outcome = match summary.outcome {
        RunOutcome::Victory => "victory",
        RunOutcome::Defeat => "defeat",
        RunOutcome::InProgress => "unfinished",
    };
    println!("level:          {}", report.level);
    println!("outcome:        {outcome}");
    println!("waves survived: {}", summary.waves_survived);
    println!("enemies killed: {}", summary.enemies_killed);
    println!("gold:           {}", summary.gold);
    println!("lives:          {}", summary.lives);
    println!(
        "towers:         {} placed, {} rejected",
        report.towers_placed, report.towers_rejected
    );
    println!("ticks:          {}", report.ticks);
}
