#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Lane Defence battle headlessly.
//!
//! The battle is configured from an optional TOML scenario plus command-line
//! overrides, advanced for a fixed number of ticks and summarised on stdout.
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG` to tune them.

mod scenario;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lane_defence_core::{Purse, Side};
use lane_defence_simulation::{Simulation, SimulationStats};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::scenario::{Placement, Scenario};

const DEFAULT_GOLD: u32 = 500;

#[derive(Parser, Debug)]
#[command(
    name = "lane-defence",
    version,
    about = "Run a Lane Defence battle without a renderer and print the outcome"
)]
struct CliArgs {
    /// TOML scenario with `[simulation]` tuning, `gold` and `[[defenders]]`.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 3_600)]
    ticks: u32,
    /// Simulated seconds per tick.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,
    /// Seed overriding the scenario's.
    #[arg(long)]
    seed: Option<u64>,
    /// Extra defender as COL,ROW[,KIND]; may be repeated.
    #[arg(long = "place", value_name = "COL,ROW[,KIND]")]
    placements: Vec<Placement>,
    /// Starting gold, overriding the scenario's.
    #[arg(long)]
    gold: Option<u32>,
    /// Summary format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Toml,
}

/// Outcome printed once the run finishes.
#[derive(Debug, Serialize)]
struct RunSummary {
    seed: u64,
    wave_level: u32,
    gold: u32,
    attackers_alive: usize,
    defenders_alive: usize,
    stats: SimulationStats,
}

/// Entry point for the Lane Defence command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = CliArgs::parse();

    let mut scenario = match &args.scenario {
        Some(path) => load_scenario(path)?,
        None => Scenario::default(),
    };
    if let Some(seed) = args.seed {
        scenario.simulation.seed = seed;
    }
    let gold = args.gold.or(scenario.gold).unwrap_or(DEFAULT_GOLD);

    let mut simulation = Simulation::new(&scenario.simulation, Purse::new(gold))
        .context("scenario configuration is invalid")?;

    for placement in scenario.defenders.iter().chain(args.placements.iter()) {
        match simulation.place_defender(placement.kind, placement.cell()) {
            Ok(defender) => info!(
                ?defender,
                kind = ?placement.kind,
                cell = ?placement.cell(),
                "defender placed"
            ),
            Err(reason) => warn!(
                kind = ?placement.kind,
                cell = ?placement.cell(),
                %reason,
                "placement skipped"
            ),
        }
    }

    for _ in 0..args.ticks {
        simulation.tick(args.dt);
    }

    let summary = summarise(&simulation);
    match args.format {
        OutputFormat::Text => print!("{}", render_text(&summary)),
        OutputFormat::Toml => {
            let text = toml::to_string(&summary).context("failed to encode summary as TOML")?;
            print!("{text}");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    Scenario::from_toml(&text)
        .with_context(|| format!("failed to parse scenario {}", path.display()))
}

fn summarise(simulation: &Simulation<Purse>) -> RunSummary {
    RunSummary {
        seed: simulation.config().seed,
        wave_level: simulation.wave_state().level(),
        gold: simulation.economy().gold(),
        attackers_alive: simulation.population(Side::Attacker),
        defenders_alive: simulation.population(Side::Defender),
        stats: simulation.stats(),
    }
}

fn render_text(summary: &RunSummary) -> String {
    let stats = &summary.stats;
    format!(
        "seed: {}\n\
         ticks: {}\n\
         wave level: {}\n\
         spawned: {}\n\
         killed: {}\n\
         escaped: {}\n\
         defenders lost: {}\n\
         gold awarded: {}\n\
         gold: {}\n\
         attackers alive: {}\n\
         defenders alive: {}\n",
        summary.seed,
        stats.ticks,
        summary.wave_level,
        stats.spawned,
        stats.killed,
        stats.escaped,
        stats.defenders_lost,
        stats.gold_awarded,
        summary.gold,
        summary.attackers_alive,
        summary.defenders_alive,
    )
}
