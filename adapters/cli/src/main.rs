#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays maze scenarios headlessly.

mod preview;
mod scenario;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mazegame_runtime::{Config, RunReport, Simulation, DEFAULT_TICK_MILLIS};
use mazegame_world::query;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

/// Turn-based maze runner.
#[derive(Debug, Parser)]
#[command(name = "mazegame", version, about)]
struct Cli {
    #[command(subcommand)]
    command: CommandLine,
}

#[derive(Debug, Subcommand)]
enum CommandLine {
    /// Plays the scenario's script against its maze.
    Run(RunArgs),
    /// Prints the board and every enemy's patrol without running.
    Preview {
        /// Path to the scenario TOML file.
        scenario: PathBuf,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Path to the scenario TOML file.
    scenario: PathBuf,
    /// Seed for the run; overrides the scenario's.
    #[arg(long)]
    seed: Option<u64>,
    /// Play this layout variant instead of one picked from the seed.
    #[arg(long)]
    variant: Option<usize>,
    /// Milliseconds between ticks.
    #[arg(long, default_value_t = DEFAULT_TICK_MILLIS)]
    tick_ms: u64,
    /// Stop after this many ticks even without a result.
    #[arg(long)]
    max_ticks: Option<u64>,
    /// Print the board after every tick.
    #[arg(long)]
    trace: bool,
    /// Print the run report as JSON.
    #[arg(long)]
    json: bool,
}

/// Entry point for the maze command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        CommandLine::Run(args) => run(&args),
        CommandLine::Preview { scenario } => preview(&scenario),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load(path: &Path) -> Result<Scenario> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario at {}", path.display()))?;
    Scenario::parse(&source)
        .with_context(|| format!("failed to parse scenario at {}", path.display()))
}

fn run(args: &RunArgs) -> Result<()> {
    let scenario = load(&args.scenario)?;
    let seed = args.seed.or(scenario.seed).unwrap_or_default();
    let variant = args.variant.unwrap_or_else(|| scenario.choose_variant(seed));
    let world = scenario
        .world(variant, seed)
        .with_context(|| format!("scenario {:?} has an invalid layout", scenario.title))?;
    info!(title = %scenario.title, seed, variant, "scenario loaded");

    let config = Config {
        seed,
        tick_interval: Duration::from_millis(args.tick_ms),
        max_ticks: args.max_ticks,
    };
    let mut simulation = Simulation::new(world, config);
    if !args.json {
        println!("{}", scenario.title);
        print!("{}", query::snapshot(simulation.world()));
    }

    let script = scenario.script();
    let (trace, json) = (args.trace, args.json);
    let report = simulation
        .run(move |mut context| {
            for direction in script {
                let turn = context.step(direction)?;
                if trace {
                    let board = format!("tick {}\n{}", turn.tick, turn.snapshot);
                    if json {
                        eprint!("{board}");
                    } else {
                        print!("{board}");
                    }
                }
                if turn.result.is_some() {
                    break;
                }
            }
            Ok(())
        })
        .context("run aborted")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to encode run report")?
        );
    } else {
        println!("{}", summary(&report));
    }
    Ok(())
}

fn summary(report: &RunReport) -> String {
    match &report.result {
        Some(result) => format!("{result} after {} ticks", report.ticks),
        None => format!("no result after {} ticks", report.ticks),
    }
}

fn preview(path: &Path) -> Result<()> {
    let scenario = load(path)?;
    let seed = scenario.seed.unwrap_or_default();

    println!("{}", scenario.title);
    if let Some(description) = &scenario.description {
        println!("{}", description.trim_end());
    }
    let count = scenario.variant_count();
    for variant in 0..count {
        let world = scenario.world(variant, seed).with_context(|| {
            format!(
                "variant {variant} of scenario {:?} has an invalid layout",
                scenario.title
            )
        })?;
        if count > 1 {
            println!("variant {variant}");
        }
        print!("{}", query::snapshot(&world));
        print!("{}", preview::render(&query::enemy_view(&world)));
    }
    Ok(())
}
