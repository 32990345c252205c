/// Entry point: a thin headless host around the simulation.
///
/// Subcommands:
///   run     — load a level and tick it with idle inputs (settle/water
///             levels run to their outcome with no piece interaction)
///   replay  — validate a replay against a level and play it back
///   hash    — print the canonical level hash
///
/// Exit codes: 0 = Won (or informational success), 1 = Lost,
/// 2 = I/O or validation error.

mod domain;
mod sim;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use sim::movement::Command;
use sim::replay::{Recorder, ReplayDoc};
use sim::world::Status;
use sim::Simulation;

#[derive(Parser)]
#[command(name = "floodline", version, about = "Deterministic voxel puzzle simulation")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run a level with idle inputs for a bounded number of ticks.
    Run {
        /// Level JSON file.
        level: PathBuf,
        /// Tick budget before giving up on an outcome.
        #[arg(long, default_value_t = 3600)]
        ticks: u64,
        /// Write the (idle) input stream as a replay document.
        #[arg(long)]
        save_replay: Option<PathBuf>,
    },
    /// Play a recorded replay back against its level.
    Replay {
        /// Level JSON file.
        level: PathBuf,
        /// Replay JSON file.
        replay: PathBuf,
    },
    /// Print the canonical hash of a level document.
    Hash {
        /// Level JSON file.
        level: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Cmd::Run {
            level,
            ticks,
            save_replay,
        } => {
            let (level, level_hash) = sim::level::load_level(&level)
                .with_context(|| format!("loading level {}", level.display()))?;
            let mut recorder = Recorder::new(&level, &level_hash);
            let (mut simulation, _) = Simulation::new(level);

            let mut played = 0;
            while simulation.status() == Status::InProgress && played < ticks {
                recorder.record(Command::None);
                simulation.tick(Command::None);
                played += 1;
            }

            if let Some(path) = save_replay {
                let doc = recorder.finish(std::env::consts::OS);
                std::fs::write(&path, doc.to_json())
                    .with_context(|| format!("writing replay {}", path.display()))?;
            }
            Ok(report(&simulation))
        }
        Cmd::Replay { level, replay } => {
            let (level, level_hash) = sim::level::load_level(&level)
                .with_context(|| format!("loading level {}", level.display()))?;
            let text = std::fs::read_to_string(&replay)
                .with_context(|| format!("reading replay {}", replay.display()))?;
            let doc = ReplayDoc::from_json(&text).context("parsing replay")?;
            let commands = doc.decode(&level, &level_hash).context("validating replay")?;

            let (mut simulation, _) = Simulation::new(level);
            for cmd in commands {
                simulation.tick(cmd);
            }
            Ok(report(&simulation))
        }
        Cmd::Hash { level } => {
            let text = std::fs::read_to_string(&level)
                .with_context(|| format!("reading level {}", level.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text).context("parsing level")?;
            let hash = sim::level::level_hash(&value).context("canonicalizing level")?;
            println!("{hash}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn report(simulation: &Simulation) -> ExitCode {
    let state = simulation.state();
    println!("ticks:   {}", state.counters.tick);
    println!("pieces:  {}", state.counters.pieces_locked);
    println!("gravity: {}", simulation.gravity().name());
    for (i, progress) in simulation.objectives().iter().enumerate() {
        println!(
            "objective {}: {}/{}{}",
            i,
            progress.current,
            progress.target,
            if progress.complete { " (complete)" } else { "" }
        );
    }
    println!("hash:    {}", simulation.compute_determinism_hash());
    match simulation.status() {
        Status::Won => {
            println!("result:  won");
            ExitCode::SUCCESS
        }
        Status::Lost(reason) => {
            eprintln!(
                "result:  lost at tick {} ({})",
                state.counters.tick,
                reason.describe()
            );
            ExitCode::from(1)
        }
        Status::InProgress => {
            if let Some(piece) = simulation.active_piece() {
                let upcoming: Vec<&str> = simulation
                    .peek_next(3)
                    .iter()
                    .map(|s| s.kind.name())
                    .collect();
                println!(
                    "result:  still in progress ({} falling, next {})",
                    piece.kind.name(),
                    upcoming.join(" ")
                );
            } else {
                println!("result:  still in progress");
            }
            ExitCode::SUCCESS
        }
    }
}
