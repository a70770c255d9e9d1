//! # Strider CLI
//!
//! Command-line scenario runner for the Strider physics slice.
//!
//! ## Commands
//! - `simulate` - Run a JSON scenario and print where everything ended up
//! - `validate` - Check that a scenario parses and every object can be built

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

pub mod scenario;

use scenario::Scenario;

/// Strider scenario runner
#[derive(Parser)]
#[command(name = "strider")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a scenario
    Simulate {
        /// Scenario file
        scenario: PathBuf,

        /// Override the simulated duration in seconds
        #[arg(short, long)]
        duration: Option<f32>,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a scenario without running it
    Validate {
        /// Scenario file
        scenario: PathBuf,
    },
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match cli.command {
        Commands::Simulate {
            scenario,
            duration,
            output,
        } => {
            let mut loaded = Scenario::load(&scenario)?;
            if let Some(duration) = duration {
                loaded.duration = duration.max(0.0);
            }
            log::info!("Simulating {} for {}s...", scenario.display(), loaded.duration);

            let mut simulation = loaded.build()?;
            let report = simulation.run(&loaded);
            log::info!("Ran {} frames ({} world steps)", report.frames, report.world_steps);

            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
                    log::info!("Report written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Validate { scenario } => {
            let loaded = Scenario::load(&scenario)?;
            let simulation = loaded.build()?;
            log::info!(
                "{} is valid: {} nodes, {} collision objects",
                scenario.display(),
                loaded.nodes.len(),
                simulation.controller.world().object_count()
            );
        }
    }

    Ok(())
}
