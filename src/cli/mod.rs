//! Command-line interface for splitpack
//!
//! Provides the main CLI structure using clap with subcommands for:
//! - `split`: Split the bundle and copy assets
//! - `analyze`: Report the partition without writing anything
//! - `inject`: Write the base entry shim that requires every feature entry

mod analyze;
mod inject;
mod split;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::config::Config;

pub use analyze::AnalyzeCommand;
pub use inject::{injection_source, InjectCommand};
pub use split::{SplitCommand, SplitOptions};

/// splitpack - split a React Native bundle into base and feature bundles
#[derive(Parser, Debug)]
#[command(name = "splitpack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to splitpack.toml (or a .json config)
    #[arg(short, long, global = true, default_value = "splitpack.toml", env = "SPLITPACK_CONFIG")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split the bundle into base and feature bundles
    Split(SplitCommand),

    /// Show how the bundle would be split
    Analyze(AnalyzeCommand),

    /// Write the base entry shim requiring every injected feature entry
    Inject(InjectCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(&self) -> Result<ExitCode> {
        print_banner();

        match &self.command {
            Commands::Split(cmd) => cmd.execute(&self.config),
            Commands::Analyze(cmd) => cmd.execute(&self.config),
            Commands::Inject(cmd) => cmd.execute(&self.config),
        }
    }
}

/// Load the config file and apply command-line overrides
fn load_config(config_path: &str, options: &SplitOptions) -> Result<Config> {
    tracing::info!("Loading configuration from {}", config_path);
    let mut config = Config::load(config_path)?;
    config.apply(&options.into());
    Ok(config)
}

/// Print the splitpack banner
fn print_banner() {
    eprintln!(
        "\n{} {} {}\n",
        "✂".cyan(),
        "splitpack".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
