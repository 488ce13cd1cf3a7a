//! splitpack - split a React Native bundle into base and feature bundles
//!
//! Reads the single bundle produced by the React Native packager, works out
//! which modules each feature needs and writes:
//! - a base bundle with the runtime and shared modules
//! - one bundle per configured feature entry
//! - the asset files each bundle references

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use splitpack_lib::Cli;

/// Initialize the logging/tracing system
fn init_tracing(verbose: bool) {
    let default_directives = if verbose {
        "splitpack=debug,splitpack_lib=debug"
    } else {
        "splitpack=info,splitpack_lib=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    cli.execute()
}
