//! Split command implementation

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::bundler::Splitter;
use crate::config::{Overrides, Platform};
use crate::report::{RunStatus, SplitReport};
use crate::utils::{format_duration, format_size};

/// Options shared by commands that read the input bundle
#[derive(Args, Debug, Clone, Default)]
pub struct SplitOptions {
    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target platform, decides the asset layout
    #[arg(short, long, value_enum)]
    pub platform: Option<Platform>,

    /// The input is a development bundle
    #[arg(long)]
    pub dev: bool,

    /// Monolithic input bundle
    #[arg(short, long)]
    pub bundle: Option<PathBuf>,

    /// Asset directory written by the packager
    #[arg(short, long)]
    pub assets: Option<PathBuf>,
}

impl From<&SplitOptions> for Overrides {
    fn from(options: &SplitOptions) -> Self {
        Self {
            platform: options.platform,
            dev: options.dev.then_some(true),
            output: options.output.clone(),
            bundle: options.bundle.clone(),
            assets: options.assets.clone(),
        }
    }
}

/// Split the bundle into base and feature bundles
#[derive(Args, Debug)]
pub struct SplitCommand {
    #[command(flatten)]
    pub options: SplitOptions,
}

impl SplitCommand {
    pub fn execute(&self, config_path: &str) -> Result<ExitCode> {
        let start = Instant::now();
        let config = super::load_config(config_path, &self.options)?;
        let input = config.input_bundle();

        eprintln!("{} Splitting {}...", "→".blue(), input.display());
        info!("Platform: {}, dev: {}", config.platform, config.dev);

        let splitter = Splitter::from_config(&config);
        let (status, bundles_failed) = match splitter.split_file(&input) {
            Ok(report) => {
                print_summary(&report, start);
                (report.status(), report.has_failures())
            }
            Err(err) => (RunStatus::from_error(&err), true),
        };
        print_status(&status);

        Ok(if bundles_failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
    }
}

fn print_summary(report: &SplitReport, start: Instant) {
    eprintln!(
        "\n{} Wrote {} bundle(s) in {}\n",
        "✓".green().bold(),
        report.written().count(),
        format_duration(start.elapsed())
    );

    for bundle in report.written() {
        eprintln!(
            "  {} {} {} {}",
            "•".dimmed(),
            bundle.path.display().to_string().cyan(),
            format_size(bundle.size).dimmed(),
            format!("{} modules, {} assets", bundle.module_count, bundle.assets_copied).dimmed()
        );
    }
    for (name, error) in report.failures() {
        eprintln!("  {} {} {}", "✗".red(), name.red(), error);
    }
    if let Some(manifest) = &report.manifest {
        eprintln!("  {} {}", "•".dimmed(), manifest.display().to_string().dimmed());
    }

    eprintln!();
}

/// Print the final status of a run
pub(super) fn print_status(status: &RunStatus) {
    match status {
        RunStatus::Succeeded => eprintln!("{} Done", "✓".green().bold()),
        RunStatus::PartiallySucceeded { warnings } => {
            for warning in warnings {
                eprintln!("{} {}", "!".yellow().bold(), warning);
            }
            eprintln!(
                "{} Partially succeeded with {} warning(s)",
                "!".yellow().bold(),
                warnings.len()
            );
        }
        RunStatus::Failed { cause } => eprintln!("{} Failed: {}", "✗".red().bold(), cause),
    }
}
