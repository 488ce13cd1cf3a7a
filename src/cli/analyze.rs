//! Analyze command implementation

use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::split::{print_status, SplitOptions};
use crate::bundler::{BundleSpec, SplitPlan, Splitter};
use crate::report::RunStatus;
use crate::utils::format_size;

/// Show how the bundle would be split without writing anything
#[derive(Args, Debug)]
pub struct AnalyzeCommand {
    #[command(flatten)]
    pub options: SplitOptions,

    /// List the module names of every bundle
    #[arg(short, long)]
    pub modules: bool,
}

impl AnalyzeCommand {
    pub fn execute(&self, config_path: &str) -> Result<ExitCode> {
        let config = super::load_config(config_path, &self.options)?;
        let input = config.input_bundle();
        let source = fs::read_to_string(&input)
            .with_context(|| format!("Failed to read bundle: {}", input.display()))?;

        eprintln!(
            "{} Analyzing {} ({})...",
            "→".blue(),
            input.display(),
            format_size(source.len())
        );

        let plan = match Splitter::from_config(&config).plan(&source) {
            Ok(plan) => plan,
            Err(err) => {
                print_status(&RunStatus::from_error(&err));
                return Ok(ExitCode::FAILURE);
            }
        };

        eprintln!(
            "\n  {} modules, {} bootstrap statement(s), {} trailing invocation(s)\n",
            plan.build.table.len(),
            plan.build.leading.len(),
            plan.build.trailing.len()
        );
        for bundle in plan.partition.bundles() {
            self.print_bundle(&plan, bundle);
        }

        let anomalies: Vec<String> = plan.anomalies().map(ToString::to_string).collect();
        eprintln!();
        if anomalies.is_empty() {
            print_status(&RunStatus::Succeeded);
        } else {
            print_status(&RunStatus::PartiallySucceeded { warnings: anomalies });
        }

        Ok(ExitCode::SUCCESS)
    }

    fn print_bundle(&self, plan: &SplitPlan, bundle: &BundleSpec) {
        let entry = bundle
            .entry_module_id
            .and_then(|id| plan.build.table.get(id))
            .map(|module| format!(" (entry {})", module.name))
            .unwrap_or_default();
        eprintln!(
            "  {} {} {}{}",
            "•".dimmed(),
            bundle.name.cyan(),
            format!("{} modules", bundle.len()).dimmed(),
            entry.dimmed()
        );

        if self.modules {
            for module in plan.build.table.iter().filter(|m| bundle.contains(m.id)) {
                eprintln!("      {} {}", format!("{:>5}", module.id).dimmed(), module.name);
            }
        }
    }
}
