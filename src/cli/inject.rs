//! Inject command implementation
//!
//! The upstream bundler only includes modules reachable from its entry file.
//! Feature entries are made reachable by bundling a copy of the base entry
//! that also requires each of them.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::{debug, info};

use crate::config::Config;

/// Write `<base index>.tmp` for the upstream bundler
#[derive(Args, Debug)]
pub struct InjectCommand {
    /// Write the shim here instead of next to the base entry
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InjectCommand {
    pub fn execute(&self, config_path: &str) -> Result<ExitCode> {
        info!("Loading configuration from {}", config_path);
        let config = Config::load(config_path)?;

        let base_index = config.base_index_path();
        let base_source = fs::read_to_string(&base_index)
            .with_context(|| format!("Failed to read base entry: {}", base_index.display()))?;

        let entries: Vec<PathBuf> = config
            .custom
            .iter()
            .filter(|entry| entry.inject)
            .map(|entry| config.root.join(&entry.index))
            .collect();
        for entry in &entries {
            debug!("Inject {}", entry.display());
        }

        let shim = self.output.clone().unwrap_or_else(|| config.shim_path());
        fs::write(&shim, injection_source(&base_source, &entries))
            .with_context(|| format!("Failed to write {}", shim.display()))?;

        eprintln!(
            "{} Injected {} entr{} into {}",
            "✓".green().bold(),
            entries.len(),
            if entries.len() == 1 { "y" } else { "ies" },
            shim.display().to_string().cyan()
        );
        Ok(ExitCode::SUCCESS)
    }
}

/// Base entry source followed by a require of `AppRegistry` and of every entry
pub fn injection_source(base_source: &str, entries: &[PathBuf]) -> String {
    let mut source = String::with_capacity(base_source.len() + 64);
    source.push_str(base_source);
    source.push_str("\n\nrequire('AppRegistry')\n");
    for entry in entries {
        source.push_str(&format!("require('{}');\n", entry.display()));
    }
    source
}
