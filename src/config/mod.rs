//! Configuration handling for splitpack
//!
//! Parses `splitpack.toml`, or a JSON file with the same layout
//! (`{package, base: {index, includes}, custom: [..]}`).

mod schema;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::{clean_path, glob_matcher};

pub use schema::*;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Package name joined in front of every module glob
    #[serde(default)]
    pub package: Option<String>,

    #[serde(default)]
    pub platform: Platform,

    /// Split a development bundle
    #[serde(default)]
    pub dev: bool,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,

    pub base: BaseConfig,

    /// Secondary entries, one bundle each
    #[serde(default)]
    pub custom: Vec<CustomEntryConfig>,

    /// Root directory (computed from config file location)
    #[serde(skip)]
    pub root: PathBuf,
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub platform: Option<Platform>,
    pub dev: Option<bool>,
    pub output: Option<PathBuf>,
    pub bundle: Option<PathBuf>,
    pub assets: Option<PathBuf>,
}

/// Name reserved for the shared bundle
pub const BASE_BUNDLE: &str = "base";

/// Appended to the base entry file name to form the injection shim
pub const SHIM_SUFFIX: &str = ".tmp";

impl Config {
    /// Load configuration from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let canonical_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let content = fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read config file: {}", canonical_path.display()))?;

        let is_json = canonical_path.extension().is_some_and(|ext| ext == "json");
        let mut config: Config = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", canonical_path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", canonical_path.display()))?
        };

        // Set root directory to the directory containing the config file
        config.root = canonical_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base.index.trim().is_empty() {
            anyhow::bail!("`base.index` must name the base entry module");
        }

        let mut names = HashSet::new();
        for entry in &self.custom {
            if entry.name.trim().is_empty() {
                anyhow::bail!("Custom entry for `{}` has an empty name", entry.index);
            }
            if entry.name == BASE_BUNDLE {
                anyhow::bail!(
                    "Custom entry name `{}` is reserved for the base bundle",
                    BASE_BUNDLE
                );
            }
            if entry.name.contains(['/', '\\']) || entry.name == "." || entry.name == ".." {
                anyhow::bail!("Custom entry name `{}` must be a plain directory name", entry.name);
            }
            if !names.insert(entry.name.as_str()) {
                anyhow::bail!("Custom entry name `{}` is used twice", entry.name);
            }
        }

        let partition = self.partition();
        let patterns = std::iter::once(&partition.base_entry_name)
            .chain(&partition.base_include_patterns)
            .chain(partition.secondary_entries.iter().map(|e| &e.index_glob));
        for pattern in patterns {
            glob_matcher(pattern)?;
        }

        Ok(())
    }

    /// Apply command-line overrides
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(platform) = overrides.platform {
            self.platform = platform;
        }
        if let Some(dev) = overrides.dev {
            self.dev = dev;
        }
        if let Some(output) = &overrides.output {
            self.output.dir = output.display().to_string();
        }
        if let Some(bundle) = &overrides.bundle {
            self.input.bundle = bundle.display().to_string();
        }
        if let Some(assets) = &overrides.assets {
            self.input.assets = assets.display().to_string();
        }
    }

    /// Module glob with the package name in front, when one is configured
    pub fn module_glob(&self, pattern: &str) -> String {
        match self.package.as_deref().filter(|p| !p.is_empty()) {
            Some(package) => clean_path(&format!("{}/{}", package, pattern)),
            None => pattern.to_string(),
        }
    }

    /// The partition settings derived from this configuration
    pub fn partition(&self) -> PartitionConfig {
        PartitionConfig {
            base_entry_name: self.module_glob(&self.base_entry_module()),
            base_include_patterns: self.base.includes.iter().map(|p| self.module_glob(p)).collect(),
            secondary_entries: self
                .custom
                .iter()
                .map(|entry| SecondaryEntry {
                    name: entry.name.clone(),
                    index_glob: self.module_glob(&entry.index),
                })
                .collect(),
            platform: self.platform,
            dev_mode: self.dev,
        }
    }

    /// Absolute path of the monolithic input bundle
    pub fn input_bundle(&self) -> PathBuf {
        self.root.join(&self.input.bundle)
    }

    /// Absolute path of the upstream asset directory
    pub fn asset_dir(&self) -> PathBuf {
        self.root.join(&self.input.assets)
    }

    /// Get the absolute output directory path
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.output.dir)
    }

    /// Absolute path of the base entry source file
    pub fn base_index_path(&self) -> PathBuf {
        self.root.join(&self.base.index)
    }

    /// Absolute path of the injection shim
    pub fn shim_path(&self) -> PathBuf {
        self.root.join(format!("{}{}", self.base.index, SHIM_SUFFIX))
    }

    /// Base entry as named inside the bundle
    fn base_entry_module(&self) -> String {
        if self.base.shim {
            format!("{}{}", self.base.index, SHIM_SUFFIX)
        } else {
            self.base.index.clone()
        }
    }
}
