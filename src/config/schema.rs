//! Configuration schema definitions

use std::fmt;

use serde::{Deserialize, Serialize};

/// Target platform of the bundle, which decides where assets live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Android,
    Ios,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Android => f.write_str("android"),
            Platform::Ios => f.write_str("ios"),
        }
    }
}

/// Where the monolithic bundle and its assets come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Bundle produced by the upstream bundler
    #[serde(default = "default_input_bundle")]
    pub bundle: String,

    /// Flat asset directory written by the upstream bundler
    #[serde(default = "default_input_assets")]
    pub assets: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            bundle: default_input_bundle(),
            assets: default_input_assets(),
        }
    }
}

fn default_input_bundle() -> String {
    "build/bundle/index.bundle".to_string()
}

fn default_input_assets() -> String {
    "build/bundle".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory, one sub-directory per bundle
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// File name of the bundle text inside each bundle directory
    #[serde(default = "default_bundle_file")]
    pub bundle_file: String,

    /// Write manifest.json describing the produced bundles
    #[serde(default = "default_true")]
    pub manifest: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            bundle_file: default_bundle_file(),
            manifest: true,
        }
    }
}

fn default_output_dir() -> String {
    "build/split".to_string()
}

fn default_bundle_file() -> String {
    "index.bundle".to_string()
}

fn default_true() -> bool {
    true
}

/// The shared base bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Glob matching the base entry module
    pub index: String,

    /// Globs of modules forced into base together with their dependencies
    #[serde(default)]
    pub includes: Vec<String>,

    /// The bundle was built from the shim written by `splitpack inject`, so
    /// the base entry module carries the shim suffix
    #[serde(default = "default_true")]
    pub shim: bool,
}

/// A feature bundle loaded on demand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomEntryConfig {
    /// Bundle name, also the output sub-directory
    pub name: String,

    /// Glob matching the entry module
    pub index: String,

    /// Require the entry from the base entry shim fed to the upstream bundler
    #[serde(default = "default_true")]
    pub inject: bool,
}

/// A configured secondary entry, globs fully resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryEntry {
    pub name: String,
    pub index_glob: String,
}

/// Everything the closure engine and emitter need to partition a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionConfig {
    /// Glob matched against module names to find the base entry
    pub base_entry_name: String,
    pub base_include_patterns: Vec<String>,
    pub secondary_entries: Vec<SecondaryEntry>,
    pub platform: Platform,
    pub dev_mode: bool,
}

impl PartitionConfig {
    /// Without secondary entries everything outside base lands in one remainder bundle
    pub fn is_partitioned(&self) -> bool {
        !self.secondary_entries.is_empty()
    }
}
