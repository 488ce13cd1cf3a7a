//! Core splitter implementation
//!
//! Recognizes the statements of a monolithic bundle, builds the module
//! table, partitions it and writes one bundle per partition set.

mod chunk;
mod closure;
mod emit;
mod graph;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::assets::Relocator;
use crate::config::{Config, PartitionConfig};
use crate::error::SplitError;
use crate::recognizer::{ScriptRecognizer, StatementRecognizer};
use crate::report::{Anomaly, BundleOutcome, SplitReport, WrittenBundle};
use crate::utils::hash_content;

pub use chunk::{BundleKind, BundleSpec, REMAINDER_BUNDLE};
pub use closure::{partition, Partition};
pub use emit::{EmittedBundle, Emitter};
pub use graph::{
    build_module_table, is_runtime_entry, InvocationStatement, ModuleId, ModuleRecord, ModuleTable,
    TableBuild, RUNTIME_ENTRY_NAMES,
};

const MANIFEST_FILE: &str = "manifest.json";

/// Where split output goes
#[derive(Debug, Clone)]
pub struct OutputLayout {
    /// Directory holding one sub-directory per bundle
    pub output_dir: PathBuf,

    /// File name of the bundle inside its directory
    pub bundle_file: String,

    /// Upstream asset directory
    pub asset_dir: PathBuf,

    /// Write `manifest.json` next to the bundle directories
    pub manifest: bool,
}

/// Module table and partition of one input bundle
#[derive(Debug)]
pub struct SplitPlan {
    pub build: TableBuild,
    pub partition: Partition,
}

impl SplitPlan {
    /// Anomalies from table construction and partitioning, in that order
    pub fn anomalies(&self) -> impl Iterator<Item = &Anomaly> {
        self.build.anomalies.iter().chain(self.partition.anomalies.iter())
    }
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    file: String,
    size: usize,
    modules: usize,
    hash: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<&'a str>,
}

/// The main splitter
pub struct Splitter {
    partition_config: PartitionConfig,
    layout: OutputLayout,
    recognizer: Box<dyn StatementRecognizer>,
}

impl Splitter {
    /// Create a splitter using the built-in statement recognizer
    pub fn new(partition_config: PartitionConfig, layout: OutputLayout) -> Self {
        Self {
            partition_config,
            layout,
            recognizer: Box::new(ScriptRecognizer),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.partition(),
            OutputLayout {
                output_dir: config.output_dir(),
                bundle_file: config.output.bundle_file.clone(),
                asset_dir: config.asset_dir(),
                manifest: config.output.manifest,
            },
        )
    }

    /// Replace the statement recognizer
    pub fn with_recognizer(mut self, recognizer: impl StatementRecognizer + 'static) -> Self {
        self.recognizer = Box::new(recognizer);
        self
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Build the module table and partition it, without writing anything
    pub fn plan(&self, source: &str) -> Result<SplitPlan, SplitError> {
        info!("Recognizing bundle statements...");
        let statements = self.recognizer.recognize(source)?;
        debug!("Recognized {} statement(s)", statements.len());

        info!("Building module table...");
        let build = build_module_table(source, &statements)?;

        info!("Partitioning modules...");
        let partition = partition(&build.table, &self.partition_config)?;

        Ok(SplitPlan { build, partition })
    }

    /// Split the bundle at `path`
    pub fn split_file(&self, path: &Path) -> Result<SplitReport, SplitError> {
        let source = fs::read_to_string(path).map_err(|source| SplitError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.split(&source)
    }

    /// Split `source` and write every bundle
    ///
    /// Errors in the table or partition abort the run. A bundle that fails to
    /// emit is recorded in the report and the remaining bundles are still
    /// written.
    pub fn split(&self, source: &str) -> Result<SplitReport, SplitError> {
        let start = Instant::now();
        let mut plan = self.plan(source)?;

        let mut report = SplitReport {
            anomalies: std::mem::take(&mut plan.build.anomalies),
            ..Default::default()
        };
        report.anomalies.append(&mut plan.partition.anomalies);

        create_dir(&self.layout.output_dir)?;
        let relocator = Relocator::new(
            &self.layout.asset_dir,
            &self.layout.output_dir,
            self.partition_config.platform,
        );
        let emitter = Emitter::new(
            source,
            &plan.build,
            &plan.partition,
            &relocator,
            self.partition_config.dev_mode,
        );

        for bundle in plan.partition.bundles() {
            info!("====== Split {} ======", bundle.name);
            let outcome = emitter.emit(bundle).and_then(|emitted| {
                self.write_bundle(emitted, &relocator, &mut report.asset_warnings)
            });
            report.bundles.push(match outcome {
                Ok(written) => BundleOutcome::Written(written),
                Err(error) => {
                    error!("Bundle {} failed: {}", bundle.name, error);
                    BundleOutcome::Failed {
                        name: bundle.name.clone(),
                        error,
                    }
                }
            });
        }

        if self.layout.manifest {
            report.manifest = Some(self.write_manifest(&report)?);
        }

        debug!("Split completed in {:?}", start.elapsed());
        Ok(report)
    }

    fn write_bundle(
        &self,
        emitted: EmittedBundle,
        relocator: &Relocator,
        asset_warnings: &mut Vec<SplitError>,
    ) -> Result<WrittenBundle, SplitError> {
        let dir = self.layout.output_dir.join(&emitted.name);
        create_dir(&dir)?;
        let path = dir.join(&self.layout.bundle_file);
        fs::write(&path, &emitted.text).map_err(|source| SplitError::Io {
            path: path.clone(),
            source,
        })?;
        info!("[Code] Write code to {}", path.display());

        asset_warnings.extend(emitted.asset_warnings);
        let failures = relocator.perform(&emitted.copies);
        let assets_copied = emitted.copies.len() - failures.len();
        asset_warnings.extend(failures);

        Ok(WrittenBundle {
            hash: hash_content(emitted.text.as_bytes()),
            size: emitted.text.len(),
            name: emitted.name,
            path,
            module_count: emitted.module_count,
            entry: emitted.entry_name,
            assets_copied,
        })
    }

    /// Write `manifest.json` describing every written bundle
    fn write_manifest(&self, report: &SplitReport) -> Result<PathBuf, SplitError> {
        let manifest: BTreeMap<&str, ManifestEntry> = report
            .written()
            .map(|bundle| {
                let entry = ManifestEntry {
                    file: format!("{}/{}", bundle.name, self.layout.bundle_file),
                    size: bundle.size,
                    modules: bundle.module_count,
                    hash: &bundle.hash,
                    entry: bundle.entry.as_deref(),
                };
                (bundle.name.as_str(), entry)
            })
            .collect();

        let path = self.layout.output_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(&path, json).map_err(|source| SplitError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

fn create_dir(path: &Path) -> Result<(), SplitError> {
    fs::create_dir_all(path).map_err(|source| SplitError::Io {
        path: path.to_path_buf(),
        source,
    })
}
