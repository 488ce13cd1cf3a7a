//! Outcome of a split run

use std::fmt;
use std::path::PathBuf;

use crate::bundler::ModuleId;
use crate::error::SplitError;
use crate::recognizer::ByteRange;

/// Something unexpected that did not stop the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// A top-level statement that matched no known shape and was dropped
    UnparsedStatement { range: ByteRange, preview: String },
    /// Runtime bootstrap code found after the first module definition, dropped
    MisplacedBootstrap { range: ByteRange, preview: String },
    MissingRuntimeEntry,
    AssetWithoutDescriptor { module_id: ModuleId, name: String },
    /// A dependency id with no module definition, skipped during closure
    UnknownDependency { module_id: ModuleId, target: ModuleId },
    /// Modules reachable from neither base nor any secondary entry
    UnplacedModules { ids: Vec<ModuleId> },
    /// A secondary entry module that base already pulled in
    EntryAbsorbedByBase { bundle: String, module_id: ModuleId },
    UnmatchedInclude { pattern: String },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::UnparsedStatement { range, preview } => {
                write!(f, "dropped unrecognized statement at {}: {}", range, preview)
            }
            Anomaly::MisplacedBootstrap { range, preview } => {
                write!(
                    f,
                    "dropped bootstrap code after module definitions at {}: {}",
                    range, preview
                )
            }
            Anomaly::MissingRuntimeEntry => f.write_str(
                "cannot find the react-native entry module; base starts from the base entry only",
            ),
            Anomaly::AssetWithoutDescriptor { module_id, name } => {
                write!(f, "asset module {} ({}) has no readable descriptor", module_id, name)
            }
            Anomaly::UnknownDependency { module_id, target } => {
                write!(f, "module {} depends on unknown module {}", module_id, target)
            }
            Anomaly::UnplacedModules { ids } => {
                write!(f, "{} module(s) belong to no bundle: {:?}", ids.len(), ids)
            }
            Anomaly::EntryAbsorbedByBase { bundle, module_id } => write!(
                f,
                "entry module {} of bundle `{}` is already part of base",
                module_id, bundle
            ),
            Anomaly::UnmatchedInclude { pattern } => {
                write!(f, "base include pattern `{}` matches no module", pattern)
            }
        }
    }
}

/// What happened to one output bundle
#[derive(Debug)]
pub enum BundleOutcome {
    Written(WrittenBundle),
    Failed { name: String, error: SplitError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenBundle {
    pub name: String,
    pub path: PathBuf,
    pub size: usize,
    pub module_count: usize,
    pub hash: String,
    /// Name of the module the bundle bootstraps, for secondary bundles
    pub entry: Option<String>,
    pub assets_copied: usize,
}

impl BundleOutcome {
    pub fn name(&self) -> &str {
        match self {
            BundleOutcome::Written(bundle) => &bundle.name,
            BundleOutcome::Failed { name, .. } => name,
        }
    }
}

/// Final status of a run, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    PartiallySucceeded { warnings: Vec<String> },
    Failed { cause: String },
}

impl RunStatus {
    pub fn from_error(error: &SplitError) -> Self {
        RunStatus::Failed {
            cause: error.to_string(),
        }
    }
}

/// Everything a run produced and ran into
#[derive(Debug, Default)]
pub struct SplitReport {
    pub bundles: Vec<BundleOutcome>,
    pub anomalies: Vec<Anomaly>,
    /// Per-asset problems; the bundle itself was still written
    pub asset_warnings: Vec<SplitError>,
    pub manifest: Option<PathBuf>,
}

impl SplitReport {
    pub fn written(&self) -> impl Iterator<Item = &WrittenBundle> {
        self.bundles.iter().filter_map(|outcome| match outcome {
            BundleOutcome::Written(bundle) => Some(bundle),
            BundleOutcome::Failed { .. } => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &SplitError)> {
        self.bundles.iter().filter_map(|outcome| match outcome {
            BundleOutcome::Failed { name, error } => Some((name.as_str(), error)),
            BundleOutcome::Written(_) => None,
        })
    }

    /// Whether any bundle could not be produced
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn status(&self) -> RunStatus {
        let mut warnings: Vec<String> = self
            .failures()
            .map(|(name, error)| format!("bundle `{}` failed: {}", name, error))
            .collect();
        warnings.extend(self.asset_warnings.iter().map(ToString::to_string));
        warnings.extend(self.anomalies.iter().map(ToString::to_string));

        if warnings.is_empty() {
            RunStatus::Succeeded
        } else {
            RunStatus::PartiallySucceeded { warnings }
        }
    }
}
