//! Copying asset files into each bundle's own asset tree

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{resolve_asset_paths, AssetDescriptor};
use crate::bundler::ModuleId;
use crate::config::Platform;
use crate::error::SplitError;

/// One scheduled file copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCopy {
    pub module_id: ModuleId,
    /// Path relative to both the source asset dir and the bundle dir
    pub relative_path: String,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Schedules and performs asset copies for emitted bundles
#[derive(Debug, Clone)]
pub struct Relocator {
    /// Flat asset output of the upstream bundler
    source_root: PathBuf,
    /// Directory holding one sub-directory per bundle
    output_root: PathBuf,
    platform: Platform,
}

impl Relocator {
    pub fn new(
        source_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        platform: Platform,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            platform,
        }
    }

    /// Work out every copy needed to move an asset into `bundle`
    ///
    /// Paths that climb out of the asset tree are rejected.
    pub fn schedule(
        &self,
        module_id: ModuleId,
        asset: &AssetDescriptor,
        bundle: &str,
    ) -> Result<Vec<AssetCopy>, SplitError> {
        let relative_paths = resolve_asset_paths(asset, self.platform)?;
        debug!(
            "Asset {} resolves to {} file(s) for {}",
            asset.name,
            relative_paths.len(),
            bundle
        );

        let bundle_root = self.output_root.join(bundle);
        relative_paths
            .into_iter()
            .map(|relative_path| {
                match (
                    join_relative(&self.source_root, &relative_path),
                    join_relative(&bundle_root, &relative_path),
                ) {
                    (Some(source), Some(destination)) => Ok(AssetCopy {
                        module_id,
                        relative_path,
                        source,
                        destination,
                    }),
                    _ => Err(SplitError::UnsafeAssetPath {
                        module_id,
                        path: relative_path,
                    }),
                }
            })
            .collect()
    }

    /// Perform scheduled copies, returning the ones that failed
    ///
    /// A missing source file skips that copy only.
    pub fn perform(&self, copies: &[AssetCopy]) -> Vec<SplitError> {
        let mut failures = Vec::new();
        for copy in copies {
            if let Err(err) = copy_one(copy) {
                warn!("{}", err);
                failures.push(err);
            }
        }
        failures
    }
}

fn copy_one(copy: &AssetCopy) -> Result<(), SplitError> {
    if !copy.source.is_file() {
        return Err(SplitError::MissingSourceAsset {
            module_id: copy.module_id,
            path: copy.source.clone(),
        });
    }
    if let Some(parent) = copy.destination.parent() {
        fs::create_dir_all(parent).map_err(|source| SplitError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::copy(&copy.source, &copy.destination).map_err(|source| SplitError::Io {
        path: copy.destination.clone(),
        source,
    })?;
    info!(
        "[Resource] Move resource {} to {}",
        copy.source.display(),
        copy.destination.display()
    );
    Ok(())
}

/// Join `/`-separated segments under `root`, refusing `..`
fn join_relative(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for part in relative.split('/') {
        match part {
            "" | "." => {}
            ".." => return None,
            part => path.push(part),
        }
    }
    Some(path)
}
