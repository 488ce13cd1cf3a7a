//! Error taxonomy for a split run
//!
//! Table-level errors abort the run. Bundle-level errors abort one bundle,
//! asset-level errors one asset copy.

use std::io;
use std::path::PathBuf;

use crate::bundler::ModuleId;
use crate::recognizer::{ByteRange, ParseError};

#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("failed to recognize bundle statements: {0}")]
    Recognize(#[from] ParseError),

    #[error("malformed module statement at {range}: {reason}")]
    MalformedModuleStatement { range: ByteRange, reason: String },

    #[error("module id {id} is defined twice (second definition at {range})")]
    DuplicateModuleId { id: ModuleId, range: ByteRange },

    #[error(
        "{referrer} in bundle `{bundle}` references module {target}, \
         which is not in the module table"
    )]
    DanglingReference {
        referrer: String,
        target: ModuleId,
        bundle: String,
    },

    #[error("cannot find {pattern} in module {module_id} while emitting bundle `{bundle}`")]
    MissingStructure {
        module_id: ModuleId,
        bundle: String,
        pattern: &'static str,
    },

    #[error("no platform density matches scale {scale} of asset {asset}")]
    UnsupportedScale { scale: f64, asset: String },

    #[error("asset file {} of module {module_id} does not exist", path.display())]
    MissingSourceAsset { module_id: ModuleId, path: PathBuf },

    #[error("asset path `{path}` of module {module_id} leaves the asset directory")]
    UnsafeAssetPath { module_id: ModuleId, path: String },

    #[error("{role} pattern `{pattern}` matches no module")]
    UnmatchedPattern { role: String, pattern: String },

    #[error("invalid glob `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to serialize asset descriptor: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SplitError {
    /// Whether the error only affects one asset copy
    pub fn is_asset_level(&self) -> bool {
        matches!(
            self,
            SplitError::UnsupportedScale { .. }
                | SplitError::MissingSourceAsset { .. }
                | SplitError::UnsafeAssetPath { .. }
        )
    }
}

pub type Result<T, E = SplitError> = std::result::Result<T, E>;
