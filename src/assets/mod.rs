//! Asset modules
//!
//! Asset modules carry a descriptor of a binary resource instead of code.
//! When the module is emitted into a bundle, its descriptor is tagged with
//! the bundle name and the resource files are copied next to that bundle.

mod paths;
mod relocate;

use std::str::FromStr;

use serde::Serialize;
use serde_json::Number;

use crate::recognizer::{ByteRange, LiteralValue, ObjectLiteral};

pub use paths::{android_resource_identifier, format_scale, resolve_asset_paths};
pub use relocate::{AssetCopy, Relocator};

/// File extensions of modules that describe media resources
pub const ASSET_EXTENSIONS: &[&str] = &[
    // Images
    "bmp", "gif", "jpg", "jpeg", "png", "psd", "svg", "webp",
    // Video
    "m4v", "mov", "mp4", "mpeg", "mpg", "webm",
    // Audio
    "aac", "aiff", "caf", "m4a", "mp3", "wav",
    // Documents
    "html", "pdf",
];

/// Whether a module name refers to a media resource
pub fn is_asset_module(module_name: &str) -> bool {
    module_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ASSET_EXTENSIONS.contains(&ext))
}

/// The descriptor an asset module registers at runtime
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetDescriptor {
    #[serde(rename = "httpServerLocation")]
    pub server_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Number>,
    /// Ascending density scales, kept as written so they serialize unchanged
    pub scales: Vec<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    /// Location of the descriptor literal, relative to the module statement
    #[serde(skip)]
    pub body_range: ByteRange,
}

#[derive(Serialize)]
struct TaggedDescriptor<'a> {
    #[serde(flatten)]
    descriptor: &'a AssetDescriptor,
    bundle: &'a str,
}

impl AssetDescriptor {
    /// Build a descriptor from a parsed object literal
    ///
    /// Returns `None` when a required field is missing or not a literal.
    pub fn from_literal(literal: &ObjectLiteral, module_start: usize) -> Option<Self> {
        let string = |key: &str| match literal.get(key) {
            Some(LiteralValue::Str(s)) => Some(s.clone()),
            _ => None,
        };
        let number = |key: &str| match literal.get(key) {
            Some(LiteralValue::Number(raw)) => Number::from_str(raw).ok(),
            _ => None,
        };

        let scales = match literal.get("scales") {
            Some(LiteralValue::Array(items)) => items
                .iter()
                .map(|item| match item {
                    LiteralValue::Number(raw) => Number::from_str(raw).ok(),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()?,
            _ => return None,
        };

        Some(Self {
            server_location: string("httpServerLocation")?,
            width: number("width"),
            height: number("height"),
            scales,
            hash: string("hash"),
            name: string("name")?,
            file_type: string("type")?,
            body_range: literal.range.relative_to(module_start),
        })
    }

    pub fn scale_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.scales.iter().filter_map(Number::as_f64)
    }

    /// Serialize the descriptor with a `bundle` field naming its new home
    pub fn to_tagged_json(&self, bundle: &str) -> serde_json::Result<String> {
        serde_json::to_string(&TaggedDescriptor {
            descriptor: self,
            bundle,
        })
    }

    /// Server location without its leading slash
    pub fn base_path(&self) -> &str {
        self.server_location.strip_prefix('/').unwrap_or(&self.server_location)
    }
}

#[cfg(test)]
pub(crate) fn sample_descriptor(scales: &[&str]) -> AssetDescriptor {
    AssetDescriptor {
        server_location: "/assets/src/assets".to_string(),
        width: Some(Number::from(960)),
        height: Some(Number::from(540)),
        scales: scales.iter().map(|s| Number::from_str(s).unwrap()).collect(),
        hash: Some("58152c62118ac492f12163c5521041fd".to_string()),
        name: "naruto".to_string(),
        file_type: "jpeg".to_string(),
        body_range: ByteRange::default(),
    }
}
