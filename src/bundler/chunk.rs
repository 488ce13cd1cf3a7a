//! Output bundle descriptions

use std::collections::HashSet;

use super::ModuleId;

/// Name of the catch-all bundle used when no secondary entries are configured
pub const REMAINDER_BUNDLE: &str = "business";

/// Role of an output bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    /// Shared runtime bundle - loaded first, carries bootstrap code
    Base,
    /// Feature bundle - loaded on demand, bootstraps its entry module
    Secondary,
    /// Everything outside base when the bundle is not partitioned
    Remainder,
}

/// A set of modules that will be emitted together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSpec {
    /// Bundle name (used for the output directory)
    pub name: String,

    pub kind: BundleKind,

    /// Module IDs included in this bundle
    pub module_ids: HashSet<ModuleId>,

    /// Module required at the end of a secondary bundle
    pub entry_module_id: Option<ModuleId>,
}

impl BundleSpec {
    pub fn base(module_ids: HashSet<ModuleId>) -> Self {
        Self {
            name: crate::config::BASE_BUNDLE.to_string(),
            kind: BundleKind::Base,
            module_ids,
            entry_module_id: None,
        }
    }

    pub fn secondary(name: String, entry: ModuleId, module_ids: HashSet<ModuleId>) -> Self {
        Self {
            name,
            kind: BundleKind::Secondary,
            module_ids,
            entry_module_id: Some(entry),
        }
    }

    pub fn remainder(module_ids: HashSet<ModuleId>) -> Self {
        Self {
            name: REMAINDER_BUNDLE.to_string(),
            kind: BundleKind::Remainder,
            module_ids,
            entry_module_id: None,
        }
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.module_ids.contains(&id)
    }

    /// Check if bundle is empty
    pub fn is_empty(&self) -> bool {
        self.module_ids.is_empty()
    }

    /// Number of modules in bundle
    pub fn len(&self) -> usize {
        self.module_ids.len()
    }
}
