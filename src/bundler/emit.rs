//! Bundle text generation
//!
//! Each output bundle is rebuilt from slices of the source bundle. Numeric
//! module references are rewritten to module names so that bundles can be
//! loaded independently of the ids the upstream bundler assigned.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::chunk::{BundleKind, BundleSpec};
use super::closure::Partition;
use super::graph::{InvocationStatement, ModuleId, ModuleRecord, TableBuild};
use crate::assets::{AssetCopy, Relocator};
use crate::error::SplitError;
use crate::recognizer::{find_dev_guard, ByteRange};
use crate::utils::quote;

/// Development flag assignment left in the bootstrap of a development build
static DEV_FLAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"global\.__DEV__\s?=\s?true").unwrap());

const DEV_FLAG_OFF: &str = "global.__DEV__ = false";

/// Position of the require polyfill among the bootstrap statements
const REQUIRE_POLYFILL_INDEX: usize = 1;

/// Separator between code fragments of a bundle
const MODULE_SEPARATOR: &str = "\n";

/// Text and side effects of one emitted bundle
#[derive(Debug)]
pub struct EmittedBundle {
    pub name: String,
    pub text: String,
    pub module_count: usize,
    /// Name of the module a secondary bundle bootstraps
    pub entry_name: Option<String>,
    /// Asset files to copy next to the bundle
    pub copies: Vec<AssetCopy>,
    /// Assets whose files could not be located
    pub asset_warnings: Vec<SplitError>,
}

/// Emits bundles for the sets of a partition
pub struct Emitter<'a> {
    source: &'a str,
    build: &'a TableBuild,
    partition: &'a Partition,
    relocator: &'a Relocator,
    dev_mode: bool,
    secondary_entries: HashSet<ModuleId>,
}

impl<'a> Emitter<'a> {
    pub fn new(
        source: &'a str,
        build: &'a TableBuild,
        partition: &'a Partition,
        relocator: &'a Relocator,
        dev_mode: bool,
    ) -> Self {
        Self {
            source,
            build,
            partition,
            relocator,
            dev_mode,
            secondary_entries: partition.secondary_entry_ids(),
        }
    }

    /// Produce the text of one bundle
    ///
    /// Modules appear in the order the source bundle defined them.
    pub fn emit(&self, bundle: &BundleSpec) -> Result<EmittedBundle, SplitError> {
        let mut emitted = EmittedBundle {
            name: bundle.name.clone(),
            text: String::new(),
            module_count: 0,
            entry_name: None,
            copies: Vec::new(),
            asset_warnings: Vec::new(),
        };
        let mut codes = Vec::new();

        if bundle.kind == BundleKind::Base {
            let mut dev_flag_pending = !self.dev_mode;
            for (index, range) in self.build.leading.iter().enumerate() {
                codes.push(self.bootstrap_code(index, *range, &mut dev_flag_pending)?);
            }
        }

        for module in self.build.table.iter().filter(|m| bundle.contains(m.id)) {
            codes.push(self.module_code(module, bundle, &mut emitted)?);
            emitted.module_count += 1;
        }

        match bundle.kind {
            BundleKind::Base => {
                for statement in &self.build.trailing {
                    codes.push(self.trailing_code(statement, bundle)?);
                }
            }
            BundleKind::Secondary => {
                if let Some(entry) = bundle.entry_module_id {
                    let module = self.build.table.get(entry).ok_or_else(|| {
                        SplitError::DanglingReference {
                            referrer: "bundle entry".to_string(),
                            target: entry,
                            bundle: bundle.name.clone(),
                        }
                    })?;
                    codes.push(format!("\nrequire({});", quote(&module.name)));
                    emitted.entry_name = Some(module.name.clone());
                }
            }
            BundleKind::Remainder => {}
        }

        emitted.text = codes.join(MODULE_SEPARATOR);
        Ok(emitted)
    }

    fn bootstrap_code(
        &self,
        index: usize,
        range: ByteRange,
        dev_flag_pending: &mut bool,
    ) -> Result<String, SplitError> {
        let mut code = range.slice(self.source).to_string();

        if index == REQUIRE_POLYFILL_INDEX {
            if let Some(guard) = find_dev_guard(&code, self.dev_mode)? {
                debug!("Strip development guard {}", preview_range(&code, guard));
                code = splice(&code, vec![(guard, String::new())]);
            }
        }

        if *dev_flag_pending {
            if let Some(flag) = DEV_FLAG.find(&code) {
                debug!("Replace {} with {}", flag.as_str(), DEV_FLAG_OFF);
                code = format!("{}{}{}", &code[..flag.start()], DEV_FLAG_OFF, &code[flag.end()..]);
                *dev_flag_pending = false;
            }
        }

        Ok(code)
    }

    fn module_code(
        &self,
        module: &ModuleRecord,
        bundle: &BundleSpec,
        emitted: &mut EmittedBundle,
    ) -> Result<String, SplitError> {
        let code = module.code(self.source);
        let mut edits = vec![(module.id_literal_range, quote(&module.name))];

        if module.is_asset {
            let asset = module.asset.as_ref().ok_or_else(|| SplitError::MissingStructure {
                module_id: module.id,
                bundle: bundle.name.clone(),
                pattern: "asset descriptor",
            })?;
            edits.push((asset.body_range, asset.to_tagged_json(&bundle.name)?));
            match self.relocator.schedule(module.id, asset, &bundle.name) {
                Ok(copies) => emitted.copies.extend(copies),
                Err(err) => {
                    warn!("Skip relocation of {}: {}", module.name, err);
                    emitted.asset_warnings.push(err);
                }
            }
        }

        let severs_features =
            bundle.kind == BundleKind::Base && module.id == self.partition.base_entry;
        for invocation in &module.invocations {
            if severs_features && self.secondary_entries.contains(&invocation.target) {
                debug!("Remove require of feature entry {} from base entry", invocation.target);
                edits.push((invocation.range, String::new()));
                continue;
            }
            let replacement = self.require_by_name(invocation.target, bundle, || {
                format!("module {}", module.id)
            })?;
            edits.push((invocation.range, replacement));
        }

        Ok(splice(code, edits))
    }

    fn trailing_code(
        &self,
        statement: &InvocationStatement,
        bundle: &BundleSpec,
    ) -> Result<String, SplitError> {
        let mut edits = Vec::with_capacity(statement.invocations.len());
        for invocation in &statement.invocations {
            let replacement = self.require_by_name(invocation.target, bundle, || {
                format!("trailing invocation at {}", statement.range)
            })?;
            edits.push((invocation.range, replacement));
        }
        Ok(splice(statement.range.slice(self.source), edits))
    }

    fn require_by_name(
        &self,
        target: ModuleId,
        bundle: &BundleSpec,
        referrer: impl FnOnce() -> String,
    ) -> Result<String, SplitError> {
        match self.build.table.get(target) {
            Some(module) => Ok(format!("require({})", quote(&module.name))),
            None => Err(SplitError::DanglingReference {
                referrer: referrer(),
                target,
                bundle: bundle.name.clone(),
            }),
        }
    }
}

/// Apply non-overlapping replacements to `text`
fn splice(text: &str, mut edits: Vec<(ByteRange, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        if range.start < cursor {
            continue;
        }
        out.push_str(&text[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn preview_range(code: &str, range: ByteRange) -> String {
    crate::utils::preview(range.slice(code), 60)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bundler::closure::partition;
    use crate::bundler::graph::build_module_table;
    use crate::config::{PartitionConfig, Platform, SecondaryEntry};
    use crate::recognizer::{find_invocations, ScriptRecognizer, StatementRecognizer};
    use pretty_assertions::assert_eq;

    pub(crate) const BUNDLE: &str = r#"(function(global) { global.__DEV__ = true; global.__BUNDLE_START_TIME__ = Date.now(); })(typeof global !== 'undefined' ? global : this);
(function(global) { function _require(id) { return id; } if (__DEV__ && typeof global.nativeRequire === 'function') { global.nativeRequire = _require; } else { global.nativeRequire = null; } global.require = _require; })(this);
__d(function(global, require, module, exports) { module.exports = { View: 'View', AssetRegistry: require(6) }; }, 0, null, "react-native-implementation");
__d(function(global, require, module, exports) { var RN = require(0); require(2); require(3); }, 1, null, "app/index.js");
__d(function(global, require, module, exports) { var RN = require(0); var img = require(4); module.exports = 'A'; }, 2, null, "app/packagea/index.js");
__d(function(global, require, module, exports) { module.exports = require(5); }, 3, null, "app/packageb/index.js");
__d(function(global, require, module, exports) { module.exports = require(6).registerAsset({"__packager_asset":true,"httpServerLocation":"/assets/app/img","width":16,"height":16,"scales":[1,2],"hash":"f00","name":"logo","type":"png"}); }, 4, null, "app/img/logo.png");
__d(function(global, require, module, exports) { module.exports = 'shared'; }, 5, null, "app/shared.js");
__d(function(global, require, module, exports) { module.exports = { registerAsset: function(a) { return a; } }; }, 6, null, "AssetRegistry");
require(1);"#;

    pub(crate) fn partition_config(
        secondaries: &[(&str, &str)],
        dev_mode: bool,
    ) -> PartitionConfig {
        PartitionConfig {
            base_entry_name: "app/index.js".to_string(),
            base_include_patterns: Vec::new(),
            secondary_entries: secondaries
                .iter()
                .map(|(name, glob)| SecondaryEntry {
                    name: name.to_string(),
                    index_glob: glob.to_string(),
                })
                .collect(),
            platform: Platform::Android,
            dev_mode,
        }
    }

    fn emit_all(source: &str, config: &PartitionConfig) -> Vec<Result<EmittedBundle, SplitError>> {
        let statements = ScriptRecognizer.recognize(source).unwrap();
        let build = build_module_table(source, &statements).unwrap();
        let partition = partition(&build.table, config).unwrap();
        let relocator = Relocator::new("/in", "/out", config.platform);
        let emitter = Emitter::new(source, &build, &partition, &relocator, config.dev_mode);
        partition.bundles().map(|bundle| emitter.emit(bundle)).collect()
    }

    fn features() -> PartitionConfig {
        partition_config(&[("packagea", "app/packagea/*"), ("packageb", "app/packageb/*")], false)
    }

    #[test]
    fn test_base_bundle_layout() {
        let bundles = emit_all(BUNDLE, &features());
        let base = bundles[0].as_ref().unwrap();
        let fragments: Vec<&str> = base.text.split(MODULE_SEPARATOR).collect();

        assert_eq!(base.name, "base");
        assert_eq!(base.module_count, 3);
        assert_eq!(fragments.len(), 6);
        assert!(fragments[0].contains("global.__DEV__ = false;"));
        assert!(fragments[2].ends_with(r#"}, "react-native-implementation", null, "react-native-implementation");"#));
        assert_eq!(
            fragments[3],
            r#"__d(function(global, require, module, exports) { var RN = require("react-native-implementation"); ; ; }, "app/index.js", null, "app/index.js");"#
        );
        assert!(fragments[4].contains(r#", "AssetRegistry", null, "AssetRegistry");"#));
        assert_eq!(fragments[5], r#"require("app/index.js");"#);
    }

    #[test]
    fn test_no_numeric_invocations_remain() {
        for bundle in emit_all(BUNDLE, &features()) {
            let bundle = bundle.unwrap();
            assert_eq!(find_invocations(&bundle.text).unwrap(), vec![], "{}", bundle.name);
        }
    }

    #[test]
    fn test_secondary_bundle_bootstraps_entry() {
        let bundles = emit_all(BUNDLE, &features());
        let packageb = bundles[2].as_ref().unwrap();
        assert_eq!(packageb.entry_name.as_deref(), Some("app/packageb/index.js"));
        assert_eq!(
            packageb.text,
            concat!(
                r#"__d(function(global, require, module, exports) { module.exports = require("app/shared.js"); }, "app/packageb/index.js", null, "app/packageb/index.js");"#,
                "\n",
                r#"__d(function(global, require, module, exports) { module.exports = 'shared'; }, "app/shared.js", null, "app/shared.js");"#,
                "\n\n",
                r#"require("app/packageb/index.js");"#
            )
        );
        assert!(!packageb.text.contains("global.__DEV__"));
    }

    #[test]
    fn test_asset_descriptor_is_tagged_and_relocated() {
        let bundles = emit_all(BUNDLE, &features());
        let packagea = bundles[1].as_ref().unwrap();

        assert!(packagea.text.contains(r#"require("AssetRegistry").registerAsset({"httpServerLocation":"/assets/app/img","width":16,"height":16,"scales":[1,2],"hash":"f00","name":"logo","type":"png","bundle":"packagea"})"#));
        let relative: Vec<&str> = packagea
            .copies
            .iter()
            .map(|c| c.relative_path.as_str())
            .collect();
        assert_eq!(
            relative,
            vec!["drawable-mdpi/app_img_logo.png", "drawable-xhdpi/app_img_logo.png"]
        );
        assert!(packagea.copies.iter().all(|c| c.module_id == 4));
    }

    #[test]
    fn test_unsupported_scale_keeps_bundle() {
        let source = BUNDLE.replace(r#""scales":[1,2]"#, r#""scales":[1,2.5]"#);
        let bundles = emit_all(&source, &features());
        let packagea = bundles[1].as_ref().unwrap();
        assert!(packagea.copies.is_empty());
        assert!(matches!(packagea.asset_warnings[0], SplitError::UnsupportedScale { .. }));
    }

    #[test]
    fn test_dev_guard_is_stripped_in_dev_mode() {
        let mut config = features();
        config.dev_mode = true;
        let bundles = emit_all(BUNDLE, &config);
        let base = bundles[0].as_ref().unwrap();
        assert!(!base.text.contains("nativeRequire"));
        assert!(base.text.contains("global.require = _require;"));
        assert!(base.text.contains("global.__DEV__ = true;"));

        let production = emit_all(BUNDLE, &features());
        assert!(production[0].as_ref().unwrap().text.contains("nativeRequire"));
    }

    #[test]
    fn test_remainder_bundle() {
        let source = BUNDLE.replace(" require(2); require(3);", "");
        let bundles = emit_all(&source, &partition_config(&[], false));
        assert_eq!(bundles.len(), 2);
        let business = bundles[1].as_ref().unwrap();
        assert_eq!(business.name, "business");
        assert_eq!(business.module_count, 4);
        assert!(business.entry_name.is_none());
        assert!(!business.text.contains("\nrequire("));
    }

    #[test]
    fn test_dangling_reference_fails_only_its_bundle() {
        let source = BUNDLE.replace("module.exports = 'shared';", "module.exports = require(999);");
        let bundles = emit_all(&source, &features());

        assert!(bundles[0].is_ok());
        assert!(bundles[1].is_ok());
        assert!(matches!(
            bundles[2],
            Err(SplitError::DanglingReference { target: 999, ref bundle, .. })
                if bundle == "packageb"
        ));
    }

    #[test]
    fn test_emission_is_reproducible() {
        let texts = || -> Vec<String> {
            emit_all(BUNDLE, &features())
                .into_iter()
                .map(|b| b.unwrap().text)
                .collect()
        };
        assert_eq!(texts(), texts());
    }

    #[test]
    fn test_splice() {
        let text = "abcdef";
        let edits = vec![
            (ByteRange::new(4, 5), "E".to_string()),
            (ByteRange::new(0, 1), String::new()),
            (ByteRange::new(2, 3), "CC".to_string()),
        ];
        assert_eq!(splice(text, edits), "bCCdEf");
    }
}
