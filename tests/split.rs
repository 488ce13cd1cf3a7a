mod common;

use std::fs;

use pretty_assertions::assert_eq;
use splitpack_lib::bundler::BundleKind;
use splitpack_lib::recognizer::find_invocations;
use splitpack_lib::report::{Anomaly, BundleOutcome};
use splitpack_lib::{Config, RunStatus, SplitError, Splitter};

use common::{Project, BUNDLE};

fn split(project: &Project) -> splitpack_lib::SplitReport {
    let config = Config::load(project.config_path()).unwrap();
    Splitter::from_config(&config).split_file(&config.input_bundle()).unwrap()
}

#[test]
fn test_writes_base_and_feature_bundles() {
    let project = Project::new(BUNDLE).with_assets();
    let report = split(&project);

    assert_eq!(report.status(), RunStatus::Succeeded);
    let written: Vec<(&str, usize)> = report
        .written()
        .map(|b| (b.name.as_str(), b.module_count))
        .collect();
    assert_eq!(written, vec![("base", 4), ("packagea", 2), ("packageb", 2)]);

    let base = project.read("split/base/index.bundle");
    assert!(base.starts_with("!function(e){e.__DEV__=false"));
    assert!(!base.contains("nativeRequire"));
    assert!(base.contains(
        r#"{var i=require("react-native-implementation");;},"split-example/index.android.js.tmp",[12,100,200],"split-example/index.android.js.tmp");"#
    ));
    assert!(base.ends_with(
        "require(\"react-native-implementation\");\n\
         require(\"split-example/index.android.js.tmp\");"
    ));
    assert!(!base.contains("SampleA"));
}

#[test]
fn test_feature_bundle_requires_its_entry_last() {
    let project = Project::new(BUNDLE).with_assets();
    split(&project);

    let packagea = project.read("split/packagea/index.bundle");
    assert!(packagea.ends_with(
        "\n\nrequire(\"split-example/src/components/packagea/SampleA.js\");"
    ));
    assert!(packagea
        .contains(r#"o=require("split-example/src/components/packagea/images/naruto.jpeg")"#));
    assert!(packagea.contains(r#""name":"naruto","type":"jpeg","bundle":"packagea"}"#));
    assert!(!packagea.contains("__packager_asset"));
    assert!(!packagea.contains("__DEV__"));
}

#[test]
fn test_no_numeric_requires_survive() {
    let project = Project::new(BUNDLE).with_assets();
    let report = split(&project);

    for bundle in report.written() {
        let text = fs::read_to_string(&bundle.path).unwrap();
        assert!(find_invocations(&text).unwrap().is_empty(), "{}", bundle.name);
    }
}

#[test]
fn test_bundles_are_disjoint_from_base() {
    let config = Config::load(Project::new(BUNDLE).config_path()).unwrap();
    let plan = Splitter::from_config(&config).plan(BUNDLE).unwrap();

    let base = &plan.partition.base;
    assert_eq!(base.kind, BundleKind::Base);
    for secondary in &plan.partition.secondaries {
        assert!(secondary.module_ids.is_disjoint(&base.module_ids), "{}", secondary.name);
        assert!(secondary.contains(secondary.entry_module_id.unwrap()));
    }
    assert!(plan.partition.remainder.is_none());
}

#[test]
fn test_assets_move_with_their_bundle() {
    let project = Project::new(BUNDLE).with_assets();
    let report = split(&project);

    let packagea = report.written().find(|b| b.name == "packagea").unwrap();
    assert_eq!(packagea.assets_copied, 2);
    for file in common::ASSET_FILES {
        assert_eq!(project.read(&format!("split/packagea/{}", file)), *file);
        assert!(!project.path(&format!("split/base/{}", file)).exists());
    }
}

#[test]
fn test_missing_asset_files_do_not_fail_bundles() {
    let project = Project::new(BUNDLE);
    let report = split(&project);

    assert!(!report.has_failures());
    assert_eq!(report.asset_warnings.len(), 2);
    assert!(matches!(
        report.asset_warnings[0],
        SplitError::MissingSourceAsset { module_id: 101, .. }
    ));
    match report.status() {
        RunStatus::PartiallySucceeded { warnings } => assert_eq!(warnings.len(), 2),
        other => panic!("unexpected status {other:?}"),
    }
}

#[test]
fn test_dangling_reference_fails_one_bundle() {
    let bundle = BUNDLE.replace("t.exports={label:'B'}", "t.exports=require(999)");
    let project = Project::new(&bundle).with_assets();
    let report = split(&project);

    assert!(matches!(
        report.anomalies.as_slice(),
        [Anomaly::UnknownDependency { module_id: 201, target: 999 }]
    ));
    let failed: Vec<&str> = report
        .bundles
        .iter()
        .filter(|outcome| matches!(outcome, BundleOutcome::Failed { .. }))
        .map(BundleOutcome::name)
        .collect();
    assert_eq!(failed, vec!["packageb"]);
    assert!(project.path("split/base/index.bundle").is_file());
    assert!(project.path("split/packagea/index.bundle").is_file());
    assert!(!project.path("split/packageb/index.bundle").exists());
}

#[test]
fn test_manifest_lists_written_bundles() {
    let project = Project::new(BUNDLE).with_assets();
    let report = split(&project);

    assert_eq!(report.manifest, Some(project.path("split/manifest.json")));
    let manifest: serde_json::Value =
        serde_json::from_str(&project.read("split/manifest.json")).unwrap();
    assert_eq!(manifest["packagea"]["file"], "packagea/index.bundle");
    assert_eq!(manifest["packagea"]["modules"], 2);
    assert_eq!(
        manifest["packageb"]["entry"],
        "split-example/src/components/packageb/SampleB.js"
    );
}

#[test]
fn test_split_is_deterministic() {
    let first = Project::new(BUNDLE).with_assets();
    let second = Project::new(BUNDLE).with_assets();
    let hashes = |project: &Project| {
        split(project)
            .written()
            .map(|b| b.hash.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(hashes(&first), hashes(&second));
}
