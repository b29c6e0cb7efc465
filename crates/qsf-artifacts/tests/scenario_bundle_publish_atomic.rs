//! Bundle publish is observable-or-not: readers of a bucket never see a
//! partial bundle, and a strategy id publishes at most once per bucket.

use qsf_artifacts::{
    verify_bundle, Bucket, StrategiesRoot, BUNDLE_FILES, FILE_BACKTEST, FILE_COMPLIANCE,
};
use serde_json::json;

fn backtest_json() -> serde_json::Value {
    json!({
        "strategyId": "RSI_ES",
        "symbols": ["ES"],
        "sharpeInSample": 1.7,
        "sharpeOutSample": 1.4,
        "winRate": 0.56,
        "totalTrades": 312,
        "maxDrawdown": 0.14,
        "costs": {"commission": 2.5, "slippage": 1.0, "fees": 0.0, "funding": 0.0}
    })
}

fn compliance_json(firms_passed: u32, min_passing: u32) -> serde_json::Value {
    json!({
        "strategyId": "RSI_ES",
        "model": "prop-firm",
        "passed": firms_passed >= min_passing,
        "firms": [],
        "firmsPassed": firms_passed,
        "minPassing": min_passing
    })
}

fn write_full_bundle(writer: &qsf_artifacts::BundleWriter) {
    writer
        .write_file("strategy.py", b"class RsiEs:\n    pass\n")
        .unwrap();
    writer.write_json(FILE_BACKTEST, &backtest_json()).unwrap();
    writer
        .write_json("optimization.json", &json!({"strategyId": "RSI_ES"}))
        .unwrap();
    writer
        .write_json("base_hit.json", &json!({"avgLossMfe": 3.25}))
        .unwrap();
    writer
        .write_json(FILE_COMPLIANCE, &compliance_json(5, 3))
        .unwrap();
    writer
        .write_file("README.md", b"# RSI_ES\n\nMean reversion on ES.\n")
        .unwrap();
}

#[test]
fn unpublished_staging_is_invisible_to_readers() {
    let dir = tempfile::tempdir().unwrap();
    let root = StrategiesRoot::new(dir.path().join("output/strategies"));
    root.ensure_layout("prop_firm_ready").unwrap();

    let bucket = Bucket::Validated("prop_firm_ready".into());
    let writer = root.stage(&bucket, "RSI_ES").unwrap();
    write_full_bundle(&writer);

    // Not published yet: the bucket lists nothing.
    assert!(root.list_bucket(&bucket).unwrap().is_empty());

    let published = writer.publish().unwrap();
    let listed = root.list_bucket(&bucket).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "RSI_ES");
    assert_eq!(listed[0].category, "validated");
    assert_eq!(listed[0].path, published);

    // The published bundle satisfies the six-file invariant.
    assert!(verify_bundle(&published, true).unwrap().is_empty());
}

#[test]
fn double_publish_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let root = StrategiesRoot::new(dir.path().join("output/strategies"));
    root.ensure_layout("prop_firm_ready").unwrap();

    let bucket = Bucket::Good;
    let w1 = root.stage(&bucket, "RSI_ES").unwrap();
    write_full_bundle(&w1);
    w1.publish().unwrap();

    let w2 = root.stage(&bucket, "RSI_ES").unwrap();
    write_full_bundle(&w2);
    assert!(w2.publish().is_err(), "write-once per strategy id per bucket");
}

#[test]
fn verify_flags_missing_and_empty_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = StrategiesRoot::new(dir.path().join("output/strategies"));
    root.ensure_layout("prop_firm_ready").unwrap();

    let writer = root.stage(&Bucket::Good, "HALF_DONE").unwrap();
    writer.write_file("strategy.py", b"pass\n").unwrap();
    writer.write_file("README.md", b"").unwrap();
    let published = writer.publish().unwrap();

    let problems = verify_bundle(&published, false).unwrap();
    assert!(problems.iter().any(|p| p.contains("README.md is empty")));
    assert!(problems.iter().any(|p| p.contains("backtest.json is missing")));
    // Four missing + one empty.
    assert_eq!(problems.len(), BUNDLE_FILES.len() - 1);
}

#[test]
fn validated_bundle_consistency_is_checked() {
    let dir = tempfile::tempdir().unwrap();
    let root = StrategiesRoot::new(dir.path().join("output/strategies"));
    root.ensure_layout("prop_firm_ready").unwrap();

    let bucket = Bucket::Validated("prop_firm_ready".into());
    let writer = root.stage(&bucket, "SKETCHY").unwrap();
    write_full_bundle(&writer);
    // Compliance short of min_passing must fail validated verification.
    writer
        .write_json(FILE_COMPLIANCE, &compliance_json(2, 3))
        .unwrap();
    let published = writer.publish().unwrap();

    let problems = verify_bundle(&published, true).unwrap();
    assert!(problems.iter().any(|p| p.contains("firms_passed")));
}
