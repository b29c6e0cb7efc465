//! Shared scaffolding for CLI contract tests.

use std::fs;
use std::path::Path;

pub const FUTURES_PROFILE: &str = r#"{
    "name": "futures-prop",
    "marketType": "futures",
    "dataProvider": {"kind": "databento"},
    "costModel": {"type": "per_contract", "commission": 2.5, "slippageTicks": 1.0, "tickValue": 12.5},
    "compliance": {"type": "prop-firm", "minPassing": 3, "firms": []},
    "symbols": {"pinned": ["ES", "NQ"]},
    "validatedDir": "prop_firm_ready",
    "rejectedDir": "rejected",
    "sampleDataDir": "data/samples",
    "sessionTimeoutSecs": 3600,
    "budgetCapUsd": 25.0
}"#;

/// Minimal §-layout project: config, profiles, pointer, queue dirs.
pub fn scaffold_project(root: &Path) {
    fs::create_dir_all(root.join("profiles")).unwrap();
    fs::create_dir_all(root.join("patterns")).unwrap();
    fs::create_dir_all(root.join("checkpoints")).unwrap();
    fs::create_dir_all(root.join("data/samples")).unwrap();
    for q in [
        "hypotheses",
        "to-convert",
        "to-backtest",
        "to-optimize",
        "completed",
        "failed",
    ] {
        fs::create_dir_all(root.join("queues").join(q)).unwrap();
    }
    for b in ["good", "under_review", "rejected", "prop_firm_ready"] {
        fs::create_dir_all(root.join("output/strategies").join(b)).unwrap();
    }

    fs::write(
        root.join("config.json"),
        r#"{"workers": {"researcher": 1, "converter": 1, "backtester": 2, "optimizer": 1}}"#,
    )
    .unwrap();
    fs::write(root.join("profiles/futures-prop.json"), FUTURES_PROFILE).unwrap();
    fs::write(
        root.join("active-profile.json"),
        r#"{"active": "futures-prop", "path": "profiles/futures-prop.json"}"#,
    )
    .unwrap();
}
