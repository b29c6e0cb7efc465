//! Crypto profile dispatch: the optimizer's compliance gate runs
//! exchange rules per bar; a leverage breach routes the bundle to
//! `rejected/` with the first offending bar in compliance.json. The
//! distilled entry lands in the crypto failure file.

use std::collections::BTreeMap;

use qsf_artifacts::Bucket;
use qsf_backtest::ComplianceReport;
use qsf_patterns::{EntryKind, PatternCategory};
use qsf_schemas::{Priority, QueueItem, QueueName, WorkerRole};
use qsf_session::SessionOutcome;
use qsf_testkit::{ScriptedInvoker, ScriptedTask, TestProject};
use qsf_worker::{NullNotifier, PatternDraft, WorkerHarness, WorkerLoop};

fn crypto_backtest_json() -> String {
    serde_json::json!({
        "strategyId": "PERP_BTC",
        "symbols": ["BTCUSDT"],
        "sharpeInSample": 1.9,
        "sharpeOutSample": 1.5,
        "winRate": 0.52,
        "totalTrades": 500,
        "maxDrawdown": 0.11,
        "costs": {"commission": 0.0, "slippage": 25.0, "fees": 50.0, "funding": 5.0},
        "exposure": [
            {"ts": 1000, "leverage": 5.0, "marginRatio": 0.95, "positionNotional": 40000.0},
            // Second tier (>50k notional) caps leverage at 10x.
            {"ts": 2000, "leverage": 12.0, "marginRatio": 0.97, "positionNotional": 60000.0},
            {"ts": 3000, "leverage": 15.0, "marginRatio": 0.97, "positionNotional": 60000.0}
        ]
    })
    .to_string()
}

fn optimization_json() -> String {
    serde_json::json!({
        "strategyId": "PERP_BTC",
        "bestParams": {"lookback": 55},
        "oosSharpe": 1.5,
        "totalTrades": 500,
        "maxDrawdown": 0.11,
        "baseHit": {"avgLossMfe": 120.0, "takeProfit": 120.0, "cashExitWinRate": 0.58}
    })
    .to_string()
}

#[tokio::test]
async fn leverage_breach_routes_to_rejected_with_first_bar() {
    let project = TestProject::new().unwrap();
    project.activate_crypto().unwrap();

    let item = QueueItem::new(
        WorkerRole::Backtester,
        3,
        Priority::High,
        serde_json::json!({"strategyId": "PERP_BTC", "backtest": "output/backtests/PERP_BTC/backtest.json"}),
    );
    project.queues().push(QueueName::ToOptimize, &item).unwrap();

    let invoker = ScriptedInvoker::new(
        project.root(),
        vec![ScriptedTask::completing(vec![
            (
                "output/backtests/PERP_BTC/backtest.json".to_string(),
                crypto_backtest_json(),
            ),
            (
                "output/backtests/PERP_BTC/optimization.json".to_string(),
                optimization_json(),
            ),
            (
                "output/backtests/PERP_BTC/strategy.py".to_string(),
                "class PerpBtc:\n    pass\n".to_string(),
            ),
        ])],
    )
    .with_distill_drafts(vec![PatternDraft {
        kind: EntryKind::Failure,
        category: None,
        instruments: vec!["BTCUSDT".to_string()],
        metrics: BTreeMap::from([("leverage".to_string(), 12.0)]),
        notes: "sizing blows through the second leverage tier".to_string(),
    }]);

    let harness = WorkerHarness::open(project.root(), 4, WorkerRole::Optimizer).unwrap();
    let mut worker = WorkerLoop::new(harness, invoker, NullNotifier);
    let report = worker.run_session().await.unwrap();
    assert_eq!(report.outcome, SessionOutcome::Complete);
    assert_eq!(report.tasks_rejected, 1, "compliance is a routing outcome, not an error");

    // The bundle landed in rejected/ with the first offending bar recorded.
    let bundles = project.strategies().list_bucket(&Bucket::Rejected).unwrap();
    assert_eq!(bundles.len(), 1);
    let compliance: ComplianceReport = serde_json::from_str(
        &std::fs::read_to_string(bundles[0].path.join("compliance.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(compliance.model, "exchange-rules");
    assert!(!compliance.passed);
    let violation = compliance.first_violation.expect("first offending bar");
    assert_eq!(violation.ts, 2000, "first breach, not the worst one");
    assert_eq!(violation.rule, "leverage");
    assert_eq!(violation.limit, 10.0);

    // Nothing in the crypto validated bucket.
    let validated = Bucket::Validated("exchange_validated".to_string());
    assert!(project.strategies().list_bucket(&validated).unwrap().is_empty());

    // The failure entry distilled into the crypto file, not the futures one.
    let crypto_fails = project
        .patterns()
        .read(PatternCategory::CryptoWhatFails)
        .unwrap();
    assert_eq!(crypto_fails.len(), 1);
    assert_eq!(crypto_fails[0].market, "crypto");
    assert!(project
        .patterns()
        .read(PatternCategory::WhatFails)
        .unwrap()
        .is_empty());
}
