//! The happy path on the futures prop-firm profile: researcher ->
//! backtester -> optimizer, ending with a six-file bundle in
//! `prop_firm_ready/`, both queue items archived in `completed/`, and a
//! distilled success entry in `what-works.md`.

use std::collections::BTreeMap;

use qsf_artifacts::{verify_bundle, Bucket};
use qsf_patterns::{EntryKind, PatternCategory};
use qsf_schemas::{QueueName, WorkerRole};
use qsf_session::{SessionEndReason, SessionOutcome};
use qsf_testkit::{ScriptedInvoker, ScriptedTask, TestProject};
use qsf_worker::{NullNotifier, PatternDraft, WorkerHarness, WorkerLoop};

fn good_backtest_json() -> String {
    let day = 86_400i64;
    let equity: Vec<serde_json::Value> = (0..10)
        .map(|i| {
            let dip = if i == 4 { -800.0 } else { 0.0 };
            serde_json::json!({"ts": i * day, "equity": 50_000.0 + 420.0 * i as f64 + dip})
        })
        .collect();
    let daily: Vec<serde_json::Value> = (0..10)
        .map(|i| {
            serde_json::json!({
                "date": format!("2026-02-{:02}", i + 1),
                "pnl": if i == 4 { -800.0 } else { 420.0 }
            })
        })
        .collect();

    serde_json::json!({
        "strategyId": "RSI_ES",
        "symbols": ["ES"],
        "sharpeInSample": 1.7,
        "sharpeOutSample": 1.4,
        "winRate": 0.56,
        "totalTrades": 312,
        "maxDrawdown": 0.14,
        "costs": {"commission": 2.5, "slippage": 12.5, "fees": 0.0, "funding": 0.0},
        "equityCurve": equity,
        "dailyPnl": daily
    })
    .to_string()
}

fn optimization_json() -> String {
    serde_json::json!({
        "strategyId": "RSI_ES",
        "bestParams": {"rsiLen": 9, "entry": 28},
        "oosSharpe": 1.5,
        "totalTrades": 312,
        "maxDrawdown": 0.13,
        "baseHit": {"avgLossMfe": 3.25, "takeProfit": 3.25, "cashExitWinRate": 0.61}
    })
    .to_string()
}

async fn run_one_session(project: &TestProject, role: WorkerRole, invoker: ScriptedInvoker) {
    let harness = WorkerHarness::open(project.root(), pane_for(role), role).unwrap();
    let mut worker = WorkerLoop::new(harness, invoker, NullNotifier);
    let report = worker.run_session().await.unwrap();
    assert_eq!(report.outcome, SessionOutcome::Complete, "{role} session");
    assert_eq!(report.end_reason, SessionEndReason::BudgetCap);
}

fn pane_for(role: WorkerRole) -> u32 {
    match role {
        WorkerRole::Researcher => 1,
        WorkerRole::Converter => 2,
        WorkerRole::Backtester => 3,
        WorkerRole::Optimizer => 4,
    }
}

#[tokio::test]
async fn pipeline_produces_a_validated_bundle() {
    let project = TestProject::new().unwrap();

    // Session 1: the researcher generates one hypothesis card.
    let researcher = ScriptedInvoker::new(
        project.root(),
        vec![ScriptedTask::completing(vec![(
            "output/hypotheses/RSI_ES.json".to_string(),
            r#"{"thesis": "RSI mean reversion after the open drive", "symbols": ["ES"]}"#
                .to_string(),
        )])],
    );
    run_one_session(&project, WorkerRole::Researcher, researcher).await;

    let depths = project.queues().depths(QueueName::Hypotheses).unwrap();
    assert_eq!(depths.pending, 1, "hypothesis card queued");

    // Session 2: the backtester runs it and the gates promote it.
    let backtester = ScriptedInvoker::new(
        project.root(),
        vec![ScriptedTask::completing(vec![
            (
                "output/backtests/RSI_ES/backtest.json".to_string(),
                good_backtest_json(),
            ),
            (
                "output/backtests/RSI_ES/strategy.py".to_string(),
                "class RsiEs:\n    pass\n".to_string(),
            ),
        ])],
    )
    .with_distill_drafts(vec![PatternDraft {
        kind: EntryKind::Success,
        category: None,
        instruments: vec!["ES".to_string()],
        metrics: BTreeMap::from([("sharpe_oos".to_string(), 1.4)]),
        notes: "RSI mean reversion holds with full costs".to_string(),
    }]);
    run_one_session(&project, WorkerRole::Backtester, backtester).await;

    assert_eq!(
        project.queues().depths(QueueName::ToOptimize).unwrap().pending,
        1,
        "promotable strategy queued for optimization"
    );

    // Session 3: the optimizer finishes the bundle; compliance passes.
    let optimizer = ScriptedInvoker::new(
        project.root(),
        vec![ScriptedTask::completing(vec![
            (
                "output/backtests/RSI_ES/backtest.json".to_string(),
                good_backtest_json(),
            ),
            (
                "output/backtests/RSI_ES/optimization.json".to_string(),
                optimization_json(),
            ),
            (
                "output/backtests/RSI_ES/strategy.py".to_string(),
                "class RsiEs:\n    pass\n".to_string(),
            ),
        ])],
    );
    run_one_session(&project, WorkerRole::Optimizer, optimizer).await;

    // The validated bundle exists and satisfies the six-file invariant.
    let validated = Bucket::Validated("prop_firm_ready".to_string());
    let bundles = project.strategies().list_bucket(&validated).unwrap();
    assert_eq!(bundles.len(), 1);
    assert_eq!(bundles[0].name, "RSI_ES");
    assert!(verify_bundle(&bundles[0].path, true).unwrap().is_empty());

    // Both processed queue items are archived in completed/.
    assert_eq!(
        project.queues().depths(QueueName::Completed).unwrap().pending,
        2,
        "hypothesis item + to-optimize item"
    );
    assert_eq!(project.queues().depths(QueueName::Failed).unwrap().pending, 0);

    // The distilled success entry landed in what-works.md.
    let entries = project.patterns().read(PatternCategory::WhatWorks).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::Success);
    assert_eq!(entries[0].instruments, ["ES"]);

    // Session summaries recorded all three sessions.
    for pane in [1, 3, 4] {
        let summary = std::fs::read_to_string(
            project
                .layout()
                .session_summaries_dir()
                .join(format!("pane-{pane}.md")),
        )
        .unwrap();
        assert!(summary.contains("## Session"), "pane {pane}");
        assert!(summary.contains("outcome: complete"), "pane {pane}");
    }
}
