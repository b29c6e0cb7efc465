//! An overfit artifact (IS Sharpe 3.8, OOS 1.1) violates both the
//! in-sample Sharpe limit and the decay limit; the report lists both so the
//! reject reason file and the failure pattern entry carry both symptoms.

use qsf_backtest::{BacktestSummary, CostBreakdown};
use qsf_gates::{evaluate_backtest, GateDecision, GateThresholds};

#[test]
fn overfit_artifact_rejects_on_two_thresholds() {
    let s = BacktestSummary {
        strategy_id: "MOMO_NQ".into(),
        symbols: vec!["NQ".into()],
        sharpe_in_sample: 3.8,
        sharpe_out_sample: 1.1,
        win_rate: 0.61,
        total_trades: 240,
        max_drawdown: 0.18,
        costs: Some(CostBreakdown {
            commission: 2.50,
            slippage: 12.5,
            ..Default::default()
        }),
        equity_curve: vec![],
        daily_pnl: vec![],
        exposure: vec![],
    };

    let report = evaluate_backtest(&s, &GateThresholds::default());
    assert_eq!(report.decision, GateDecision::Reject);

    let codes: Vec<&str> = report.violations.iter().map(|v| v.code.as_str()).collect();
    assert!(codes.contains(&"sharpe_in_sample"));
    assert!(codes.contains(&"oos_decay"), "decay (3.8-1.1)/3.8 = 0.71 > 0.50");
    assert_eq!(codes.len(), 2, "no spurious violations");

    // decay figure reported to two decimals in the reason line.
    let decay_line = report
        .violations
        .iter()
        .find(|v| v.code == "oos_decay")
        .unwrap();
    assert!((decay_line.observed - 0.7105).abs() < 1e-3);
}
