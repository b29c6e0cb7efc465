//! All gate thresholds are half-open: a value exactly on a limit passes.
//! Sharpe 3.0 passes and 3.01 rejects; 99 trades reject and 100 pass.

use qsf_backtest::{BacktestSummary, CostBreakdown};
use qsf_gates::{evaluate_backtest, GateDecision, GateThresholds};

fn summary() -> BacktestSummary {
    BacktestSummary {
        strategy_id: "RSI_ES".into(),
        symbols: vec!["ES".into()],
        sharpe_in_sample: 1.7,
        sharpe_out_sample: 1.4,
        win_rate: 0.56,
        total_trades: 312,
        max_drawdown: 0.14,
        costs: Some(CostBreakdown {
            commission: 2.50,
            ..Default::default()
        }),
        equity_curve: vec![],
        daily_pnl: vec![],
        exposure: vec![],
    }
}

#[test]
fn sharpe_exactly_three_passes_and_above_rejects() {
    let thr = GateThresholds::default();

    let mut s = summary();
    s.sharpe_in_sample = 3.0;
    s.sharpe_out_sample = 2.5;
    assert_ne!(
        evaluate_backtest(&s, &thr).decision,
        GateDecision::Reject,
        "3.0 is within the limit"
    );

    s.sharpe_in_sample = 3.01;
    let report = evaluate_backtest(&s, &thr);
    assert_eq!(report.decision, GateDecision::Reject);
    assert!(report.violations.iter().any(|v| v.code == "sharpe_in_sample"));
}

#[test]
fn trade_count_boundary() {
    let thr = GateThresholds::default();

    let mut s = summary();
    s.total_trades = 99;
    assert_eq!(evaluate_backtest(&s, &thr).decision, GateDecision::Reject);

    s.total_trades = 100;
    assert_eq!(evaluate_backtest(&s, &thr).decision, GateDecision::Promote);
}

#[test]
fn decay_bands_are_half_open() {
    let thr = GateThresholds::default();

    // decay = (2.0 - 1.4) / 2.0 = 0.30 exactly: still promotable.
    let mut s = summary();
    s.sharpe_in_sample = 2.0;
    s.sharpe_out_sample = 1.4;
    assert_eq!(evaluate_backtest(&s, &thr).decision, GateDecision::Promote);

    // decay = 0.50 exactly: review, not reject.
    s.sharpe_out_sample = 1.0;
    assert_eq!(
        evaluate_backtest(&s, &thr).decision,
        GateDecision::UnderReview
    );

    // decay just over 0.50: reject.
    s.sharpe_out_sample = 0.99;
    assert_eq!(evaluate_backtest(&s, &thr).decision, GateDecision::Reject);
}

#[test]
fn missing_or_zero_costs_reject() {
    let thr = GateThresholds::default();

    let mut s = summary();
    s.costs = None;
    let report = evaluate_backtest(&s, &thr);
    assert_eq!(report.decision, GateDecision::Reject);
    assert!(report.violations.iter().any(|v| v.code == "costs"));

    s.costs = Some(CostBreakdown::default());
    assert_eq!(evaluate_backtest(&s, &thr).decision, GateDecision::Reject);

    // Slippage alone satisfies cost inclusion.
    s.costs = Some(CostBreakdown {
        slippage: 1.25,
        ..Default::default()
    });
    assert_eq!(evaluate_backtest(&s, &thr).decision, GateDecision::Promote);
}

#[test]
fn promotion_band_shortfall_routes_to_review() {
    let thr = GateThresholds::default();

    // Survives auto-reject, decay fine, but OOS Sharpe under 1.0.
    let mut s = summary();
    s.sharpe_in_sample = 1.1;
    s.sharpe_out_sample = 0.9;
    let report = evaluate_backtest(&s, &thr);
    assert_eq!(report.decision, GateDecision::UnderReview);
    assert!(report.violations.iter().any(|v| v.code == "oos_sharpe"));

    // Drawdown in (0.20, 0.30]: not rejected, not promotable.
    let mut s = summary();
    s.max_drawdown = 0.25;
    let report = evaluate_backtest(&s, &thr);
    assert_eq!(report.decision, GateDecision::UnderReview);
    assert!(report.violations.iter().any(|v| v.code == "max_drawdown"));
}
