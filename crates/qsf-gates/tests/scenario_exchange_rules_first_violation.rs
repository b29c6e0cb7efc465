//! Exchange-rule compliance walks the exposure series bar by bar and
//! reports the first offending bar's timestamp.

use qsf_backtest::{BacktestSummary, BarExposure, CostBreakdown};
use qsf_gates::evaluate_compliance;
use qsf_profile::{ComplianceModel, LeverageTier};

fn model() -> ComplianceModel {
    ComplianceModel::ExchangeRules {
        leverage_tiers: vec![
            LeverageTier {
                notional_cap: 50_000.0,
                max_leverage: 20.0,
            },
            LeverageTier {
                notional_cap: 250_000.0,
                max_leverage: 10.0,
            },
        ],
        liquidation_buffer_pct: 0.01,
        max_position_notional: 200_000.0,
    }
}

fn summary(exposure: Vec<BarExposure>) -> BacktestSummary {
    BacktestSummary {
        strategy_id: "PERP_BTC".into(),
        symbols: vec!["BTCUSDT".into()],
        sharpe_in_sample: 1.9,
        sharpe_out_sample: 1.5,
        win_rate: 0.52,
        total_trades: 500,
        max_drawdown: 0.11,
        costs: Some(CostBreakdown {
            fees: 50.0,
            slippage: 25.0,
            ..Default::default()
        }),
        equity_curve: vec![],
        daily_pnl: vec![],
        exposure,
    }
}

fn bar(ts: i64, leverage: f64, margin_ratio: f64, notional: f64) -> BarExposure {
    BarExposure {
        ts,
        leverage,
        margin_ratio,
        position_notional: notional,
    }
}

#[test]
fn clean_series_passes() {
    let s = summary(vec![
        bar(1_000, 5.0, 0.95, 40_000.0),
        bar(2_000, 8.0, 0.96, 45_000.0),
    ]);
    let report = evaluate_compliance(&model(), &s);
    assert!(report.passed);
    assert!(report.first_violation.is_none());
    assert_eq!(report.model, "exchange-rules");
}

#[test]
fn leverage_over_tier_reports_first_offending_bar() {
    let s = summary(vec![
        bar(1_000, 5.0, 0.95, 40_000.0),
        // Second tier allows only 10x at 60k notional.
        bar(2_000, 12.0, 0.97, 60_000.0),
        bar(3_000, 15.0, 0.97, 60_000.0),
    ]);
    let report = evaluate_compliance(&model(), &s);
    assert!(!report.passed);

    let v = report.first_violation.unwrap();
    assert_eq!(v.ts, 2_000, "first offending bar, not the worst one");
    assert_eq!(v.rule, "leverage");
    assert_eq!(v.limit, 10.0);
}

#[test]
fn margin_ratio_must_cover_liquidation_buffer() {
    // At 10x: required = 1 - 1/10 + 0.01 = 0.91.
    let s = summary(vec![bar(5_000, 10.0, 0.90, 40_000.0)]);
    let report = evaluate_compliance(&model(), &s);
    let v = report.first_violation.unwrap();
    assert_eq!(v.rule, "margin_ratio");
    assert!((v.limit - 0.91).abs() < 1e-9);
}

#[test]
fn notional_above_cap_is_max_position() {
    let s = summary(vec![bar(9_000, 2.0, 0.99, 300_000.0)]);
    let report = evaluate_compliance(&model(), &s);
    let v = report.first_violation.unwrap();
    assert_eq!(v.rule, "max_position");
    assert_eq!(v.ts, 9_000);
}
