//! Prop-firm compliance: each firm's rules run independently; promotion
//! requires at least `min_passing` firms passing.

use qsf_backtest::{BacktestSummary, CostBreakdown, DailyPnl, EquityPoint};
use qsf_gates::evaluate_compliance;
use qsf_profile::{ComplianceModel, FirmRules, TrailingDrawdownType};

fn firm(name: &str, daily: f64, trailing: f64, dd_type: TrailingDrawdownType) -> FirmRules {
    FirmRules {
        name: name.into(),
        daily_loss_limit: daily,
        trailing_dd_limit: trailing,
        trailing_dd_type: dd_type,
        consistency_pct: 0.5,
    }
}

fn summary() -> BacktestSummary {
    // Two steady weeks: small dips, no outsized day.
    let day = 86_400i64;
    let equity_curve = (0..10)
        .map(|i| EquityPoint {
            ts: i * day,
            equity: 50_000.0 + 300.0 * i as f64,
        })
        .collect();
    let daily_pnl = (0..10)
        .map(|i| DailyPnl {
            date: format!("2026-02-{:02}", i + 1),
            pnl: if i == 4 { -800.0 } else { 420.0 },
        })
        .collect();

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
        equity_curve,
        daily_pnl,
        exposure: vec![],
    }
}

#[test]
fn firms_pass_and_fail_independently() {
    let model = ComplianceModel::PropFirm {
        min_passing: 2,
        firms: vec![
            firm("wide-limits", 2_000.0, 5_000.0, TrailingDrawdownType::Eod),
            firm("tight-daily", 500.0, 5_000.0, TrailingDrawdownType::Eod),
            firm("fixed-floor", 2_000.0, 5_000.0, TrailingDrawdownType::Fixed),
        ],
    };

    let report = evaluate_compliance(&model, &summary());
    assert_eq!(report.model, "prop-firm");
    assert_eq!(report.firms.len(), 3);

    // The -800 day kills only the tight-daily firm.
    let tight = report.firms.iter().find(|f| f.firm == "tight-daily").unwrap();
    assert!(!tight.passed);
    assert!(tight.reason.as_deref().unwrap().contains("daily loss"));

    assert_eq!(report.firms_passed, 2);
    assert!(report.passed, "2 of 3 meets min_passing=2");
}

#[test]
fn min_passing_gates_promotion() {
    let model = ComplianceModel::PropFirm {
        min_passing: 3,
        firms: vec![
            firm("a", 2_000.0, 5_000.0, TrailingDrawdownType::Intraday),
            firm("b", 500.0, 5_000.0, TrailingDrawdownType::Intraday),
            firm("c", 2_000.0, 5_000.0, TrailingDrawdownType::Fixed),
        ],
    };

    let report = evaluate_compliance(&model, &summary());
    assert_eq!(report.firms_passed, 2);
    assert!(!report.passed, "2 of 3 misses min_passing=3");
}

#[test]
fn consistency_rule_catches_one_day_wonder() {
    let mut s = summary();
    // One day carries nearly all profit.
    s.daily_pnl = vec![
        DailyPnl {
            date: "2026-02-01".into(),
            pnl: 5_000.0,
        },
        DailyPnl {
            date: "2026-02-02".into(),
            pnl: 100.0,
        },
    ];

    let model = ComplianceModel::PropFirm {
        min_passing: 1,
        firms: vec![firm("consistent", 10_000.0, 50_000.0, TrailingDrawdownType::Eod)],
    };
    let report = evaluate_compliance(&model, &s);
    assert!(!report.passed);
    assert!(report.firms[0]
        .reason
        .as_deref()
        .unwrap()
        .contains("consistency"));
}
