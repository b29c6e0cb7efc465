//! Profile-dispatched compliance evaluation.
//!
//! Dispatch happens over the closed compliance sum type: prop-firm rules
//! run per firm over the equity curve and daily-pnl series; exchange rules
//! run per bar over the exposure series, reporting the first offending bar.

use std::collections::BTreeMap;

use qsf_backtest::{BacktestSummary, ComplianceReport, FirmResult, TierViolation};
use qsf_profile::{find_tier, ComplianceModel, FirmRules, TrailingDrawdownType};

/// Run the profile's compliance model against one backtest summary.
pub fn evaluate_compliance(model: &ComplianceModel, summary: &BacktestSummary) -> ComplianceReport {
    match model {
        ComplianceModel::PropFirm { firms, min_passing } => {
            let results: Vec<FirmResult> = firms.iter().map(|f| run_firm(f, summary)).collect();
            let firms_passed = results.iter().filter(|r| r.passed).count() as u32;
            ComplianceReport {
                strategy_id: summary.strategy_id.clone(),
                model: "prop-firm".to_string(),
                passed: firms_passed >= *min_passing,
                firms: results,
                firms_passed,
                min_passing: *min_passing,
                first_violation: None,
            }
        }
        ComplianceModel::ExchangeRules {
            leverage_tiers,
            liquidation_buffer_pct,
            max_position_notional,
        } => {
            let first_violation = check_exchange_bars(
                summary,
                leverage_tiers,
                *liquidation_buffer_pct,
                *max_position_notional,
            );
            ComplianceReport {
                strategy_id: summary.strategy_id.clone(),
                model: "exchange-rules".to_string(),
                passed: first_violation.is_none(),
                firms: Vec::new(),
                firms_passed: 0,
                min_passing: 0,
                first_violation,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Prop firm
// ---------------------------------------------------------------------------

/// Each firm's rules are evaluated independently over the same series.
fn run_firm(firm: &FirmRules, summary: &BacktestSummary) -> FirmResult {
    let fail = |reason: String| FirmResult {
        firm: firm.name.clone(),
        passed: false,
        reason: Some(reason),
    };

    // Daily loss limit.
    if let Some(day) = summary
        .daily_pnl
        .iter()
        .find(|d| d.pnl < -firm.daily_loss_limit)
    {
        return fail(format!(
            "daily loss {:.2} on {} exceeds limit {:.2}",
            -day.pnl, day.date, firm.daily_loss_limit
        ));
    }

    // Trailing drawdown per firm type.
    if let Some(reason) = check_trailing_dd(firm, summary) {
        return fail(reason);
    }

    // Consistency: no single day may carry more than `consistency_pct` of
    // total profit. Unprofitable runs have nothing to be inconsistent about.
    let total_profit: f64 = summary.daily_pnl.iter().map(|d| d.pnl).sum();
    if total_profit > 0.0 {
        if let Some(day) = summary
            .daily_pnl
            .iter()
            .find(|d| d.pnl / total_profit > firm.consistency_pct)
        {
            return fail(format!(
                "day {} carries {:.0}% of profit, above {:.0}% consistency cap",
                day.date,
                100.0 * day.pnl / total_profit,
                100.0 * firm.consistency_pct
            ));
        }
    }

    FirmResult {
        firm: firm.name.clone(),
        passed: true,
        reason: None,
    }
}

fn check_trailing_dd(firm: &FirmRules, summary: &BacktestSummary) -> Option<String> {
    let curve = &summary.equity_curve;
    if curve.is_empty() {
        return None;
    }

    match firm.trailing_dd_type {
        TrailingDrawdownType::Intraday => {
            let mut peak = curve[0].equity;
            for p in curve {
                if p.equity > peak {
                    peak = p.equity;
                }
                if peak - p.equity > firm.trailing_dd_limit {
                    return Some(format!(
                        "intraday trailing drawdown {:.2} exceeds limit {:.2}",
                        peak - p.equity,
                        firm.trailing_dd_limit
                    ));
                }
            }
            None
        }
        TrailingDrawdownType::Eod => {
            // Peak trails end-of-day equity only: last point per UTC day.
            let mut eod: BTreeMap<i64, f64> = BTreeMap::new();
            for p in curve {
                eod.insert(p.ts.div_euclid(86_400), p.equity);
            }
            let mut peak = f64::MIN;
            for (_, equity) in eod {
                if equity > peak {
                    peak = equity;
                }
                if peak - equity > firm.trailing_dd_limit {
                    return Some(format!(
                        "EOD trailing drawdown {:.2} exceeds limit {:.2}",
                        peak - equity,
                        firm.trailing_dd_limit
                    ));
                }
            }
            None
        }
        TrailingDrawdownType::Fixed => {
            let floor = curve[0].equity - firm.trailing_dd_limit;
            for p in curve {
                if p.equity < floor {
                    return Some(format!(
                        "equity {:.2} below fixed floor {:.2}",
                        p.equity, floor
                    ));
                }
            }
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Exchange rules
// ---------------------------------------------------------------------------

fn check_exchange_bars(
    summary: &BacktestSummary,
    tiers: &[qsf_profile::LeverageTier],
    buffer_pct: f64,
    max_position_notional: f64,
) -> Option<TierViolation> {
    for bar in &summary.exposure {
        if bar.position_notional > max_position_notional {
            return Some(TierViolation {
                ts: bar.ts,
                rule: "max_position".to_string(),
                observed: bar.position_notional,
                limit: max_position_notional,
            });
        }

        let Some(tier) = find_tier(tiers, bar.position_notional) else {
            let largest = tiers.last().map(|t| t.notional_cap).unwrap_or(0.0);
            return Some(TierViolation {
                ts: bar.ts,
                rule: "max_position".to_string(),
                observed: bar.position_notional,
                limit: largest,
            });
        };

        if bar.leverage > tier.max_leverage {
            return Some(TierViolation {
                ts: bar.ts,
                rule: "leverage".to_string(),
                observed: bar.leverage,
                limit: tier.max_leverage,
            });
        }

        if bar.leverage > 1.0 {
            let required = 1.0 - (1.0 / bar.leverage) + buffer_pct;
            if bar.margin_ratio < required {
                return Some(TierViolation {
                    ts: bar.ts,
                    rule: "margin_ratio".to_string(),
                    observed: bar.margin_ratio,
                    limit: required,
                });
            }
        }
    }
    None
}
