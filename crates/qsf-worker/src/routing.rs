//! Per-role output routing after a verified model pass.
//!
//! The role fixes where results go: researcher output fans into the
//! hypothesis queues, converter output feeds the backtest queue, and the
//! backtester/optimizer run the validation gates before anything moves
//! downstream. Gate rejection is a routing outcome: the task itself
//! succeeded.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};

use qsf_artifacts::{
    bucket_for, write_reason_file, Bucket, StrategiesRoot, FILE_BACKTEST, FILE_BASE_HIT,
    FILE_COMPLIANCE, FILE_OPTIMIZATION, FILE_README, FILE_STRATEGY_CODE,
};
use qsf_backtest::{BacktestSummary, OptimizationSummary};
use qsf_gates::{evaluate_backtest, evaluate_compliance, GateDecision, GateThresholds};
use qsf_profile::Profile;
use qsf_queue::QueueRoot;
use qsf_schemas::{ItemId, Priority, ProjectLayout, QueueItem, QueueName, WorkerRole};

/// Everything routing needs, borrowed from the harness.
pub struct RoutingDeps<'a> {
    pub layout: &'a ProjectLayout,
    pub queues: &'a QueueRoot,
    pub strategies: &'a StrategiesRoot,
    pub profile: &'a Profile,
    pub thresholds: &'a GateThresholds,
    pub pane: u32,
}

/// What routing did with a verified pass.
#[derive(Debug)]
pub enum RouteResult {
    /// Results moved downstream (queue pushes and/or a published bundle).
    Success {
        pushed: Vec<(QueueName, ItemId)>,
        published: Option<PathBuf>,
    },
    /// Gates turned the candidate away. A successful task, rejected
    /// routing outcome.
    Rejected {
        bucket: String,
        reason_codes: Vec<String>,
        published: Option<PathBuf>,
    },
    /// The pass claimed completion but its artifacts are unusable. The
    /// loop treats this as a task failure.
    MissingArtifacts(String),
}

// ---------------------------------------------------------------------------
// Researcher
// ---------------------------------------------------------------------------

/// Hypothesis cards route by artifact type: PineScript sources need the
/// converter; JSON cards go straight to the backtest-ready hypothesis
/// queue.
pub fn route_researcher(deps: &RoutingDeps<'_>, artifacts: &[PathBuf]) -> Result<RouteResult> {
    let mut pushed = Vec::new();

    for rel in artifacts {
        let abs = deps.layout.root().join(rel);
        if !abs.exists() {
            warn!(path = %rel.display(), "researcher artifact listed but missing; skipped");
            continue;
        }
        let strategy_id = file_stem(rel);

        let (queue, payload) = match rel.extension().and_then(|e| e.to_str()) {
            Some("pine") => (
                QueueName::ToConvert,
                json!({"source": rel, "strategyId": strategy_id}),
            ),
            _ => (
                QueueName::Hypotheses,
                json!({"card": rel, "strategyId": strategy_id}),
            ),
        };

        let item = QueueItem::new(WorkerRole::Researcher, deps.pane, Priority::Medium, payload);
        let id = deps.queues.push(queue, &item)?;
        pushed.push((queue, id));
    }

    if pushed.is_empty() {
        return Ok(RouteResult::MissingArtifacts(
            "researcher pass created no usable hypothesis artifacts".to_string(),
        ));
    }
    Ok(RouteResult::Success {
        pushed,
        published: None,
    })
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// The converter hands translated strategy code to the backtest queue.
pub fn route_converter(
    deps: &RoutingDeps<'_>,
    source_item: &QueueItem,
    artifacts: &[PathBuf],
) -> Result<RouteResult> {
    let Some(strategy_rel) = artifacts
        .iter()
        .find(|p| p.extension().and_then(|e| e.to_str()) == Some("py"))
    else {
        return Ok(RouteResult::MissingArtifacts(
            "converter pass produced no .py strategy file".to_string(),
        ));
    };

    let strategy_id = source_item
        .payload
        .get("strategyId")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| file_stem(strategy_rel));

    let item = QueueItem::new(
        WorkerRole::Converter,
        deps.pane,
        source_item.priority,
        json!({"strategy": strategy_rel, "strategyId": strategy_id}),
    );
    let id = deps.queues.push(QueueName::ToBacktest, &item)?;

    Ok(RouteResult::Success {
        pushed: vec![(QueueName::ToBacktest, id)],
        published: None,
    })
}

// ---------------------------------------------------------------------------
// Backtester
// ---------------------------------------------------------------------------

/// Gate the fresh backtest. The backtester writes exactly two
/// destinations: promotable candidates feed `to-optimize/`, everything
/// else lands in `rejected/` with its reasons. The review band is the
/// optimizer's call; it re-runs the gates on the optimized result and may
/// route to `under_review/` then.
pub fn route_backtester(
    deps: &RoutingDeps<'_>,
    source_item: &QueueItem,
    artifacts: &[PathBuf],
) -> Result<RouteResult> {
    let Some((summary_rel, summary)) = load_backtest_summary(artifacts, deps.layout.root()) else {
        return Ok(RouteResult::MissingArtifacts(
            "backtester pass produced no parseable backtest summary JSON".to_string(),
        ));
    };

    let gate = evaluate_backtest(&summary, deps.thresholds);
    match gate.decision {
        GateDecision::Promote => {
            let payload = json!({
                "strategyId": summary.strategy_id,
                "backtest": summary_rel,
                "strategy": source_item.payload.get("strategy"),
            });
            let item = QueueItem::new(
                WorkerRole::Backtester,
                deps.pane,
                source_item.priority,
                payload,
            );
            let id = deps.queues.push(QueueName::ToOptimize, &item)?;
            info!(strategy = %summary.strategy_id, "backtest passed gates; queued for optimization");
            Ok(RouteResult::Success {
                pushed: vec![(QueueName::ToOptimize, id)],
                published: None,
            })
        }
        GateDecision::UnderReview | GateDecision::Reject => {
            let bucket = Bucket::Rejected;

            let writer = deps.strategies.stage(&bucket, &summary.strategy_id)?;
            writer.write_json(FILE_BACKTEST, &summary)?;
            copy_if_listed(deps, source_item.payload.get("strategy"), &writer)?;
            write_reason_file(&writer, &gate, None)?;

            let published = publish_tolerating_duplicate(writer, &summary.strategy_id)?;
            Ok(RouteResult::Rejected {
                bucket: bucket.category().to_string(),
                reason_codes: gate.violations.iter().map(|v| v.code.clone()).collect(),
                published,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Optimizer
// ---------------------------------------------------------------------------

/// Final gates plus the profile-dispatched compliance check, then the full
/// six-file bundle lands in its bucket.
pub fn route_optimizer(
    deps: &RoutingDeps<'_>,
    _source_item: &QueueItem,
    artifacts: &[PathBuf],
) -> Result<RouteResult> {
    let Some((_, summary)) = load_backtest_summary(artifacts, deps.layout.root()) else {
        return Ok(RouteResult::MissingArtifacts(
            "optimizer pass produced no parseable backtest summary JSON".to_string(),
        ));
    };
    let Some((_, optimization)) = load_optimization_summary(artifacts, deps.layout.root()) else {
        return Ok(RouteResult::MissingArtifacts(
            "optimizer pass produced no parseable optimization summary JSON".to_string(),
        ));
    };

    let gate = evaluate_backtest(&summary, deps.thresholds);
    let compliance = match gate.decision {
        GateDecision::Promote => Some(evaluate_compliance(
            deps.profile.validator(),
            &summary,
        )),
        _ => None,
    };

    let bucket = bucket_for(
        gate.decision,
        compliance.as_ref().map(|c| c.passed),
        &deps.profile.validated_dir,
    );
    let validated = matches!(bucket, Bucket::Validated(_));

    let writer = deps.strategies.stage(&bucket, &summary.strategy_id)?;
    writer.write_json(FILE_BACKTEST, &summary)?;
    writer.write_json(FILE_OPTIMIZATION, &optimization)?;
    writer.write_json(FILE_BASE_HIT, &optimization.base_hit)?;
    match &compliance {
        Some(c) => writer.write_json(FILE_COMPLIANCE, c)?,
        // Non-promotable candidates still record why no compliance ran.
        None => writer.write_json(
            FILE_COMPLIANCE,
            &json!({
                "strategyId": summary.strategy_id,
                "model": deps.profile.validator().tag(),
                "passed": false,
                "skipped": "gates did not promote"
            }),
        )?,
    }

    if !write_strategy_code(deps, artifacts, &writer)? {
        writer.abort()?;
        return Ok(RouteResult::MissingArtifacts(
            "optimizer pass produced no strategy code file".to_string(),
        ));
    }
    write_readme(&writer, &summary, &optimization)?;

    if !validated {
        write_reason_file(&writer, &gate, compliance.as_ref())?;
    }

    let published = publish_tolerating_duplicate(writer, &summary.strategy_id)?;

    if validated {
        info!(strategy = %summary.strategy_id, "strategy promoted to validated bucket");
        Ok(RouteResult::Success {
            pushed: vec![],
            published,
        })
    } else {
        Ok(RouteResult::Rejected {
            bucket: bucket.category().to_string(),
            reason_codes: gate
                .violations
                .iter()
                .map(|v| v.code.clone())
                .chain(
                    compliance
                        .as_ref()
                        .filter(|c| !c.passed)
                        .map(|_| "compliance".to_string()),
                )
                .collect(),
            published,
        })
    }
}

// ---------------------------------------------------------------------------
// Artifact loading
// ---------------------------------------------------------------------------

/// Find the first artifact that parses as a backtest summary. Preference
/// goes to files literally named `backtest.json`.
pub fn load_backtest_summary(
    artifacts: &[PathBuf],
    root: &Path,
) -> Option<(PathBuf, BacktestSummary)> {
    load_first_json(artifacts, root, FILE_BACKTEST)
}

/// Find the first artifact that parses as an optimization summary.
pub fn load_optimization_summary(
    artifacts: &[PathBuf],
    root: &Path,
) -> Option<(PathBuf, OptimizationSummary)> {
    load_first_json(artifacts, root, FILE_OPTIMIZATION)
}

fn load_first_json<T: serde::de::DeserializeOwned>(
    artifacts: &[PathBuf],
    root: &Path,
    preferred_name: &str,
) -> Option<(PathBuf, T)> {
    let mut ordered: Vec<&PathBuf> = artifacts
        .iter()
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    ordered.sort_by_key(|p| {
        (p.file_name().and_then(|n| n.to_str()) != Some(preferred_name)) as u8
    });

    for rel in ordered {
        let abs = root.join(rel);
        let Ok(text) = fs::read_to_string(&abs) else {
            continue;
        };
        if let Ok(parsed) = serde_json::from_str::<T>(&text) {
            return Some((rel.clone(), parsed));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Bundle helpers
// ---------------------------------------------------------------------------

fn write_strategy_code(
    deps: &RoutingDeps<'_>,
    artifacts: &[PathBuf],
    writer: &qsf_artifacts::BundleWriter,
) -> Result<bool> {
    let Some(code_rel) = artifacts
        .iter()
        .find(|p| p.extension().and_then(|e| e.to_str()) == Some("py"))
    else {
        return Ok(false);
    };
    let abs = deps.layout.root().join(code_rel);
    let bytes =
        fs::read(&abs).with_context(|| format!("read strategy code: {}", abs.display()))?;
    writer.write_file(FILE_STRATEGY_CODE, &bytes)?;
    Ok(true)
}

fn copy_if_listed(
    deps: &RoutingDeps<'_>,
    strategy_field: Option<&serde_json::Value>,
    writer: &qsf_artifacts::BundleWriter,
) -> Result<()> {
    let Some(rel) = strategy_field.and_then(|v| v.as_str()) else {
        return Ok(());
    };
    let abs = deps.layout.root().join(rel);
    if let Ok(bytes) = fs::read(&abs) {
        writer.write_file(FILE_STRATEGY_CODE, &bytes)?;
    }
    Ok(())
}

fn write_readme(
    writer: &qsf_artifacts::BundleWriter,
    summary: &BacktestSummary,
    optimization: &OptimizationSummary,
) -> Result<()> {
    let text = format!(
        "# {}\n\n\
         Symbols: {}\n\n\
         | metric | value |\n|---|---|\n\
         | OOS Sharpe | {:.2} |\n\
         | IS Sharpe | {:.2} |\n\
         | win rate | {:.1}% |\n\
         | trades | {} |\n\
         | max drawdown | {:.1}% |\n\
         | base hit (avg loss MFE) | {:.2} |\n",
        summary.strategy_id,
        summary.symbols.join(", "),
        summary.sharpe_out_sample,
        summary.sharpe_in_sample,
        100.0 * summary.win_rate,
        summary.total_trades,
        100.0 * summary.max_drawdown,
        optimization.base_hit.avg_loss_mfe,
    );
    writer.write_file(FILE_README, text.as_bytes())
}

/// Publish, tolerating a strategy id that already landed in this bucket on
/// an earlier pass (a legitimate re-derivation, not an error worth failing
/// the task over).
fn publish_tolerating_duplicate(
    writer: qsf_artifacts::BundleWriter,
    strategy_id: &str,
) -> Result<Option<PathBuf>> {
    match writer.publish() {
        Ok(path) => Ok(Some(path)),
        Err(e) => {
            warn!(strategy = %strategy_id, error = %e, "bundle already present; keeping the original");
            Ok(None)
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed")
        .to_string()
}
