//! The worker loop: one session at a time, one task at a time.

use std::path::PathBuf;
use std::time::{Duration as StdDuration, SystemTime};

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use tracing::{info, warn};

use qsf_artifacts::StrategiesRoot;
use qsf_checkpoint::{Checkpoint, CheckpointStore, ResumeAction};
use qsf_config::{load_layered_json, FactoryConfig};
use qsf_gates::GateThresholds;
use qsf_patterns::{EntryKind, PatternCategory, PatternEntry, PatternStore};
use qsf_profile::{Profile, ProfileRegistry};
use qsf_queue::{ClaimedItem, QueueRoot};
use qsf_schemas::{ErrorKind, ItemId, Marker, ProjectLayout, WorkerRole};
use qsf_session::{
    check_completion, write_session_summary, CompletionCheck, ModelPassResult, SessionController,
    SessionOutcome, SessionReport, SessionSettings,
};

use crate::context::SessionContext;
use crate::cost_tracker::CostTracker;
use crate::invoker::{DistillRequest, InvokerError, ModelInvoker, TaskRequest};
use crate::notifier::Notifier;
use crate::routing::{
    route_backtester, route_converter, route_optimizer, route_researcher, RouteResult,
    RoutingDeps,
};

/// Everything a worker process needs, opened once from the project root.
pub struct WorkerHarness {
    pub layout: ProjectLayout,
    pub config: FactoryConfig,
    pub thresholds: GateThresholds,
    pub profile: Profile,
    pub pane: u32,
    pub role: WorkerRole,
    pub queues: QueueRoot,
    pub checkpoints: CheckpointStore,
    pub patterns: PatternStore,
    pub strategies: StrategiesRoot,
}

impl WorkerHarness {
    /// Load config + active profile and build the stores.
    pub fn open(root: impl Into<PathBuf>, pane: u32, role: WorkerRole) -> Result<WorkerHarness> {
        let layout = ProjectLayout::new(root);

        let loaded = load_layered_json(&[&layout.config_file()])
            .with_context(|| format!("load config under {}", layout.root().display()))?;
        let config = loaded.factory()?;
        let thresholds = GateThresholds::from_config(&loaded.config_json)?;

        let registry = ProfileRegistry::load(layout.root())?;
        let profile = registry.active().clone();

        let queues = QueueRoot::new(layout.queues_dir());
        queues.ensure_layout()?;
        let strategies = StrategiesRoot::new(layout.strategies_dir());
        strategies.ensure_layout(&profile.validated_dir)?;

        Ok(WorkerHarness {
            checkpoints: CheckpointStore::new(layout.checkpoints_dir()),
            patterns: PatternStore::new(layout.patterns_dir()),
            queues,
            strategies,
            layout,
            config,
            thresholds,
            profile,
            pane,
            role,
        })
    }

    fn routing_deps(&self) -> RoutingDeps<'_> {
        RoutingDeps {
            layout: &self.layout,
            queues: &self.queues,
            strategies: &self.strategies,
            profile: &self.profile,
            thresholds: &self.thresholds,
            pane: self.pane,
        }
    }

    /// Where this role's model passes are expected to create files; the
    /// mtime side of completion verification scans this tree.
    fn output_root(&self) -> PathBuf {
        match self.role {
            WorkerRole::Researcher => self.layout.hypotheses_output_dir(),
            WorkerRole::Converter | WorkerRole::Backtester | WorkerRole::Optimizer => {
                self.layout.backtests_dir()
            }
        }
    }

    fn stop_requested(&self) -> bool {
        self.layout.stop_signal_file().exists()
    }

    fn paused(&self) -> bool {
        self.layout.pause_signal_file().exists()
    }

    fn task_deadline(&self) -> StdDuration {
        StdDuration::from_secs(self.config.model.task_timeout_secs)
    }

    fn child_env(&self) -> Vec<(String, String)> {
        vec![
            ("QSF_ROLE".to_string(), self.role.as_str().to_string()),
            ("QSF_PANE".to_string(), self.pane.to_string()),
            ("QSF_PROFILE".to_string(), self.profile.name.clone()),
            (
                "QSF_PROJECT_ROOT".to_string(),
                self.layout.root().display().to_string(),
            ),
        ]
    }
}

/// The loop itself, generic over the model and notifier boundaries.
pub struct WorkerLoop<I, N> {
    harness: WorkerHarness,
    invoker: I,
    notifier: N,
}

impl<I: ModelInvoker, N: Notifier> WorkerLoop<I, N> {
    pub fn new(harness: WorkerHarness, invoker: I, notifier: N) -> WorkerLoop<I, N> {
        WorkerLoop {
            harness,
            invoker,
            notifier,
        }
    }

    pub fn harness(&self) -> &WorkerHarness {
        &self.harness
    }

    /// The mission loop: sessions back to back until the stop signal.
    pub async fn run_forever(&mut self) -> Result<()> {
        loop {
            if self.harness.stop_requested() {
                info!("stop signal present; mission loop exiting");
                return Ok(());
            }
            let report = self.run_session().await?;
            if report.outcome == SessionOutcome::IncompleteNeedsDistill {
                // Retry distillation before anything else; the pane is not
                // idle until patterns are written.
                warn!(session = %report.session_id, "distillation incomplete; retrying");
                continue;
            }
        }
    }

    /// One full session: START -> LOOP -> DISTILL -> COMPLETE.
    pub async fn run_session(&mut self) -> Result<SessionReport> {
        let h = &self.harness;
        let now = Utc::now();

        let settings = SessionSettings {
            pane: h.pane,
            role: h.role,
            session_timeout: Duration::seconds(h.profile.session_timeout_secs as i64),
            budget_cap_usd: h.profile.budget_cap_usd,
            estimated_cost_per_task_usd: h.config.budget.estimated_cost_per_task_usd,
            max_consecutive_failures: h.config.recovery.max_consecutive_failures,
        };

        // Crash recovery: resume a held claim, or clear a stale record.
        let mut resumed: Option<ClaimedItem> = None;
        match h.checkpoints.reconcile(h.pane, &h.queues)? {
            ResumeAction::Fresh => {}
            ResumeAction::ClearedStale(id) => {
                info!(item = %id, "cleared stale claim record at startup");
            }
            ResumeAction::Resume(id) => {
                resumed = h.queues.adopt_claim(&id, h.pane, h.role)?;
                if resumed.is_some() {
                    info!(item = %id, "resuming claimed item from checkpoint");
                }
            }
        }

        let mut checkpoint = Checkpoint::fresh(h.pane, h.role, now);
        checkpoint.last_claimed_item = resumed.as_ref().map(|c| c.item().id.clone());
        h.checkpoints.save(&checkpoint)?;

        let ctx = SessionContext::gather(&h.profile, &h.patterns, &h.queues)?;
        let mut ctl = SessionController::new(settings, now);
        println!("{}", ctl.begin());

        let mut rejection_log: Vec<String> = Vec::new();
        let poll = StdDuration::from_secs(h.config.poll_interval_secs);

        loop {
            if self.harness.stop_requested() {
                ctl.request_stop();
            }
            if ctl.should_end(Utc::now()).is_some() {
                break;
            }
            if self.harness.paused() {
                self.harness.checkpoints.heartbeat(self.harness.pane)?;
                tokio::time::sleep(poll).await;
                continue;
            }

            // One task. The researcher is generative; the others claim.
            let claimed = match resumed.take() {
                Some(c) => Some(c),
                None if self.harness.role == WorkerRole::Researcher => None,
                None => {
                    match self.harness.queues.claim(
                        self.harness.role.input_queues(),
                        self.harness.pane,
                        self.harness.role,
                    )? {
                        Some(c) => Some(c),
                        None => {
                            self.harness.checkpoints.heartbeat(self.harness.pane)?;
                            tokio::time::sleep(poll).await;
                            continue;
                        }
                    }
                }
            };

            self.run_one_task(&mut ctl, &mut checkpoint, &ctx, claimed, &mut rejection_log)
                .await?;
        }

        // Clean stop with a resumed-but-unprocessed claim: return it now.
        if let Some(c) = resumed.take() {
            c.revert()?;
        }

        self.distill_and_complete(ctl, &ctx, &rejection_log).await
    }

    // -----------------------------------------------------------------------
    // One task
    // -----------------------------------------------------------------------

    async fn run_one_task(
        &mut self,
        ctl: &mut SessionController,
        checkpoint: &mut Checkpoint,
        ctx: &SessionContext,
        claimed: Option<ClaimedItem>,
        rejection_log: &mut Vec<String>,
    ) -> Result<()> {
        let h = &self.harness;

        checkpoint.last_claimed_item = claimed.as_ref().map(|c| c.item().id.clone());
        checkpoint.last_heartbeat = Utc::now();
        h.checkpoints.save(checkpoint)?;

        let task_id = claimed
            .as_ref()
            .map(|c| c.item().id.to_string())
            .unwrap_or_else(|| ItemId::generate(h.role.id_prefix(), Utc::now()).to_string());
        println!(
            "{}",
            Marker::TaskStart {
                task_id: task_id.clone()
            }
        );

        let task_started = SystemTime::now();
        let request = TaskRequest {
            task_id,
            prompt: render_task_prompt(ctx, h.role, claimed.as_ref().map(|c| c.item())),
            deadline: h.task_deadline(),
            env: h.child_env(),
        };

        let outcome = self.invoker.run_task(&request).await;

        // Scenario: the session deadline (or a stop) landed while the pass
        // was running. A verified completion still counts; anything else
        // reverts the claim instead of failing the item.
        let h = &self.harness;
        let session_expiring = h.stop_requested()
            || Utc::now() - checkpoint.session_started_at
                >= Duration::seconds(h.profile.session_timeout_secs as i64);

        match outcome {
            Ok(transcript) => {
                let result =
                    ModelPassResult::from_lines(transcript.lines.iter().map(String::as_str));
                let check = check_completion(&result, &h.output_root(), task_started);
                self.settle_task(ctl, claimed, result, check, session_expiring, rejection_log)?;
            }
            Err(InvokerError::Timeout) => {
                self.fail_or_retry(
                    ctl,
                    claimed,
                    ErrorKind::Timeout,
                    "model pass exceeded its soft deadline",
                    session_expiring,
                    false,
                )?;
            }
            Err(e) => {
                self.fail_or_retry(
                    ctl,
                    claimed,
                    ErrorKind::Worker,
                    &e.to_string(),
                    session_expiring,
                    false,
                )?;
            }
        }

        let h = &self.harness;
        checkpoint.last_claimed_item = None;
        checkpoint.tasks_completed = ctl.tasks_completed();
        checkpoint.files_created = ctl.files_created();
        checkpoint.consecutive_failures = ctl.consecutive_failures();
        checkpoint.last_error_kind = ctl.last_error().map(|(kind, _)| *kind);
        checkpoint.last_heartbeat = Utc::now();
        h.checkpoints.save(checkpoint)?;
        Ok(())
    }

    /// Terminal-transition the queue item and update session accounting
    /// for one completed model pass.
    fn settle_task(
        &mut self,
        ctl: &mut SessionController,
        claimed: Option<ClaimedItem>,
        result: ModelPassResult,
        check: CompletionCheck,
        session_expiring: bool,
        rejection_log: &mut Vec<String>,
    ) -> Result<()> {
        let h = &self.harness;

        match check {
            CompletionCheck::Verified { new_files } => {
                let deps = h.routing_deps();
                let route = match h.role {
                    WorkerRole::Researcher => route_researcher(&deps, &result.artifacts)?,
                    WorkerRole::Converter => route_converter(
                        &deps,
                        claimed.as_ref().expect("converter always claims").item(),
                        &result.artifacts,
                    )?,
                    WorkerRole::Backtester => route_backtester(
                        &deps,
                        claimed.as_ref().expect("backtester always claims").item(),
                        &result.artifacts,
                    )?,
                    WorkerRole::Optimizer => route_optimizer(
                        &deps,
                        claimed.as_ref().expect("optimizer always claims").item(),
                        &result.artifacts,
                    )?,
                };

                match route {
                    RouteResult::Success { pushed, published } => {
                        if let Some(c) = claimed {
                            c.complete()?;
                        }
                        let mut artifacts: Vec<String> = result
                            .artifacts
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect();
                        if let Some(p) = &published {
                            artifacts.push(p.display().to_string());
                        }
                        ctl.record_success(new_files.len() as u32, &artifacts);
                        for (queue, id) in &pushed {
                            info!(queue = %queue, id = %id, "routed downstream");
                        }
                        if published.is_some() {
                            self.notifier.notify(
                                "strategy_validated",
                                &format!("bundle published: {artifacts:?}"),
                            );
                        }
                    }
                    RouteResult::Rejected {
                        bucket,
                        reason_codes,
                        ..
                    } => {
                        if let Some(c) = claimed {
                            c.complete()?;
                        }
                        ctl.record_rejection(new_files.len() as u32);
                        rejection_log.push(format!(
                            "routed to {bucket}: {}",
                            reason_codes.join(", ")
                        ));
                    }
                    RouteResult::MissingArtifacts(msg) => {
                        self.fail_or_retry(
                            ctl,
                            claimed,
                            ErrorKind::Integrity,
                            &msg,
                            session_expiring,
                            false,
                        )?;
                    }
                }
            }
            // An explicit block is a definitive outcome, not a flake:
            // no point retrying the same item.
            CompletionCheck::Blocked { reason } => {
                self.fail_or_retry(
                    ctl,
                    claimed,
                    ErrorKind::Worker,
                    &reason,
                    session_expiring,
                    true,
                )?;
            }
            CompletionCheck::PhraseWithoutFiles => {
                self.fail_or_retry(
                    ctl,
                    claimed,
                    ErrorKind::Worker,
                    "completion phrase without file creation",
                    session_expiring,
                    false,
                )?;
            }
            CompletionCheck::NoCompletionPhrase => {
                self.fail_or_retry(
                    ctl,
                    claimed,
                    ErrorKind::Worker,
                    "model pass ended without a completion marker",
                    session_expiring,
                    false,
                )?;
            }
        }
        Ok(())
    }

    /// The shared failure path.
    ///
    /// A session ending mid-task (wall clock or stop) reverts the claim
    /// and records nothing: no item is marked failed solely because the
    /// session ended. Otherwise the failure counts toward the
    /// consecutive-failure threshold and the item is retried (reverted to
    /// pending) until the threshold trips, at which point it lands in
    /// `failed/` with its error kind. `terminal` skips the retry ladder.
    fn fail_or_retry(
        &self,
        ctl: &mut SessionController,
        claimed: Option<ClaimedItem>,
        kind: ErrorKind,
        message: &str,
        session_expiring: bool,
        terminal: bool,
    ) -> Result<()> {
        if session_expiring {
            if let Some(c) = claimed {
                c.revert()?;
            }
            return Ok(());
        }

        ctl.record_failure(kind, message);
        if let Some(c) = claimed {
            let threshold_hit = ctl.consecutive_failures()
                >= self.harness.config.recovery.max_consecutive_failures;
            if terminal || threshold_hit {
                c.fail(kind, message)?;
            } else {
                c.revert()?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // DISTILL -> COMPLETE
    // -----------------------------------------------------------------------

    async fn distill_and_complete(
        &mut self,
        mut ctl: SessionController,
        ctx: &SessionContext,
        rejection_log: &[String],
    ) -> Result<SessionReport> {
        let h = &self.harness;
        ctl.enter_distill();

        let request = DistillRequest {
            prompt: render_distill_prompt(ctx, rejection_log, &ctl),
            deadline: h.task_deadline(),
            env: h.child_env(),
        };

        match self.invoker.distill(&request).await {
            Ok(drafts) => {
                let market = h.profile.market_type.as_str();
                let mut appended = 0u32;
                for draft in drafts {
                    let category = draft
                        .category
                        .as_deref()
                        .and_then(PatternCategory::from_file_stem)
                        .unwrap_or_else(|| match draft.kind {
                            EntryKind::Success => PatternCategory::success_for(market),
                            EntryKind::Failure => PatternCategory::failure_for(market),
                            EntryKind::Combo => PatternCategory::combos_for(market),
                        });
                    let entry = PatternEntry {
                        kind: draft.kind,
                        recorded_at: Utc::now(),
                        market: market.to_string(),
                        instruments: draft.instruments,
                        metrics: draft.metrics,
                        notes: draft.notes,
                    };
                    h.patterns.append(category, &entry)?;
                    println!(
                        "{}",
                        Marker::PatternsUpdated {
                            file: category.file_name().to_string(),
                            entries: 1
                        }
                    );
                    appended += 1;
                }
                println!("{}", Marker::DistillationComplete);
                ctl.distill_done(appended);

                let (report, marker) = ctl.complete(Utc::now());
                println!("{marker}");
                write_session_summary(&h.layout.session_summaries_dir(), &report)?;
                CostTracker::record_session(
                    &h.layout.cost_tracker_file(),
                    h.role.as_str(),
                    report.estimated_cost_usd,
                    (report.tasks_completed + report.tasks_failed) as u64,
                )?;
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "distillation failed; session incomplete");
                let report = ctl.incomplete_needs_distill(Utc::now());
                write_session_summary(&h.layout.session_summaries_dir(), &report)?;
                Ok(report)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Prompt rendering
// ---------------------------------------------------------------------------

fn render_task_prompt(
    ctx: &SessionContext,
    role: WorkerRole,
    item: Option<&qsf_schemas::QueueItem>,
) -> String {
    let mut prompt = ctx.render_preamble(role);

    match item {
        Some(item) => {
            prompt.push_str(&format!(
                "\nTask {id} (priority {prio}):\n{payload}\n",
                id = item.id,
                prio = item.priority,
                payload = serde_json::to_string_pretty(&item.payload).unwrap_or_default()
            ));
            prompt.push_str(&format!(
                "\nWhen finished, print `QUANT_TASK_COMPLETE: {}` plus `FILES_CREATED:` and `ARTIFACTS:` lines. \
                 If blocked, print `QUANT_TASK_BLOCKED: {}` and a `REASON:` line.\n",
                item.id, item.id
            ));
        }
        None => {
            prompt.push_str(
                "\nGenerate the next hypothesis card within the profile's research scope. \
                 Write it under output/hypotheses/ and report it with QUANT_TASK_COMPLETE, \
                 FILES_CREATED and ARTIFACTS lines.\n",
            );
        }
    }
    prompt
}

fn render_distill_prompt(
    ctx: &SessionContext,
    rejection_log: &[String],
    ctl: &SessionController,
) -> String {
    let mut prompt = format!(
        "Distill this session into pattern entries. Profile {} ({}). \
         Tasks completed: {}, failed: {}.\n",
        ctx.profile_name,
        ctx.market,
        ctl.tasks_completed(),
        ctl.tasks_failed(),
    );
    if !rejection_log.is_empty() {
        prompt.push_str("Gate rejections this session:\n");
        for line in rejection_log {
            prompt.push_str(&format!("- {line}\n"));
        }
    }
    prompt.push_str(
        "\nEmit zero or more `PATTERN_ENTRY: {json}` lines (kind, instruments, metrics, notes) \
         and finish with `DISTILLATION_COMPLETE`.\n",
    );
    prompt
}
