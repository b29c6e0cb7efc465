//! The session state machine and its bookkeeping.
//!
//! The controller is pure bookkeeping: no IO, no clock of its own. The
//! worker loop feeds it timestamps and task outcomes; the controller
//! answers "may this loop continue" and assembles the final report.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use qsf_schemas::{ErrorKind, Marker, WorkerRole};

// ---------------------------------------------------------------------------
// States and end reasons
// ---------------------------------------------------------------------------

/// START -> LOOP -> DISTILL -> COMPLETE, strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Start,
    Loop,
    Distill,
    Complete,
}

/// Why the LOOP phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    /// Consecutive failures exceeded the threshold.
    FailureThreshold,
    /// Session wall-clock deadline passed.
    Timeout,
    /// Estimated cost reached the budget cap.
    BudgetCap,
    /// An explicit stop signal arrived.
    StopRequested,
}

impl SessionEndReason {
    /// The error kind this end reason maps to in summaries.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            SessionEndReason::FailureThreshold => Some(ErrorKind::Worker),
            SessionEndReason::Timeout => Some(ErrorKind::Timeout),
            SessionEndReason::BudgetCap => Some(ErrorKind::Budget),
            SessionEndReason::StopRequested => None,
        }
    }
}

/// Terminal session outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Complete,
    /// Distillation failed; the supervisor must retry it before the pane
    /// is idle.
    IncompleteNeedsDistill,
}

// ---------------------------------------------------------------------------
// Settings and report
// ---------------------------------------------------------------------------

/// Loop governance knobs, resolved from config + profile at session start.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub pane: u32,
    pub role: WorkerRole,
    pub session_timeout: Duration,
    pub budget_cap_usd: f64,
    pub estimated_cost_per_task_usd: f64,
    pub max_consecutive_failures: u32,
}

/// Everything `SESSION_COMPLETE` and the summary file report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub pane: u32,
    pub role: WorkerRole,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub end_reason: SessionEndReason,
    pub outcome: SessionOutcome,
    pub tasks_completed: u32,
    pub tasks_failed: u32,
    pub tasks_rejected: u32,
    pub files_created: u32,
    pub artifacts: Vec<String>,
    pub estimated_cost_usd: f64,
    pub pattern_entries_appended: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<(ErrorKind, String)>,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SessionController {
    settings: SessionSettings,
    session_id: Uuid,
    state: SessionState,
    started_at: DateTime<Utc>,
    tasks_completed: u32,
    tasks_failed: u32,
    tasks_rejected: u32,
    files_created: u32,
    consecutive_failures: u32,
    artifacts: Vec<String>,
    estimated_cost_usd: f64,
    pattern_entries_appended: u32,
    end_reason: Option<SessionEndReason>,
    last_error: Option<(ErrorKind, String)>,
    stop_requested: bool,
}

impl SessionController {
    pub fn new(settings: SessionSettings, now: DateTime<Utc>) -> SessionController {
        SessionController {
            settings,
            session_id: Uuid::new_v4(),
            state: SessionState::Start,
            started_at: now,
            tasks_completed: 0,
            tasks_failed: 0,
            tasks_rejected: 0,
            files_created: 0,
            consecutive_failures: 0,
            artifacts: Vec::new(),
            estimated_cost_usd: 0.0,
            pattern_entries_appended: 0,
            end_reason: None,
            last_error: None,
            stop_requested: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn estimated_cost_usd(&self) -> f64 {
        self.estimated_cost_usd
    }

    pub fn tasks_completed(&self) -> u32 {
        self.tasks_completed
    }

    pub fn tasks_failed(&self) -> u32 {
        self.tasks_failed
    }

    pub fn files_created(&self) -> u32 {
        self.files_created
    }

    pub fn last_error(&self) -> Option<&(ErrorKind, String)> {
        self.last_error.as_ref()
    }

    /// START: transition into LOOP, returning the `SESSION_START` marker
    /// the pane prints.
    pub fn begin(&mut self) -> Marker {
        assert_eq!(self.state, SessionState::Start, "begin() called twice");
        self.state = SessionState::Loop;
        info!(
            session = %self.session_id,
            pane = self.settings.pane,
            role = %self.settings.role,
            "session started"
        );
        Marker::SessionStart {
            role: self.settings.role,
            at: self.started_at,
        }
    }

    /// Checked at every loop boundary. `None` means keep looping.
    ///
    /// Order matters: an explicit stop wins, then the failure threshold,
    /// then wall clock, then budget.
    pub fn should_end(&mut self, now: DateTime<Utc>) -> Option<SessionEndReason> {
        debug_assert_eq!(self.state, SessionState::Loop);

        let reason = if self.stop_requested {
            SessionEndReason::StopRequested
        } else if self.consecutive_failures >= self.settings.max_consecutive_failures {
            SessionEndReason::FailureThreshold
        } else if now - self.started_at >= self.settings.session_timeout {
            SessionEndReason::Timeout
        } else if self.estimated_cost_usd >= self.settings.budget_cap_usd {
            SessionEndReason::BudgetCap
        } else {
            return None;
        };

        self.end_reason = Some(reason);
        Some(reason)
    }

    /// Stop flag observed (file or signal). Takes effect at the next loop
    /// boundary.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    // -----------------------------------------------------------------------
    // Task accounting (one model pass = one unit of budget)
    // -----------------------------------------------------------------------

    /// A verified completion. Resets the consecutive-failure counter.
    pub fn record_success(&mut self, files_created: u32, artifacts: &[String]) {
        self.tasks_completed += 1;
        self.files_created += files_created;
        self.artifacts.extend_from_slice(artifacts);
        self.consecutive_failures = 0;
        self.accrue_task_cost();
    }

    /// A gate rejection is a successful task with a rejected routing
    /// outcome. It does NOT touch the failure counter.
    pub fn record_rejection(&mut self, files_created: u32) {
        self.tasks_completed += 1;
        self.tasks_rejected += 1;
        self.files_created += files_created;
        self.consecutive_failures = 0;
        self.accrue_task_cost();
    }

    /// A failed task (no phrase, phrase without files, blocked, or task
    /// deadline exceeded).
    pub fn record_failure(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.tasks_failed += 1;
        self.consecutive_failures += 1;
        self.last_error = Some((kind, message.into()));
        self.accrue_task_cost();
    }

    fn accrue_task_cost(&mut self) {
        self.estimated_cost_usd += self.settings.estimated_cost_per_task_usd;
    }

    // -----------------------------------------------------------------------
    // DISTILL / COMPLETE
    // -----------------------------------------------------------------------

    /// LOOP -> DISTILL. The loop must have ended first.
    pub fn enter_distill(&mut self) {
        assert!(
            self.end_reason.is_some(),
            "distill entered while the loop was still live"
        );
        self.state = SessionState::Distill;
    }

    /// Distillation succeeded with `entries` pattern entries appended.
    pub fn distill_done(&mut self, entries: u32) {
        debug_assert_eq!(self.state, SessionState::Distill);
        self.pattern_entries_appended += entries;
    }

    /// DISTILL -> COMPLETE. Returns the report and the `SESSION_COMPLETE`
    /// marker. Only reachable through `enter_distill`, so a session can
    /// never complete without a distill pass having run.
    pub fn complete(mut self, now: DateTime<Utc>) -> (SessionReport, Marker) {
        assert_eq!(
            self.state,
            SessionState::Distill,
            "complete() without distill"
        );
        self.state = SessionState::Complete;

        let marker = Marker::SessionComplete {
            role: self.settings.role,
            at: now,
        };
        (self.into_report(now, SessionOutcome::Complete), marker)
    }

    /// Distillation failed: the session ends as INCOMPLETE_NEEDS_DISTILL
    /// and emits no `SESSION_COMPLETE` marker.
    pub fn incomplete_needs_distill(self, now: DateTime<Utc>) -> SessionReport {
        self.into_report(now, SessionOutcome::IncompleteNeedsDistill)
    }

    fn into_report(self, now: DateTime<Utc>, outcome: SessionOutcome) -> SessionReport {
        SessionReport {
            session_id: self.session_id,
            pane: self.settings.pane,
            role: self.settings.role,
            started_at: self.started_at,
            ended_at: now,
            end_reason: self.end_reason.unwrap_or(SessionEndReason::StopRequested),
            outcome,
            tasks_completed: self.tasks_completed,
            tasks_failed: self.tasks_failed,
            tasks_rejected: self.tasks_rejected,
            files_created: self.files_created,
            artifacts: self.artifacts,
            estimated_cost_usd: self.estimated_cost_usd,
            pattern_entries_appended: self.pattern_entries_appended,
            last_error: self.last_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SessionSettings {
        SessionSettings {
            pane: 2,
            role: WorkerRole::Backtester,
            session_timeout: Duration::seconds(3600),
            budget_cap_usd: 2.0,
            estimated_cost_per_task_usd: 0.5,
            max_consecutive_failures: 3,
        }
    }

    #[test]
    fn failure_threshold_ends_the_loop() {
        let now = Utc::now();
        let mut ctl = SessionController::new(settings(), now);
        ctl.begin();

        ctl.record_failure(ErrorKind::Worker, "no phrase");
        ctl.record_failure(ErrorKind::Worker, "no phrase");
        assert_eq!(ctl.should_end(now), None);
        ctl.record_failure(ErrorKind::Worker, "no phrase");
        assert_eq!(ctl.should_end(now), Some(SessionEndReason::FailureThreshold));
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let now = Utc::now();
        let mut ctl = SessionController::new(settings(), now);
        ctl.begin();

        ctl.record_failure(ErrorKind::Worker, "x");
        ctl.record_failure(ErrorKind::Worker, "x");
        ctl.record_success(1, &[]);
        assert_eq!(ctl.consecutive_failures(), 0);
    }

    #[test]
    fn rejection_is_not_failure() {
        let now = Utc::now();
        let mut ctl = SessionController::new(settings(), now);
        ctl.begin();

        ctl.record_failure(ErrorKind::Worker, "x");
        ctl.record_rejection(2);
        assert_eq!(ctl.consecutive_failures(), 0, "rejection resets the counter");
        assert_eq!(ctl.should_end(now), None);
    }

    #[test]
    fn budget_cap_ends_at_boundary() {
        let now = Utc::now();
        let mut ctl = SessionController::new(settings(), now);
        ctl.begin();

        for _ in 0..4 {
            ctl.record_success(1, &[]);
        }
        // 4 x 0.5 = 2.0 reaches the cap.
        assert_eq!(ctl.should_end(now), Some(SessionEndReason::BudgetCap));
    }

    #[test]
    fn timeout_ends_at_boundary() {
        let now = Utc::now();
        let mut ctl = SessionController::new(settings(), now);
        ctl.begin();
        assert_eq!(
            ctl.should_end(now + Duration::seconds(3601)),
            Some(SessionEndReason::Timeout)
        );
    }

    #[test]
    fn complete_requires_distill() {
        let now = Utc::now();
        let mut ctl = SessionController::new(settings(), now);
        ctl.begin();
        ctl.request_stop();
        assert_eq!(ctl.should_end(now), Some(SessionEndReason::StopRequested));

        ctl.enter_distill();
        ctl.distill_done(2);
        let (report, marker) = ctl.complete(now);
        assert_eq!(report.outcome, SessionOutcome::Complete);
        assert_eq!(report.pattern_entries_appended, 2);
        assert!(matches!(marker, Marker::SessionComplete { .. }));
    }

    #[test]
    fn failed_distill_reports_incomplete() {
        let now = Utc::now();
        let mut ctl = SessionController::new(settings(), now);
        ctl.begin();
        ctl.request_stop();
        ctl.should_end(now);
        ctl.enter_distill();

        let report = ctl.incomplete_needs_distill(now);
        assert_eq!(report.outcome, SessionOutcome::IncompleteNeedsDistill);
    }
}
