//! Session executor - the governed state machine
//!
//! Drives one session through `pending -> running -> {paused_approval |
//! completed | failed}`. Per run:
//!
//! 1. validate the request (failure is terminal, no slot is taken)
//! 2. acquire a per-tenant concurrency slot (failure is terminal)
//! 3. launch the engine and record the initial navigation
//! 4. walk the plan in order: blocked actions are recorded and skipped,
//!    unapproved high-risk actions suspend the session, everything else
//!    executes with audit capture; the first executor failure ends the run
//! 5. a clean walk ends in `completed`
//!
//! The whole run sits inside a hard wall-clock timeout that force-closes
//! the engine; the slot is scoped so it is released on every exit path.
//! External cancellation (a status overwrite in the store) is honored
//! between actions.

use crate::approval::ApprovalGateway;
use crate::governor::ConcurrencyGovernor;
use crate::store::SessionStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use warden_audit::{AuditCapture, AuditEvidence, BlobStore};
use warden_browser::{execute_action, extracted_text, BrowserEngine, EngineLauncher};
use warden_core::{
    ActionOutcome, ActionRecord, ActionRequest, ActionType, EngineConfig, PauseBookmark, Result,
    RiskLevel, SessionConfig, SessionRecord, SessionResult, SessionStatus, WardenError,
};
use warden_policy::{classify, host_of, plan_risk_tier, GovernancePolicy};

/// How a run enters the action loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunMode {
    /// First run: record the initial navigation, start at plan index 0
    Fresh,
    /// Resume after approval: re-open the page as setup, start at the
    /// paused index with that one action's risk gate already cleared
    Resume { next_index: usize },
}

impl RunMode {
    fn start_index(&self) -> usize {
        match self {
            Self::Fresh => 0,
            Self::Resume { next_index } => *next_index,
        }
    }

    fn approved_index(&self) -> Option<usize> {
        match self {
            Self::Fresh => None,
            Self::Resume { next_index } => Some(*next_index),
        }
    }
}

/// The governed browser-automation session engine
pub struct SessionEngine {
    config: EngineConfig,
    policy: GovernancePolicy,
    governor: ConcurrencyGovernor,
    launcher: Arc<dyn EngineLauncher>,
    store: Arc<dyn SessionStore>,
    approvals: Arc<dyn ApprovalGateway>,
    audit: AuditCapture,
}

impl SessionEngine {
    pub fn new(
        config: EngineConfig,
        launcher: Arc<dyn EngineLauncher>,
        store: Arc<dyn SessionStore>,
        approvals: Arc<dyn ApprovalGateway>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let policy = GovernancePolicy::new(&config);
        let governor = ConcurrencyGovernor::new(config.max_sessions_per_tenant);
        let audit = AuditCapture::new(blobs, config.dom_snapshot_char_cap);
        Self {
            config,
            policy,
            governor,
            launcher,
            store,
            approvals,
            audit,
        }
    }

    /// Concurrency governor, exposed for monitoring and reconciliation
    pub fn governor(&self) -> &ConcurrencyGovernor {
        &self.governor
    }

    pub(crate) fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub(crate) fn approvals(&self) -> &Arc<dyn ApprovalGateway> {
        &self.approvals
    }

    /// Execute one session end to end (or to its first suspension point).
    ///
    /// Validation and capacity failures are terminal for this attempt and
    /// reported through the result's status and error, with a reason the
    /// caller can use to distinguish "fix the request" from "retry later".
    pub async fn execute_session(&self, request: SessionConfig) -> Result<SessionResult> {
        let session_host = host_of(&request.target_url).unwrap_or_default();
        let risk_tier = plan_risk_tier(&request.actions, &session_host);
        let mut record = SessionRecord::new(&request, risk_tier);

        // Credential values never reach persistence, not even inside the
        // immutable plan copy; the actions carrying them can never execute.
        for action in record.plan.iter_mut() {
            if classify(action, &session_host).is_blocked() {
                *action = action.redacted();
            }
        }

        info!(
            session_id = %record.id,
            tenant_id = %record.tenant_id,
            risk_tier = %risk_tier,
            actions = record.plan.len(),
            "session requested"
        );

        // Step 1: governance validation. No slot is held yet, so there is
        // nothing to release on this path.
        let errors = self.policy.validate_session(&request);
        if !errors.is_empty() {
            let reason = WardenError::Validation(errors.join("; ")).to_string();
            record.status = SessionStatus::Failed;
            record.error = Some(reason);
            record.finished_at = Some(Utc::now());
            self.store.create_session(&record).await?;
            return self.result_for(&record).await;
        }

        // Step 2: concurrency slot, fail-fast at the ceiling.
        let slot = match self.governor.acquire(&record.tenant_id) {
            Ok(slot) => slot,
            Err(e) => {
                warn!(session_id = %record.id, error = %e, "no capacity for session");
                record.status = SessionStatus::Failed;
                record.error = Some(e.to_string());
                record.finished_at = Some(Utc::now());
                self.store.create_session(&record).await?;
                return self.result_for(&record).await;
            }
        };

        record.status = SessionStatus::Running;
        self.store.create_session(&record).await?;

        let result = self.drive(record, RunMode::Fresh).await;
        slot.release();
        result
    }

    /// Launch an engine and run the action loop under the hard session
    /// timeout. The engine is force-closed on every path out of here.
    pub(crate) async fn drive(
        &self,
        mut record: SessionRecord,
        mode: RunMode,
    ) -> Result<SessionResult> {
        let engine = match self.launcher.launch().await {
            Ok(engine) => engine,
            Err(e) => {
                self.finish_failed(&mut record, format!("browser launch failed: {}", e))
                    .await?;
                return self.result_for(&record).await;
            }
        };

        let deadline = self.config.session_timeout();
        let run = self.run_loop(Arc::clone(&engine), &mut record, mode);

        let timed_out = match tokio::time::timeout(deadline, run).await {
            Ok(Ok(())) => false,
            Ok(Err(e)) => {
                // Persistence failed mid-run; the record may be stale but
                // the session cannot be trusted to continue.
                record.status = SessionStatus::Failed;
                record.error = Some(format!("internal error: {}", e));
                record.finished_at = Some(Utc::now());
                if let Err(update_err) = self.persist_or_adopt(&mut record).await {
                    warn!(session_id = %record.id, error = %update_err, "failed to persist failure");
                }
                false
            }
            Err(_) => true,
        };

        if timed_out {
            warn!(
                session_id = %record.id,
                limit_secs = self.config.session_timeout_secs,
                "session exceeded hard timeout; forcing engine teardown"
            );
            record.status = SessionStatus::Failed;
            record.error = Some(
                WardenError::Timeout(format!(
                    "exceeded the {}s session limit",
                    self.config.session_timeout_secs
                ))
                .to_string(),
            );
            record.finished_at = Some(Utc::now());
            record.pause = None;
            if let Err(e) = self.persist_or_adopt(&mut record).await {
                warn!(session_id = %record.id, error = %e, "failed to persist timeout failure");
            }
        }

        // Unconditional teardown: after a timeout this is what makes any
        // in-flight engine await fail instead of hang.
        if let Err(e) = engine.close().await {
            warn!(session_id = %record.id, error = %e, "engine close failed");
        }

        self.result_for(&record).await
    }

    async fn run_loop(
        &self,
        engine: Arc<dyn BrowserEngine>,
        record: &mut SessionRecord,
        mode: RunMode,
    ) -> Result<()> {
        let session_host = host_of(&record.target_url).unwrap_or_default();

        // Open the target page. On a fresh run this is audit history (the
        // session's first record); on resume it is setup for a new engine
        // instance and stays out of the action sequence.
        let nav_request = ActionRequest::navigate(&record.target_url);
        let nav_outcome =
            execute_action(engine.as_ref(), &self.policy, &self.config, &nav_request).await;

        match mode {
            RunMode::Fresh => {
                let evidence = if nav_outcome.ok {
                    self.audit
                        .capture(
                            engine.as_ref(),
                            &record.tenant_id,
                            &record.id,
                            0,
                            ActionType::Navigate,
                        )
                        .await
                } else {
                    AuditEvidence::default()
                };
                self.append_record(record, 0, &nav_request, RiskLevel::Low, true, evidence, &nav_outcome)
                    .await?;

                if !nav_outcome.ok {
                    let reason = nav_outcome.error.unwrap_or_else(|| "unknown".to_string());
                    self.finish_failed(record, format!("initial navigation failed: {}", reason))
                        .await?;
                    return Ok(());
                }
                record.executed_count += 1;
                if !self.persist_or_adopt(record).await? {
                    return Ok(());
                }
            }
            RunMode::Resume { .. } => {
                if !nav_outcome.ok {
                    let reason = nav_outcome.error.unwrap_or_else(|| "unknown".to_string());
                    self.finish_failed(record, format!("re-navigation on resume failed: {}", reason))
                        .await?;
                    return Ok(());
                }
            }
        }

        let plan = record.plan.clone();
        for (index, action) in plan.iter().enumerate().skip(mode.start_index()) {
            // External cancellation lands as a status overwrite; honor it
            // between actions, never mid-action.
            if let Some(persisted) = self.store.get_session(&record.id).await? {
                if persisted.status == SessionStatus::Failed {
                    info!(session_id = %record.id, "session cancelled externally; stopping");
                    *record = persisted;
                    return Ok(());
                }
            }

            let classification = classify(action, &session_host);
            let approved = mode.approved_index() == Some(index);
            let sequence = index + 1;

            if classification.is_blocked() {
                warn!(
                    session_id = %record.id,
                    index,
                    action = %action.action_type,
                    "action blocked by policy; recorded and skipped"
                );
                self.append_record(
                    record,
                    sequence,
                    &action.redacted(),
                    RiskLevel::Blocked,
                    false,
                    AuditEvidence::default(),
                    &ActionOutcome::rejected(),
                )
                .await?;
                continue;
            }

            if classification.requires_approval() && !approved {
                let evidence_ref = self
                    .audit
                    .capture_screenshot(
                        engine.as_ref(),
                        &record.tenant_id,
                        &record.id,
                        sequence,
                        action.action_type,
                    )
                    .await;
                let approval = self
                    .approvals
                    .create_request(&record.tenant_id, &record.id, index, evidence_ref)
                    .await?;

                record.status = SessionStatus::PausedApproval;
                record.pause = Some(PauseBookmark {
                    action_index: index,
                    approval_id: approval.id.clone(),
                });
                if !self.persist_or_adopt(record).await? {
                    return Ok(());
                }

                info!(
                    session_id = %record.id,
                    index,
                    approval_id = %approval.id,
                    reason = %classification.reason,
                    "session paused for approval"
                );
                return Ok(());
            }

            let outcome =
                execute_action(engine.as_ref(), &self.policy, &self.config, action).await;
            let evidence = self
                .audit
                .capture(
                    engine.as_ref(),
                    &record.tenant_id,
                    &record.id,
                    sequence,
                    action.action_type,
                )
                .await;
            self.append_record(
                record,
                sequence,
                action,
                classification.level,
                true,
                evidence,
                &outcome,
            )
            .await?;

            if !outcome.ok {
                let reason = outcome.error.unwrap_or_else(|| "unknown".to_string());
                self.finish_failed(
                    record,
                    format!("action {} ({}) failed: {}", index, action.action_type, reason),
                )
                .await?;
                return Ok(());
            }

            record.executed_count += 1;
            if action.action_type == ActionType::Extract {
                if let Some(text) = extracted_text(&outcome) {
                    record.extracted_data.push(text);
                }
            }
            if !self.persist_or_adopt(record).await? {
                return Ok(());
            }
        }

        record.status = SessionStatus::Completed;
        record.finished_at = Some(Utc::now());
        record.pause = None;
        if self.persist_or_adopt(record).await? {
            info!(
                session_id = %record.id,
                executed = record.executed_count,
                "session completed"
            );
        }
        Ok(())
    }

    /// Persist the record unless an external overwrite already failed the
    /// session (operator cancellation). In that case the persisted state
    /// wins: adopt it and report `false` so the caller stops promptly.
    async fn persist_or_adopt(&self, record: &mut SessionRecord) -> Result<bool> {
        match self.store.update_session(record).await {
            Ok(()) => Ok(true),
            Err(e) => {
                if let Some(persisted) = self.store.get_session(&record.id).await? {
                    if persisted.status == SessionStatus::Failed {
                        info!(
                            session_id = %record.id,
                            "session was failed externally; stopping"
                        );
                        *record = persisted;
                        return Ok(false);
                    }
                }
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn append_record(
        &self,
        record: &SessionRecord,
        index: usize,
        request: &ActionRequest,
        risk: RiskLevel,
        approved: bool,
        evidence: AuditEvidence,
        outcome: &ActionOutcome,
    ) -> Result<()> {
        let action_record = ActionRecord {
            session_id: record.id.clone(),
            index,
            request: request.clone(),
            risk,
            approved,
            screenshot_ref: evidence.screenshot_ref,
            dom_snapshot: evidence.dom_snapshot,
            outcome: Some(outcome.clone()),
            recorded_at: Utc::now(),
        };
        self.store.append_action(&action_record).await
    }

    pub(crate) async fn finish_failed(
        &self,
        record: &mut SessionRecord,
        reason: String,
    ) -> Result<()> {
        warn!(session_id = %record.id, reason = %reason, "session failed");
        record.status = SessionStatus::Failed;
        record.error = Some(reason);
        record.finished_at = Some(Utc::now());
        record.pause = None;
        self.persist_or_adopt(record).await.map(|_| ())
    }

    pub(crate) async fn result_for(&self, record: &SessionRecord) -> Result<SessionResult> {
        let actions = self.store.list_actions(&record.id).await?;
        Ok(SessionResult {
            session_id: record.id.clone(),
            status: record.status,
            actions,
            extracted_data: record.extracted_data.clone(),
            error: record.error.clone(),
        })
    }
}
