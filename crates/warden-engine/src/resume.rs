//! Resume protocol for paused sessions
//!
//! Re-enters the session executor after an external approval decision.
//! Everything needed is reconstructed from persisted state - the paused
//! run's process, engine and timers are assumed gone. Only a session in
//! exactly `paused_approval` is a valid resume source; the approved action
//! skips its risk gate once and still executes through the same executor
//! and audit path.

use crate::executor::{RunMode, SessionEngine};
use tracing::info;
use warden_core::{ApprovalDecision, Result, SessionResult, SessionStatus, WardenError};

impl SessionEngine {
    /// Resume a paused session once its approval has been decided.
    ///
    /// Rejects anything not in `paused_approval` (resuming twice, or
    /// resuming a running/terminal session, is an error, not a no-op).
    /// A denied approval fails the session; an approved one re-runs the
    /// remaining plan from the paused index.
    pub async fn resume_session(&self, session_id: &str) -> Result<SessionResult> {
        let mut record = self
            .store()
            .get_session(session_id)
            .await?
            .ok_or_else(|| WardenError::SessionNotFound(session_id.to_string()))?;

        if record.status != SessionStatus::PausedApproval {
            return Err(WardenError::InvalidResume(format!(
                "session {} is {}; only paused_approval sessions can resume",
                session_id, record.status
            )));
        }

        let bookmark = record.pause.clone().ok_or_else(|| {
            WardenError::InvalidResume(format!(
                "session {} is paused but carries no bookmark",
                session_id
            ))
        })?;

        let approval = self
            .approvals()
            .get_request(&bookmark.approval_id)
            .await?
            .ok_or_else(|| {
                WardenError::Approval(format!(
                    "approval request {} not found",
                    bookmark.approval_id
                ))
            })?;

        match approval.decision {
            ApprovalDecision::Pending => Err(WardenError::InvalidResume(format!(
                "approval request {} is still pending",
                bookmark.approval_id
            ))),
            ApprovalDecision::Denied => {
                self.approvals().mark_consumed(&bookmark.approval_id).await?;
                self.finish_failed(
                    &mut record,
                    format!(
                        "approval request {} was denied for action {}",
                        bookmark.approval_id, bookmark.action_index
                    ),
                )
                .await?;
                self.result_for(&record).await
            }
            ApprovalDecision::Approved => {
                if approval.consumed {
                    return Err(WardenError::InvalidResume(format!(
                        "approval request {} was already consumed",
                        bookmark.approval_id
                    )));
                }
                self.approvals().mark_consumed(&bookmark.approval_id).await?;

                // Resume takes a fresh slot; the paused run's slot was
                // released when that process finished.
                let slot = match self.governor().acquire(&record.tenant_id) {
                    Ok(slot) => slot,
                    Err(e) => {
                        self.finish_failed(&mut record, e.to_string()).await?;
                        return self.result_for(&record).await;
                    }
                };

                info!(
                    session_id,
                    index = bookmark.action_index,
                    approval_id = %bookmark.approval_id,
                    "resuming session after approval"
                );

                record.status = SessionStatus::Running;
                record.pause = None;
                self.store().update_session(&record).await?;

                let result = self
                    .drive(
                        record,
                        RunMode::Resume {
                            next_index: bookmark.action_index,
                        },
                    )
                    .await;
                slot.release();
                result
            }
        }
    }
}
