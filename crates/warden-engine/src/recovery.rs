//! Restart reconciliation
//!
//! In-memory tenant counters do not survive a process restart, and neither
//! does any browser engine. A session persisted as `running` at startup is
//! therefore an orphan: its engine is gone and it can never make progress.
//! Recovery marks each one failed with an explicit reason and resets the
//! governor from the (empty) live set before the engine accepts new work.
//!
//! Sessions in `paused_approval` are left alone - that suspension is
//! durable by design and resumes through the normal protocol.

use crate::executor::SessionEngine;
use chrono::Utc;
use std::collections::HashMap;
use tracing::{info, warn};
use warden_core::{Result, SessionStatus};

impl SessionEngine {
    /// Reconcile persisted state after a restart. Returns the ids of the
    /// sessions that were failed as orphans.
    pub async fn recover_orphaned(&self) -> Result<Vec<String>> {
        let orphans = self.store().find_by_status(SessionStatus::Running).await?;

        let mut recovered = Vec::new();
        for mut record in orphans {
            warn!(
                session_id = %record.id,
                tenant_id = %record.tenant_id,
                "orphaned running session found on startup; failing it"
            );
            record.status = SessionStatus::Failed;
            record.error = Some(
                "process restarted while the session was running; no live engine survives"
                    .to_string(),
            );
            record.finished_at = Some(Utc::now());
            record.pause = None;
            self.store().update_session(&record).await?;
            recovered.push(record.id);
        }

        // No engine survives a restart, so the live set is empty.
        self.governor().reconcile(HashMap::new());

        if !recovered.is_empty() {
            info!(count = recovered.len(), "orphaned sessions reconciled");
        }
        Ok(recovered)
    }
}
