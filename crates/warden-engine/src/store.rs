//! Session persistence boundary
//!
//! Session and action records are created and mutated exclusively by the
//! session executor and resume protocol; everything else reads. Both
//! provided implementations enforce terminal immutability: a completed or
//! failed session can never be updated again. The one sanctioned exception
//! is the operator cancellation overwrite of a non-terminal session, which
//! arrives through the same `update_session` door.

use crate::approval::ApprovalGateway;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;
use warden_core::{
    ActionRecord, ApprovalDecision, ApprovalRequestRecord, Result, SessionRecord, SessionStatus,
    WardenError,
};

/// Persistence boundary for session and action records
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, record: &SessionRecord) -> Result<()>;

    async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>>;

    /// Update an existing session. Terminal sessions are immutable.
    async fn update_session(&self, record: &SessionRecord) -> Result<()>;

    /// Append one action record (append-only, ordered by index)
    async fn append_action(&self, record: &ActionRecord) -> Result<()>;

    /// All action records for a session, ordered by index
    async fn list_actions(&self, session_id: &str) -> Result<Vec<ActionRecord>>;

    /// All sessions currently in the given status (restart reconciliation)
    async fn find_by_status(&self, status: SessionStatus) -> Result<Vec<SessionRecord>>;
}

fn terminal_guard(existing: &SessionRecord, incoming: &SessionRecord) -> Result<()> {
    if existing.status.is_terminal() {
        return Err(WardenError::Storage(format!(
            "session {} is {} and immutable; rejected update to {}",
            existing.id, existing.status, incoming.status
        )));
    }
    Ok(())
}

/// In-memory session store for tests and single-process runs
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    actions: Mutex<Vec<ActionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, record: &SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        if sessions.contains_key(&record.id) {
            return Err(WardenError::Storage(format!(
                "session {} already exists",
                record.id
            )));
        }
        sessions.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>> {
        Ok(self
            .sessions
            .lock()
            .expect("session mutex poisoned")
            .get(id)
            .cloned())
    }

    async fn update_session(&self, record: &SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        let existing = sessions.get(&record.id).ok_or_else(|| {
            WardenError::SessionNotFound(record.id.clone())
        })?;
        terminal_guard(existing, record)?;
        sessions.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn append_action(&self, record: &ActionRecord) -> Result<()> {
        self.actions
            .lock()
            .expect("action mutex poisoned")
            .push(record.clone());
        Ok(())
    }

    async fn list_actions(&self, session_id: &str) -> Result<Vec<ActionRecord>> {
        let mut actions: Vec<ActionRecord> = self
            .actions
            .lock()
            .expect("action mutex poisoned")
            .iter()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect();
        actions.sort_by_key(|a| a.index);
        Ok(actions)
    }

    async fn find_by_status(&self, status: SessionStatus) -> Result<Vec<SessionRecord>> {
        Ok(self
            .sessions
            .lock()
            .expect("session mutex poisoned")
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect())
    }
}

/// JSON-file-backed store for local runs that must survive a restart
/// (pause on one invocation, resume on the next).
///
/// Layout under the root directory:
/// - `sessions/{id}.json` - one `SessionRecord`
/// - `actions/{id}.json` - ordered `Vec<ActionRecord>`
/// - `approvals/{id}.json` - one `ApprovalRequestRecord`
///
/// Also implements [`ApprovalGateway`] so a CLI can act as the external
/// decision input between invocations.
pub struct JsonFileStateStore {
    root: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.root.join("sessions").join(format!("{}.json", id))
    }

    fn actions_path(&self, id: &str) -> PathBuf {
        self.root.join("actions").join(format!("{}.json", id))
    }

    fn approval_path(&self, id: &str) -> PathBuf {
        self.root.join("approvals").join(format!("{}.json", id))
    }

    async fn write_json<T: serde::Serialize>(&self, path: &PathBuf, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                WardenError::Storage(format!(
                    "Failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let content = serde_json::to_string_pretty(value)?;
        fs::write(path, content).await.map_err(|e| {
            WardenError::Storage(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &PathBuf,
    ) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).await.map_err(|e| {
            WardenError::Storage(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Update an approval's decision in place (the CLI's `approve` path)
    pub async fn resolve_approval(&self, id: &str, decision: ApprovalDecision) -> Result<()> {
        let path = self.approval_path(id);
        let mut record: ApprovalRequestRecord = self
            .read_json(&path)
            .await?
            .ok_or_else(|| WardenError::Approval(format!("approval request {} not found", id)))?;
        record.decision = decision;
        self.write_json(&path, &record).await
    }
}

#[async_trait]
impl SessionStore for JsonFileStateStore {
    async fn create_session(&self, record: &SessionRecord) -> Result<()> {
        let path = self.session_path(&record.id);
        if path.exists() {
            return Err(WardenError::Storage(format!(
                "session {} already exists",
                record.id
            )));
        }
        self.write_json(&path, record).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>> {
        self.read_json(&self.session_path(id)).await
    }

    async fn update_session(&self, record: &SessionRecord) -> Result<()> {
        let path = self.session_path(&record.id);
        let existing: SessionRecord = self
            .read_json(&path)
            .await?
            .ok_or_else(|| WardenError::SessionNotFound(record.id.clone()))?;
        terminal_guard(&existing, record)?;
        self.write_json(&path, record).await
    }

    async fn append_action(&self, record: &ActionRecord) -> Result<()> {
        let path = self.actions_path(&record.session_id);
        let mut actions: Vec<ActionRecord> =
            self.read_json(&path).await?.unwrap_or_default();
        actions.push(record.clone());
        self.write_json(&path, &actions).await
    }

    async fn list_actions(&self, session_id: &str) -> Result<Vec<ActionRecord>> {
        let mut actions: Vec<ActionRecord> = self
            .read_json(&self.actions_path(session_id))
            .await?
            .unwrap_or_default();
        actions.sort_by_key(|a| a.index);
        Ok(actions)
    }

    async fn find_by_status(&self, status: SessionStatus) -> Result<Vec<SessionRecord>> {
        let dir = self.root.join("sessions");
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut matches = Vec::new();
        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            WardenError::Storage(format!("Failed to read {}: {}", dir.display(), e))
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            WardenError::Storage(format!("Failed to read directory entry: {}", e))
        })? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = self.read_json::<SessionRecord>(&path).await? {
                if record.status == status {
                    matches.push(record);
                }
            }
        }

        Ok(matches)
    }
}

#[async_trait]
impl ApprovalGateway for JsonFileStateStore {
    async fn create_request(
        &self,
        tenant_id: &str,
        session_id: &str,
        action_index: usize,
        evidence_ref: Option<String>,
    ) -> Result<ApprovalRequestRecord> {
        let record =
            ApprovalRequestRecord::new(tenant_id, session_id, action_index, evidence_ref);
        self.write_json(&self.approval_path(&record.id), &record)
            .await?;
        Ok(record)
    }

    async fn get_request(&self, id: &str) -> Result<Option<ApprovalRequestRecord>> {
        self.read_json(&self.approval_path(id)).await
    }

    async fn mark_consumed(&self, id: &str) -> Result<()> {
        let path = self.approval_path(id);
        let mut record: ApprovalRequestRecord = self
            .read_json(&path)
            .await?
            .ok_or_else(|| WardenError::Approval(format!("approval request {} not found", id)))?;
        record.consumed = true;
        self.write_json(&path, &record).await
    }
}
