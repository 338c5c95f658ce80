//! Boundary to the external human-approval subsystem
//!
//! Warden creates approval requests when a session pauses on a high-risk
//! action and consumes their resolution during resume. The decision itself
//! is owned by the external subsystem; the in-memory gateway here stands in
//! for it in tests and local runs (its `resolve` plays the human).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use warden_core::{ApprovalDecision, ApprovalRequestRecord, Result, WardenError};

/// Approval-request boundary consumed by the session engine
#[async_trait]
pub trait ApprovalGateway: Send + Sync {
    /// Create a pending request for one paused action
    async fn create_request(
        &self,
        tenant_id: &str,
        session_id: &str,
        action_index: usize,
        evidence_ref: Option<String>,
    ) -> Result<ApprovalRequestRecord>;

    async fn get_request(&self, id: &str) -> Result<Option<ApprovalRequestRecord>>;

    /// Record that a resume has acted on this request's decision
    async fn mark_consumed(&self, id: &str) -> Result<()>;
}

/// In-memory approval gateway for tests and single-process runs
#[derive(Default)]
pub struct InMemoryApprovalGateway {
    requests: Mutex<HashMap<String, ApprovalRequestRecord>>,
}

impl InMemoryApprovalGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Resolve a pending request, standing in for the external decision
    pub fn resolve(&self, id: &str, decision: ApprovalDecision) -> Result<()> {
        let mut requests = self.requests.lock().expect("approval mutex poisoned");
        let request = requests
            .get_mut(id)
            .ok_or_else(|| WardenError::Approval(format!("approval request {} not found", id)))?;
        request.decision = decision;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.requests.lock().expect("approval mutex poisoned").len()
    }

    pub fn all(&self) -> Vec<ApprovalRequestRecord> {
        self.requests
            .lock()
            .expect("approval mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ApprovalGateway for InMemoryApprovalGateway {
    async fn create_request(
        &self,
        tenant_id: &str,
        session_id: &str,
        action_index: usize,
        evidence_ref: Option<String>,
    ) -> Result<ApprovalRequestRecord> {
        let record =
            ApprovalRequestRecord::new(tenant_id, session_id, action_index, evidence_ref);
        self.requests
            .lock()
            .expect("approval mutex poisoned")
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_request(&self, id: &str) -> Result<Option<ApprovalRequestRecord>> {
        Ok(self
            .requests
            .lock()
            .expect("approval mutex poisoned")
            .get(id)
            .cloned())
    }

    async fn mark_consumed(&self, id: &str) -> Result<()> {
        let mut requests = self.requests.lock().expect("approval mutex poisoned");
        let request = requests
            .get_mut(id)
            .ok_or_else(|| WardenError::Approval(format!("approval request {} not found", id)))?;
        request.consumed = true;
        Ok(())
    }
}
