//! Post-action audit capture pipeline
//!
//! After the initial navigation and after every executed action: take a
//! screenshot, upload it at a deterministic path, and capture a sanitized
//! DOM snapshot. Capture is best-effort by contract - a storage or engine
//! failure here downgrades the evidence to None and emits a structured
//! warning; it never affects the action sequence.

use crate::snapshot::sanitize_dom;
use crate::store::BlobStore;
use std::sync::Arc;
use tracing::warn;
use warden_browser::BrowserEngine;
use warden_core::ActionType;

/// Evidence recorded alongside one executed action
#[derive(Debug, Clone, Default)]
pub struct AuditEvidence {
    /// Blob path of the uploaded screenshot; None when capture failed
    pub screenshot_ref: Option<String>,
    /// Sanitized, size-capped DOM snapshot; None when capture failed
    pub dom_snapshot: Option<String>,
}

/// Captures and persists audit evidence for session actions
pub struct AuditCapture {
    store: Arc<dyn BlobStore>,
    dom_cap: usize,
}

impl AuditCapture {
    pub fn new(store: Arc<dyn BlobStore>, dom_cap: usize) -> Self {
        Self { store, dom_cap }
    }

    /// Deterministic blob path for one action's screenshot
    pub fn blob_path(
        tenant_id: &str,
        session_id: &str,
        index: usize,
        action_type: ActionType,
    ) -> String {
        format!(
            "tenants/{}/sessions/{}/{:04}-{}.png",
            tenant_id, session_id, index, action_type
        )
    }

    /// Screenshot the current page and upload it. Returns the blob path on
    /// success, None on any failure (upload failures are non-fatal).
    pub async fn capture_screenshot(
        &self,
        engine: &dyn BrowserEngine,
        tenant_id: &str,
        session_id: &str,
        index: usize,
        action_type: ActionType,
    ) -> Option<String> {
        let bytes = match engine.screenshot().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    session_id,
                    index,
                    error = %e,
                    "screenshot capture failed; continuing without evidence"
                );
                return None;
            }
        };

        let path = Self::blob_path(tenant_id, session_id, index, action_type);
        match self.store.put(&path, &bytes, "image/png").await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(
                    session_id,
                    index,
                    blob_path = %path,
                    error = %e,
                    "screenshot upload failed; continuing without evidence"
                );
                None
            }
        }
    }

    /// Capture the full evidence pair for an executed action
    pub async fn capture(
        &self,
        engine: &dyn BrowserEngine,
        tenant_id: &str,
        session_id: &str,
        index: usize,
        action_type: ActionType,
    ) -> AuditEvidence {
        let screenshot_ref = self
            .capture_screenshot(engine, tenant_id, session_id, index, action_type)
            .await;

        let dom_snapshot = match engine.dom_snapshot().await {
            Ok(html) => Some(sanitize_dom(&html, self.dom_cap)),
            Err(e) => {
                warn!(
                    session_id,
                    index,
                    error = %e,
                    "DOM snapshot failed; continuing without evidence"
                );
                None
            }
        };

        AuditEvidence {
            screenshot_ref,
            dom_snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBlobStore;
    use warden_browser::{EngineLauncher, MockLauncher};

    #[test]
    fn test_blob_path_is_deterministic() {
        let path = AuditCapture::blob_path("t1", "s1", 3, ActionType::Click);
        assert_eq!(path, "tenants/t1/sessions/s1/0003-click.png");
    }

    #[tokio::test]
    async fn test_capture_uploads_and_sanitizes() {
        let store = MemoryBlobStore::new();
        let capture = AuditCapture::new(store.clone(), 1000);
        let launcher =
            MockLauncher::new().with_dom_html("<script>x()</script><p>visible</p>");
        let engine = launcher.launch().await.unwrap();

        let evidence = capture
            .capture(engine.as_ref(), "t1", "s1", 0, ActionType::Navigate)
            .await;

        assert_eq!(
            evidence.screenshot_ref.as_deref(),
            Some("tenants/t1/sessions/s1/0000-navigate.png")
        );
        assert!(store.contains("tenants/t1/sessions/s1/0000-navigate.png"));

        let dom = evidence.dom_snapshot.unwrap();
        assert!(!dom.contains("<script>"));
        assert!(dom.contains("visible"));
    }

    #[tokio::test]
    async fn test_upload_failure_is_non_fatal() {
        let store = MemoryBlobStore::new();
        store.set_failing(true);
        let capture = AuditCapture::new(store.clone(), 1000);
        let launcher = MockLauncher::new();
        let engine = launcher.launch().await.unwrap();

        let evidence = capture
            .capture(engine.as_ref(), "t1", "s1", 1, ActionType::Extract)
            .await;

        // No screenshot reference, but the DOM snapshot still arrives
        assert!(evidence.screenshot_ref.is_none());
        assert!(evidence.dom_snapshot.is_some());
    }

    #[tokio::test]
    async fn test_engine_screenshot_failure_is_non_fatal() {
        let store = MemoryBlobStore::new();
        let capture = AuditCapture::new(store.clone(), 1000);
        let launcher = MockLauncher::new().failing_on(ActionType::Screenshot);
        let engine = launcher.launch().await.unwrap();

        let evidence = capture
            .capture(engine.as_ref(), "t1", "s1", 0, ActionType::Navigate)
            .await;

        assert!(evidence.screenshot_ref.is_none());
        assert!(store.is_empty());
        assert!(evidence.dom_snapshot.is_some());
    }
}
