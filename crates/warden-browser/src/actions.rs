//! Per-action executors over the browser engine capability
//!
//! One arm per [`ActionType`], each a thin adapter producing the uniform
//! [`ActionOutcome`] shape. Failures never propagate past the per-action
//! boundary: every error ends up captured in the outcome of the action
//! that caused it. The match is exhaustive, so adding an action type is a
//! compile-time requirement here.

use crate::engine::BrowserEngine;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use warden_core::{
    ActionOutcome, ActionRequest, ActionType, EngineConfig, Result, WardenError,
};
use warden_policy::GovernancePolicy;

/// Await an engine call with the configured per-action bound
async fn bounded<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(WardenError::Executor(format!(
            "{} timed out after {}s",
            what,
            limit.as_secs()
        ))),
    }
}

/// Truncate extracted text to the audit/storage cap, on a char boundary
fn truncate_chars(text: &str, cap: usize) -> (String, bool) {
    if text.chars().count() <= cap {
        (text.to_string(), false)
    } else {
        (text.chars().take(cap).collect(), true)
    }
}

/// Execute one action through the engine, returning the uniform outcome.
///
/// The caller is responsible for the risk gate; by the time a request
/// reaches here it is cleared to run. Navigation targets are still
/// re-validated against the governance policy before loading.
pub async fn execute_action(
    engine: &dyn BrowserEngine,
    policy: &GovernancePolicy,
    config: &EngineConfig,
    request: &ActionRequest,
) -> ActionOutcome {
    let limit = config.action_timeout();
    debug!(action = %request.action_type, target = ?request.target, "executing action");

    let result: Result<serde_json::Value> = match request.action_type {
        ActionType::Navigate => {
            let url = match request.target.as_deref() {
                Some(url) => url,
                None => return ActionOutcome::failure("navigate requires a URL"),
            };
            // Defense in depth: the plan was validated at session start,
            // but never load a URL the policy would reject now.
            match policy.validate_url(url) {
                Ok(_) => bounded(limit, "navigate", engine.navigate(url))
                    .await
                    .map(|page| json!({ "title": page.title, "url": page.final_url })),
                Err(e) => Err(e),
            }
        }

        ActionType::Click => {
            let selector = request.target.as_deref().unwrap_or_default();
            bounded(limit, "click", engine.click(selector))
                .await
                .map(|_| json!({ "clicked": selector }))
        }

        ActionType::Type => {
            let selector = request.target.as_deref().unwrap_or_default();
            let value = request.value.as_deref().unwrap_or_default();
            // The typed value is deliberately absent from the outcome
            bounded(limit, "type", engine.type_text(selector, value))
                .await
                .map(|_| json!({ "typed_into": selector }))
        }

        ActionType::Submit => {
            let selector = request.target.as_deref().unwrap_or_default();
            bounded(limit, "submit", engine.submit(selector))
                .await
                .map(|_| json!({ "submitted": selector }))
        }

        ActionType::Extract => {
            bounded(limit, "extract", engine.extract(request.target.as_deref()))
                .await
                .map(|text| {
                    let (text, truncated) = truncate_chars(&text, config.extract_char_cap);
                    json!({ "text": text, "truncated": truncated })
                })
        }

        ActionType::Scroll => {
            let direction = request.scroll_direction();
            bounded(limit, "scroll", engine.scroll(direction))
                .await
                .map(|_| json!({ "scrolled": format!("{:?}", direction).to_lowercase() }))
        }

        // No page interaction; the audit pipeline takes the actual shot
        ActionType::Screenshot => Ok(json!({ "screenshot": true })),
    };

    match result {
        Ok(data) => ActionOutcome::success(data),
        Err(e) => ActionOutcome::failure(e.to_string()),
    }
}

/// Extracted text from a successful extract outcome, if any
pub fn extracted_text(outcome: &ActionOutcome) -> Option<String> {
    outcome
        .data
        .as_ref()
        .and_then(|d| d.get("text"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineLauncher;
    use crate::mock::MockLauncher;

    fn policy() -> GovernancePolicy {
        GovernancePolicy::new(&EngineConfig::default())
    }

    #[tokio::test]
    async fn test_navigate_returns_page_info() {
        let launcher = MockLauncher::new();
        let engine = launcher.launch().await.unwrap();
        let config = EngineConfig::default();

        let outcome = execute_action(
            engine.as_ref(),
            &policy(),
            &config,
            &ActionRequest::navigate("https://example.com"),
        )
        .await;

        assert!(outcome.ok);
        let data = outcome.data.unwrap();
        assert_eq!(data["url"], "https://example.com");
        assert_eq!(data["title"], "Mock Page");
    }

    #[tokio::test]
    async fn test_navigate_rechecks_policy_before_loading() {
        let launcher = MockLauncher::new();
        let engine = launcher.launch().await.unwrap();
        let config = EngineConfig::default();

        let outcome = execute_action(
            engine.as_ref(),
            &policy(),
            &config,
            &ActionRequest::navigate("http://169.254.169.254/latest/meta-data"),
        )
        .await;

        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().contains("blocked range"));
        // The engine was never asked to load the page
        assert!(launcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_extract_truncates_to_cap() {
        let launcher = MockLauncher::new().with_extract_text("a".repeat(100));
        let engine = launcher.launch().await.unwrap();
        let mut config = EngineConfig::default();
        config.extract_char_cap = 10;

        let outcome = execute_action(
            engine.as_ref(),
            &policy(),
            &config,
            &ActionRequest::extract(None),
        )
        .await;

        assert!(outcome.ok);
        let data = outcome.data.as_ref().unwrap();
        assert_eq!(data["text"].as_str().unwrap().len(), 10);
        assert_eq!(data["truncated"], true);
        assert_eq!(extracted_text(&outcome).unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_failure_is_captured_not_thrown() {
        let launcher = MockLauncher::new().failing_on(ActionType::Click);
        let engine = launcher.launch().await.unwrap();
        let config = EngineConfig::default();

        let outcome = execute_action(
            engine.as_ref(),
            &policy(),
            &config,
            &ActionRequest::click("#go"),
        )
        .await;

        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().contains("injected click failure"));
    }

    #[tokio::test]
    async fn test_type_outcome_never_echoes_value() {
        let launcher = MockLauncher::new();
        let engine = launcher.launch().await.unwrap();
        let config = EngineConfig::default();

        let outcome = execute_action(
            engine.as_ref(),
            &policy(),
            &config,
            &ActionRequest::type_text("#q", "do-not-echo"),
        )
        .await;

        assert!(outcome.ok);
        assert!(!serde_json::to_string(&outcome).unwrap().contains("do-not-echo"));
    }

    #[tokio::test]
    async fn test_per_action_timeout_bounds_hanging_call() {
        let launcher = MockLauncher::new().hanging_on(ActionType::Click);
        let engine = launcher.launch().await.unwrap();
        let mut config = EngineConfig::default();
        config.action_timeout_secs = 1;

        let outcome = execute_action(
            engine.as_ref(),
            &policy(),
            &config,
            &ActionRequest::click("#slow"),
        )
        .await;

        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_screenshot_action_needs_no_engine_call() {
        let launcher = MockLauncher::new();
        let engine = launcher.launch().await.unwrap();
        let config = EngineConfig::default();

        let outcome = execute_action(
            engine.as_ref(),
            &policy(),
            &config,
            &ActionRequest::screenshot(),
        )
        .await;

        assert!(outcome.ok);
        assert!(launcher.calls().is_empty());
    }
}
