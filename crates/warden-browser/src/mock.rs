//! Scripted in-memory browser engine for tests
//!
//! Behaves like a page that always has the requested elements. Failures and
//! hangs are injected per action type; every call is appended to a shared
//! log so tests can assert on exactly what the executor drove.

use crate::engine::{BrowserEngine, EngineLauncher, PageInfo};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warden_core::{ActionType, ScrollDirection, WardenError};

/// Shared behavior script for mock engines
#[derive(Debug, Clone)]
struct MockScript {
    extract_text: String,
    dom_html: String,
    page_title: String,
    fail_on: Option<ActionType>,
    hang_on: Option<ActionType>,
    call_delay: Duration,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            extract_text: "mock page text".to_string(),
            dom_html: "<html><body><p>mock</p></body></html>".to_string(),
            page_title: "Mock Page".to_string(),
            fail_on: None,
            hang_on: None,
            call_delay: Duration::ZERO,
        }
    }
}

/// Scripted engine; construct through [`MockLauncher`]
pub struct MockEngine {
    script: MockScript,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockEngine {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    async fn gate(&self, action: ActionType) -> Result<()> {
        if !self.script.call_delay.is_zero() {
            tokio::time::sleep(self.script.call_delay).await;
        }
        if self.script.hang_on == Some(action) {
            // Long enough that only the session-level timeout can end it
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.script.fail_on == Some(action) {
            return Err(WardenError::Browser(format!(
                "injected {} failure",
                action
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserEngine for MockEngine {
    async fn navigate(&self, url: &str) -> Result<PageInfo> {
        self.record(format!("navigate:{}", url));
        self.gate(ActionType::Navigate).await?;
        Ok(PageInfo {
            title: self.script.page_title.clone(),
            final_url: url.to_string(),
        })
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.record(format!("click:{}", selector));
        self.gate(ActionType::Click).await
    }

    async fn type_text(&self, selector: &str, _value: &str) -> Result<()> {
        // Values never land in the call log; records must not echo them
        self.record(format!("type:{}", selector));
        self.gate(ActionType::Type).await
    }

    async fn submit(&self, selector: &str) -> Result<()> {
        self.record(format!("submit:{}", selector));
        self.gate(ActionType::Submit).await
    }

    async fn extract(&self, selector: Option<&str>) -> Result<String> {
        self.record(format!("extract:{}", selector.unwrap_or("body")));
        self.gate(ActionType::Extract).await?;
        Ok(self.script.extract_text.clone())
    }

    async fn scroll(&self, direction: ScrollDirection) -> Result<()> {
        self.record(format!("scroll:{:?}", direction));
        self.gate(ActionType::Scroll).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.record("screenshot");
        self.gate(ActionType::Screenshot).await?;
        Ok(b"\x89PNG mock".to_vec())
    }

    async fn dom_snapshot(&self) -> Result<String> {
        self.record("dom_snapshot");
        Ok(self.script.dom_html.clone())
    }

    async fn close(&self) -> Result<()> {
        self.record("close");
        Ok(())
    }
}

/// Launcher producing scripted engines; counts launches for capacity tests
pub struct MockLauncher {
    script: MockScript,
    launches: AtomicUsize,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Default for MockLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLauncher {
    pub fn new() -> Self {
        Self {
            script: MockScript::default(),
            launches: AtomicUsize::new(0),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_extract_text(mut self, text: impl Into<String>) -> Self {
        self.script.extract_text = text.into();
        self
    }

    pub fn with_dom_html(mut self, html: impl Into<String>) -> Self {
        self.script.dom_html = html.into();
        self
    }

    /// Inject a failure for every call of the given action type
    pub fn failing_on(mut self, action: ActionType) -> Self {
        self.script.fail_on = Some(action);
        self
    }

    /// Make calls of the given action type hang until cancelled
    pub fn hanging_on(mut self, action: ActionType) -> Self {
        self.script.hang_on = Some(action);
        self
    }

    /// Delay every engine call, for tests that race the session loop
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.script.call_delay = delay;
        self
    }

    /// Number of engines launched so far
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Every engine call across all launched engines, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EngineLauncher for MockLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserEngine>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockEngine {
            script: self.script.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_engine_happy_path() {
        let launcher = MockLauncher::new().with_extract_text("hello");
        let engine = launcher.launch().await.unwrap();

        let page = engine.navigate("https://example.com").await.unwrap();
        assert_eq!(page.final_url, "https://example.com");
        assert_eq!(engine.extract(None).await.unwrap(), "hello");

        assert_eq!(launcher.launches(), 1);
        assert_eq!(
            launcher.calls(),
            vec!["navigate:https://example.com", "extract:body"]
        );
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let launcher = MockLauncher::new().failing_on(ActionType::Click);
        let engine = launcher.launch().await.unwrap();

        assert!(engine.click("#go").await.is_err());
        // Other calls still work
        assert!(engine.scroll(ScrollDirection::Down).await.is_ok());
    }

    #[tokio::test]
    async fn test_type_value_never_logged() {
        let launcher = MockLauncher::new();
        let engine = launcher.launch().await.unwrap();
        engine.type_text("#q", "super-secret").await.unwrap();

        let calls = launcher.calls();
        assert_eq!(calls, vec!["type:#q"]);
        assert!(!calls.iter().any(|c| c.contains("super-secret")));
    }
}
