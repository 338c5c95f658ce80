//! Browser engine capability and the Chrome DevTools Protocol adapter
//!
//! The session executor only ever talks to [`BrowserEngine`]; the CDP
//! adapter here is one implementation, the scripted mock in [`crate::mock`]
//! is another. Engines are launched per session through [`EngineLauncher`]
//! so capacity tests can count launches without touching Chrome.

use crate::error::Result;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};
use warden_core::{ScrollDirection, WardenError};

/// Title + final URL observed after a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub title: String,
    pub final_url: String,
}

/// The browser capability consumed by action executors.
///
/// One instance drives one page for the lifetime of one session. Every
/// method is a suspension point subject to the per-action timeout applied
/// by the executor layer.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<PageInfo>;
    async fn click(&self, selector: &str) -> Result<()>;
    async fn type_text(&self, selector: &str, value: &str) -> Result<()>;
    /// Click and wait for the page to settle afterwards
    async fn submit(&self, selector: &str) -> Result<()>;
    /// Visible text of the selected element, or the full page body
    async fn extract(&self, selector: Option<&str>) -> Result<String>;
    async fn scroll(&self, direction: ScrollDirection) -> Result<()>;
    /// PNG screenshot of the current viewport
    async fn screenshot(&self) -> Result<Vec<u8>>;
    /// Raw outer HTML of the current document
    async fn dom_snapshot(&self) -> Result<String>;
    /// Force-close the engine. Idempotent; in-flight calls fail afterwards.
    async fn close(&self) -> Result<()>;
}

/// Factory that launches a fresh engine for each session run
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn BrowserEngine>>;
}

/// Configuration for the CDP adapter
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// User agent string
    pub user_agent: Option<String>,
    /// Element-wait timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 900,
            user_agent: None,
            timeout_seconds: 10,
        }
    }
}

/// Browser engine over the Chrome DevTools Protocol
pub struct CdpEngine {
    /// Underlying browser instance; taken out on close so the child
    /// process is killed even while other handles are still held
    browser: Mutex<Option<Browser>>,
    tab: Arc<Tab>,
    config: BrowserConfig,
}

impl CdpEngine {
    /// Launch a new browser instance
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            config.headless, config.window_width, config.window_height
        );

        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .build()
            .map_err(|e| WardenError::Browser(format!("Failed to launch browser: {}", e)))?;

        let user_agent_arg: Option<String> = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));
        if let Some(ref ua_arg) = user_agent_arg {
            launch_options.args.push(OsStr::new(ua_arg));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| WardenError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| WardenError::Browser(format!("Failed to create tab: {}", e)))?;

        info!("Browser launched successfully");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            tab,
            config,
        })
    }

    fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    fn ensure_open(&self) -> Result<()> {
        let open = self
            .browser
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false);
        if open {
            Ok(())
        } else {
            Err(WardenError::Browser("browser engine is closed".to_string()))
        }
    }

    /// Execute JavaScript in the page context
    fn evaluate_script(&self, script: &str) -> Result<serde_json::Value> {
        debug!("Evaluating JavaScript: {}", script);

        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| WardenError::Browser(format!("JavaScript evaluation failed: {}", e)))?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl BrowserEngine for CdpEngine {
    async fn navigate(&self, url: &str) -> Result<PageInfo> {
        self.ensure_open()?;
        debug!("Navigating to {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| WardenError::Browser(format!("Failed to navigate to {}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| WardenError::Browser(format!("Navigation timeout for {}: {}", url, e)))?;

        let title = self
            .evaluate_script("document.title")?
            .as_str()
            .unwrap_or("")
            .to_string();
        let final_url = self
            .evaluate_script("window.location.href")?
            .as_str()
            .unwrap_or(url)
            .to_string();

        info!("Successfully navigated to {}", final_url);
        Ok(PageInfo { title, final_url })
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.ensure_open()?;
        debug!("Clicking {}", selector);

        let element = self
            .tab
            .wait_for_element_with_custom_timeout(selector, self.element_timeout())
            .map_err(|_e| WardenError::Browser(format!("Element not found: {}", selector)))?;

        element
            .click()
            .map_err(|e| WardenError::Browser(format!("Failed to click {}: {}", selector, e)))?;

        Ok(())
    }

    async fn type_text(&self, selector: &str, value: &str) -> Result<()> {
        self.ensure_open()?;
        debug!("Typing into {}", selector);

        let element = self
            .tab
            .wait_for_element_with_custom_timeout(selector, self.element_timeout())
            .map_err(|_e| WardenError::Browser(format!("Element not found: {}", selector)))?;

        element
            .click()
            .map_err(|e| WardenError::Browser(format!("Failed to focus {}: {}", selector, e)))?;

        self.tab
            .type_str(value)
            .map_err(|e| WardenError::Browser(format!("Failed to type into {}: {}", selector, e)))?;

        Ok(())
    }

    async fn submit(&self, selector: &str) -> Result<()> {
        self.ensure_open()?;
        debug!("Submitting via {}", selector);

        let element = self
            .tab
            .wait_for_element_with_custom_timeout(selector, self.element_timeout())
            .map_err(|_e| WardenError::Browser(format!("Element not found: {}", selector)))?;

        element
            .click()
            .map_err(|e| WardenError::Browser(format!("Failed to click {}: {}", selector, e)))?;

        // Submits usually trigger a navigation; settle before returning so
        // the post-action snapshot sees the resulting page.
        if let Err(e) = self.tab.wait_until_navigated() {
            debug!("No navigation after submit on {}: {}", selector, e);
        }

        Ok(())
    }

    async fn extract(&self, selector: Option<&str>) -> Result<String> {
        self.ensure_open()?;

        let script = match selector {
            Some(sel) => format!(
                "document.querySelector('{}')?.innerText ?? ''",
                sel.replace('\'', "\\'")
            ),
            None => "document.body?.innerText ?? ''".to_string(),
        };

        let result = self.evaluate_script(&script)?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    async fn scroll(&self, direction: ScrollDirection) -> Result<()> {
        self.ensure_open()?;

        let offset = match direction {
            ScrollDirection::Down => 600,
            ScrollDirection::Up => -600,
        };
        self.evaluate_script(&format!("window.scrollBy(0, {})", offset))?;

        // Short settle delay so lazy-loaded content appears in the capture
        tokio::time::sleep(Duration::from_millis(250)).await;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.ensure_open()?;

        self.tab
            .capture_screenshot(
                headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption::Png,
                None,
                None,
                true,
            )
            .map_err(|e| WardenError::Browser(format!("Screenshot capture failed: {}", e)))
    }

    async fn dom_snapshot(&self) -> Result<String> {
        self.ensure_open()?;

        let result = self.evaluate_script("document.documentElement.outerHTML")?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    async fn close(&self) -> Result<()> {
        info!("Closing browser engine");

        let taken = self
            .browser
            .lock()
            .map_err(|_| WardenError::Browser("browser handle poisoned".to_string()))?
            .take();

        // Dropping the Browser kills the Chrome child process; in-flight
        // CDP calls fail once the transport is gone.
        drop(taken);
        Ok(())
    }
}

/// Launches a fresh CDP engine per session
pub struct CdpLauncher {
    config: BrowserConfig,
}

impl CdpLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineLauncher for CdpLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserEngine>> {
        let engine = CdpEngine::launch(self.config.clone()).await?;
        Ok(Arc::new(engine))
    }
}
