//! Configuration management for Warden
//!
//! Engine-level governance limits (concurrency ceiling, hard timeouts,
//! plan caps, audit size caps) loaded from `warden.toml` with compiled
//! defaults for every field.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::Result;

/// Engine-level configuration
///
/// Loaded from `warden.toml` in the working directory, or defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Concurrent sessions allowed per tenant (hard cap, no queueing)
    #[serde(default = "default_max_sessions_per_tenant")]
    pub max_sessions_per_tenant: usize,

    /// Hard wall-clock limit for one session; on expiry the browser
    /// engine is force-closed
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Bounded wait for a single browser interaction
    #[serde(default = "default_action_timeout_secs")]
    pub action_timeout_secs: u64,

    /// Maximum actions accepted in one session plan
    #[serde(default = "default_max_actions_per_session")]
    pub max_actions_per_session: usize,

    /// Maximum length accepted for a typed value
    #[serde(default = "default_max_value_len")]
    pub max_value_len: usize,

    /// Extracted text is truncated to this many characters
    #[serde(default = "default_extract_char_cap")]
    pub extract_char_cap: usize,

    /// Sanitized DOM snapshots are truncated to this many characters
    #[serde(default = "default_dom_snapshot_char_cap")]
    pub dom_snapshot_char_cap: usize,

    /// Domains denied in addition to the built-in internal-network list
    #[serde(default)]
    pub blocked_domains: Vec<String>,
}

// Default value providers
fn default_max_sessions_per_tenant() -> usize {
    2
}

fn default_session_timeout_secs() -> u64 {
    300
}

fn default_action_timeout_secs() -> u64 {
    10
}

fn default_max_actions_per_session() -> usize {
    50
}

fn default_max_value_len() -> usize {
    4096
}

fn default_extract_char_cap() -> usize {
    20_000
}

fn default_dom_snapshot_char_cap() -> usize {
    50_000
}

impl EngineConfig {
    /// Load configuration from `warden.toml` or use defaults
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join("warden.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content).map_err(|e| {
                crate::WardenError::Other(format!("Failed to parse config file: {}", e))
            })?)
        } else {
            Ok(Self::default())
        }
    }

    /// Write default configuration to `warden.toml`
    pub fn write_default(dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        let config_path = dir.join("warden.toml");
        let config = Self::default();
        let content = toml::to_string_pretty(&config).map_err(|e| {
            crate::WardenError::Other(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_tenant: default_max_sessions_per_tenant(),
            session_timeout_secs: default_session_timeout_secs(),
            action_timeout_secs: default_action_timeout_secs(),
            max_actions_per_session: default_max_actions_per_session(),
            max_value_len: default_max_value_len(),
            extract_char_cap: default_extract_char_cap(),
            dom_snapshot_char_cap: default_dom_snapshot_char_cap(),
            blocked_domains: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_sessions_per_tenant, 2);
        assert_eq!(config.session_timeout_secs, 300);
        assert_eq!(config.action_timeout_secs, 10);
        assert_eq!(config.extract_char_cap, 20_000);
        assert_eq!(config.dom_snapshot_char_cap, 50_000);
        assert!(config.blocked_domains.is_empty());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = EngineConfig::load_or_default(temp_dir.path()).unwrap();
        assert_eq!(config.max_sessions_per_tenant, 2);
    }

    #[test]
    fn test_write_then_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        EngineConfig::write_default(temp_dir.path()).unwrap();

        let config = EngineConfig::load_or_default(temp_dir.path()).unwrap();
        assert_eq!(config.max_actions_per_session, 50);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("warden.toml"),
            "max_sessions_per_tenant = 5\nblocked_domains = [\"evil.example\"]\n",
        )
        .unwrap();

        let config = EngineConfig::load_or_default(temp_dir.path()).unwrap();
        assert_eq!(config.max_sessions_per_tenant, 5);
        assert_eq!(config.blocked_domains, vec!["evil.example".to_string()]);
        // Unspecified fields keep compiled defaults
        assert_eq!(config.session_timeout_secs, 300);
    }
}
