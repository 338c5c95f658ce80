//! Pre-start governance validation of session requests
//!
//! Validates the target URL (scheme, blocklist, internal networks) and the
//! full action plan (length ceiling, structural checks) before any browser
//! engine is launched. Returns human-readable errors; the session executor
//! refuses to start on any of them.

use std::net::IpAddr;
use tracing::debug;
use url::Url;
use warden_core::{ActionType, EngineConfig, Result, SessionConfig, WardenError};

/// Host suffixes that always resolve inside an operator network
const INTERNAL_SUFFIXES: &[&str] = &[".internal", ".local", ".localdomain", ".corp", ".lan"];

/// Extract the host portion of a URL string, lowercased
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Same-site heuristic: exact host match or a shared registrable domain
/// (last two labels). `shop.example.com` is the same site as `example.com`;
/// `example.org` is not.
pub fn same_site(host: &str, session_host: &str) -> bool {
    let host = host.to_lowercase();
    let session_host = session_host.to_lowercase();

    if host == session_host {
        return true;
    }

    let base = |h: &str| -> String {
        let labels: Vec<&str> = h.split('.').collect();
        if labels.len() >= 2 {
            labels[labels.len() - 2..].join(".")
        } else {
            h.to_string()
        }
    };

    // IP addresses never share a site with anything but themselves
    if host.parse::<IpAddr>().is_ok() || session_host.parse::<IpAddr>().is_ok() {
        return false;
    }

    base(&host) == base(&session_host)
}

fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // Unique-local fc00::/7
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                // Link-local fe80::/10
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Governance policy for session targets and plans
#[derive(Debug, Clone)]
pub struct GovernancePolicy {
    max_actions: usize,
    max_value_len: usize,
    blocked_domains: Vec<String>,
}

impl GovernancePolicy {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_actions: config.max_actions_per_session,
            max_value_len: config.max_value_len,
            blocked_domains: config
                .blocked_domains
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
        }
    }

    /// Validate a URL against the target policy.
    ///
    /// Used at session start and again by the navigate executor before
    /// every page load (defense in depth).
    pub fn validate_url(&self, url: &str) -> Result<Url> {
        let parsed = Url::parse(url)
            .map_err(|e| WardenError::Policy(format!("invalid URL '{}': {}", url, e)))?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(WardenError::Policy(format!(
                    "scheme '{}' is not allowed for '{}'",
                    other, url
                )));
            }
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| WardenError::Policy(format!("URL '{}' has no host", url)))?
            .to_lowercase();

        if host == "localhost" {
            return Err(WardenError::Policy(format!(
                "host '{}' resolves to an internal network",
                host
            )));
        }

        if let Ok(ip) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
            if is_internal_ip(ip) {
                return Err(WardenError::Policy(format!(
                    "IP target '{}' is inside a blocked range",
                    host
                )));
            }
        }

        if INTERNAL_SUFFIXES.iter().any(|s| host.ends_with(s)) {
            return Err(WardenError::Policy(format!(
                "host '{}' resolves to an internal network",
                host
            )));
        }

        for blocked in &self.blocked_domains {
            if host == *blocked || host.ends_with(&format!(".{}", blocked)) {
                return Err(WardenError::Policy(format!(
                    "domain '{}' is on the blocklist",
                    host
                )));
            }
        }

        Ok(parsed)
    }

    /// Validate a full session request. Returns a list of human-readable
    /// errors; an empty list means the request is valid.
    pub fn validate_session(&self, config: &SessionConfig) -> Vec<String> {
        let mut errors = Vec::new();

        if let Err(e) = self.validate_url(&config.target_url) {
            errors.push(e.to_string());
        }

        if config.tenant_id.trim().is_empty() {
            errors.push("tenant id must not be empty".to_string());
        }

        if config.actions.len() > self.max_actions {
            errors.push(format!(
                "action plan has {} actions, exceeding the ceiling of {}",
                config.actions.len(),
                self.max_actions
            ));
        }

        for (index, action) in config.actions.iter().enumerate() {
            let target_missing = action
                .target
                .as_deref()
                .map(|t| t.trim().is_empty())
                .unwrap_or(true);

            if action.action_type.requires_target() && target_missing {
                errors.push(format!(
                    "action {} ({}) requires a target",
                    index, action.action_type
                ));
            }

            if action.action_type == ActionType::Type && action.value.is_none() {
                errors.push(format!("action {} (type) requires a value", index));
            }

            if let Some(value) = &action.value {
                if value.len() > self.max_value_len {
                    errors.push(format!(
                        "action {} value exceeds {} characters",
                        index, self.max_value_len
                    ));
                }
            }
        }

        if !errors.is_empty() {
            debug!(error_count = errors.len(), "session request failed validation");
        }

        errors
    }
}
