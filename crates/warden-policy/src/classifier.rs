//! Risk classification of individual browser actions
//!
//! Pure function of the action description plus the session's declared
//! target domain. No state is consulted, so every rule is unit-testable
//! with literal inputs. Rules apply in priority order; first match wins:
//!
//! 1. credential/payment field heuristic -> blocked (non-overridable)
//! 2. submit, or click/type on a destructive target -> high
//! 3. navigate off the session's domain -> medium
//! 4. everything else -> low

use regex::Regex;
use std::sync::OnceLock;
use warden_core::{ActionRequest, ActionType, RiskLevel, BLOCKED_EXPLANATION};

use crate::policy::{host_of, same_site};

/// Result of classifying one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub level: RiskLevel,
    /// Human-readable reason an operator can act on
    pub reason: String,
}

impl Classification {
    fn new(level: RiskLevel, reason: impl Into<String>) -> Self {
        Self {
            level,
            reason: reason.into(),
        }
    }

    /// Blocked actions are never executable, regardless of later approvals
    pub fn is_blocked(&self) -> bool {
        self.level == RiskLevel::Blocked
    }

    /// High-risk actions pause the session for human approval
    pub fn requires_approval(&self) -> bool {
        self.level == RiskLevel::High
    }
}

/// Field name/selector/value fragments that suggest credential or payment
/// entry. Matching any of these blocks the action permanently.
fn credential_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(password|passwd|passphrase|\bpwd\b|\botp\b|one[-_ ]?time[-_ ]?code|\bcvc\b|\bcvv\b|card[-_ ]?number|cardnum|credit[-_ ]?card|\biban\b|\bssn\b|social[-_ ]?security|security[-_ ]?code|routing[-_ ]?number|account[-_ ]?number|\bpin[-_ ]?code\b|secret)",
        )
        .expect("credential pattern must compile")
    })
}

/// Target fragments that suggest a destructive or irreversible operation
fn destructive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(delete|remove|destroy|\bdrop\b|purchase|buy[-_ ]?now|checkout|\bpay\b|payment|place[-_ ]?order|confirm[-_ ]?(payment|purchase|order)|publish|transfer|wire)",
        )
        .expect("destructive pattern must compile")
    })
}

/// Classify a single action against the session's declared target host.
///
/// `session_host` is the host of the URL the session was opened against;
/// it anchors the same-domain check for navigations.
pub fn classify(request: &ActionRequest, session_host: &str) -> Classification {
    let target = request.target.as_deref().unwrap_or("");
    let value = request.value.as_deref().unwrap_or("");

    // Rule 1: credential/payment fields are blocked for every action type.
    if credential_pattern().is_match(target) || credential_pattern().is_match(value) {
        return Classification::new(RiskLevel::Blocked, BLOCKED_EXPLANATION);
    }

    // Rule 2: submit always needs approval; click/type do when the target
    // looks destructive.
    match request.action_type {
        ActionType::Submit => {
            return Classification::new(
                RiskLevel::High,
                "form submission requires approval",
            );
        }
        ActionType::Click | ActionType::Type => {
            if destructive_pattern().is_match(target) {
                return Classification::new(
                    RiskLevel::High,
                    format!("destructive target '{}' requires approval", target),
                );
            }
        }
        _ => {}
    }

    // Rule 3: navigation off the declared domain is medium risk. An
    // unparseable navigation target is treated as off-domain.
    if request.action_type == ActionType::Navigate {
        let off_domain = match host_of(target) {
            Some(host) => !same_site(&host, session_host),
            None => true,
        };
        if off_domain {
            return Classification::new(
                RiskLevel::Medium,
                format!("navigation away from {}", session_host),
            );
        }
    }

    Classification::new(RiskLevel::Low, "routine action")
}

/// Worst-of classification across a whole plan; drives the session's
/// persisted risk tier.
pub fn plan_risk_tier(plan: &[ActionRequest], session_host: &str) -> RiskLevel {
    plan.iter()
        .map(|action| classify(action, session_host).level)
        .max()
        .unwrap_or(RiskLevel::Low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::ScrollDirection;

    const HOST: &str = "example.com";

    #[test]
    fn test_password_field_blocked_for_type() {
        let c = classify(&ActionRequest::type_text("#password-field", "x"), HOST);
        assert_eq!(c.level, RiskLevel::Blocked);
        assert!(c.is_blocked());
        assert_eq!(c.reason, BLOCKED_EXPLANATION);
    }

    #[test]
    fn test_credential_blocked_regardless_of_action_type() {
        // Same heuristic hit across every declared type, including ones
        // that would otherwise be low risk.
        let requests = [
            ActionRequest::click("input[name=card_number]"),
            ActionRequest::extract(Some("#cvv".to_string())),
            ActionRequest::navigate("https://example.com/reset-password"),
            ActionRequest::submit("#otp"),
            ActionRequest::new(warden_core::ActionType::Screenshot).with_target("#ssn"),
        ];
        for request in &requests {
            let c = classify(request, HOST);
            assert_eq!(c.level, RiskLevel::Blocked, "request: {:?}", request);
        }
    }

    #[test]
    fn test_credential_value_blocks_even_with_benign_target() {
        let c = classify(&ActionRequest::type_text("#comment", "my password is"), HOST);
        assert_eq!(c.level, RiskLevel::Blocked);
    }

    #[test]
    fn test_submit_is_high() {
        let c = classify(&ActionRequest::submit("#form"), HOST);
        assert_eq!(c.level, RiskLevel::High);
        assert!(c.requires_approval());
    }

    #[test]
    fn test_destructive_click_is_high() {
        let c = classify(&ActionRequest::click("#submit-payment"), HOST);
        assert_eq!(c.level, RiskLevel::High);

        let c = classify(&ActionRequest::click("button.delete-account"), HOST);
        assert_eq!(c.level, RiskLevel::High);

        let c = classify(&ActionRequest::click("#confirm-order"), HOST);
        assert_eq!(c.level, RiskLevel::High);
    }

    #[test]
    fn test_destructive_extract_stays_low() {
        // Rule 2 only covers interaction types; reading a delete button's
        // label is harmless.
        let c = classify(&ActionRequest::extract(Some(".delete-banner".to_string())), HOST);
        assert_eq!(c.level, RiskLevel::Low);
    }

    #[test]
    fn test_cross_domain_navigate_is_medium() {
        let c = classify(&ActionRequest::navigate("https://other.org/page"), HOST);
        assert_eq!(c.level, RiskLevel::Medium);
    }

    #[test]
    fn test_same_domain_navigate_is_low() {
        let c = classify(&ActionRequest::navigate("https://example.com/about"), HOST);
        assert_eq!(c.level, RiskLevel::Low);

        let c = classify(&ActionRequest::navigate("https://shop.example.com/"), HOST);
        assert_eq!(c.level, RiskLevel::Low);
    }

    #[test]
    fn test_unparseable_navigate_is_medium() {
        let c = classify(&ActionRequest::navigate("not a url"), HOST);
        assert_eq!(c.level, RiskLevel::Medium);
    }

    #[test]
    fn test_routine_actions_are_low() {
        assert_eq!(
            classify(&ActionRequest::extract(None), HOST).level,
            RiskLevel::Low
        );
        assert_eq!(
            classify(&ActionRequest::scroll(ScrollDirection::Down), HOST).level,
            RiskLevel::Low
        );
        assert_eq!(
            classify(&ActionRequest::screenshot(), HOST).level,
            RiskLevel::Low
        );
        assert_eq!(
            classify(&ActionRequest::click("#next-page"), HOST).level,
            RiskLevel::Low
        );
    }

    #[test]
    fn test_plan_tier_is_worst_of() {
        let plan = vec![
            ActionRequest::extract(None),
            ActionRequest::click("#submit-payment"),
            ActionRequest::scroll(ScrollDirection::Down),
        ];
        assert_eq!(plan_risk_tier(&plan, HOST), RiskLevel::High);

        let plan = vec![ActionRequest::type_text("#password", "x")];
        assert_eq!(plan_risk_tier(&plan, HOST), RiskLevel::Blocked);

        assert_eq!(plan_risk_tier(&[], HOST), RiskLevel::Low);
    }
}
