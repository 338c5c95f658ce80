//! Core type definitions for Warden browser-automation sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed explanation attached to every blocked action record.
///
/// Blocked actions are a static, non-overridable rule; operators must be
/// able to distinguish policy-blocked from failed.
pub const BLOCKED_EXPLANATION: &str =
    "password/payment field interaction is permanently blocked";

/// Risk tier of a single action (and, worst-of, of a session)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
    Blocked = 3,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "blocked" => Ok(Self::Blocked),
            _ => Err(format!("Invalid risk level: {}", s)),
        }
    }
}

/// Session lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Transient: exists only while the request is being validated
    #[default]
    Pending,
    Running,
    /// Suspended waiting on a human decision for one high-risk action
    PausedApproval,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Terminal states are immutable once persisted
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::PausedApproval => write!(f, "paused_approval"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "paused_approval" | "paused" => Ok(Self::PausedApproval),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid session status: {}", s)),
        }
    }
}

/// Closed set of browser actions Warden can drive.
///
/// Executor dispatch matches exhaustively on this enum; adding a kind is a
/// compile-time requirement on every executor site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Navigate,
    Click,
    Type,
    Extract,
    Scroll,
    Submit,
    Screenshot,
}

impl ActionType {
    /// Whether this action type requires a non-empty target
    pub fn requires_target(&self) -> bool {
        matches!(
            self,
            Self::Navigate | Self::Click | Self::Type | Self::Submit
        )
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Navigate => write!(f, "navigate"),
            Self::Click => write!(f, "click"),
            Self::Type => write!(f, "type"),
            Self::Extract => write!(f, "extract"),
            Self::Scroll => write!(f, "scroll"),
            Self::Submit => write!(f, "submit"),
            Self::Screenshot => write!(f, "screenshot"),
        }
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "navigate" => Ok(Self::Navigate),
            "click" => Ok(Self::Click),
            "type" => Ok(Self::Type),
            "extract" => Ok(Self::Extract),
            "scroll" => Ok(Self::Scroll),
            "submit" => Ok(Self::Submit),
            "screenshot" => Ok(Self::Screenshot),
            _ => Err(format!("Invalid action type: {}", s)),
        }
    }
}

/// Scroll direction for `ActionType::Scroll`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    #[default]
    Down,
    Up,
}

/// One requested browser interaction within a session plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// What to do
    pub action_type: ActionType,
    /// CSS selector, URL (navigate) or direction (scroll), per action type
    #[serde(default)]
    pub target: Option<String>,
    /// Text to type; never persisted for blocked actions
    #[serde(default)]
    pub value: Option<String>,
}

impl ActionRequest {
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            target: None,
            value: None,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(ActionType::Navigate).with_target(url)
    }

    pub fn click(selector: impl Into<String>) -> Self {
        Self::new(ActionType::Click).with_target(selector)
    }

    pub fn type_text(selector: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ActionType::Type)
            .with_target(selector)
            .with_value(value)
    }

    pub fn extract(selector: Option<String>) -> Self {
        Self {
            action_type: ActionType::Extract,
            target: selector,
            value: None,
        }
    }

    pub fn scroll(direction: ScrollDirection) -> Self {
        Self::new(ActionType::Scroll).with_target(match direction {
            ScrollDirection::Down => "down",
            ScrollDirection::Up => "up",
        })
    }

    pub fn submit(selector: impl Into<String>) -> Self {
        Self::new(ActionType::Submit).with_target(selector)
    }

    pub fn screenshot() -> Self {
        Self::new(ActionType::Screenshot)
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Scroll direction, defaulting to down when unspecified or unknown
    pub fn scroll_direction(&self) -> ScrollDirection {
        match self.target.as_deref() {
            Some("up") => ScrollDirection::Up,
            _ => ScrollDirection::Down,
        }
    }

    /// Copy of this request with the value elided (blocked credential fields)
    pub fn redacted(&self) -> Self {
        Self {
            action_type: self.action_type,
            target: self.target.clone(),
            value: None,
        }
    }
}

/// Uniform result shape returned by every action executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub ok: bool,
    /// Structured payload (page title, extracted text, ...)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Rejection marker recorded for blocked actions (the only executor
    /// result a blocked action may carry)
    pub fn rejected() -> Self {
        Self::failure(BLOCKED_EXPLANATION)
    }
}

/// Bookmark carried by a session in `paused_approval`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseBookmark {
    /// Plan index of the action awaiting approval
    pub action_index: usize,
    /// Approval request this pause is waiting on
    pub approval_id: String,
}

/// Serializable resume token: everything needed to re-enter a paused
/// session from a different process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeToken {
    pub session_id: String,
    pub next_index: usize,
}

/// Caller-supplied request to run one governed browser session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub tenant_id: String,
    pub agent_id: String,
    /// Originating intent, when the caller tracks one
    #[serde(default)]
    pub intent_id: Option<String>,
    pub target_url: String,
    pub purpose: String,
    pub actions: Vec<ActionRequest>,
}

/// Persisted record of one automation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub tenant_id: String,
    pub agent_id: String,
    #[serde(default)]
    pub intent_id: Option<String>,
    pub target_url: String,
    pub purpose: String,
    /// Immutable once the session starts
    pub plan: Vec<ActionRequest>,
    pub status: SessionStatus,
    /// Worst action tier in the plan, derived at creation
    pub risk_tier: RiskLevel,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// Actions that actually executed (blocked/paused excluded)
    pub executed_count: usize,
    /// Text gathered by successful extract actions, in plan order
    pub extracted_data: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub pause: Option<PauseBookmark>,
}

impl SessionRecord {
    pub fn new(config: &SessionConfig, risk_tier: RiskLevel) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: config.tenant_id.clone(),
            agent_id: config.agent_id.clone(),
            intent_id: config.intent_id.clone(),
            target_url: config.target_url.clone(),
            purpose: config.purpose.clone(),
            plan: config.actions.clone(),
            status: SessionStatus::Pending,
            risk_tier,
            started_at: Utc::now(),
            finished_at: None,
            executed_count: 0,
            extracted_data: Vec::new(),
            error: None,
            pause: None,
        }
    }

    /// Resume token for the paused action, if this session is paused
    pub fn resume_token(&self) -> Option<ResumeToken> {
        self.pause.as_ref().map(|p| ResumeToken {
            session_id: self.id.clone(),
            next_index: p.action_index,
        })
    }
}

/// Persisted record of one step within a session, append-only and strictly
/// ordered by sequence index. The initial navigation occupies index 0; plan
/// action `i` lands at index `i + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub session_id: String,
    pub index: usize,
    /// Value elided when the action was blocked
    pub request: ActionRequest,
    pub risk: RiskLevel,
    pub approved: bool,
    /// Object-store path of the post-action screenshot; None when capture
    /// failed or the action never executed
    #[serde(default)]
    pub screenshot_ref: Option<String>,
    /// Sanitized, size-capped DOM snapshot
    #[serde(default)]
    pub dom_snapshot: Option<String>,
    #[serde(default)]
    pub outcome: Option<ActionOutcome>,
    pub recorded_at: DateTime<Utc>,
}

/// Decision state of an approval request (owned by the external approval
/// subsystem; Warden only creates and consumes these)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    #[default]
    Pending,
    Approved,
    Denied,
}

impl std::fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// Approval request created when a session pauses on a high-risk action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequestRecord {
    pub id: String,
    pub tenant_id: String,
    pub session_id: String,
    /// Plan index of the paused action
    pub action_index: usize,
    /// Pre-action screenshot shown to the approver
    #[serde(default)]
    pub evidence_ref: Option<String>,
    pub decision: ApprovalDecision,
    /// Set once a resume has acted on the decision
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}

impl ApprovalRequestRecord {
    pub fn new(
        tenant_id: impl Into<String>,
        session_id: impl Into<String>,
        action_index: usize,
        evidence_ref: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            session_id: session_id.into(),
            action_index,
            evidence_ref,
            decision: ApprovalDecision::Pending,
            consumed: false,
            created_at: Utc::now(),
        }
    }
}

/// Result returned to the caller by both entrypoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_id: String,
    pub status: SessionStatus,
    pub actions: Vec<ActionRecord>,
    pub extracted_data: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}
