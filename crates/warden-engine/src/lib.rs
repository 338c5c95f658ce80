//! # warden-engine
//!
//! The session engine: a governed state machine that drives browser
//! automation plans under Warden's policy envelope.
//!
//! - [`SessionEngine::execute_session`] runs a plan to completion, failure
//!   or its first suspension point (a high-risk action awaiting approval)
//! - [`SessionEngine::resume_session`] re-enters a paused session after
//!   the external approval decision, from any process
//! - [`SessionEngine::recover_orphaned`] reconciles persisted state on
//!   startup
//!
//! Persistence ([`SessionStore`]) and approvals ([`ApprovalGateway`]) are
//! boundary traits with in-memory and JSON-file implementations; the
//! browser and blob store come from `warden-browser` and `warden-audit`.

pub mod approval;
pub mod executor;
pub mod governor;
pub mod recovery;
pub mod resume;
pub mod store;

pub use approval::{ApprovalGateway, InMemoryApprovalGateway};
pub use executor::SessionEngine;
pub use governor::{ConcurrencyGovernor, SessionSlot};
pub use store::{InMemorySessionStore, JsonFileStateStore, SessionStore};
