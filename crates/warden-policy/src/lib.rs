//! # warden-policy
//!
//! The policy envelope for Warden sessions: per-action risk classification
//! and pre-start governance validation.
//!
//! Both halves are IO-free. The [`classifier`] is a pure function over one
//! action description; the [`policy`] validates a session request (target
//! URL, plan shape) against static rules plus configured extensions, before
//! any browser engine is launched.

pub mod classifier;
pub mod policy;

pub use classifier::{classify, plan_risk_tier, Classification};
pub use policy::{host_of, same_site, GovernancePolicy};
