//! # warden-audit
//!
//! Audit evidence pipeline for Warden sessions: a screenshot and a
//! sanitized DOM snapshot for every executed action, uploaded to an
//! object store at deterministic per-action paths.
//!
//! Audit completeness is best-effort; correctness of the action sequence
//! is not. Failures in this crate downgrade evidence to `None` and warn,
//! they never fail a session.

pub mod capture;
pub mod snapshot;
pub mod store;

pub use capture::{AuditCapture, AuditEvidence};
pub use snapshot::sanitize_dom;
pub use store::{BlobStore, FsBlobStore, MemoryBlobStore};
