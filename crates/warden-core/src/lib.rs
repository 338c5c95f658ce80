//! # warden-core
//!
//! Core types for Warden, a governed browser-automation session engine.
//!
//! Warden drives a headless browser through a fixed, caller-supplied action
//! plan under a hard policy envelope:
//!
//! - every action is risk-classified before it runs
//! - high-risk actions suspend the session until a human approves them
//! - credential/payment interaction is blocked unconditionally
//! - every executed step leaves a screenshot + sanitized DOM snapshot
//!
//! This crate holds the shared vocabulary: session and action records, risk
//! tiers, the unified error type, and the engine configuration.

mod config;
mod error;
mod types;

pub use config::EngineConfig;
pub use error::{Result, WardenError};
pub use types::*;
