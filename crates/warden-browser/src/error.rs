//! Browser errors - re-exports the unified WardenError from warden-core
//!
//! All browser errors use the unified WardenError type with the Browser
//! variant for engine-level failures (launch, navigation, CDP, screenshots)
//! and the Executor variant for bounded-wait expiries.

pub use warden_core::{Result, WardenError};
