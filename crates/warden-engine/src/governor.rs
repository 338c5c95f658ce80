//! Per-tenant concurrency governor
//!
//! Tracks in-flight sessions per tenant and enforces a hard ceiling: at
//! capacity, `acquire` fails immediately with a capacity error rather than
//! queueing. Acquisition is scoped - the returned slot releases itself on
//! drop, so every exit path (success, failure, panic unwind, timeout
//! teardown) gives the slot back.
//!
//! The live counters are a cache of ground truth; `reconcile` rebuilds
//! them from persisted state after a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use warden_core::{Result, WardenError};

type TenantCounts = Arc<Mutex<HashMap<String, usize>>>;

/// Per-tenant in-flight session limiter
pub struct ConcurrencyGovernor {
    ceiling: usize,
    counts: TenantCounts,
}

impl ConcurrencyGovernor {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Claim a slot for a tenant. Fails fast at the ceiling; the caller
    /// must fail the session rather than wait.
    pub fn acquire(&self, tenant_id: &str) -> Result<SessionSlot> {
        let mut counts = self
            .counts
            .lock()
            .expect("tenant counter mutex poisoned");

        let count = counts.entry(tenant_id.to_string()).or_insert(0);
        if *count >= self.ceiling {
            return Err(WardenError::Capacity(format!(
                "tenant '{}' already has {} sessions in flight (ceiling {})",
                tenant_id, count, self.ceiling
            )));
        }

        *count += 1;
        debug!(tenant_id, in_flight = *count, "acquired session slot");

        Ok(SessionSlot {
            tenant_id: tenant_id.to_string(),
            counts: Arc::clone(&self.counts),
            released: AtomicBool::new(false),
        })
    }

    /// In-flight count for a tenant (for monitoring and tests)
    pub fn active(&self, tenant_id: &str) -> usize {
        self.counts
            .lock()
            .expect("tenant counter mutex poisoned")
            .get(tenant_id)
            .copied()
            .unwrap_or(0)
    }

    /// Replace the counters with ground truth recomputed from persisted
    /// state. Called on restart, when no prior in-memory count survives.
    pub fn reconcile(&self, live: HashMap<String, usize>) {
        let mut counts = self
            .counts
            .lock()
            .expect("tenant counter mutex poisoned");
        if !counts.is_empty() && *counts != live {
            warn!(?live, "reconciling tenant counters against persisted state");
        }
        *counts = live;
    }
}

/// RAII handle for one acquired slot. Dropping releases; explicit release
/// is idempotent.
#[derive(Debug)]
pub struct SessionSlot {
    tenant_id: String,
    counts: TenantCounts,
    released: AtomicBool,
}

impl SessionSlot {
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Give the slot back. Safe to call more than once.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut counts = self
            .counts
            .lock()
            .expect("tenant counter mutex poisoned");
        match counts.get_mut(&self.tenant_id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                debug!(tenant_id = %self.tenant_id, in_flight = *count, "released session slot");
            }
            _ => {
                // Counter was reconciled away underneath us; nothing to do
                warn!(tenant_id = %self.tenant_id, "released slot had no counter");
            }
        }
    }
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_up_to_ceiling() {
        let governor = ConcurrencyGovernor::new(2);
        let a = governor.acquire("t1").unwrap();
        let _b = governor.acquire("t1").unwrap();
        assert_eq!(governor.active("t1"), 2);

        let err = governor.acquire("t1").unwrap_err();
        assert!(matches!(err, WardenError::Capacity(_)));

        drop(a);
        assert_eq!(governor.active("t1"), 1);
        assert!(governor.acquire("t1").is_ok());
    }

    #[test]
    fn test_tenants_are_independent() {
        let governor = ConcurrencyGovernor::new(1);
        let _a = governor.acquire("t1").unwrap();
        assert!(governor.acquire("t2").is_ok());
        assert!(governor.acquire("t1").is_err());
    }

    #[test]
    fn test_release_is_idempotent() {
        let governor = ConcurrencyGovernor::new(2);
        let slot = governor.acquire("t1").unwrap();

        slot.release();
        slot.release();
        assert_eq!(governor.active("t1"), 0);

        // Drop after explicit release must not underflow
        drop(slot);
        assert_eq!(governor.active("t1"), 0);
    }

    #[test]
    fn test_slot_released_on_panic_unwind() {
        let governor = Arc::new(ConcurrencyGovernor::new(1));
        let inner = Arc::clone(&governor);

        let result = std::panic::catch_unwind(move || {
            let _slot = inner.acquire("t1").unwrap();
            panic!("simulated crash mid-session");
        });
        assert!(result.is_err());

        // Unwinding dropped the slot
        assert_eq!(governor.active("t1"), 0);
        assert!(governor.acquire("t1").is_ok());
    }

    #[test]
    fn test_count_never_negative() {
        let governor = ConcurrencyGovernor::new(2);
        let slot = governor.acquire("t1").unwrap();

        // Reconcile wipes the counter while a slot is still out
        governor.reconcile(HashMap::new());
        slot.release();
        assert_eq!(governor.active("t1"), 0);
    }

    #[test]
    fn test_reconcile_replaces_counts() {
        let governor = ConcurrencyGovernor::new(2);
        let _slot = governor.acquire("t1").unwrap();

        let mut live = HashMap::new();
        live.insert("t2".to_string(), 1);
        governor.reconcile(live);

        assert_eq!(governor.active("t1"), 0);
        assert_eq!(governor.active("t2"), 1);
    }
}
