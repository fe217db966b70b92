// crates/schema-steward-core/src/runtime/lock.rs
// ============================================================================
// Module: Tenant Single-Flight Locks
// Description: In-process mutual exclusion keyed by tenant identifier.
// Purpose: Serialize concurrent provisioning runs for the same tenant.
// Dependencies: crate::core::identifiers
// ============================================================================

//! ## Overview
//! Two concurrent runs for the same tenant could both pass the idempotence
//! check before either commits. The lock table closes that window for a
//! single-instance orchestrator: a guard is acquired before the first ledger
//! read and held until every file has been attempted. Distinct tenants never
//! block each other.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::core::identifiers::TenantId;

// ============================================================================
// SECTION: Lock Table
// ============================================================================

/// In-process lock table keyed by tenant identifier.
///
/// # Invariants
/// - A tenant appears in the held set iff a [`TenantGuard`] for it is alive.
#[derive(Debug, Default)]
pub struct TenantLocks {
    /// Tenants currently holding a guard.
    held: Mutex<BTreeSet<String>>,
    /// Signaled whenever a guard is released.
    released: Condvar,
}

impl TenantLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the tenant's slot is free, then holds it.
    #[must_use]
    pub fn acquire(&self, tenant_id: &TenantId) -> TenantGuard<'_> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while held.contains(tenant_id.as_str()) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(tenant_id.as_str().to_string());
        drop(held);
        TenantGuard {
            locks: self,
            tenant: tenant_id.as_str().to_string(),
        }
    }
}

// ============================================================================
// SECTION: Guard
// ============================================================================

/// Held tenant slot; releases on drop.
#[derive(Debug)]
pub struct TenantGuard<'locks> {
    /// Owning lock table.
    locks: &'locks TenantLocks,
    /// Held tenant identifier.
    tenant: String,
}

impl Drop for TenantGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.tenant);
        drop(held);
        self.locks.released.notify_all();
    }
}
