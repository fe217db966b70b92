// crates/schema-steward-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Test Doubles
// Description: In-memory audit ledger and scriptable executor.
// Purpose: Deterministic implementations for tests and local demos.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! This module provides in-memory implementations of [`AuditLedger`] and
//! [`SchemaExecutor`] for tests and local demos. The scripted executor can be
//! primed with per-statement failures so orchestration paths (benign race,
//! transient retry, fatal failure) are exercised without a database. Not
//! intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::audit::AuditRecord;
use crate::core::audit::AuditStatus;
use crate::core::identifiers::SchemaVersion;
use crate::core::identifiers::TenantId;
use crate::interfaces::AuditAttempt;
use crate::interfaces::AuditLedger;
use crate::interfaces::ExecutorError;
use crate::interfaces::LedgerError;
use crate::interfaces::SchemaExecutor;

// ============================================================================
// SECTION: In-Memory Ledger
// ============================================================================

/// In-memory append-only audit ledger.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditLedger {
    /// Appended records guarded by a mutex.
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl InMemoryAuditLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all appended records.
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl AuditLedger for InMemoryAuditLedger {
    fn ensure_audit_table(&self) -> Result<(), LedgerError> {
        Ok(())
    }

    fn has_succeeded(
        &self,
        tenant_id: &TenantId,
        file_name: &str,
        version: &SchemaVersion,
        checksum: &str,
    ) -> Result<bool, LedgerError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.iter().any(|record| {
            record.status == AuditStatus::Success
                && record.tenant_id == *tenant_id
                && record.file_name == file_name
                && record.version == *version
                && record.checksum == checksum
        }))
    }

    fn record(&self, attempt: &AuditAttempt) -> Result<(), LedgerError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let id = i64::try_from(records.len())
            .map_err(|_| LedgerError::Invalid("ledger id overflow".to_string()))?
            .checked_add(1)
            .ok_or_else(|| LedgerError::Invalid("ledger id overflow".to_string()))?;
        records.push(AuditRecord {
            id,
            tenant_id: attempt.tenant_id.clone(),
            schema_name: attempt.schema_name.clone(),
            file_name: attempt.file_name.clone(),
            version: attempt.version.clone(),
            checksum: attempt.checksum.clone(),
            applied_at: unix_millis(),
            status: attempt.status,
            error_sealed: attempt.error_sealed.clone(),
        });
        Ok(())
    }
}

// ============================================================================
// SECTION: Scripted Executor
// ============================================================================

/// Scriptable in-memory executor for orchestration tests.
///
/// Failures are primed per SQL text and consumed in FIFO order, so one test
/// can model "fail twice with busy, then succeed" for a single file.
#[derive(Debug, Default, Clone)]
pub struct ScriptedExecutor {
    /// Primed failures keyed by exact SQL text.
    failures: Arc<Mutex<BTreeMap<String, VecDeque<ExecutorError>>>>,
    /// Primed failures for drop operations, keyed by tenant identifier.
    drop_failures: Arc<Mutex<BTreeMap<String, VecDeque<ExecutorError>>>>,
    /// Log of successful applies as (tenant, sql) pairs.
    applied: Arc<Mutex<Vec<(String, String)>>>,
    /// Log of successful drops as (tenant, table) pairs.
    dropped: Arc<Mutex<Vec<(String, String)>>>,
    /// Log of release calls by tenant identifier.
    released: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExecutor {
    /// Creates an executor that succeeds on every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Primes one failure for the next apply of the given SQL text.
    pub fn fail_next_apply(&self, sql: &str, error: ExecutorError) {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        failures.entry(sql.to_string()).or_default().push_back(error);
    }

    /// Primes one failure for the next drop for the given tenant.
    pub fn fail_next_drop(&self, tenant_id: &TenantId, error: ExecutorError) {
        let mut failures = self.drop_failures.lock().unwrap_or_else(PoisonError::into_inner);
        failures.entry(tenant_id.as_str().to_string()).or_default().push_back(error);
    }

    /// Returns the successful applies as (tenant, sql) pairs.
    #[must_use]
    pub fn applied(&self) -> Vec<(String, String)> {
        self.applied.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the dropped tables as (tenant, table) pairs.
    #[must_use]
    pub fn dropped(&self) -> Vec<(String, String)> {
        self.dropped.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the tenants released so far.
    #[must_use]
    pub fn released(&self) -> Vec<String> {
        self.released.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SchemaExecutor for ScriptedExecutor {
    fn apply(&self, tenant_id: &TenantId, sql: &str) -> Result<(), ExecutorError> {
        let next_failure = {
            let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
            failures.get_mut(sql).and_then(VecDeque::pop_front)
        };
        if let Some(error) = next_failure {
            return Err(error);
        }
        let mut applied = self.applied.lock().unwrap_or_else(PoisonError::into_inner);
        applied.push((tenant_id.as_str().to_string(), sql.to_string()));
        Ok(())
    }

    fn drop_tables(&self, tenant_id: &TenantId, tables: &[String]) -> Result<(), ExecutorError> {
        let next_failure = {
            let mut failures = self.drop_failures.lock().unwrap_or_else(PoisonError::into_inner);
            failures.get_mut(tenant_id.as_str()).and_then(VecDeque::pop_front)
        };
        if let Some(error) = next_failure {
            return Err(error);
        }
        let mut dropped = self.dropped.lock().unwrap_or_else(PoisonError::into_inner);
        for table in tables {
            dropped.push((tenant_id.as_str().to_string(), table.clone()));
        }
        Ok(())
    }

    fn release(&self, tenant_id: &TenantId) {
        let mut released = self.released.lock().unwrap_or_else(PoisonError::into_inner);
        released.push(tenant_id.as_str().to_string());
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
