// crates/schema-steward-core/src/runtime/provisioner.rs
// ============================================================================
// Module: Tenant Provisioner
// Description: Orchestration entry points for schema apply and rollback.
// Purpose: Drive validate, checksum, apply, and record per schema file.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The provisioner applies the registry's file list to one tenant, strictly
//! in order, one file at a time. Failures are isolated per file: a rejected
//! or failed file never stops the remaining files from being attempted. No
//! error escapes the entry points; every outcome is a structured report.
//!
//! A per-tenant single-flight guard is held across the whole run, so two
//! concurrent initializations for the same tenant serialize instead of racing
//! the idempotence check. The "already exists" tolerance remains as a second
//! line of defense for partial prior applies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;

use crate::core::audit::ApplyReport;
use crate::core::audit::ApplyStatus;
use crate::core::audit::AuditStatus;
use crate::core::audit::RollbackReport;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::hash_bytes;
use crate::core::identifiers::TenantId;
use crate::core::policy::POLICY_VIOLATION_MESSAGE;
use crate::core::policy::SqlPolicy;
use crate::core::registry::RollbackMapping;
use crate::core::registry::SchemaFileDescriptor;
use crate::core::registry::SchemaFileRegistry;
use crate::core::sealing::ErrorCipher;
use crate::interfaces::AuditAttempt;
use crate::interfaces::AuditLedger;
use crate::interfaces::LedgerError;
use crate::interfaces::SchemaExecutor;
use crate::interfaces::SchemaSource;
use crate::runtime::classify::FailureKind;
use crate::runtime::classify::RetryPolicy;
use crate::runtime::classify::classify_failure;
use crate::runtime::lock::TenantLocks;

// ============================================================================
// SECTION: Provisioner
// ============================================================================

/// Per-tenant schema initialization and rollback orchestrator.
///
/// # Invariants
/// - Files are applied in registry order, sequentially, never in parallel.
/// - Entry points never panic or propagate errors; all outcomes are reports.
/// - The audit ledger is append-only from this type's perspective.
#[derive(Debug)]
pub struct Provisioner<L, E, S> {
    /// Fixed ordered file list.
    registry: SchemaFileRegistry,
    /// File-to-tables teardown mapping.
    rollback: RollbackMapping,
    /// Path whitelist and SQL pattern gate.
    policy: SqlPolicy,
    /// Append-only audit ledger.
    ledger: L,
    /// Transactional tenant-schema executor.
    executor: E,
    /// Versioned SQL text source.
    source: S,
    /// Cipher for sealed failure detail.
    cipher: ErrorCipher,
    /// Bounded retry policy for transient failures.
    retry: RetryPolicy,
    /// Per-tenant single-flight lock table.
    locks: TenantLocks,
}

impl<L, E, S> Provisioner<L, E, S>
where
    L: AuditLedger,
    E: SchemaExecutor,
    S: SchemaSource,
{
    /// Creates a provisioner over validated, immutable configuration.
    #[must_use]
    pub fn new(
        registry: SchemaFileRegistry,
        rollback: RollbackMapping,
        policy: SqlPolicy,
        ledger: L,
        executor: E,
        source: S,
        cipher: ErrorCipher,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            rollback,
            policy,
            ledger,
            executor,
            source,
            cipher,
            retry,
            locks: TenantLocks::new(),
        }
    }

    /// Applies every registry file to the tenant's schema, in order.
    ///
    /// Returns one report per registry file. A file that was already applied
    /// (same content) reports `skipped`; a tolerated concurrent-creation race
    /// also reports `skipped` but appends a `success` audit row so future
    /// runs short-circuit on the ledger.
    pub fn run_schema_initialization(&self, tenant_id: &TenantId) -> Vec<ApplyReport> {
        let guard = self.locks.acquire(tenant_id);
        let reports = if let Err(err) = self.ledger.ensure_audit_table() {
            let message = format!("control plane unavailable: {err}");
            self.registry
                .files()
                .iter()
                .map(|descriptor| {
                    ApplyReport::with_message(
                        descriptor.relative_path.clone(),
                        descriptor.version.clone(),
                        ApplyStatus::Failed,
                        message.clone(),
                    )
                })
                .collect()
        } else {
            self.registry
                .files()
                .iter()
                .map(|descriptor| self.apply_one(tenant_id, descriptor))
                .collect()
        };
        self.executor.release(tenant_id);
        drop(guard);
        reports
    }

    /// Drops the tables attributed to one schema file, in one transaction.
    ///
    /// The audit ledger is not consulted or mutated: a rolled-back file still
    /// reads as applied, so re-initialization will skip it until its content
    /// changes. Remediation is a content change or manual control-plane
    /// intervention.
    pub fn rollback_schema_file(&self, tenant_id: &TenantId, file_name: &str) -> RollbackReport {
        let guard = self.locks.acquire(tenant_id);
        let report = match self.rollback.tables_for(file_name) {
            None => RollbackReport {
                success: false,
                dropped_tables: Vec::new(),
                message: Some(format!("no rollback mapping for schema file: {file_name}")),
            },
            Some(tables) => match self.executor.drop_tables(tenant_id, tables) {
                Ok(()) => RollbackReport {
                    success: true,
                    dropped_tables: tables.to_vec(),
                    message: None,
                },
                Err(err) => RollbackReport {
                    success: false,
                    dropped_tables: Vec::new(),
                    message: Some(err.to_string()),
                },
            },
        };
        self.executor.release(tenant_id);
        drop(guard);
        report
    }

    /// Validates, checksums, applies, and records one schema file.
    fn apply_one(&self, tenant_id: &TenantId, descriptor: &SchemaFileDescriptor) -> ApplyReport {
        // Path gate runs before any disk read.
        if self.policy.check_path(&descriptor.relative_path).is_err() {
            self.record_outcome(
                tenant_id,
                descriptor,
                "",
                AuditStatus::Failure,
                Some(POLICY_VIOLATION_MESSAGE),
            );
            return ApplyReport::with_message(
                descriptor.relative_path.clone(),
                descriptor.version.clone(),
                ApplyStatus::Failed,
                POLICY_VIOLATION_MESSAGE,
            );
        }
        let bytes = match self.source.read(descriptor) {
            Ok(bytes) => bytes,
            Err(err) => {
                let message = format!("schema file unreadable: {err}");
                self.record_outcome(
                    tenant_id,
                    descriptor,
                    "",
                    AuditStatus::Failure,
                    Some(&message),
                );
                return ApplyReport::with_message(
                    descriptor.relative_path.clone(),
                    descriptor.version.clone(),
                    ApplyStatus::Failed,
                    message,
                );
            }
        };
        let checksum = hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes).value;
        let Ok(sql) = std::str::from_utf8(&bytes) else {
            let message = "schema file is not valid utf-8".to_string();
            self.record_outcome(
                tenant_id,
                descriptor,
                &checksum,
                AuditStatus::Failure,
                Some(&message),
            );
            return ApplyReport::with_message(
                descriptor.relative_path.clone(),
                descriptor.version.clone(),
                ApplyStatus::Failed,
                message,
            );
        };
        if SqlPolicy::check_sql(sql).is_err() {
            self.record_outcome(
                tenant_id,
                descriptor,
                &checksum,
                AuditStatus::Failure,
                Some(POLICY_VIOLATION_MESSAGE),
            );
            return ApplyReport::with_message(
                descriptor.relative_path.clone(),
                descriptor.version.clone(),
                ApplyStatus::Failed,
                POLICY_VIOLATION_MESSAGE,
            );
        }
        match self.ledger.has_succeeded(
            tenant_id,
            &descriptor.relative_path,
            &descriptor.version,
            &checksum,
        ) {
            Ok(true) => {
                return ApplyReport::with_message(
                    descriptor.relative_path.clone(),
                    descriptor.version.clone(),
                    ApplyStatus::Skipped,
                    "already applied",
                );
            }
            Ok(false) => {}
            Err(err) => {
                return ApplyReport::with_message(
                    descriptor.relative_path.clone(),
                    descriptor.version.clone(),
                    ApplyStatus::Failed,
                    format!("idempotence check failed: {err}"),
                );
            }
        }
        self.execute_with_retries(tenant_id, descriptor, sql, &checksum)
    }

    /// Runs the transactional apply, retrying transient failures.
    fn execute_with_retries(
        &self,
        tenant_id: &TenantId,
        descriptor: &SchemaFileDescriptor,
        sql: &str,
        checksum: &str,
    ) -> ApplyReport {
        let mut attempt: u32 = 1;
        loop {
            match self.executor.apply(tenant_id, sql) {
                Ok(()) => {
                    if let Err(err) = self.record_success(tenant_id, descriptor, checksum) {
                        // Applied but unrecorded: surface as failed so the
                        // operator re-runs; the next run lands on the
                        // already-exists tolerance and records success.
                        return ApplyReport::with_message(
                            descriptor.relative_path.clone(),
                            descriptor.version.clone(),
                            ApplyStatus::Failed,
                            format!("applied but audit record failed: {err}"),
                        );
                    }
                    return ApplyReport::new(
                        descriptor.relative_path.clone(),
                        descriptor.version.clone(),
                        ApplyStatus::Success,
                    );
                }
                Err(err) => match classify_failure(&err) {
                    FailureKind::BenignRace => {
                        // Success-equivalent: record success so future runs
                        // short-circuit on the ledger, surface skipped.
                        if let Err(record_err) = self.record_success(tenant_id, descriptor, checksum)
                        {
                            return ApplyReport::with_message(
                                descriptor.relative_path.clone(),
                                descriptor.version.clone(),
                                ApplyStatus::Failed,
                                format!("applied but audit record failed: {record_err}"),
                            );
                        }
                        return ApplyReport::with_message(
                            descriptor.relative_path.clone(),
                            descriptor.version.clone(),
                            ApplyStatus::Skipped,
                            "schema objects already present",
                        );
                    }
                    FailureKind::Transient if attempt < self.retry.max_attempts => {
                        thread::sleep(self.retry.delay_for(attempt));
                        attempt = attempt.saturating_add(1);
                    }
                    FailureKind::Transient | FailureKind::Timeout | FailureKind::Fatal => {
                        let message = err.to_string();
                        self.record_outcome(
                            tenant_id,
                            descriptor,
                            checksum,
                            AuditStatus::Failure,
                            Some(&message),
                        );
                        return ApplyReport::with_message(
                            descriptor.relative_path.clone(),
                            descriptor.version.clone(),
                            ApplyStatus::Failed,
                            message,
                        );
                    }
                },
            }
        }
    }

    /// Appends a success row for the tuple.
    fn record_success(
        &self,
        tenant_id: &TenantId,
        descriptor: &SchemaFileDescriptor,
        checksum: &str,
    ) -> Result<(), LedgerError> {
        self.ledger.record(&AuditAttempt {
            tenant_id: tenant_id.clone(),
            schema_name: tenant_id.as_str().to_string(),
            file_name: descriptor.relative_path.clone(),
            version: descriptor.version.clone(),
            checksum: checksum.to_string(),
            status: AuditStatus::Success,
            error_sealed: None,
        })
    }

    /// Appends an attempt row, sealing failure detail when present.
    ///
    /// Ledger append errors here are deliberately swallowed: the per-file
    /// report already carries the primary outcome, and a dead control plane
    /// must not turn one classified failure into a panic path.
    fn record_outcome(
        &self,
        tenant_id: &TenantId,
        descriptor: &SchemaFileDescriptor,
        checksum: &str,
        status: AuditStatus,
        error_detail: Option<&str>,
    ) {
        let error_sealed = match (status, error_detail) {
            (AuditStatus::Failure, Some(detail)) => self.cipher.seal(detail).ok(),
            _ => None,
        };
        let _unused = self.ledger.record(&AuditAttempt {
            tenant_id: tenant_id.clone(),
            schema_name: tenant_id.as_str().to_string(),
            file_name: descriptor.relative_path.clone(),
            version: descriptor.version.clone(),
            checksum: checksum.to_string(),
            status,
            error_sealed,
        });
    }
}
