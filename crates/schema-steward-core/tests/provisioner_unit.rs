// crates/schema-steward-core/tests/provisioner_unit.rs
// ============================================================================
// Module: Provisioner Orchestration Unit Tests
// Description: Scenario coverage for per-tenant schema initialization.
// Purpose: Validate idempotence, policy gating, failure isolation, retries,
//          benign-race tolerance, and rollback over in-memory doubles.
// ============================================================================

//! ## Overview
//! Orchestration-level tests driving [`Provisioner`] with the in-memory
//! ledger, the scripted executor, and a tempdir-backed filesystem source:
//! - Fresh tenant, repeat run, and content-change scenarios
//! - Path whitelist and SQL pattern rejection before execution
//! - Per-file failure isolation and bounded transient retries
//! - Benign-race tolerance recording success while reporting skipped
//! - Same-tenant runs serialize; distinct tenants proceed concurrently
//! - Rollback ordering and failure reporting

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::Barrier;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use schema_steward_core::ApplyStatus;
use schema_steward_core::AuditAttempt;
use schema_steward_core::AuditLedger;
use schema_steward_core::AuditStatus;
use schema_steward_core::DbErrorCode;
use schema_steward_core::ErrorCipher;
use schema_steward_core::ExecutorError;
use schema_steward_core::FsSchemaSource;
use schema_steward_core::InMemoryAuditLedger;
use schema_steward_core::LedgerError;
use schema_steward_core::POLICY_VIOLATION_MESSAGE;
use schema_steward_core::Provisioner;
use schema_steward_core::RetryPolicy;
use schema_steward_core::RollbackMapping;
use schema_steward_core::SchemaFileDescriptor;
use schema_steward_core::SchemaFileRegistry;
use schema_steward_core::SchemaVersion;
use schema_steward_core::SchemaExecutor;
use schema_steward_core::ScriptedExecutor;
use schema_steward_core::SqlPolicy;
use schema_steward_core::TenantId;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const TEST_SECRET: &str = "unit-test-sealing-secret";

fn write_schema(root: &Path, relative: &str, sql: &str) {
    let full = root.join(relative);
    fs::create_dir_all(full.parent().expect("parent")).expect("create schema dir");
    fs::write(full, sql).expect("write schema file");
}

fn registry_of(paths: &[&str]) -> SchemaFileRegistry {
    let files = paths
        .iter()
        .map(|path| SchemaFileDescriptor::new(*path, "1.0"))
        .collect();
    SchemaFileRegistry::new(files).expect("registry")
}

fn provisioner_with(
    root: &Path,
    registry: SchemaFileRegistry,
    mapping: RollbackMapping,
    ledger: InMemoryAuditLedger,
    executor: ScriptedExecutor,
    retry: RetryPolicy,
) -> Provisioner<InMemoryAuditLedger, ScriptedExecutor, FsSchemaSource> {
    Provisioner::new(
        registry,
        mapping,
        SqlPolicy::new(vec!["schemas/core".to_string()]).expect("policy"),
        ledger,
        executor,
        FsSchemaSource::new(root),
        ErrorCipher::from_secret(TEST_SECRET).expect("cipher"),
        retry,
    )
}

fn empty_mapping(registry: &SchemaFileRegistry) -> RollbackMapping {
    RollbackMapping::new(Vec::new(), registry).expect("mapping")
}

// ============================================================================
// SECTION: Fresh and Repeat Runs
// ============================================================================

#[test]
fn fresh_tenant_applies_all_files_in_order() {
    let dir = TempDir::new().expect("tempdir");
    write_schema(dir.path(), "schemas/core/a.sql", "CREATE TABLE patients (id INTEGER);");
    write_schema(dir.path(), "schemas/core/b.sql", "CREATE TABLE appointments (id INTEGER);");
    let registry = registry_of(&["schemas/core/a.sql", "schemas/core/b.sql"]);
    let mapping = empty_mapping(&registry);
    let ledger = InMemoryAuditLedger::new();
    let executor = ScriptedExecutor::new();
    let provisioner = provisioner_with(
        dir.path(),
        registry,
        mapping,
        ledger.clone(),
        executor.clone(),
        RetryPolicy::default(),
    );

    let reports = provisioner.run_schema_initialization(&TenantId::new("t1"));

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|report| report.status == ApplyStatus::Success));
    let applied = executor.applied();
    assert_eq!(applied.len(), 2);
    assert!(applied[0].1.contains("patients"));
    assert!(applied[1].1.contains("appointments"));
    let records = ledger.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.status == AuditStatus::Success));
    assert!(records.iter().all(|record| record.schema_name == "t1"));
    assert_eq!(executor.released(), vec!["t1".to_string()]);
}

#[test]
fn repeat_run_skips_unchanged_files_without_new_rows() {
    let dir = TempDir::new().expect("tempdir");
    write_schema(dir.path(), "schemas/core/a.sql", "CREATE TABLE patients (id INTEGER);");
    let registry = registry_of(&["schemas/core/a.sql"]);
    let mapping = empty_mapping(&registry);
    let ledger = InMemoryAuditLedger::new();
    let executor = ScriptedExecutor::new();
    let provisioner = provisioner_with(
        dir.path(),
        registry,
        mapping,
        ledger.clone(),
        executor.clone(),
        RetryPolicy::default(),
    );
    let tenant = TenantId::new("t1");

    let first = provisioner.run_schema_initialization(&tenant);
    let second = provisioner.run_schema_initialization(&tenant);

    assert_eq!(first[0].status, ApplyStatus::Success);
    assert_eq!(second[0].status, ApplyStatus::Skipped);
    assert_eq!(second[0].message.as_deref(), Some("already applied"));
    assert_eq!(ledger.records().len(), 1);
    assert_eq!(executor.applied().len(), 1);
}

#[test]
fn changed_content_is_a_new_unit_of_work() {
    let dir = TempDir::new().expect("tempdir");
    write_schema(dir.path(), "schemas/core/a.sql", "CREATE TABLE patients (id INTEGER);");
    let registry = registry_of(&["schemas/core/a.sql"]);
    let mapping = empty_mapping(&registry);
    let ledger = InMemoryAuditLedger::new();
    let executor = ScriptedExecutor::new();
    let provisioner = provisioner_with(
        dir.path(),
        registry,
        mapping,
        ledger.clone(),
        executor.clone(),
        RetryPolicy::default(),
    );
    let tenant = TenantId::new("t1");

    let first = provisioner.run_schema_initialization(&tenant);
    write_schema(
        dir.path(),
        "schemas/core/a.sql",
        "CREATE TABLE patients (id INTEGER, name TEXT);",
    );
    let second = provisioner.run_schema_initialization(&tenant);

    assert_eq!(first[0].status, ApplyStatus::Success);
    assert_eq!(second[0].status, ApplyStatus::Success);
    let records = ledger.records();
    assert_eq!(records.len(), 2);
    assert_ne!(records[0].checksum, records[1].checksum);
}

// ============================================================================
// SECTION: Policy Gating
// ============================================================================

#[test]
fn path_outside_whitelist_is_rejected_without_read_or_execution() {
    let dir = TempDir::new().expect("tempdir");
    let registry = registry_of(&["private/evil.sql"]);
    let mapping = empty_mapping(&registry);
    let ledger = InMemoryAuditLedger::new();
    let executor = ScriptedExecutor::new();
    let provisioner = provisioner_with(
        dir.path(),
        registry,
        mapping,
        ledger.clone(),
        executor.clone(),
        RetryPolicy::default(),
    );

    let reports = provisioner.run_schema_initialization(&TenantId::new("t1"));

    assert_eq!(reports[0].status, ApplyStatus::Failed);
    assert_eq!(reports[0].message.as_deref(), Some(POLICY_VIOLATION_MESSAGE));
    assert!(executor.applied().is_empty());
    let records = ledger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AuditStatus::Failure);
    assert!(records[0].checksum.is_empty());
}

#[test]
fn disallowed_pattern_is_rejected_with_sealed_fixed_message() {
    let dir = TempDir::new().expect("tempdir");
    write_schema(
        dir.path(),
        "schemas/core/bad.sql",
        "CREATE TABLE ok (id INTEGER);\nDROP SCHEMA victim;",
    );
    let registry = registry_of(&["schemas/core/bad.sql"]);
    let mapping = empty_mapping(&registry);
    let ledger = InMemoryAuditLedger::new();
    let executor = ScriptedExecutor::new();
    let provisioner = provisioner_with(
        dir.path(),
        registry,
        mapping,
        ledger.clone(),
        executor.clone(),
        RetryPolicy::default(),
    );

    let reports = provisioner.run_schema_initialization(&TenantId::new("t1"));

    assert_eq!(reports[0].status, ApplyStatus::Failed);
    assert!(executor.applied().is_empty());
    let records = ledger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AuditStatus::Failure);
    assert!(!records[0].checksum.is_empty());
    let sealed = records[0].error_sealed.as_deref().expect("sealed detail");
    let cipher = ErrorCipher::from_secret(TEST_SECRET).expect("cipher");
    assert_eq!(cipher.unseal(sealed).expect("unseal"), POLICY_VIOLATION_MESSAGE);
}

// ============================================================================
// SECTION: Failure Isolation and Retries
// ============================================================================

#[test]
fn one_failed_file_does_not_stop_the_remaining_files() {
    let dir = TempDir::new().expect("tempdir");
    write_schema(dir.path(), "schemas/core/a.sql", "CREATE TABLE a (id INTEGER);");
    write_schema(dir.path(), "schemas/core/b.sql", "CREATE TABLE b (id INTEGER);");
    write_schema(dir.path(), "schemas/core/c.sql", "CREATE TABLE c (id INTEGER);");
    let registry =
        registry_of(&["schemas/core/a.sql", "schemas/core/b.sql", "schemas/core/c.sql"]);
    let mapping = empty_mapping(&registry);
    let ledger = InMemoryAuditLedger::new();
    let executor = ScriptedExecutor::new();
    executor.fail_next_apply(
        "CREATE TABLE b (id INTEGER);",
        ExecutorError::Db {
            code: None,
            message: "syntax error near b".to_string(),
        },
    );
    let provisioner = provisioner_with(
        dir.path(),
        registry,
        mapping,
        ledger.clone(),
        executor.clone(),
        RetryPolicy::default(),
    );

    let reports = provisioner.run_schema_initialization(&TenantId::new("t1"));

    assert_eq!(reports[0].status, ApplyStatus::Success);
    assert_eq!(reports[1].status, ApplyStatus::Failed);
    assert_eq!(reports[2].status, ApplyStatus::Success);
    assert_eq!(executor.applied().len(), 2);
}

#[test]
fn benign_race_reports_skipped_and_records_success() {
    let dir = TempDir::new().expect("tempdir");
    write_schema(dir.path(), "schemas/core/a.sql", "CREATE TABLE patients (id INTEGER);");
    let registry = registry_of(&["schemas/core/a.sql"]);
    let mapping = empty_mapping(&registry);
    let ledger = InMemoryAuditLedger::new();
    let executor = ScriptedExecutor::new();
    executor.fail_next_apply(
        "CREATE TABLE patients (id INTEGER);",
        ExecutorError::Db {
            code: None,
            message: "table patients already exists".to_string(),
        },
    );
    let provisioner = provisioner_with(
        dir.path(),
        registry,
        mapping,
        ledger.clone(),
        executor.clone(),
        RetryPolicy::default(),
    );
    let tenant = TenantId::new("t1");

    let first = provisioner.run_schema_initialization(&tenant);
    let second = provisioner.run_schema_initialization(&tenant);

    assert_eq!(first[0].status, ApplyStatus::Skipped);
    assert_eq!(first[0].message.as_deref(), Some("schema objects already present"));
    let records = ledger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AuditStatus::Success);
    // The ledger row short-circuits the second run before execution.
    assert_eq!(second[0].status, ApplyStatus::Skipped);
    assert_eq!(second[0].message.as_deref(), Some("already applied"));
}

#[test]
fn transient_failures_are_retried_until_success() {
    let dir = TempDir::new().expect("tempdir");
    write_schema(dir.path(), "schemas/core/a.sql", "CREATE TABLE a (id INTEGER);");
    let registry = registry_of(&["schemas/core/a.sql"]);
    let mapping = empty_mapping(&registry);
    let ledger = InMemoryAuditLedger::new();
    let executor = ScriptedExecutor::new();
    for _ in 0 .. 2 {
        executor.fail_next_apply(
            "CREATE TABLE a (id INTEGER);",
            ExecutorError::Db {
                code: Some(DbErrorCode::Busy),
                message: "database is busy".to_string(),
            },
        );
    }
    let retry = RetryPolicy {
        max_attempts: 3,
        backoff_ms: 1,
    };
    let provisioner =
        provisioner_with(dir.path(), registry, mapping, ledger.clone(), executor.clone(), retry);

    let reports = provisioner.run_schema_initialization(&TenantId::new("t1"));

    assert_eq!(reports[0].status, ApplyStatus::Success);
    assert_eq!(executor.applied().len(), 1);
    assert_eq!(ledger.records().len(), 1);
}

#[test]
fn transient_failures_surface_failed_once_retries_are_exhausted() {
    let dir = TempDir::new().expect("tempdir");
    write_schema(dir.path(), "schemas/core/a.sql", "CREATE TABLE a (id INTEGER);");
    let registry = registry_of(&["schemas/core/a.sql"]);
    let mapping = empty_mapping(&registry);
    let ledger = InMemoryAuditLedger::new();
    let executor = ScriptedExecutor::new();
    for _ in 0 .. 2 {
        executor.fail_next_apply(
            "CREATE TABLE a (id INTEGER);",
            ExecutorError::Db {
                code: Some(DbErrorCode::Locked),
                message: "database table is locked".to_string(),
            },
        );
    }
    let retry = RetryPolicy {
        max_attempts: 2,
        backoff_ms: 1,
    };
    let provisioner =
        provisioner_with(dir.path(), registry, mapping, ledger.clone(), executor.clone(), retry);

    let reports = provisioner.run_schema_initialization(&TenantId::new("t1"));

    assert_eq!(reports[0].status, ApplyStatus::Failed);
    assert!(executor.applied().is_empty());
    let records = ledger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AuditStatus::Failure);
    assert!(records[0].error_sealed.is_some());
}

#[test]
fn timeout_is_final_and_never_retried() {
    let dir = TempDir::new().expect("tempdir");
    write_schema(dir.path(), "schemas/core/a.sql", "CREATE TABLE a (id INTEGER);");
    let registry = registry_of(&["schemas/core/a.sql"]);
    let mapping = empty_mapping(&registry);
    let ledger = InMemoryAuditLedger::new();
    let executor = ScriptedExecutor::new();
    executor.fail_next_apply(
        "CREATE TABLE a (id INTEGER);",
        ExecutorError::Timeout { deadline_ms: 250 },
    );
    let provisioner = provisioner_with(
        dir.path(),
        registry,
        mapping,
        ledger.clone(),
        executor.clone(),
        RetryPolicy::default(),
    );

    let reports = provisioner.run_schema_initialization(&TenantId::new("t1"));

    assert_eq!(reports[0].status, ApplyStatus::Failed);
    assert!(reports[0].message.as_deref().is_some_and(|message| message.contains("deadline")));
    // A retry would have consumed the scripted failure and then succeeded.
    assert!(executor.applied().is_empty());
}

// ============================================================================
// SECTION: Control Plane Unavailability
// ============================================================================

/// Ledger double whose table bootstrap always fails.
#[derive(Debug, Clone)]
struct DeadControlPlane;

impl AuditLedger for DeadControlPlane {
    fn ensure_audit_table(&self) -> Result<(), LedgerError> {
        Err(LedgerError::Db("connection refused".to_string()))
    }

    fn has_succeeded(
        &self,
        _tenant_id: &TenantId,
        _file_name: &str,
        _version: &SchemaVersion,
        _checksum: &str,
    ) -> Result<bool, LedgerError> {
        Err(LedgerError::Db("connection refused".to_string()))
    }

    fn record(&self, _attempt: &AuditAttempt) -> Result<(), LedgerError> {
        Err(LedgerError::Db("connection refused".to_string()))
    }
}

#[test]
fn dead_control_plane_fails_every_file_without_execution() {
    let dir = TempDir::new().expect("tempdir");
    write_schema(dir.path(), "schemas/core/a.sql", "CREATE TABLE a (id INTEGER);");
    write_schema(dir.path(), "schemas/core/b.sql", "CREATE TABLE b (id INTEGER);");
    let registry = registry_of(&["schemas/core/a.sql", "schemas/core/b.sql"]);
    let mapping = empty_mapping(&registry);
    let executor = ScriptedExecutor::new();
    let provisioner = Provisioner::new(
        registry,
        mapping,
        SqlPolicy::new(vec!["schemas/core".to_string()]).expect("policy"),
        DeadControlPlane,
        executor.clone(),
        FsSchemaSource::new(dir.path()),
        ErrorCipher::from_secret(TEST_SECRET).expect("cipher"),
        RetryPolicy::default(),
    );

    let reports = provisioner.run_schema_initialization(&TenantId::new("t1"));

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|report| report.status == ApplyStatus::Failed));
    assert!(reports.iter().all(|report| {
        report.message.as_deref().is_some_and(|message| message.contains("control plane"))
    }));
    assert!(executor.applied().is_empty());
}

// ============================================================================
// SECTION: Tenant Single-Flight
// ============================================================================

/// Ledger double that never reports prior success, so every run reaches the
/// executor instead of short-circuiting on idempotence.
#[derive(Debug, Clone)]
struct NeverAppliedLedger;

impl AuditLedger for NeverAppliedLedger {
    fn ensure_audit_table(&self) -> Result<(), LedgerError> {
        Ok(())
    }

    fn has_succeeded(
        &self,
        _tenant_id: &TenantId,
        _file_name: &str,
        _version: &SchemaVersion,
        _checksum: &str,
    ) -> Result<bool, LedgerError> {
        Ok(false)
    }

    fn record(&self, _attempt: &AuditAttempt) -> Result<(), LedgerError> {
        Ok(())
    }
}

/// Executor double that flags overlapping apply calls.
#[derive(Debug, Clone, Default)]
struct OverlapDetector {
    in_flight: Arc<AtomicBool>,
    overlapped: Arc<AtomicBool>,
    applies: Arc<AtomicUsize>,
}

impl SchemaExecutor for OverlapDetector {
    fn apply(&self, _tenant_id: &TenantId, _sql: &str) -> Result<(), ExecutorError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        thread::sleep(Duration::from_millis(5));
        self.in_flight.store(false, Ordering::SeqCst);
        self.applies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn drop_tables(&self, _tenant_id: &TenantId, _tables: &[String]) -> Result<(), ExecutorError> {
        Ok(())
    }

    fn release(&self, _tenant_id: &TenantId) {}
}

#[test]
fn concurrent_runs_for_the_same_tenant_serialize() {
    let dir = TempDir::new().expect("tempdir");
    write_schema(dir.path(), "schemas/core/a.sql", "CREATE TABLE a (id INTEGER);");
    let registry = registry_of(&["schemas/core/a.sql"]);
    let mapping = empty_mapping(&registry);
    let executor = OverlapDetector::default();
    let provisioner = Provisioner::new(
        registry,
        mapping,
        SqlPolicy::new(vec!["schemas/core".to_string()]).expect("policy"),
        NeverAppliedLedger,
        executor.clone(),
        FsSchemaSource::new(dir.path()),
        ErrorCipher::from_secret(TEST_SECRET).expect("cipher"),
        RetryPolicy::default(),
    );
    let tenant = TenantId::new("t1");

    thread::scope(|scope| {
        for _ in 0 .. 2 {
            scope.spawn(|| {
                let reports = provisioner.run_schema_initialization(&tenant);
                assert_eq!(reports[0].status, ApplyStatus::Success);
            });
        }
    });

    assert!(!executor.overlapped.load(Ordering::SeqCst));
    assert_eq!(executor.applies.load(Ordering::SeqCst), 2);
}

/// Executor double whose apply blocks until a second apply is also in
/// flight. Serialized runs would never both reach the barrier.
#[derive(Debug)]
struct RendezvousExecutor {
    both_applying: Barrier,
}

impl SchemaExecutor for RendezvousExecutor {
    fn apply(&self, _tenant_id: &TenantId, _sql: &str) -> Result<(), ExecutorError> {
        self.both_applying.wait();
        Ok(())
    }

    fn drop_tables(&self, _tenant_id: &TenantId, _tables: &[String]) -> Result<(), ExecutorError> {
        Ok(())
    }

    fn release(&self, _tenant_id: &TenantId) {}
}

#[test]
fn distinct_tenants_do_not_block_each_other() {
    let dir = TempDir::new().expect("tempdir");
    write_schema(dir.path(), "schemas/core/a.sql", "CREATE TABLE a (id INTEGER);");
    let registry = registry_of(&["schemas/core/a.sql"]);
    let mapping = empty_mapping(&registry);
    let provisioner = Provisioner::new(
        registry,
        mapping,
        SqlPolicy::new(vec!["schemas/core".to_string()]).expect("policy"),
        NeverAppliedLedger,
        RendezvousExecutor {
            both_applying: Barrier::new(2),
        },
        FsSchemaSource::new(dir.path()),
        ErrorCipher::from_secret(TEST_SECRET).expect("cipher"),
        RetryPolicy::default(),
    );

    let provisioner = &provisioner;
    thread::scope(|scope| {
        for tenant in ["t1", "t2"] {
            scope.spawn(move || {
                let reports = provisioner.run_schema_initialization(&TenantId::new(tenant));
                assert_eq!(reports[0].status, ApplyStatus::Success);
            });
        }
    });
}

// ============================================================================
// SECTION: Rollback
// ============================================================================

#[test]
fn rollback_drops_mapped_tables_in_mapping_order() {
    let dir = TempDir::new().expect("tempdir");
    let registry = registry_of(&["schemas/core/a.sql"]);
    let mapping = RollbackMapping::new(
        vec![(
            "schemas/core/a.sql".to_string(),
            vec!["appointments".to_string(), "patients".to_string()],
        )],
        &registry,
    )
    .expect("mapping");
    let executor = ScriptedExecutor::new();
    let provisioner = provisioner_with(
        dir.path(),
        registry,
        mapping,
        InMemoryAuditLedger::new(),
        executor.clone(),
        RetryPolicy::default(),
    );
    let tenant = TenantId::new("t1");

    let report = provisioner.rollback_schema_file(&tenant, "schemas/core/a.sql");

    assert!(report.success);
    assert_eq!(report.dropped_tables, vec!["appointments".to_string(), "patients".to_string()]);
    let dropped = executor.dropped();
    assert_eq!(dropped[0].1, "appointments");
    assert_eq!(dropped[1].1, "patients");
}

#[test]
fn rollback_of_unmapped_file_reports_failure() {
    let dir = TempDir::new().expect("tempdir");
    let registry = registry_of(&["schemas/core/a.sql"]);
    let mapping = empty_mapping(&registry);
    let provisioner = provisioner_with(
        dir.path(),
        registry,
        mapping,
        InMemoryAuditLedger::new(),
        ScriptedExecutor::new(),
        RetryPolicy::default(),
    );

    let report = provisioner.rollback_schema_file(&TenantId::new("t1"), "schemas/core/missing.sql");

    assert!(!report.success);
    assert!(report.dropped_tables.is_empty());
    assert!(report.message.is_some());
}

#[test]
fn rollback_failure_drops_nothing_and_carries_detail() {
    let dir = TempDir::new().expect("tempdir");
    let registry = registry_of(&["schemas/core/a.sql"]);
    let mapping = RollbackMapping::new(
        vec![("schemas/core/a.sql".to_string(), vec!["patients".to_string()])],
        &registry,
    )
    .expect("mapping");
    let executor = ScriptedExecutor::new();
    let tenant = TenantId::new("t1");
    executor.fail_next_drop(
        &tenant,
        ExecutorError::Db {
            code: None,
            message: "no such table: patients".to_string(),
        },
    );
    let provisioner = provisioner_with(
        dir.path(),
        registry,
        mapping,
        InMemoryAuditLedger::new(),
        executor.clone(),
        RetryPolicy::default(),
    );

    let report = provisioner.rollback_schema_file(&tenant, "schemas/core/a.sql");

    assert!(!report.success);
    assert!(report.dropped_tables.is_empty());
    assert!(report.message.as_deref().is_some_and(|message| message.contains("no such table")));
    assert!(executor.dropped().is_empty());
}
