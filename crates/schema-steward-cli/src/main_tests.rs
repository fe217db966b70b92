// crates/schema-steward-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for report rendering and timestamp formatting.
// Purpose: Ensure operator-facing text output stays stable and readable.
// Dependencies: schema-steward-cli main helpers
// ============================================================================

//! ## Overview
//! Validates the text renderers for apply reports, rollback reports, and
//! audit records, the RFC 3339 timestamp fallback, and the audit read path
//! against a real control-plane database.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use schema_steward_config::StewardConfig;
use schema_steward_core::ApplyReport;
use schema_steward_core::ApplyStatus;
use schema_steward_core::AuditAttempt;
use schema_steward_core::AuditLedger;
use schema_steward_core::AuditRecord;
use schema_steward_core::AuditStatus;
use schema_steward_core::RollbackReport;
use schema_steward_core::SchemaVersion;
use schema_steward_core::TenantId;
use schema_steward_store_sqlite::SqliteControlPlane;
use tempfile::TempDir;

use super::audit_records;
use super::format_timestamp;
use super::render_apply_report;
use super::render_audit_record;
use super::render_rollback_report;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn record(status: AuditStatus, checksum: &str, sealed: Option<Vec<u8>>) -> AuditRecord {
    AuditRecord {
        id: 1,
        tenant_id: TenantId::new("hospital_a"),
        schema_name: "hospital_a".to_string(),
        file_name: "schemas/core/001_hospital_core.sql".to_string(),
        version: SchemaVersion::new("1.0"),
        checksum: checksum.to_string(),
        applied_at: 0,
        status,
        error_sealed: sealed,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn apply_report_line_includes_status_file_and_version() {
    let report = ApplyReport::new(
        "schemas/core/001_hospital_core.sql",
        SchemaVersion::new("1.0"),
        ApplyStatus::Success,
    );

    let line = render_apply_report(&report);

    assert!(line.starts_with("applied"));
    assert!(line.contains("schemas/core/001_hospital_core.sql @1.0"));
}

#[test]
fn apply_report_line_carries_the_message_when_present() {
    let report = ApplyReport::with_message(
        "schemas/billing/003_billing.sql",
        SchemaVersion::new("1.0"),
        ApplyStatus::Skipped,
        "already applied",
    );

    let line = render_apply_report(&report);

    assert!(line.starts_with("skipped"));
    assert!(line.ends_with("(already applied)"));
}

#[test]
fn rollback_success_line_lists_dropped_tables() {
    let report = RollbackReport {
        success: true,
        dropped_tables: vec!["invoices".to_string(), "payments".to_string()],
        message: None,
    };

    let line = render_rollback_report("schemas/billing/003_billing.sql", &report);

    assert_eq!(
        line,
        "rolled back schemas/billing/003_billing.sql: dropped [invoices, payments]"
    );
}

#[test]
fn rollback_failure_line_carries_the_detail() {
    let report = RollbackReport {
        success: false,
        dropped_tables: Vec::new(),
        message: Some("no rollback mapping".to_string()),
    };

    let line = render_rollback_report("schemas/unknown.sql", &report);

    assert_eq!(line, "rollback failed for schemas/unknown.sql: no rollback mapping");
}

#[test]
fn audit_record_line_renders_epoch_and_empty_checksum_placeholder() {
    let line = render_audit_record(&record(AuditStatus::Failure, "", Some(vec![1, 2, 3])));

    assert!(line.starts_with("1970-01-01T00:00:00Z"));
    assert!(line.contains("failure"));
    assert!(line.contains("checksum=-"));
    assert!(line.ends_with("[sealed detail]"));
}

#[test]
fn audit_record_line_shows_the_checksum_when_present() {
    let line = render_audit_record(&record(AuditStatus::Success, "abc123", None));

    assert!(line.contains("checksum=abc123"));
    assert!(!line.contains("sealed"));
}

#[test]
fn timestamps_render_as_rfc3339_with_millis_fallback() {
    assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
    assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
}

// ============================================================================
// SECTION: Audit Read Path
// ============================================================================

#[test]
fn audit_query_reads_the_control_plane_ledger() {
    let dir = TempDir::new().expect("tempdir");
    let config_path = dir.path().join("schema-steward.toml");
    let db_path = dir.path().join("control/audit.db");
    fs::write(
        &config_path,
        format!("[control_plane]\ndb_path = \"{}\"\n", db_path.display()),
    )
    .expect("write config");
    let config = StewardConfig::load(Some(&config_path)).expect("load");
    let tenant = TenantId::new("hospital_a");

    // A fresh deployment reads as empty, not as an error.
    assert!(audit_records(&config, &tenant).expect("empty query").is_empty());

    let ledger = SqliteControlPlane::new(&config.control_plane_config()).expect("ledger");
    ledger.ensure_audit_table().expect("bootstrap");
    ledger
        .record(&AuditAttempt {
            tenant_id: tenant.clone(),
            schema_name: "hospital_a".to_string(),
            file_name: "schemas/core/001_hospital_core.sql".to_string(),
            version: SchemaVersion::new("1.0"),
            checksum: "abc123".to_string(),
            status: AuditStatus::Success,
            error_sealed: None,
        })
        .expect("record");

    let records = audit_records(&config, &tenant).expect("query");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].file_name, "schemas/core/001_hospital_core.sql");
    assert_eq!(records[0].status, AuditStatus::Success);
}
