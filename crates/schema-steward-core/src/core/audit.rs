// crates/schema-steward-core/src/core/audit.rs
// ============================================================================
// Module: Audit and Report Model
// Description: Audit ledger rows and per-file provisioning reports.
// Purpose: Define the persisted evidence and the caller-facing result shape.
// Dependencies: crate::core::identifiers, serde, thiserror
// ============================================================================

//! ## Overview
//! One [`AuditRecord`] is appended for every apply attempt — success or
//! failure — and is never mutated afterwards. The caller of the provisioning
//! entry point consumes only [`ApplyReport`] values; a `skipped` report can
//! mean either a ledger idempotence hit or a tolerated concurrent-creation
//! race.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::SchemaVersion;
use crate::core::identifiers::TenantId;

// ============================================================================
// SECTION: Audit Status
// ============================================================================

/// Persisted outcome of one apply attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// The file's statements committed (or were already present).
    Success,
    /// The attempt was rejected or rolled back.
    Failure,
}

/// Label parsing errors for persisted audit statuses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditStatusError {
    /// The stored label is not a known status.
    #[error("unknown audit status label: {0}")]
    UnknownLabel(String),
}

impl AuditStatus {
    /// Returns the canonical persisted label.
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    /// Parses a persisted label.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStatusError`] for unknown labels.
    pub fn parse_label(label: &str) -> Result<Self, AuditStatusError> {
        match label {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            other => Err(AuditStatusError::UnknownLabel(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Audit Record
// ============================================================================

/// One append-only row of apply-attempt evidence.
///
/// # Invariants
/// - Rows are write-once; the core never updates or deletes them.
/// - `schema_name` equals the tenant identifier in this system.
/// - `checksum` is empty only when the file content was never read (path
///   rejection or unreadable source).
/// - `error_sealed` is present only when `status` is [`AuditStatus::Failure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Surrogate key assigned by the ledger.
    pub id: i64,
    /// Logical tenant identifier.
    pub tenant_id: TenantId,
    /// Database schema the statements were executed against.
    pub schema_name: String,
    /// Schema file name (registry relative path).
    pub file_name: String,
    /// Schema file version.
    pub version: SchemaVersion,
    /// Lowercase hex SHA-256 of the file bytes at attempt time.
    pub checksum: String,
    /// Attempt timestamp in unix milliseconds.
    pub applied_at: i64,
    /// Attempt outcome.
    pub status: AuditStatus,
    /// Sealed failure detail (`nonce || ciphertext+tag`), failures only.
    pub error_sealed: Option<Vec<u8>>,
}

// ============================================================================
// SECTION: Apply Report
// ============================================================================

/// Caller-facing outcome for one schema file in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    /// The file's statements executed and committed in this run.
    Success,
    /// The file was already applied, or a benign creation race was tolerated.
    Skipped,
    /// The file was rejected or its execution failed.
    Failed,
}

/// Per-file result returned by the provisioning entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Schema file name (registry relative path).
    pub file: String,
    /// Schema file version.
    pub version: SchemaVersion,
    /// Outcome classification.
    pub status: ApplyStatus,
    /// Optional human-readable detail (raw, unencrypted).
    pub message: Option<String>,
}

impl ApplyReport {
    /// Creates a report with no message.
    #[must_use]
    pub fn new(file: impl Into<String>, version: SchemaVersion, status: ApplyStatus) -> Self {
        Self {
            file: file.into(),
            version,
            status,
            message: None,
        }
    }

    /// Creates a report carrying a message.
    #[must_use]
    pub fn with_message(
        file: impl Into<String>,
        version: SchemaVersion,
        status: ApplyStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            version,
            status,
            message: Some(message.into()),
        }
    }
}

// ============================================================================
// SECTION: Rollback Report
// ============================================================================

/// Result of an explicit per-file rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackReport {
    /// True when every mapped table was dropped in one transaction.
    pub success: bool,
    /// Tables dropped, in mapping order; empty on failure.
    pub dropped_tables: Vec<String>,
    /// Optional human-readable failure detail.
    pub message: Option<String>,
}
