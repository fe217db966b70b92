// crates/schema-steward-core/src/interfaces/mod.rs
// ============================================================================
// Module: Schema Steward Interfaces
// Description: Backend-agnostic interfaces for ledger, executor, and source.
// Purpose: Define the contract surfaces used by the provisioning runtime.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the provisioning runtime integrates with a database
//! engine and a schema file source without embedding backend-specific
//! details. Implementations must fail closed: an error from any seam is
//! surfaced as a failed per-file report, never swallowed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::audit::AuditStatus;
use crate::core::identifiers::SchemaVersion;
use crate::core::identifiers::TenantId;
use crate::core::registry::SchemaFileDescriptor;

// ============================================================================
// SECTION: Audit Ledger
// ============================================================================

/// Ledger-side view of one apply attempt, before the row id and timestamp
/// are assigned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditAttempt {
    /// Logical tenant identifier.
    pub tenant_id: TenantId,
    /// Database schema the statements were executed against.
    pub schema_name: String,
    /// Schema file name (registry relative path).
    pub file_name: String,
    /// Schema file version.
    pub version: SchemaVersion,
    /// Lowercase hex SHA-256 of the file bytes; empty when never read.
    pub checksum: String,
    /// Attempt outcome.
    pub status: AuditStatus,
    /// Sealed failure detail, failures only.
    pub error_sealed: Option<Vec<u8>>,
}

/// Audit ledger errors.
#[derive(Debug, Error, Clone)]
pub enum LedgerError {
    /// Control-plane database error.
    #[error("audit ledger db error: {0}")]
    Db(String),
    /// Control-plane I/O error.
    #[error("audit ledger io error: {0}")]
    Io(String),
    /// Stored ledger data is invalid.
    #[error("audit ledger invalid data: {0}")]
    Invalid(String),
}

/// Append-only audit ledger providing idempotence and traceability.
pub trait AuditLedger {
    /// Idempotently creates the audit table in the control-plane schema.
    ///
    /// Safe to call concurrently from multiple orchestration runs; the
    /// implementation relies on create-if-not-exists DDL.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the control plane is unreachable.
    fn ensure_audit_table(&self) -> Result<(), LedgerError>;

    /// Returns true iff a success row exists for this exact tuple.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the lookup fails.
    fn has_succeeded(
        &self,
        tenant_id: &TenantId,
        file_name: &str,
        version: &SchemaVersion,
        checksum: &str,
    ) -> Result<bool, LedgerError>;

    /// Appends one attempt row. Never updates or deletes existing rows.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the insert fails.
    fn record(&self, attempt: &AuditAttempt) -> Result<(), LedgerError>;
}

// ============================================================================
// SECTION: Schema Executor
// ============================================================================

/// Structured database error classification hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbErrorCode {
    /// The database is busy (retryable).
    Busy,
    /// A table or database handle is locked (retryable).
    Locked,
    /// The statement was interrupted.
    Interrupted,
    /// A constraint was violated.
    Constraint,
}

/// Schema executor errors.
#[derive(Debug, Error, Clone)]
pub enum ExecutorError {
    /// Database error with an optional structured code.
    #[error("schema execution db error: {message}")]
    Db {
        /// Structured error code when the engine exposes one.
        code: Option<DbErrorCode>,
        /// Raw error message.
        message: String,
    },
    /// Tenant storage I/O error.
    #[error("schema execution io error: {0}")]
    Io(String),
    /// The tenant identifier is not usable as a storage name.
    #[error("invalid tenant identifier: {0}")]
    InvalidTenant(String),
    /// The statement batch exceeded its deadline and was rolled back.
    #[error("schema execution exceeded {deadline_ms} ms deadline")]
    Timeout {
        /// Configured deadline in milliseconds.
        deadline_ms: u64,
    },
}

/// Transactional executor for one tenant's isolated schema.
///
/// Implementations hold one connection per tenant for the duration of a run;
/// the runtime calls [`SchemaExecutor::release`] once all files have been
/// attempted.
pub trait SchemaExecutor {
    /// Executes one schema file's SQL inside a transaction scoped to the
    /// tenant's schema. Commits on success, rolls back on failure.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] when execution fails; the raw error detail
    /// is classified by the runtime, not by the executor.
    fn apply(&self, tenant_id: &TenantId, sql: &str) -> Result<(), ExecutorError>;

    /// Drops the listed tables in order inside one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] when any drop fails; nothing is dropped in
    /// that case.
    fn drop_tables(&self, tenant_id: &TenantId, tables: &[String]) -> Result<(), ExecutorError>;

    /// Returns the tenant's connection to the pool after a run completes.
    fn release(&self, tenant_id: &TenantId);
}

// ============================================================================
// SECTION: Schema Source
// ============================================================================

/// Schema source errors.
#[derive(Debug, Error, Clone)]
pub enum SourceError {
    /// File read failed.
    #[error("schema source io error: {0}")]
    Io(String),
    /// The file exceeds the configured size limit.
    #[error("schema file too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual file size in bytes.
        actual_bytes: usize,
    },
    /// The file is not valid UTF-8.
    #[error("schema file is not valid utf-8")]
    InvalidUtf8,
    /// The descriptor path escapes the source root.
    #[error("schema path escapes the source root")]
    PathEscape,
}

/// Filesystem-like source of versioned SQL text.
pub trait SchemaSource {
    /// Reads the raw bytes of one schema file.
    ///
    /// Callers checksum these exact bytes; implementations must not
    /// normalize line endings or encoding.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the file cannot be read.
    fn read(&self, descriptor: &SchemaFileDescriptor) -> Result<Vec<u8>, SourceError>;
}
