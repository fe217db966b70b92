// crates/schema-steward-store-sqlite/src/ledger.rs
// ============================================================================
// Module: SQLite Control Plane Ledger
// Description: Append-only schema_audit ledger in the control-plane database.
// Purpose: Persist apply-attempt evidence and answer idempotence lookups.
// Dependencies: schema-steward-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements the audit ledger over a dedicated control-plane
//! `SQLite` database. Rows are insert-only; nothing in this module updates or
//! deletes `schema_audit` rows. Table bootstrap uses create-if-not-exists DDL
//! so concurrent orchestration runs can race it safely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::params;
use schema_steward_core::AuditAttempt;
use schema_steward_core::AuditLedger;
use schema_steward_core::AuditRecord;
use schema_steward_core::AuditStatus;
use schema_steward_core::LedgerError;
use schema_steward_core::SchemaVersion;
use schema_steward_core::TenantId;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Audit table DDL, safe to run concurrently.
const AUDIT_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS schema_audit (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id TEXT NOT NULL,
    schema_name TEXT NOT NULL,
    file_name TEXT NOT NULL,
    version TEXT NOT NULL,
    checksum TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    status TEXT NOT NULL,
    error_sealed BLOB
);
CREATE INDEX IF NOT EXISTS idx_schema_audit_tenant_file
    ON schema_audit (tenant_id, file_name);";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the control-plane ledger database.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlPlaneConfig {
    /// Path to the control-plane `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` ledger errors.
#[derive(Debug, Error)]
pub enum SqliteLedgerError {
    /// Ledger I/O error.
    #[error("sqlite ledger io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite ledger db error: {0}")]
    Db(String),
    /// Stored ledger data is invalid.
    #[error("sqlite ledger invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteLedgerError> for LedgerError {
    fn from(error: SqliteLedgerError) -> Self {
        match error {
            SqliteLedgerError::Io(message) => Self::Io(message),
            SqliteLedgerError::Db(message) => Self::Db(message),
            SqliteLedgerError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Control Plane
// ============================================================================

/// `SQLite`-backed control-plane audit ledger.
#[derive(Clone)]
pub struct SqliteControlPlane {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteControlPlane").finish_non_exhaustive()
    }
}

impl SqliteControlPlane {
    /// Opens the control-plane database.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError`] when the database cannot be opened.
    pub fn new(config: &ControlPlaneConfig) -> Result<Self, SqliteLedgerError> {
        validate_db_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let connection = open_connection(config)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns every audit row for one tenant, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError`] when the query fails or a stored row is
    /// invalid.
    pub fn records_for_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<AuditRecord>, SqliteLedgerError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteLedgerError::Db("mutex poisoned".to_string()))?;
        let mut statement = guard
            .prepare(
                "SELECT id, tenant_id, schema_name, file_name, version, checksum, applied_at, \
                 status, error_sealed FROM schema_audit WHERE tenant_id = ?1 ORDER BY id ASC",
            )
            .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params![tenant_id.as_str()], |row| {
                let status_label: String = row.get(7)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                    status_label,
                    row.get::<_, Option<Vec<u8>>>(8)?,
                ))
            })
            .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
        let mut records = Vec::new();
        for row in rows {
            let (id, tenant, schema_name, file_name, version, checksum, applied_at, label, sealed) =
                row.map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
            let status = AuditStatus::parse_label(&label)
                .map_err(|err| SqliteLedgerError::Invalid(err.to_string()))?;
            records.push(AuditRecord {
                id,
                tenant_id: TenantId::new(tenant),
                schema_name,
                file_name,
                version: SchemaVersion::new(version),
                checksum,
                applied_at,
                status,
                error_sealed: sealed,
            });
        }
        Ok(records)
    }
}

impl AuditLedger for SqliteControlPlane {
    fn ensure_audit_table(&self) -> Result<(), LedgerError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| LedgerError::Db("mutex poisoned".to_string()))?;
        guard
            .execute_batch(AUDIT_TABLE_DDL)
            .map_err(|err| LedgerError::Db(err.to_string()))?;
        drop(guard);
        Ok(())
    }

    fn has_succeeded(
        &self,
        tenant_id: &TenantId,
        file_name: &str,
        version: &SchemaVersion,
        checksum: &str,
    ) -> Result<bool, LedgerError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| LedgerError::Db("mutex poisoned".to_string()))?;
        let exists: bool = guard
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM schema_audit WHERE tenant_id = ?1 AND file_name = \
                 ?2 AND version = ?3 AND checksum = ?4 AND status = 'success')",
                params![tenant_id.as_str(), file_name, version.as_str(), checksum],
                |row| row.get(0),
            )
            .map_err(|err| LedgerError::Db(err.to_string()))?;
        drop(guard);
        Ok(exists)
    }

    fn record(&self, attempt: &AuditAttempt) -> Result<(), LedgerError> {
        let applied_at = unix_millis();
        let guard = self
            .connection
            .lock()
            .map_err(|_| LedgerError::Db("mutex poisoned".to_string()))?;
        guard
            .execute(
                "INSERT INTO schema_audit (tenant_id, schema_name, file_name, version, checksum, \
                 applied_at, status, error_sealed) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    attempt.tenant_id.as_str(),
                    attempt.schema_name,
                    attempt.file_name,
                    attempt.version.as_str(),
                    attempt.checksum,
                    applied_at,
                    attempt.status.as_label(),
                    attempt.error_sealed
                ],
            )
            .map_err(|err| LedgerError::Db(err.to_string()))?;
        drop(guard);
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the database exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteLedgerError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteLedgerError::Io("database path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteLedgerError::Io(err.to_string()))
}

/// Validates database paths for safety limits.
fn validate_db_path(path: &Path) -> Result<(), SqliteLedgerError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteLedgerError::Invalid("database path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteLedgerError::Invalid(
                "database path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteLedgerError::Invalid(
            "database path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &ControlPlaneConfig) -> Result<Connection, SqliteLedgerError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
    Ok(connection)
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
