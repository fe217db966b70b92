// crates/schema-steward-store-sqlite/src/executor.rs
// ============================================================================
// Module: SQLite Tenant Executor
// Description: Transactional schema application with one database per tenant.
// Purpose: Execute schema file batches and teardown drops in tenant isolation.
// Dependencies: schema-steward-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! Each tenant owns one `SQLite` database file under the data directory; that
//! file is the isolation boundary standing in for a per-tenant schema. A
//! schema file's statements run inside a single transaction: commit on
//! success, rollback on any failure.
//!
//! Connections are cached per tenant for the duration of an orchestration run
//! and evicted on [`SchemaExecutor::release`]. A batch runs under a
//! wall-clock deadline: a watchdog thread interrupts the engine once the
//! deadline passes, the transaction rolls back, and the error surfaces as
//! [`ExecutorError::Timeout`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use schema_steward_core::DbErrorCode;
use schema_steward_core::ExecutorError;
use schema_steward_core::SchemaExecutor;
use schema_steward_core::TenantId;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default per-batch statement deadline (ms).
const DEFAULT_STATEMENT_TIMEOUT_MS: u64 = 30_000;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Watchdog polling interval (ms).
const WATCHDOG_TICK_MS: u64 = 10;
/// Maximum tenant identifier length accepted as a storage name.
const MAX_TENANT_ID_LENGTH: usize = 64;
/// Maximum table identifier length accepted in teardown lists.
const MAX_TABLE_NAME_LENGTH: usize = 64;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for per-tenant schema storage.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantStoreConfig {
    /// Directory holding one `SQLite` database file per tenant.
    pub data_dir: PathBuf,
    /// Per-batch statement deadline in milliseconds; zero disables it.
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Returns the default statement deadline.
const fn default_statement_timeout_ms() -> u64 {
    DEFAULT_STATEMENT_TIMEOUT_MS
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tenant store construction errors.
#[derive(Debug, Error)]
pub enum TenantStoreError {
    /// Data directory could not be created.
    #[error("tenant store io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// `SQLite`-backed transactional executor with one database file per tenant.
#[derive(Clone)]
pub struct SqliteTenantExecutor {
    /// Store configuration.
    config: TenantStoreConfig,
    /// Cached per-tenant connections, evicted on release.
    connections: Arc<Mutex<BTreeMap<String, Connection>>>,
}

impl std::fmt::Debug for SqliteTenantExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTenantExecutor").field("config", &self.config).finish_non_exhaustive()
    }
}

impl SqliteTenantExecutor {
    /// Creates an executor over the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns [`TenantStoreError`] when the data directory cannot be created.
    pub fn new(config: TenantStoreConfig) -> Result<Self, TenantStoreError> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|err| TenantStoreError::Io(err.to_string()))?;
        Ok(Self {
            config,
            connections: Arc::new(Mutex::new(BTreeMap::new())),
        })
    }

    /// Takes the tenant's cached connection out of the pool, opening one on
    /// first use. The connection is handed back via [`Self::checkin`], so a
    /// long batch never blocks other tenants on the pool mutex.
    fn checkout(&self, tenant_id: &TenantId) -> Result<Connection, ExecutorError> {
        validate_tenant_id(tenant_id)?;
        let cached = {
            let mut connections =
                self.connections.lock().unwrap_or_else(PoisonError::into_inner);
            connections.remove(tenant_id.as_str())
        };
        match cached {
            Some(connection) => Ok(connection),
            None => self.open_tenant_db(tenant_id),
        }
    }

    /// Returns a connection to the pool after a call completes.
    fn checkin(&self, tenant_id: &TenantId, connection: Connection) {
        let mut connections = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
        connections.insert(tenant_id.as_str().to_string(), connection);
    }

    /// Opens the tenant's database file with durable defaults.
    fn open_tenant_db(&self, tenant_id: &TenantId) -> Result<Connection, ExecutorError> {
        let path = self.config.data_dir.join(format!("{}.db", tenant_id.as_str()));
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let connection = Connection::open_with_flags(&path, flags).map_err(map_db_error)?;
        connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(map_db_error)?;
        connection.execute_batch("PRAGMA journal_mode = wal;").map_err(map_db_error)?;
        connection
            .busy_timeout(Duration::from_millis(self.config.busy_timeout_ms))
            .map_err(map_db_error)?;
        Ok(connection)
    }

    /// Runs one statement batch in a transaction under the deadline.
    ///
    /// The watchdog is joined before this returns: a deadline that fires in
    /// the instant the batch finishes delivers its interrupt to an idle
    /// connection, never to a later batch on the same cached connection. The
    /// watchdog polls the completion flag, so a fast batch never waits out
    /// the full deadline; a zero deadline disables the watchdog entirely.
    fn run_batch(&self, connection: &mut Connection, sql: &str) -> Result<(), ExecutorError> {
        let deadline_ms = self.config.statement_timeout_ms;
        if deadline_ms == 0 {
            return execute_transaction(connection, sql);
        }
        let handle = connection.get_interrupt_handle();
        let done = AtomicBool::new(false);
        let result = thread::scope(|scope| {
            let builder = thread::Builder::new().name("schema-deadline".to_string());
            let spawned = builder.spawn_scoped(scope, || {
                let started = Instant::now();
                let deadline = Duration::from_millis(deadline_ms);
                while !done.load(Ordering::SeqCst) {
                    if started.elapsed() >= deadline {
                        handle.interrupt();
                        return;
                    }
                    thread::sleep(Duration::from_millis(WATCHDOG_TICK_MS));
                }
            });
            if let Err(err) = spawned {
                // No watchdog means no deadline enforcement; fail closed.
                return Err(ExecutorError::Io(err.to_string()));
            }
            let result = execute_transaction(connection, sql);
            done.store(true, Ordering::SeqCst);
            result
        });
        match result {
            Err(ExecutorError::Db {
                code: Some(DbErrorCode::Interrupted),
                ..
            }) => Err(ExecutorError::Timeout { deadline_ms }),
            other => other,
        }
    }
}

impl SchemaExecutor for SqliteTenantExecutor {
    fn apply(&self, tenant_id: &TenantId, sql: &str) -> Result<(), ExecutorError> {
        let mut connection = self.checkout(tenant_id)?;
        let result = self.run_batch(&mut connection, sql);
        self.checkin(tenant_id, connection);
        result
    }

    fn drop_tables(&self, tenant_id: &TenantId, tables: &[String]) -> Result<(), ExecutorError> {
        for table in tables {
            validate_table_name(table)?;
        }
        let mut connection = self.checkout(tenant_id)?;
        let result = drop_transaction(&mut connection, tables);
        self.checkin(tenant_id, connection);
        result
    }

    fn release(&self, tenant_id: &TenantId) {
        let mut connections = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
        drop(connections.remove(tenant_id.as_str()));
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Executes a batch inside one transaction: commit or full rollback.
fn execute_transaction(connection: &mut Connection, sql: &str) -> Result<(), ExecutorError> {
    let tx = connection.transaction().map_err(map_db_error)?;
    tx.execute_batch(sql).map_err(map_db_error)?;
    tx.commit().map_err(map_db_error)
}

/// Drops the listed tables in order inside one transaction.
fn drop_transaction(connection: &mut Connection, tables: &[String]) -> Result<(), ExecutorError> {
    let tx = connection.transaction().map_err(map_db_error)?;
    for table in tables {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{table}\";")).map_err(map_db_error)?;
    }
    tx.commit().map_err(map_db_error)
}

/// Validates a tenant identifier as a storage name.
fn validate_tenant_id(tenant_id: &TenantId) -> Result<(), ExecutorError> {
    let id = tenant_id.as_str();
    let valid = !id.is_empty()
        && id.len() <= MAX_TENANT_ID_LENGTH
        && id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(ExecutorError::InvalidTenant(id.to_string()))
    }
}

/// Validates a teardown table identifier.
fn validate_table_name(table: &str) -> Result<(), ExecutorError> {
    let mut chars = table.chars();
    let head_ok = chars.next().is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    let valid = head_ok
        && table.len() <= MAX_TABLE_NAME_LENGTH
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(ExecutorError::Db {
            code: None,
            message: format!("invalid table name in rollback mapping: {table}"),
        })
    }
}

/// Maps an engine error to the structured executor error.
fn map_db_error(error: rusqlite::Error) -> ExecutorError {
    let code = match &error {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::DatabaseBusy => Some(DbErrorCode::Busy),
            ErrorCode::DatabaseLocked => Some(DbErrorCode::Locked),
            ErrorCode::OperationInterrupted => Some(DbErrorCode::Interrupted),
            ErrorCode::ConstraintViolation => Some(DbErrorCode::Constraint),
            _ => None,
        },
        _ => None,
    };
    ExecutorError::Db {
        code,
        message: error.to_string(),
    }
}
