// crates/schema-steward-config/src/config.rs
// ============================================================================
// Module: Schema Steward Configuration
// Description: Configuration loading and validation for Schema Steward.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: schema-steward-core, schema-steward-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. The sealing secret is never
//! stored in the file; the config names the environment variable that carries
//! it, and resolution fails when the variable is unset or blank.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use schema_steward_core::RetryPolicy;
use schema_steward_core::SqlPolicy;
use schema_steward_store_sqlite::ControlPlaneConfig;
use schema_steward_store_sqlite::SqliteJournalMode;
use schema_steward_store_sqlite::SqliteSyncMode;
use schema_steward_store_sqlite::TenantStoreConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "schema-steward.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "SCHEMA_STEWARD_CONFIG";
/// Default environment variable carrying the sealing secret.
const DEFAULT_SEALING_SECRET_ENV: &str = "SCHEMA_STEWARD_SEALING_SECRET";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of whitelisted schema directories.
pub(crate) const MAX_ALLOWED_DIRS: usize = 64;
/// Maximum accepted schema file size limit in bytes.
pub(crate) const MAX_SCHEMA_FILE_BYTES: usize = 10 * 1024 * 1024;
/// Maximum retry attempts accepted by validation.
pub(crate) const MAX_RETRY_ATTEMPTS: u32 = 10;
/// Maximum retry backoff step in milliseconds.
pub(crate) const MAX_RETRY_BACKOFF_MS: u64 = 60_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Schema Steward deployment configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StewardConfig {
    /// Control-plane database configuration.
    #[serde(default)]
    pub control_plane: ControlPlaneSection,
    /// Per-tenant storage configuration.
    #[serde(default)]
    pub tenants: TenantSection,
    /// Schema file source configuration.
    #[serde(default)]
    pub source: SourceSection,
    /// Transient-failure retry configuration.
    #[serde(default)]
    pub retry: RetrySection,
    /// Error sealing configuration.
    #[serde(default)]
    pub sealing: SealingSection,
}

impl Default for StewardConfig {
    fn default() -> Self {
        Self {
            control_plane: ControlPlaneSection::default(),
            tenants: TenantSection::default(),
            source: SourceSection::default(),
            retry: RetrySection::default(),
            sealing: SealingSection::default(),
        }
    }
}

impl StewardConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.control_plane.validate()?;
        self.tenants.validate()?;
        self.source.validate()?;
        self.retry.validate()?;
        self.sealing.validate()?;
        Ok(())
    }

    /// Builds the control-plane store configuration.
    #[must_use]
    pub fn control_plane_config(&self) -> ControlPlaneConfig {
        ControlPlaneConfig {
            path: self.control_plane.db_path.clone(),
            busy_timeout_ms: self.control_plane.busy_timeout_ms,
            journal_mode: self.control_plane.journal_mode,
            sync_mode: self.control_plane.sync_mode,
        }
    }

    /// Builds the per-tenant store configuration.
    #[must_use]
    pub fn tenant_store_config(&self) -> TenantStoreConfig {
        TenantStoreConfig {
            data_dir: self.tenants.data_dir.clone(),
            statement_timeout_ms: self.tenants.statement_timeout_ms,
            busy_timeout_ms: self.tenants.busy_timeout_ms,
        }
    }

    /// Builds the runtime retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            backoff_ms: self.retry.backoff_ms,
        }
    }

    /// Builds the SQL policy from the configured whitelist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a whitelist entry is invalid.
    pub fn sql_policy(&self) -> Result<SqlPolicy, ConfigError> {
        SqlPolicy::new(self.source.allowed_dirs.clone())
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Resolves the sealing secret from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the variable is unset or blank.
    pub fn resolve_sealing_secret(&self) -> Result<String, ConfigError> {
        let secret = env::var(&self.sealing.secret_env).map_err(|_| {
            ConfigError::MissingSecret(self.sealing.secret_env.clone())
        })?;
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret(self.sealing.secret_env.clone()));
        }
        Ok(secret)
    }
}

/// Control-plane database section.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlPlaneSection {
    /// Path to the control-plane `SQLite` database file.
    #[serde(default = "default_control_plane_db_path")]
    pub db_path: PathBuf,
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

impl Default for ControlPlaneSection {
    fn default() -> Self {
        Self {
            db_path: default_control_plane_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl ControlPlaneSection {
    /// Validates the control-plane section.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_field("control_plane.db_path", &self.db_path)?;
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "control_plane.busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-tenant storage section.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantSection {
    /// Directory holding one database file per tenant.
    #[serde(default = "default_tenant_data_dir")]
    pub data_dir: PathBuf,
    /// Per-batch statement deadline in milliseconds; zero disables it.
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for TenantSection {
    fn default() -> Self {
        Self {
            data_dir: default_tenant_data_dir(),
            statement_timeout_ms: default_statement_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl TenantSection {
    /// Validates the tenant storage section.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_field("tenants.data_dir", &self.data_dir)?;
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "tenants.busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Schema file source section.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    /// Root directory containing the whitelisted schema directories.
    #[serde(default = "default_schema_root")]
    pub schema_root: PathBuf,
    /// Whitelisted schema directories, relative to the root.
    #[serde(default = "default_allowed_dirs")]
    pub allowed_dirs: Vec<String>,
    /// Maximum accepted schema file size in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            schema_root: default_schema_root(),
            allowed_dirs: default_allowed_dirs(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

impl SourceSection {
    /// Validates the schema source section.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_field("source.schema_root", &self.schema_root)?;
        if self.allowed_dirs.is_empty() {
            return Err(ConfigError::Invalid(
                "source.allowed_dirs must list at least one directory".to_string(),
            ));
        }
        if self.allowed_dirs.len() > MAX_ALLOWED_DIRS {
            return Err(ConfigError::Invalid("source.allowed_dirs too many entries".to_string()));
        }
        // Whitelist entry shape is enforced by the policy constructor.
        SqlPolicy::new(self.allowed_dirs.clone())
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if self.max_file_bytes == 0 || self.max_file_bytes > MAX_SCHEMA_FILE_BYTES {
            return Err(ConfigError::Invalid("source.max_file_bytes out of range".to_string()));
        }
        Ok(())
    }
}

/// Transient-failure retry section.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetrySection {
    /// Maximum apply attempts per schema file.
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,
    /// Linear backoff step in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl RetrySection {
    /// Validates the retry section.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::Invalid("retry.max_attempts out of range".to_string()));
        }
        if self.backoff_ms > MAX_RETRY_BACKOFF_MS {
            return Err(ConfigError::Invalid("retry.backoff_ms out of range".to_string()));
        }
        Ok(())
    }
}

/// Error sealing section.
#[derive(Debug, Clone, Deserialize)]
pub struct SealingSection {
    /// Environment variable carrying the sealing secret.
    #[serde(default = "default_sealing_secret_env")]
    pub secret_env: String,
}

impl Default for SealingSection {
    fn default() -> Self {
        Self {
            secret_env: default_sealing_secret_env(),
        }
    }
}

impl SealingSection {
    /// Validates the sealing section.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_env.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "sealing.secret_env must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone)]
pub enum ConfigError {
    /// Config I/O error.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// The sealing secret environment variable is unset or blank.
    #[error("sealing secret environment variable not set: {0}")]
    MissingSecret(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path field against length constraints.
fn validate_path_field(field: &str, value: &Path) -> Result<(), ConfigError> {
    let text = value.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in value.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default control-plane database path.
fn default_control_plane_db_path() -> PathBuf {
    PathBuf::from("data/control/audit.db")
}

/// Default per-tenant data directory.
fn default_tenant_data_dir() -> PathBuf {
    PathBuf::from("data/tenants")
}

/// Default schema root directory.
fn default_schema_root() -> PathBuf {
    PathBuf::from(".")
}

/// Default whitelisted schema directories.
fn default_allowed_dirs() -> Vec<String> {
    vec![
        "schemas/core".to_string(),
        "schemas/billing".to_string(),
        "schemas/wards".to_string(),
    ]
}

/// Default maximum schema file size.
const fn default_max_file_bytes() -> usize {
    1024 * 1024
}

/// Default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Default per-batch statement deadline.
const fn default_statement_timeout_ms() -> u64 {
    30_000
}

/// Default maximum apply attempts per schema file.
const fn default_retry_max_attempts() -> u32 {
    3
}

/// Default linear backoff step.
const fn default_retry_backoff_ms() -> u64 {
    50
}

/// Default sealing secret environment variable name.
fn default_sealing_secret_env() -> String {
    DEFAULT_SEALING_SECRET_ENV.to_string()
}
