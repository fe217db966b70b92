// crates/schema-steward-cli/src/main.rs
// ============================================================================
// Module: Schema Steward CLI Entry Point
// Description: Command dispatcher for tenant schema provisioning workflows.
// Purpose: Provide an operator-facing CLI for init, rollback, and audit tasks.
// Dependencies: clap, schema-steward-config, schema-steward-core,
//               schema-steward-store-sqlite, serde_json, thiserror, time.
// ============================================================================

//! ## Overview
//! The Schema Steward CLI wires the provisioning runtime to the `SQLite`
//! storage engine and the deployment configuration file. It exposes three
//! workflows: `init` applies the full schema file sequence to one tenant,
//! `rollback` drops the tables mapped to a single schema file, and `audit`
//! lists the tenant's append-only attempt history. Inputs are untrusted and
//! validated before any database is touched.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use schema_steward_config::StewardConfig;
use schema_steward_core::ApplyReport;
use schema_steward_core::ApplyStatus;
use schema_steward_core::AuditLedger;
use schema_steward_core::AuditRecord;
use schema_steward_core::ErrorCipher;
use schema_steward_core::FsSchemaSource;
use schema_steward_core::Provisioner;
use schema_steward_core::RollbackReport;
use schema_steward_core::TenantId;
use schema_steward_core::builtin_registry;
use schema_steward_store_sqlite::SqliteControlPlane;
use schema_steward_store_sqlite::SqliteTenantExecutor;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "schema-steward", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize or migrate a tenant's schema.
    Init(InitCommand),
    /// Roll back the tables created by one schema file.
    Rollback(RollbackCommand),
    /// List the audit trail for a tenant.
    Audit(AuditCommand),
}

/// Configuration for the `init` command.
#[derive(Args, Debug)]
struct InitCommand {
    /// Tenant identifier to provision.
    #[arg(long, value_name = "TENANT")]
    tenant: String,
    /// Optional config file path (defaults to schema-steward.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Emit the per-file reports as JSON instead of text.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

/// Configuration for the `rollback` command.
#[derive(Args, Debug)]
struct RollbackCommand {
    /// Tenant identifier to roll back.
    #[arg(long, value_name = "TENANT")]
    tenant: String,
    /// Schema file name (registry relative path) whose tables are dropped.
    #[arg(long, value_name = "FILE")]
    file: String,
    /// Optional config file path (defaults to schema-steward.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Emit the rollback report as JSON instead of text.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

/// Configuration for the `audit` command.
#[derive(Args, Debug)]
struct AuditCommand {
    /// Tenant identifier to inspect.
    #[arg(long, value_name = "TENANT")]
    tenant: String,
    /// Optional config file path (defaults to schema-steward.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Emit the audit records as JSON instead of text.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for operator-facing error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("schema-steward {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Init(command) => command_init(&command),
        Commands::Rollback(command) => command_rollback(&command),
        Commands::Audit(command) => command_audit(&command),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Runtime Assembly
// ============================================================================

/// Loads configuration from the explicit path or the default resolution rules.
fn load_config(path: Option<&PathBuf>) -> CliResult<StewardConfig> {
    StewardConfig::load(path.map(PathBuf::as_path))
        .map_err(|err| CliError::new(format!("configuration error: {err}")))
}

/// Builds the provisioning runtime from loaded configuration.
fn build_provisioner(
    config: &StewardConfig,
) -> CliResult<Provisioner<SqliteControlPlane, SqliteTenantExecutor, FsSchemaSource>> {
    let (registry, rollback) = builtin_registry()
        .map_err(|err| CliError::new(format!("registry error: {err}")))?;
    let policy = config
        .sql_policy()
        .map_err(|err| CliError::new(format!("configuration error: {err}")))?;
    let control_plane = SqliteControlPlane::new(&config.control_plane_config())
        .map_err(|err| CliError::new(format!("control plane error: {err}")))?;
    let executor = SqliteTenantExecutor::new(config.tenant_store_config())
        .map_err(|err| CliError::new(format!("tenant store error: {err}")))?;
    let source = FsSchemaSource::new(config.source.schema_root.clone())
        .with_max_bytes(config.source.max_file_bytes);
    let secret = config
        .resolve_sealing_secret()
        .map_err(|err| CliError::new(format!("configuration error: {err}")))?;
    let cipher = ErrorCipher::from_secret(&secret)
        .map_err(|err| CliError::new(format!("sealing error: {err}")))?;
    Ok(Provisioner::new(
        registry,
        rollback,
        policy,
        control_plane,
        executor,
        source,
        cipher,
        config.retry_policy(),
    ))
}

/// Reads one tenant's audit trail from the control plane.
///
/// Only the ledger is opened: the audit read path does not need the tenant
/// store or the sealing secret.
fn audit_records(config: &StewardConfig, tenant: &TenantId) -> CliResult<Vec<AuditRecord>> {
    let control_plane = SqliteControlPlane::new(&config.control_plane_config())
        .map_err(|err| CliError::new(format!("control plane error: {err}")))?;
    control_plane
        .ensure_audit_table()
        .map_err(|err| CliError::new(format!("control plane error: {err}")))?;
    control_plane
        .records_for_tenant(tenant)
        .map_err(|err| CliError::new(format!("audit query error: {err}")))
}

// ============================================================================
// SECTION: Init Command
// ============================================================================

/// Applies the full schema file sequence to one tenant.
fn command_init(command: &InitCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_ref())?;
    let provisioner = build_provisioner(&config)?;
    let tenant = TenantId::new(command.tenant.clone());

    let reports = provisioner.run_schema_initialization(&tenant);

    if command.json {
        write_json(&reports)?;
    } else {
        for report in &reports {
            write_stdout_line(&render_apply_report(report))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }

    let failed = reports.iter().any(|report| report.status == ApplyStatus::Failed);
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

// ============================================================================
// SECTION: Rollback Command
// ============================================================================

/// Drops the tables mapped to one schema file for one tenant.
fn command_rollback(command: &RollbackCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_ref())?;
    let provisioner = build_provisioner(&config)?;
    let tenant = TenantId::new(command.tenant.clone());

    let report = provisioner.rollback_schema_file(&tenant, &command.file);

    if command.json {
        write_json(&report)?;
    } else {
        write_stdout_line(&render_rollback_report(&command.file, &report))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }

    Ok(if report.success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

// ============================================================================
// SECTION: Audit Command
// ============================================================================

/// Lists the append-only audit trail for one tenant.
fn command_audit(command: &AuditCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_ref())?;
    let tenant = TenantId::new(command.tenant.clone());

    let records = audit_records(&config, &tenant)?;

    if command.json {
        write_json(&records)?;
    } else {
        for record in &records {
            write_stdout_line(&render_audit_record(record))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Formats one apply report as a single text line.
fn render_apply_report(report: &ApplyReport) -> String {
    let status = apply_status_label(report.status);
    match &report.message {
        Some(message) => format!("{status:<8} {} @{} ({message})", report.file, report.version),
        None => format!("{status:<8} {} @{}", report.file, report.version),
    }
}

/// Formats a rollback report as a single text line.
fn render_rollback_report(file: &str, report: &RollbackReport) -> String {
    if report.success {
        format!("rolled back {file}: dropped [{}]", report.dropped_tables.join(", "))
    } else {
        let detail = report.message.as_deref().unwrap_or("unknown failure");
        format!("rollback failed for {file}: {detail}")
    }
}

/// Formats one audit record as a single text line.
fn render_audit_record(record: &AuditRecord) -> String {
    let checksum = if record.checksum.is_empty() { "-" } else { record.checksum.as_str() };
    let sealed = if record.error_sealed.is_some() { " [sealed detail]" } else { "" };
    format!(
        "{} {:<7} {} @{} checksum={checksum}{sealed}",
        format_timestamp(record.applied_at),
        record.status.as_label(),
        record.file_name,
        record.version,
    )
}

/// Returns the stable text label for an apply status.
const fn apply_status_label(status: ApplyStatus) -> &'static str {
    match status {
        ApplyStatus::Success => "applied",
        ApplyStatus::Skipped => "skipped",
        ApplyStatus::Failed => "failed",
    }
}

/// Renders a unix-millisecond timestamp as RFC 3339, falling back to raw millis.
fn format_timestamp(unix_millis: i64) -> String {
    let nanos = i128::from(unix_millis) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|stamp| stamp.format(&Rfc3339).ok())
        .unwrap_or_else(|| unix_millis.to_string())
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a serializable value to stdout as pretty-printed JSON.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("serialization error: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message for a given stream.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
