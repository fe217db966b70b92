// crates/schema-steward-core/src/lib.rs
// ============================================================================
// Module: Schema Steward Core Library
// Description: Public API surface for the Schema Steward core.
// Purpose: Expose core types, interfaces, and the provisioning runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Schema Steward core provides per-tenant schema initialization with
//! checksum-based idempotence, policy gating, a tamper-evident audit trail,
//! and selective rollback. It is backend-agnostic and integrates with storage
//! engines through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AuditAttempt;
pub use interfaces::AuditLedger;
pub use interfaces::DbErrorCode;
pub use interfaces::ExecutorError;
pub use interfaces::LedgerError;
pub use interfaces::SchemaExecutor;
pub use interfaces::SchemaSource;
pub use interfaces::SourceError;
pub use runtime::FailureKind;
pub use runtime::FsSchemaSource;
pub use runtime::InMemoryAuditLedger;
pub use runtime::Provisioner;
pub use runtime::RetryPolicy;
pub use runtime::ScriptedExecutor;
pub use runtime::TenantLocks;
pub use runtime::classify_failure;
