// crates/schema-steward-core/src/runtime/mod.rs
// ============================================================================
// Module: Schema Steward Runtime
// Description: Provisioning orchestration, classification, and test doubles.
// Purpose: Drive the per-tenant apply/rollback flow over the interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime wires the registry, policy, ledger, executor, and source into
//! the two orchestration entry points. Failure classification and the
//! per-tenant single-flight guard live here so they can be unit-tested in
//! isolation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod classify;
pub mod fs_source;
pub mod lock;
pub mod memory;
pub mod provisioner;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use classify::FailureKind;
pub use classify::RetryPolicy;
pub use classify::classify_failure;
pub use fs_source::FsSchemaSource;
pub use lock::TenantGuard;
pub use lock::TenantLocks;
pub use memory::InMemoryAuditLedger;
pub use memory::ScriptedExecutor;
pub use provisioner::Provisioner;
