// crates/schema-steward-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Schema Store
// Description: SQLite backends for the audit ledger and tenant executor.
// Purpose: Provide production persistence for Schema Steward provisioning.
// Dependencies: schema-steward-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides the `SQLite` realization of the provisioning seams:
//! - [`SqliteControlPlane`] implements the append-only audit ledger in a
//!   dedicated control-plane database file.
//! - [`SqliteTenantExecutor`] implements transactional schema application with
//!   one database file per tenant, which is the isolation boundary.
//!
//! Statement batches run under a wall-clock deadline enforced through the
//! engine's interrupt handle; an interrupted batch rolls back and surfaces as
//! a timeout.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod executor;
pub mod ledger;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use executor::SqliteTenantExecutor;
pub use executor::TenantStoreConfig;
pub use executor::TenantStoreError;
pub use ledger::ControlPlaneConfig;
pub use ledger::SqliteControlPlane;
pub use ledger::SqliteJournalMode;
pub use ledger::SqliteLedgerError;
pub use ledger::SqliteSyncMode;
