// crates/schema-steward-core/src/core/mod.rs
// ============================================================================
// Module: Schema Steward Core Types
// Description: Value types for tenants, schema files, audit records, policy.
// Purpose: Group the core data model behind one module path.
// Dependencies: crate::core submodules
// ============================================================================

//! ## Overview
//! Core value types for the provisioning engine: identifiers, the schema file
//! registry and rollback mapping, the SQL policy gate, content hashing, error
//! sealing, and the audit/report model.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod hashing;
pub mod identifiers;
pub mod policy;
pub mod registry;
pub mod sealing;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::ApplyReport;
pub use audit::ApplyStatus;
pub use audit::AuditRecord;
pub use audit::AuditStatus;
pub use audit::AuditStatusError;
pub use audit::RollbackReport;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::hash_bytes;
pub use identifiers::SchemaVersion;
pub use identifiers::TenantId;
pub use policy::POLICY_VIOLATION_MESSAGE;
pub use policy::PolicyError;
pub use policy::PolicyViolation;
pub use policy::SqlPolicy;
pub use registry::RegistryError;
pub use registry::RollbackMapping;
pub use registry::SchemaFileDescriptor;
pub use registry::SchemaFileRegistry;
pub use registry::builtin_registry;
pub use sealing::ErrorCipher;
pub use sealing::SealError;
