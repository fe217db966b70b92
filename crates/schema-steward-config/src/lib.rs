// crates/schema-steward-config/src/lib.rs
// ============================================================================
// Module: Schema Steward Configuration
// Description: Configuration model for the provisioning engine.
// Purpose: Provide strict, fail-closed config parsing for deployments.
// Dependencies: schema-steward-core, schema-steward-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! This crate defines the deployment configuration for Schema Steward: the
//! control-plane database, the per-tenant data directory, the schema file
//! source, retry policy, and the sealing secret indirection. Configuration is
//! loaded from a TOML file with strict size and path limits, and invalid
//! configuration fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::ControlPlaneSection;
pub use config::RetrySection;
pub use config::SealingSection;
pub use config::SourceSection;
pub use config::StewardConfig;
pub use config::TenantSection;
