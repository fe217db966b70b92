// crates/schema-steward-core/src/core/registry.rs
// ============================================================================
// Module: Schema File Registry
// Description: Fixed ordered list of schema files and their rollback mapping.
// Purpose: Supply the per-tenant application order and teardown capability.
// Dependencies: crate::core::identifiers, serde, thiserror
// ============================================================================

//! ## Overview
//! The registry is immutable configuration injected at provisioner
//! construction time: the same ordered file list applies to every tenant.
//! The rollback mapping is a hand-maintained inverse of what each schema file
//! creates; it is cross-validated against the registry at construction so a
//! mapping entry can never reference an unknown file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::SchemaVersion;

// ============================================================================
// SECTION: Descriptor
// ============================================================================

/// One unit of schema to apply for a tenant.
///
/// # Invariants
/// - `relative_path` is relative to the schema root and doubles as the file
///   name key in audit records and the rollback mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFileDescriptor {
    /// Path relative to the schema root.
    pub relative_path: String,
    /// Version label for this unit of work.
    pub version: SchemaVersion,
}

impl SchemaFileDescriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(relative_path: impl Into<String>, version: impl Into<SchemaVersion>) -> Self {
        Self {
            relative_path: relative_path.into(),
            version: version.into(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry and rollback mapping construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A descriptor carries an empty relative path.
    #[error("registry descriptor has an empty relative path")]
    EmptyPath,
    /// The same (path, version) pair appears twice.
    #[error("duplicate registry entry: {0}")]
    Duplicate(String),
    /// A rollback mapping key does not name a registry descriptor.
    #[error("rollback mapping references unknown schema file: {0}")]
    UnknownRollbackFile(String),
    /// A rollback mapping entry lists no tables.
    #[error("rollback mapping entry has no tables: {0}")]
    EmptyTableList(String),
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Fixed, ordered list of schema files to apply per tenant.
///
/// # Invariants
/// - Order is application order and never changes at runtime.
/// - `(relative_path, version)` pairs are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFileRegistry {
    /// Ordered descriptors.
    files: Vec<SchemaFileDescriptor>,
}

impl SchemaFileRegistry {
    /// Creates a registry from an ordered descriptor list.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] on empty paths or duplicate entries.
    pub fn new(files: Vec<SchemaFileDescriptor>) -> Result<Self, RegistryError> {
        let mut seen = BTreeSet::new();
        for descriptor in &files {
            if descriptor.relative_path.is_empty() {
                return Err(RegistryError::EmptyPath);
            }
            let key = format!("{}@{}", descriptor.relative_path, descriptor.version);
            if !seen.insert(key.clone()) {
                return Err(RegistryError::Duplicate(key));
            }
        }
        Ok(Self { files })
    }

    /// Returns the ordered descriptor list.
    #[must_use]
    pub fn files(&self) -> &[SchemaFileDescriptor] {
        &self.files
    }

    /// Returns true when some descriptor uses the given relative path.
    #[must_use]
    pub fn contains_file(&self, relative_path: &str) -> bool {
        self.files.iter().any(|descriptor| descriptor.relative_path == relative_path)
    }
}

// ============================================================================
// SECTION: Rollback Mapping
// ============================================================================

/// Hand-maintained mapping from schema file to the tables it creates.
///
/// # Invariants
/// - Every key names a descriptor present in the registry it was built with.
/// - Table lists preserve declaration order; teardown drops in that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackMapping {
    /// File name to ordered table list.
    tables: BTreeMap<String, Vec<String>>,
}

impl RollbackMapping {
    /// Creates a mapping validated against the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when a key names an unknown file or an entry
    /// lists no tables.
    pub fn new(
        entries: Vec<(String, Vec<String>)>,
        registry: &SchemaFileRegistry,
    ) -> Result<Self, RegistryError> {
        let mut tables = BTreeMap::new();
        for (file_name, table_list) in entries {
            if !registry.contains_file(&file_name) {
                return Err(RegistryError::UnknownRollbackFile(file_name));
            }
            if table_list.is_empty() {
                return Err(RegistryError::EmptyTableList(file_name));
            }
            tables.insert(file_name, table_list);
        }
        Ok(Self { tables })
    }

    /// Returns the ordered table list for a schema file, if mapped.
    #[must_use]
    pub fn tables_for(&self, file_name: &str) -> Option<&[String]> {
        self.tables.get(file_name).map(Vec::as_slice)
    }
}

// ============================================================================
// SECTION: Builtin Registry
// ============================================================================

/// Returns the compiled-in hospital schema registry and rollback mapping.
///
/// The file order matters: later files reference tables created by earlier
/// ones (billing and bed management both key against patients).
///
/// # Errors
///
/// Returns [`RegistryError`] when the compiled-in tables are inconsistent.
pub fn builtin_registry() -> Result<(SchemaFileRegistry, RollbackMapping), RegistryError> {
    let registry = SchemaFileRegistry::new(vec![
        SchemaFileDescriptor::new("schemas/core/001_hospital_core.sql", "1.0"),
        SchemaFileDescriptor::new("schemas/core/002_staff_records.sql", "1.0"),
        SchemaFileDescriptor::new("schemas/billing/003_billing.sql", "1.0"),
        SchemaFileDescriptor::new("schemas/wards/004_bed_management.sql", "1.0"),
    ])?;
    let mapping = RollbackMapping::new(
        vec![
            (
                "schemas/core/001_hospital_core.sql".to_string(),
                vec!["appointments".to_string(), "patients".to_string()],
            ),
            (
                "schemas/core/002_staff_records.sql".to_string(),
                vec!["staff_assignments".to_string(), "staff".to_string()],
            ),
            (
                "schemas/billing/003_billing.sql".to_string(),
                vec![
                    "payments".to_string(),
                    "invoice_lines".to_string(),
                    "invoices".to_string(),
                ],
            ),
            (
                "schemas/wards/004_bed_management.sql".to_string(),
                vec!["bed_allocations".to_string(), "beds".to_string(), "wards".to_string()],
            ),
        ],
        &registry,
    )?;
    Ok((registry, mapping))
}
