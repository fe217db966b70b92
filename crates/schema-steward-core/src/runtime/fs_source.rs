// crates/schema-steward-core/src/runtime/fs_source.rs
// ============================================================================
// Module: Filesystem Schema Source
// Description: Reads schema files from a rooted directory tree.
// Purpose: Provide the production SchemaSource over plain SQL files on disk.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The filesystem source joins registry-relative paths under a fixed root and
//! refuses any component that is not a plain name, so a descriptor can never
//! escape the root even before the policy whitelist runs. Reads are bounded
//! by a size limit and return exact bytes; checksums are computed over what
//! was read, not over a normalized form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::core::registry::SchemaFileDescriptor;
use crate::interfaces::SchemaSource;
use crate::interfaces::SourceError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum schema file size in bytes.
pub const DEFAULT_MAX_SCHEMA_FILE_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Source
// ============================================================================

/// Filesystem-backed schema source rooted at a project directory.
#[derive(Debug, Clone)]
pub struct FsSchemaSource {
    /// Root directory containing the whitelisted schema directories.
    root: PathBuf,
    /// Maximum accepted file size in bytes.
    max_bytes: usize,
}

impl FsSchemaSource {
    /// Creates a source with the default size limit.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_bytes: DEFAULT_MAX_SCHEMA_FILE_BYTES,
        }
    }

    /// Overrides the maximum accepted file size.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

impl SchemaSource for FsSchemaSource {
    fn read(&self, descriptor: &SchemaFileDescriptor) -> Result<Vec<u8>, SourceError> {
        let relative = Path::new(&descriptor.relative_path);
        if relative.components().any(|component| !matches!(component, Component::Normal(_))) {
            return Err(SourceError::PathEscape);
        }
        let full = self.root.join(relative);
        let bytes = fs::read(&full).map_err(|err| SourceError::Io(err.to_string()))?;
        if bytes.len() > self.max_bytes {
            return Err(SourceError::TooLarge {
                max_bytes: self.max_bytes,
                actual_bytes: bytes.len(),
            });
        }
        Ok(bytes)
    }
}
