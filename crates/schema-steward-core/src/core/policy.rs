// crates/schema-steward-core/src/core/policy.rs
// ============================================================================
// Module: SQL Policy Validator
// Description: Directory whitelist and disallowed-pattern gate for schema SQL.
// Purpose: Reject dangerous paths and statement categories before execution.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The policy gate runs before any I/O against a tenant database. Path checks
//! happen before the file is read, so a descriptor outside the whitelist never
//! reaches disk. The SQL check is coarse, case-insensitive pattern matching —
//! it does not parse SQL and only rejects the specific statement categories
//! the fixed schema file set must never contain.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Component;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Disallowed statement patterns, matched case-insensitively against raw SQL.
const DISALLOWED_PATTERNS: [&str; 7] = [
    "drop schema",
    "drop database",
    "alter system",
    "load data",
    "into outfile",
    "into dumpfile",
    "union select",
];

/// Fixed audit message for policy rejections, never derived from file content.
pub const POLICY_VIOLATION_MESSAGE: &str = "schema file rejected by security policy";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy violation categories.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyViolation {
    /// The path's containing directory is not whitelisted.
    #[error("schema path is outside the whitelisted directories")]
    PathNotWhitelisted,
    /// The SQL text matches a disallowed statement pattern.
    #[error("schema sql matches a disallowed statement pattern")]
    DisallowedPattern,
}

/// Policy construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The whitelist is empty.
    #[error("policy whitelist must list at least one directory")]
    EmptyWhitelist,
    /// A whitelist entry is empty or not a relative directory.
    #[error("policy whitelist entry is invalid: {0}")]
    InvalidWhitelistEntry(String),
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// SQL policy gate: directory whitelist plus disallowed-pattern scan.
///
/// # Invariants
/// - Whitelist entries are normalized relative directory paths.
/// - Pattern matching is case-insensitive and content-order independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlPolicy {
    /// Allowed containing directories for schema files.
    allowed_dirs: Vec<String>,
}

impl SqlPolicy {
    /// Creates a policy from a directory whitelist.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the whitelist is empty or an entry is not
    /// a plain relative directory path.
    pub fn new(allowed_dirs: Vec<String>) -> Result<Self, PolicyError> {
        if allowed_dirs.is_empty() {
            return Err(PolicyError::EmptyWhitelist);
        }
        for entry in &allowed_dirs {
            if entry.is_empty() || !is_plain_relative(entry) {
                return Err(PolicyError::InvalidWhitelistEntry(entry.clone()));
            }
        }
        Ok(Self { allowed_dirs })
    }

    /// Returns the policy for the compiled-in hospital schema layout.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the compiled-in whitelist is inconsistent.
    pub fn builtin() -> Result<Self, PolicyError> {
        Self::new(vec![
            "schemas/core".to_string(),
            "schemas/billing".to_string(),
            "schemas/wards".to_string(),
        ])
    }

    /// Returns true when the path's containing directory is whitelisted.
    ///
    /// Traversal components, absolute paths, and bare file names (no
    /// containing directory) are all rejected before the whitelist lookup.
    #[must_use]
    pub fn is_path_whitelisted(&self, relative_path: &str) -> bool {
        if relative_path.is_empty() || !is_plain_relative(relative_path) {
            return false;
        }
        let Some((directory, file_name)) = relative_path.rsplit_once('/') else {
            return false;
        };
        if file_name.is_empty() {
            return false;
        }
        self.allowed_dirs.iter().any(|allowed| allowed == directory)
    }

    /// Returns true when the SQL text matches no disallowed pattern.
    #[must_use]
    pub fn is_sql_safe(sql: &str) -> bool {
        let lowered = sql.to_lowercase();
        !DISALLOWED_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
    }

    /// Checks a path against the whitelist, as a violation result.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation::PathNotWhitelisted`] for rejected paths.
    pub fn check_path(&self, relative_path: &str) -> Result<(), PolicyViolation> {
        if self.is_path_whitelisted(relative_path) {
            Ok(())
        } else {
            Err(PolicyViolation::PathNotWhitelisted)
        }
    }

    /// Checks SQL text against the disallowed patterns, as a violation result.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation::DisallowedPattern`] for rejected SQL.
    pub fn check_sql(sql: &str) -> Result<(), PolicyViolation> {
        if Self::is_sql_safe(sql) {
            Ok(())
        } else {
            Err(PolicyViolation::DisallowedPattern)
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when every component of the path is a normal name.
fn is_plain_relative(path: &str) -> bool {
    Path::new(path).components().all(|component| matches!(component, Component::Normal(_)))
}
