// crates/schema-steward-core/src/runtime/classify.rs
// ============================================================================
// Module: Failure Classification
// Description: Maps executor errors to benign, transient, or fatal outcomes.
// Purpose: Centralize the fragile error-text coupling behind one function.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! Classification prefers structured error codes when the engine exposes one
//! and falls back to message substrings only as a last resort. Keeping the
//! whole mapping in one function lets it be unit-tested against a table of
//! known codes and strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::interfaces::DbErrorCode;
use crate::interfaces::ExecutorError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message substrings indicating a benign concurrent-creation race.
const BENIGN_RACE_PATTERNS: [&str; 2] = ["already exists", "duplicate column name"];

/// Message substrings indicating a retryable contention failure.
const TRANSIENT_PATTERNS: [&str; 3] =
    ["database is locked", "database table is locked", "database is busy"];

// ============================================================================
// SECTION: Failure Kind
// ============================================================================

/// Classified apply-failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The target object already exists; success-equivalent.
    BenignRace,
    /// Contention that is eligible for bounded retries.
    Transient,
    /// The statement batch exceeded its deadline; final, not retried.
    Timeout,
    /// Any other execution failure; final.
    Fatal,
}

/// Classifies one executor error.
///
/// Benign-race detection runs on the message first because engines report
/// duplicate creation as a generic error code with a distinctive message.
#[must_use]
pub fn classify_failure(error: &ExecutorError) -> FailureKind {
    match error {
        ExecutorError::Timeout { .. } => FailureKind::Timeout,
        ExecutorError::Db { code, message } => {
            let lowered = message.to_lowercase();
            if BENIGN_RACE_PATTERNS.iter().any(|pattern| lowered.contains(pattern)) {
                return FailureKind::BenignRace;
            }
            match code {
                Some(DbErrorCode::Busy | DbErrorCode::Locked | DbErrorCode::Interrupted) => {
                    FailureKind::Transient
                }
                Some(DbErrorCode::Constraint) | None
                    if TRANSIENT_PATTERNS.iter().any(|pattern| lowered.contains(pattern)) =>
                {
                    FailureKind::Transient
                }
                _ => FailureKind::Fatal,
            }
        }
        ExecutorError::Io(_) | ExecutorError::InvalidTenant(_) => FailureKind::Fatal,
    }
}

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

/// Bounded retry policy for transient failures.
///
/// # Invariants
/// - `max_attempts` counts the first attempt; 1 disables retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per file, including the first.
    pub max_attempts: u32,
    /// Base backoff in milliseconds; grows linearly per attempt.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 50,
        }
    }
}

impl RetryPolicy {
    /// Returns the backoff delay before the given retry (1-based attempt).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)))
    }
}
