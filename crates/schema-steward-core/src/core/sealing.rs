// crates/schema-steward-core/src/core/sealing.rs
// ============================================================================
// Module: Audit Error Sealing
// Description: Authenticated encryption for persisted failure detail.
// Purpose: Keep sensitive error text out of the audit ledger in the clear.
// Dependencies: aes-gcm, rand, sha2
// ============================================================================

//! ## Overview
//! Failure detail can echo fragments of schema, table, or patient-adjacent
//! names, so it is sealed with AES-256-GCM before persistence. The key is
//! derived once from an operator-supplied secret and is process-wide, not
//! tenant-specific. Every seal call draws a fresh random nonce; nonces are
//! never reused. Sealed blobs are laid out as `nonce || ciphertext+tag`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use aes_gcm::Aes256Gcm;
use aes_gcm::KeyInit;
use aes_gcm::Nonce;
use aes_gcm::aead::Aead;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Sealing and unsealing errors.
///
/// # Invariants
/// - Error variants never carry key material or plaintext.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SealError {
    /// The operator secret is empty.
    #[error("sealing secret must not be empty")]
    EmptySecret,
    /// Cipher initialization or operation failed.
    #[error("sealing cipher failure")]
    Crypto,
    /// A sealed blob is too short or fails authentication.
    #[error("sealed blob is malformed or fails authentication")]
    Malformed,
}

// ============================================================================
// SECTION: Cipher
// ============================================================================

/// Process-wide authenticated cipher for audit failure detail.
///
/// # Invariants
/// - Key material is acquired once at construction and never exposed.
/// - Each seal call uses a fresh random nonce.
pub struct ErrorCipher {
    /// Initialized AES-256-GCM cipher.
    cipher: Aes256Gcm,
}

impl fmt::Debug for ErrorCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorCipher").finish_non_exhaustive()
    }
}

impl ErrorCipher {
    /// Derives a cipher from an operator-supplied secret.
    ///
    /// The 256-bit key is the SHA-256 digest of the secret bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SealError`] when the secret is empty or the cipher cannot be
    /// initialized.
    pub fn from_secret(secret: &str) -> Result<Self, SealError> {
        if secret.trim().is_empty() {
            return Err(SealError::EmptySecret);
        }
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        let key = hasher.finalize();
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| SealError::Crypto)?;
        Ok(Self { cipher })
    }

    /// Seals plaintext into `nonce || ciphertext+tag`.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::Crypto`] when encryption fails.
    pub fn seal(&self, plaintext: &str) -> Result<Vec<u8>, SealError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext =
            self.cipher.encrypt(nonce, plaintext.as_bytes()).map_err(|_| SealError::Crypto)?;
        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Unseals a blob produced by [`ErrorCipher::seal`].
    ///
    /// # Errors
    ///
    /// Returns [`SealError::Malformed`] when the blob is truncated, fails
    /// authentication, or decrypts to invalid UTF-8.
    pub fn unseal(&self, sealed: &[u8]) -> Result<String, SealError> {
        if sealed.len() <= NONCE_LEN {
            return Err(SealError::Malformed);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self.cipher.decrypt(nonce, ciphertext).map_err(|_| SealError::Malformed)?;
        String::from_utf8(plaintext).map_err(|_| SealError::Malformed)
    }
}
