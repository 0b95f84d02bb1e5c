// SPDX-License-Identifier: PMPL-1.0-or-later
//! Session store error types.
//!
//! "Session not found" is deliberately absent: a missing session is
//! `Ok(None)` from [`crate::SessionStore::fetch`], never an error.

use sessionkv_storage::StorageError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::crypto::CryptoError;

/// Errors returned by session store operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The key-value backend reported a failure. Not retried.
    #[error("backend error: {0}")]
    Backend(#[from] StorageError),

    /// The stored value is not a well-formed session (or envelope), or the
    /// session could not be serialized.
    #[error("session is not valid serialized data: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The envelope MAC did not verify: tampered data or wrong secret.
    #[error("encrypted session was tampered with or the secret is wrong")]
    Integrity,

    /// Encryption or decryption failed after the integrity check passed.
    #[error("session cipher failure: {0}")]
    Crypto(#[source] CryptoError),

    /// The store configuration was rejected.
    #[error("invalid store configuration: {0}")]
    Config(#[from] ConfigError),
}

impl SessionError {
    /// True for [`SessionError::Backend`].
    pub fn is_backend(&self) -> bool {
        matches!(self, SessionError::Backend(_))
    }

    /// True for [`SessionError::Serialization`].
    pub fn is_serialization(&self) -> bool {
        matches!(self, SessionError::Serialization(_))
    }

    /// True for [`SessionError::Integrity`].
    pub fn is_integrity(&self) -> bool {
        matches!(self, SessionError::Integrity)
    }
}

impl From<CryptoError> for SessionError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Integrity => SessionError::Integrity,
            CryptoError::Malformed(err) => SessionError::Serialization(err),
            other => SessionError::Crypto(other),
        }
    }
}

/// Convenience type alias for session store results.
pub type Result<T> = std::result::Result<T, SessionError>;
