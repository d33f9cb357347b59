//! # Engine Error Types
//!
//! Structured errors for all credential engine operations.

use thiserror::Error;

/// Errors from credential engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Raw key material could not be imported.
    #[error("key import failed: {0}")]
    KeyImport(String),

    /// No key with the given subject key identifier is stored.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The key handle is of the wrong kind for the operation.
    #[error("unsupported key: {0}")]
    UnsupportedKey(String),

    /// The options are inconsistent with the operation.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The credential is malformed or not valid for the presented key.
    #[error("credential error: {0}")]
    Credential(String),

    /// Signature or proof generation failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A signature or proof did not verify.
    #[error("verification failed: {0}")]
    Verification(String),

    /// Encoding or decoding of engine artifacts failed.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<idmx_core::CanonicalizationError> for EngineError {
    fn from(err: idmx_core::CanonicalizationError) -> Self {
        Self::Encoding(err.to_string())
    }
}
