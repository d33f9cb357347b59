//! # Membership Error Types
//!
//! Every failure of the membership layer, with the operation and, where
//! known, the identity it concerns. Engine and codec failures are wrapped,
//! never swallowed.

use idmx_core::{ConfigError, WireError};
use idmx_crypto::EngineError;
use thiserror::Error;

use crate::registry::RegistryError;

/// Errors from membership identity operations.
#[derive(Error, Debug)]
pub enum MspError {
    /// Untrusted identity bytes could not be parsed.
    #[error("malformed identity: {context}")]
    MalformedIdentity {
        /// What was being parsed.
        context: String,
        /// Underlying codec failure, if any.
        #[source]
        source: Option<WireError>,
    },

    /// Authority name mismatch or failed proof verification.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// A signature did not verify under the identity's pseudonym.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The held credential failed its self-check before issuance.
    #[error("credential is invalid: {0}")]
    CredentialInvalid(String),

    /// Signature or proof generation failed.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// Audit information does not correspond to the identity.
    #[error("audit mismatch: {0}")]
    AuditMismatch(String),

    /// No local pseudonym secret exists for the identity.
    #[error("no secret material: {0}")]
    NoSecretMaterial(String),

    /// The credential engine violated its contract.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    /// The capability is not supported by pseudonymous identities.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Provider or support construction failed.
    #[error("setup failed: {0}")]
    Setup(String),

    /// The authority configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The signer registry refused the identity.
    #[error("registration of {identity} failed: {source}")]
    Registration {
        /// Unique id of the identity being registered.
        identity: String,
        /// Registry failure.
        #[source]
        source: RegistryError,
    },

    /// Any other engine failure.
    #[error("{operation}: {source}")]
    Engine {
        /// The operation that invoked the engine.
        operation: &'static str,
        /// Engine failure.
        #[source]
        source: EngineError,
    },
}

impl MspError {
    pub(crate) fn malformed(context: impl Into<String>, source: WireError) -> Self {
        Self::MalformedIdentity {
            context: context.into(),
            source: Some(source),
        }
    }

    pub(crate) fn engine(operation: &'static str) -> impl FnOnce(EngineError) -> Self {
        move |source| Self::Engine { operation, source }
    }
}
