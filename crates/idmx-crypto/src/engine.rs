//! # Credential Engine Contract
//!
//! Defines the abstract interface to an attribute-based credential
//! scheme. The membership layer never touches curve arithmetic or secret
//! bytes; it drives an engine through opaque key handles and typed option
//! values.
//!
//! ## Handles
//!
//! A [`KeyHandle`] is a shared reference to engine-owned key material.
//! Secret material never leaves the engine: [`Key::bytes`] refuses secret
//! keys, and implementations zeroize secrets when the last handle drops.
//! Every derivation returns a fresh handle; handles are never mutated.
//!
//! ## Verification Contract
//!
//! `verify` returns `Ok(true)` for a valid signature or proof and `Err(_)`
//! describing why anything else is invalid. `Ok(false)` is a contract
//! breach; callers treat it as an internal invariant failure rather than
//! an ordinary rejection.
//!
//! ## Security Invariant
//!
//! The trait requires `Send + Sync`. Proof generation and verification are
//! pure functions of their inputs and may run concurrently for distinct
//! identities.

use std::any::Any;
use std::sync::Arc;

use crate::digest::Ski;
use crate::error::EngineError;

/// Shared handle to engine-owned key material.
pub type KeyHandle = Arc<dyn Key>;

/// The kinds of key an engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Authority issuer public key.
    IssuerPublic,
    /// Authority revocation public key.
    RevocationPublic,
    /// A member's long-term user secret.
    UserSecret,
    /// Secret half of a pseudonym.
    NymSecret,
    /// Public half of a pseudonym.
    NymPublic,
}

/// Opaque key material held by an engine.
pub trait Key: Send + Sync + std::fmt::Debug {
    /// Subject key identifier. A pseudonym's secret and public halves
    /// share the same identifier.
    fn ski(&self) -> Ski;

    /// Public encoding of the key. Fails for secret keys.
    fn bytes(&self) -> Result<Vec<u8>, EngineError>;

    /// Whether the key holds secret material.
    fn is_private(&self) -> bool;

    /// The public counterpart of this key.
    fn public_key(&self) -> Result<KeyHandle, EngineError>;

    /// What kind of key this is.
    fn kind(&self) -> KeyKind;

    /// Downcasting hook for the engine that created the key.
    fn as_any(&self) -> &dyn Any;
}

/// How raw key material should be interpreted on import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyImportOpts {
    /// Issuer public key with the credential attribute names it signs.
    IssuerPublicKey {
        /// Attribute names in template order.
        attribute_names: Vec<String>,
        /// Do not persist in the key store.
        temporary: bool,
    },
    /// Revocation public key.
    RevocationPublicKey {
        /// Do not persist in the key store.
        temporary: bool,
    },
    /// A member's user secret.
    UserSecretKey {
        /// Do not persist in the key store.
        temporary: bool,
    },
    /// The public half of a pseudonym, as received from a peer.
    NymPublicKey {
        /// Do not persist in the key store.
        temporary: bool,
    },
}

/// Options for deriving a fresh pseudonym from a user secret.
#[derive(Debug, Clone)]
pub struct NymDerivationOpts {
    /// When false the pseudonym secret is persisted and can later be
    /// resolved through [`CredentialEngine::get_key`].
    pub temporary: bool,
    /// Issuer whose credential the pseudonym is bound to.
    pub issuer_public_key: KeyHandle,
}

/// One slot of an ordered attribute template.
///
/// `Bytes` and `Int` slots are disclosed; `Hidden` slots are only proven.
/// A disclosed slot without a value means "disclose whatever the
/// credential holds"; with a value it means "the credential must hold
/// exactly this".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// Disclosed byte-string attribute.
    Bytes(Option<Vec<u8>>),
    /// Disclosed integer attribute.
    Int(Option<i64>),
    /// Undisclosed attribute.
    Hidden,
}

impl Attribute {
    /// Whether the slot is disclosed.
    pub fn is_disclosed(&self) -> bool {
        !matches!(self, Self::Hidden)
    }

    /// The canonical byte encoding of the expected value, if any.
    ///
    /// Integers encode as 8-byte big-endian.
    pub fn expected_value(&self) -> Option<Vec<u8>> {
        match self {
            Self::Bytes(v) => v.clone(),
            Self::Int(v) => v.map(|n| n.to_be_bytes().to_vec()),
            Self::Hidden => None,
        }
    }
}

/// Auditor-side expectation checked during proof verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditExpectation {
    /// The enrollment id the proof is expected to commit to.
    pub enrollment_id: Vec<u8>,
    /// Audit data returned by the engine when the proof was produced.
    pub audit_data: Vec<u8>,
}

/// Options for producing a membership proof.
#[derive(Debug, Clone)]
pub struct ProofSignerOpts {
    /// Pseudonym secret the proof is bound to.
    pub nym: KeyHandle,
    /// Issuer of the credential.
    pub issuer_public_key: KeyHandle,
    /// The member's credential.
    pub credential: Vec<u8>,
    /// Disclosure template, one slot per credential attribute.
    pub attributes: Vec<Attribute>,
    /// Position of the revocation handle.
    pub rh_index: usize,
    /// Position of the enrollment id.
    pub eid_index: usize,
    /// Credential revocation information for the current epoch.
    pub cri: Vec<u8>,
}

/// Options for verifying a membership proof.
#[derive(Debug, Clone)]
pub struct ProofVerifierOpts {
    /// Revocation key the proof's epoch must be vouched for by.
    pub revocation_public_key: KeyHandle,
    /// Pseudonym the proof must be bound to, when known.
    pub nym_public_key: Option<KeyHandle>,
    /// Expected disclosure template.
    pub attributes: Vec<Attribute>,
    /// Position of the revocation handle.
    pub rh_index: usize,
    /// Position of the enrollment id.
    pub eid_index: usize,
    /// Expected revocation epoch.
    pub epoch: i64,
    /// Enrollment id expectation checked by auditors.
    pub audit: Option<AuditExpectation>,
}

/// Options for `sign`.
#[derive(Debug, Clone)]
pub enum SignerOpts {
    /// Sign a message under a pseudonym.
    Nym {
        /// Pseudonym secret.
        nym: KeyHandle,
        /// Issuer the pseudonym is bound to.
        issuer_public_key: KeyHandle,
    },
    /// Produce a membership proof.
    Proof(ProofSignerOpts),
}

/// Options for `verify`.
#[derive(Debug, Clone)]
pub enum VerifierOpts {
    /// Verify a pseudonym signature; the key is the pseudonym public key.
    Nym {
        /// Issuer the pseudonym is bound to.
        issuer_public_key: KeyHandle,
    },
    /// Verify a membership proof; the key is the issuer public key.
    Proof(ProofVerifierOpts),
    /// Check a credential against a user secret; the signature is the
    /// credential itself.
    Credential {
        /// Issuer of the credential.
        issuer_public_key: KeyHandle,
        /// Expected attribute values.
        attributes: Vec<Attribute>,
    },
}

/// Output of `sign`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signed {
    /// The signature or proof bytes.
    pub signature: Vec<u8>,
    /// Proof randomness an auditor needs to open the enrollment id
    /// commitment. Only produced for membership proofs.
    pub audit_data: Option<Vec<u8>>,
}

/// Abstract interface to a credential cryptography engine.
///
/// The key store behind an engine may be shared process-wide; concurrent
/// calls must each receive distinct handles.
pub trait CredentialEngine: Send + Sync {
    /// Import raw key material.
    fn key_import(&self, raw: &[u8], opts: &KeyImportOpts) -> Result<KeyHandle, EngineError>;

    /// Derive a fresh pseudonym from a user secret.
    fn key_derive(&self, key: &KeyHandle, opts: &NymDerivationOpts)
        -> Result<KeyHandle, EngineError>;

    /// Sign a message or produce a proof.
    fn sign(&self, key: &KeyHandle, msg: &[u8], opts: &SignerOpts) -> Result<Signed, EngineError>;

    /// Verify a signature, proof or credential. See the module docs for
    /// the return contract.
    fn verify(
        &self,
        key: &KeyHandle,
        signature: &[u8],
        msg: &[u8],
        opts: &VerifierOpts,
    ) -> Result<bool, EngineError>;

    /// Resolve a persisted key by its subject key identifier.
    fn get_key(&self, ski: &Ski) -> Result<KeyHandle, EngineError>;

    /// Human-readable engine name for diagnostics.
    fn engine_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_is_not_disclosed() {
        assert!(!Attribute::Hidden.is_disclosed());
        assert!(Attribute::Bytes(None).is_disclosed());
        assert!(Attribute::Int(Some(2)).is_disclosed());
    }

    #[test]
    fn expected_value_encodings() {
        assert_eq!(
            Attribute::Bytes(Some(b"ou".to_vec())).expected_value(),
            Some(b"ou".to_vec())
        );
        assert_eq!(
            Attribute::Int(Some(2)).expected_value(),
            Some(vec![0, 0, 0, 0, 0, 0, 0, 2])
        );
        assert_eq!(Attribute::Int(None).expected_value(), None);
        assert_eq!(Attribute::Hidden.expected_value(), None);
    }
}
