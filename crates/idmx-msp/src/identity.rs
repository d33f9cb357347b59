//! # Pseudonymous Identities
//!
//! [`PseudonymIdentity`] is the public face of a member: a pseudonym
//! public key, the disclosed role and organizational unit, and the proof
//! tying them to a credential from the authority. It is immutable once
//! built.
//!
//! [`SigningIdentity`] adds handles to the member's user secret and
//! pseudonym secret. It projects to its public identity by dropping those
//! handles; the reverse is impossible.
//!
//! ## Security Invariant
//!
//! Neither type holds raw secret bytes. Secrets stay inside the credential
//! engine and are released when the last handle drops.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use idmx_core::wire::split_point;
use idmx_core::{MspRole, OrganizationUnit, Role, SerializedIdentity, SerializedNymIdentity};
use idmx_crypto::{KeyHandle, SignerOpts, VerifierOpts};
use prost::Message;

use crate::error::MspError;
use crate::support::MembershipSupport;

/// Produces signatures under an identity.
pub trait Signer: Send + Sync {
    /// Sign `msg`.
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, MspError>;
}

/// Checks signatures made under an identity.
pub trait Verifier: Send + Sync {
    /// Verify `signature` over `msg`.
    fn verify(&self, msg: &[u8], signature: &[u8]) -> Result<(), MspError>;
}

/// Unique identifier of an identity within its authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityIdentifier {
    /// Authority name.
    pub mspid: String,
    /// Lowercase hex of the pseudonym public key.
    pub id: String,
}

impl std::fmt::Display for IdentityIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.mspid, self.id)
    }
}

/// Organizational unit descriptor, keyed by the certifying issuer key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OuIdentifier {
    /// Raw issuer public key.
    pub certifiers_identifier: Vec<u8>,
    /// Unit identifier.
    pub organizational_unit_identifier: String,
}

/// Operations every membership identity supports.
pub trait Identity: Verifier {
    /// Pseudonymous identities are always anonymous.
    fn anonymous(&self) -> bool;

    /// Pseudonymous identities do not expire.
    fn expires_at(&self) -> Option<DateTime<Utc>>;

    fn identifier(&self) -> &IdentityIdentifier;

    /// Name of the authority the identity claims membership of.
    fn msp_identifier(&self) -> &str;

    fn organizational_units(&self) -> Vec<OuIdentifier>;

    /// Check the authority name and the membership proof.
    fn validate(&self) -> Result<(), MspError>;

    /// Principal evaluation is not supported for pseudonymous identities.
    fn satisfies_principal(&self, principal: &[u8]) -> Result<(), MspError>;

    /// Encode as a [`SerializedIdentity`] envelope.
    fn serialize(&self) -> Result<Vec<u8>, MspError>;
}

/// A pseudonym plus disclosed attributes and the proof binding them.
#[derive(Clone)]
pub struct PseudonymIdentity {
    support: MembershipSupport,
    mspid: String,
    nym: Vec<u8>,
    nym_public_key: KeyHandle,
    role: Role,
    /// The role message as received, re-encoded verbatim by `serialize`.
    msp_role: MspRole,
    ou: OrganizationUnit,
    proof: Vec<u8>,
    id: IdentityIdentifier,
}

impl std::fmt::Debug for PseudonymIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PseudonymIdentity")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("ou", &self.ou.organizational_unit_identifier)
            .finish_non_exhaustive()
    }
}

impl PseudonymIdentity {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        support: MembershipSupport,
        mspid: String,
        nym: Vec<u8>,
        nym_public_key: KeyHandle,
        role: Role,
        msp_role: MspRole,
        ou: OrganizationUnit,
        proof: Vec<u8>,
    ) -> Self {
        let id = IdentityIdentifier {
            mspid: mspid.clone(),
            id: hex::encode(&nym),
        };
        Self {
            support,
            mspid,
            nym,
            nym_public_key,
            role,
            msp_role,
            ou,
            proof,
            id,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The disclosed organizational unit.
    pub fn organizational_unit(&self) -> &OrganizationUnit {
        &self.ou
    }

    /// Raw pseudonym public key.
    pub fn nym_public_key(&self) -> &[u8] {
        &self.nym
    }

    pub fn proof(&self) -> &[u8] {
        &self.proof
    }

    fn verify_proof(&self) -> Result<(), MspError> {
        match self.support.check_proof(
            &self.proof,
            &self.nym_public_key,
            &self.ou.organizational_unit_identifier,
            self.role,
            None,
        ) {
            Ok(true) => Ok(()),
            Ok(false) => Err(MspError::InternalInvariant(format!(
                "engine rejected the proof of {} without an error",
                self.id
            ))),
            Err(e) => Err(MspError::InvalidIdentity(format!(
                "proof of {} does not verify: {e}",
                self.id
            ))),
        }
    }
}

impl Verifier for PseudonymIdentity {
    fn verify(&self, msg: &[u8], signature: &[u8]) -> Result<(), MspError> {
        let opts = VerifierOpts::Nym {
            issuer_public_key: Arc::clone(self.support.issuer_key()),
        };
        match self
            .support
            .engine()
            .verify(&self.nym_public_key, signature, msg, &opts)
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(MspError::InternalInvariant(format!(
                "engine rejected a signature of {} without an error",
                self.id
            ))),
            Err(e) => Err(MspError::InvalidSignature(format!("{}: {e}", self.id))),
        }
    }
}

impl Identity for PseudonymIdentity {
    fn anonymous(&self) -> bool {
        true
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn identifier(&self) -> &IdentityIdentifier {
        &self.id
    }

    fn msp_identifier(&self) -> &str {
        &self.mspid
    }

    fn organizational_units(&self) -> Vec<OuIdentifier> {
        vec![OuIdentifier {
            certifiers_identifier: self.support.issuer_public_key().to_vec(),
            organizational_unit_identifier: self.ou.organizational_unit_identifier.clone(),
        }]
    }

    fn validate(&self) -> Result<(), MspError> {
        if self.mspid != self.support.name() {
            return Err(MspError::InvalidIdentity(format!(
                "identity belongs to {}, expected {}",
                self.mspid,
                self.support.name()
            )));
        }
        self.verify_proof()
    }

    fn satisfies_principal(&self, _principal: &[u8]) -> Result<(), MspError> {
        Err(MspError::NotImplemented("satisfies_principal"))
    }

    fn serialize(&self) -> Result<Vec<u8>, MspError> {
        let (nym_x, nym_y) = split_point(&self.nym)
            .map_err(|e| MspError::InternalInvariant(format!("pseudonym of {}: {e}", self.id)))?;
        let inner = SerializedNymIdentity {
            nym_x: nym_x.to_vec(),
            nym_y: nym_y.to_vec(),
            ou: self.ou.encode_to_vec(),
            role: self.msp_role.encode_to_vec(),
            proof: self.proof.clone(),
        };
        let envelope = SerializedIdentity {
            mspid: self.mspid.clone(),
            id_bytes: inner.encode_to_vec(),
        };
        Ok(envelope.encode_to_vec())
    }
}

/// A pseudonymous identity together with its secret handles.
#[derive(Clone)]
pub struct SigningIdentity {
    public: PseudonymIdentity,
    credential: Vec<u8>,
    user_key: KeyHandle,
    nym_key: KeyHandle,
    enrollment_id: String,
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl SigningIdentity {
    pub(crate) fn new(
        public: PseudonymIdentity,
        credential: Vec<u8>,
        user_key: KeyHandle,
        nym_key: KeyHandle,
        enrollment_id: String,
    ) -> Self {
        Self {
            public,
            credential,
            user_key,
            nym_key,
            enrollment_id,
        }
    }

    /// The public identity, without secret handles.
    pub fn public_version(&self) -> &PseudonymIdentity {
        &self.public
    }

    /// Consume the signing identity, keeping only the public part.
    pub fn into_public(self) -> PseudonymIdentity {
        self.public
    }

    pub fn credential(&self) -> &[u8] {
        &self.credential
    }

    pub fn enrollment_id(&self) -> &str {
        &self.enrollment_id
    }
}

impl Signer for SigningIdentity {
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, MspError> {
        let opts = SignerOpts::Nym {
            nym: Arc::clone(&self.nym_key),
            issuer_public_key: Arc::clone(self.public.support.issuer_key()),
        };
        let signed = self
            .public
            .support
            .engine()
            .sign(&self.user_key, msg, &opts)
            .map_err(|e| MspError::SigningFailed(format!("{}: {e}", self.public.id)))?;
        Ok(signed.signature)
    }
}

impl Verifier for SigningIdentity {
    fn verify(&self, msg: &[u8], signature: &[u8]) -> Result<(), MspError> {
        self.public.verify(msg, signature)
    }
}

impl Identity for SigningIdentity {
    fn anonymous(&self) -> bool {
        self.public.anonymous()
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.public.expires_at()
    }

    fn identifier(&self) -> &IdentityIdentifier {
        self.public.identifier()
    }

    fn msp_identifier(&self) -> &str {
        self.public.msp_identifier()
    }

    fn organizational_units(&self) -> Vec<OuIdentifier> {
        self.public.organizational_units()
    }

    fn validate(&self) -> Result<(), MspError> {
        self.public.validate()
    }

    fn satisfies_principal(&self, principal: &[u8]) -> Result<(), MspError> {
        self.public.satisfies_principal(principal)
    }

    fn serialize(&self) -> Result<Vec<u8>, MspError> {
        self.public.serialize()
    }
}
