//! # Membership Authority Support
//!
//! Holds an authority's public anchors (name, issuer public key,
//! revocation public key, epoch) and the engine they were imported into.
//!
//! [`MembershipSupport::deserialize`] is the single parse path for
//! identity bytes. Every other entry point that accepts serialized
//! identities, including audit matching, funnels through it.

use std::sync::Arc;

use idmx_core::attributes::{ENROLLMENT_ID_INDEX, REVOCATION_HANDLE_INDEX};
use idmx_core::wire::split_point;
use idmx_core::{MspConfig, MspRole, OrganizationUnit, Role, SerializedIdentity, SerializedNymIdentity};
use idmx_crypto::{
    Attribute, AuditExpectation, CredentialEngine, EngineError, KeyHandle, KeyImportOpts,
    ProofVerifierOpts, VerifierOpts,
};

use crate::error::MspError;
use crate::identity::{Identity, PseudonymIdentity};

struct Anchors {
    name: String,
    issuer_public_key: Vec<u8>,
    engine: Arc<dyn CredentialEngine>,
    issuer: KeyHandle,
    revocation: KeyHandle,
    epoch: i64,
}

/// Public anchors of one membership authority. Cheap to clone.
#[derive(Clone)]
pub struct MembershipSupport {
    anchors: Arc<Anchors>,
}

/// Everything [`MembershipSupport::deserialize`] recovers from identity
/// bytes.
#[derive(Debug, Clone)]
pub struct Deserialized {
    /// The parsed identity.
    pub identity: PseudonymIdentity,
    /// Ephemeral handle to the pseudonym public key.
    pub nym_public_key: KeyHandle,
    /// The outer envelope.
    pub envelope: SerializedIdentity,
    /// Disclosed organizational unit.
    pub ou: OrganizationUnit,
    /// Disclosed role.
    pub role: MspRole,
}

impl std::fmt::Debug for MembershipSupport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipSupport")
            .field("name", &self.anchors.name)
            .field("epoch", &self.anchors.epoch)
            .field("engine", &self.anchors.engine.engine_name())
            .finish()
    }
}

impl MembershipSupport {
    /// Import the authority's public keys from `config` into `engine`.
    pub fn new(config: &MspConfig, engine: Arc<dyn CredentialEngine>) -> Result<Self, MspError> {
        let issuer = engine
            .key_import(
                &config.issuer_public_key,
                &KeyImportOpts::IssuerPublicKey {
                    attribute_names: config.attribute_names.clone(),
                    temporary: true,
                },
            )
            .map_err(|e| MspError::Setup(format!("issuer public key of {}: {e}", config.name)))?;
        let revocation = engine
            .key_import(
                &config.revocation_public_key,
                &KeyImportOpts::RevocationPublicKey { temporary: true },
            )
            .map_err(|e| {
                MspError::Setup(format!("revocation public key of {}: {e}", config.name))
            })?;
        tracing::debug!(msp = %config.name, issuer = %issuer.ski(), "imported authority anchors");
        Ok(Self {
            anchors: Arc::new(Anchors {
                name: config.name.clone(),
                issuer_public_key: config.issuer_public_key.clone(),
                engine,
                issuer,
                revocation,
                epoch: 0,
            }),
        })
    }

    /// Authority name.
    pub fn name(&self) -> &str {
        &self.anchors.name
    }

    /// Raw issuer public key.
    pub fn issuer_public_key(&self) -> &[u8] {
        &self.anchors.issuer_public_key
    }

    /// Revocation epoch proofs are checked against.
    pub fn epoch(&self) -> i64 {
        self.anchors.epoch
    }

    pub(crate) fn engine(&self) -> &dyn CredentialEngine {
        self.anchors.engine.as_ref()
    }

    pub(crate) fn issuer_key(&self) -> &KeyHandle {
        &self.anchors.issuer
    }

    /// Parse identity bytes and, when `check_validity` is set, validate
    /// the result.
    pub fn deserialize(&self, raw: &[u8], check_validity: bool) -> Result<Deserialized, MspError> {
        let envelope = SerializedIdentity::decode_from(raw)
            .map_err(|e| MspError::malformed("identity envelope", e))?;
        let inner = SerializedNymIdentity::decode_from(&envelope.id_bytes)
            .map_err(|e| MspError::malformed(format!("identity of {}", envelope.mspid), e))?;

        let nym_raw = inner.nym_public_key();
        split_point(&nym_raw).map_err(|e| MspError::malformed("pseudonym", e))?;
        let nym_public_key = self
            .engine()
            .key_import(&nym_raw, &KeyImportOpts::NymPublicKey { temporary: true })
            .map_err(|e| MspError::MalformedIdentity {
                context: format!("pseudonym of {}: {e}", envelope.mspid),
                source: None,
            })?;

        let ou = OrganizationUnit::decode_from(&inner.ou)
            .map_err(|e| MspError::malformed("organizational unit", e))?;
        let role = MspRole::decode_from(&inner.role).map_err(|e| MspError::malformed("role", e))?;
        let parsed_role =
            Role::from_wire(role.role).map_err(|e| MspError::malformed("role", e))?;

        let identity = PseudonymIdentity::new(
            self.clone(),
            envelope.mspid.clone(),
            nym_raw,
            nym_public_key.clone(),
            parsed_role,
            role.clone(),
            ou.clone(),
            inner.proof,
        );
        if check_validity {
            identity.validate()?;
        }
        tracing::debug!(identity = %identity.identifier(), checked = check_validity, "deserialized identity");
        Ok(Deserialized {
            identity,
            nym_public_key,
            envelope,
            ou,
            role,
        })
    }

    /// Run the engine over a membership proof with the fixed attribute
    /// template: OU and role disclosed, enrollment id and revocation
    /// handle hidden.
    pub(crate) fn check_proof(
        &self,
        proof: &[u8],
        nym_public_key: &KeyHandle,
        ou: &str,
        role: Role,
        audit: Option<AuditExpectation>,
    ) -> Result<bool, EngineError> {
        let opts = VerifierOpts::Proof(ProofVerifierOpts {
            revocation_public_key: Arc::clone(&self.anchors.revocation),
            nym_public_key: Some(Arc::clone(nym_public_key)),
            attributes: vec![
                Attribute::Bytes(Some(ou.as_bytes().to_vec())),
                Attribute::Int(Some(role.code())),
                Attribute::Hidden,
                Attribute::Hidden,
            ],
            rh_index: REVOCATION_HANDLE_INDEX,
            eid_index: ENROLLMENT_ID_INDEX,
            epoch: self.anchors.epoch,
            audit,
        });
        self.engine().verify(&self.anchors.issuer, proof, &[], &opts)
    }
}
