//! # Identity Provider
//!
//! Derives fresh pseudonymous identities from the member's long-term
//! credential, turns identity bytes back into verifiers and signers, and
//! describes identities for operators and auditors.
//!
//! ## Issuance
//!
//! All issuing entry points share one routine parameterized by
//! [`Issuance`]: derive a pseudonym, self-check the credential, prove
//! membership, then optionally register the signer and produce audit
//! info. Rehydration of identities owned by this process shares
//! [`IdentityProvider::rehydrate`].
//!
//! ## Security Invariant
//!
//! A provider always holds signer material. Construction without a signer
//! block fails; there is no verification-only provider.

use std::sync::Arc;

use idmx_core::attributes::{ENROLLMENT_ID_INDEX, REVOCATION_HANDLE_INDEX};
use idmx_core::{MspConfig, MspRole, OrganizationUnit, Role};
use idmx_crypto::{
    sha256_hex, Attribute, CredentialEngine, KeyHandle, KeyImportOpts, NymDerivationOpts,
    ProofSignerOpts, SignerOpts, VerifierOpts,
};

use crate::audit::AuditInfo;
use crate::error::MspError;
use crate::identity::{Identity, PseudonymIdentity, Signer, SigningIdentity, Verifier};
use crate::registry::SignerRegistry;
use crate::support::MembershipSupport;

/// Message signed and verified when a signer is rehydrated.
const SELF_TEST_MESSAGE: &[u8] = b"idmx signer self-test";

/// What an issuance does beyond deriving and proving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Issuance {
    /// Persist the pseudonym secret in the engine key store.
    persist_nym: bool,
    /// Hand the signer to the registry.
    register: bool,
    /// Produce audit info.
    audit: bool,
}

impl Issuance {
    const FULL: Self = Self {
        persist_nym: true,
        register: true,
        audit: true,
    };
    const TRANSIENT: Self = Self {
        persist_nym: false,
        register: false,
        audit: false,
    };
}

struct Issued {
    signing: SigningIdentity,
    serialized: Vec<u8>,
    audit: Option<AuditInfo>,
}

/// Issues and resolves pseudonymous identities for one member.
pub struct IdentityProvider {
    support: MembershipSupport,
    registry: Arc<dyn SignerRegistry>,
    user_key: KeyHandle,
    credential: Vec<u8>,
    cri: Vec<u8>,
    organizational_unit: String,
    role_mask: i64,
    enrollment_id: String,
}

impl std::fmt::Debug for IdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProvider")
            .field("support", &self.support)
            .field("organizational_unit", &self.organizational_unit)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for IdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Idemix Provider [{}]",
            sha256_hex(self.support.issuer_public_key())
        )
    }
}

impl IdentityProvider {
    /// Build a provider from a full authority configuration.
    ///
    /// Fails with [`MspError::Setup`] when `config` has no signer block.
    pub fn new(
        config: &MspConfig,
        engine: Arc<dyn CredentialEngine>,
        registry: Arc<dyn SignerRegistry>,
    ) -> Result<Self, MspError> {
        let signer = config.signer.as_ref().ok_or_else(|| {
            MspError::Setup(format!("no signer material configured for {}", config.name))
        })?;
        let support = MembershipSupport::new(config, Arc::clone(&engine))?;
        let user_key = engine
            .key_import(
                &signer.user_secret_key,
                &KeyImportOpts::UserSecretKey { temporary: true },
            )
            .map_err(|e| MspError::Setup(format!("user secret of {}: {e}", config.name)))?;
        tracing::debug!(msp = %config.name, ou = %signer.organizational_unit, "identity provider ready");
        Ok(Self {
            support,
            registry,
            user_key,
            credential: signer.credential.clone(),
            cri: signer.credential_revocation_information.clone(),
            organizational_unit: signer.organizational_unit.clone(),
            role_mask: signer.role,
            enrollment_id: signer.enrollment_id.clone(),
        })
    }

    /// Parse a YAML configuration and build a provider from it.
    pub fn from_yaml_str(
        doc: &str,
        engine: Arc<dyn CredentialEngine>,
        registry: Arc<dyn SignerRegistry>,
    ) -> Result<Self, MspError> {
        Self::new(&MspConfig::from_yaml_str(doc)?, engine, registry)
    }

    pub fn support(&self) -> &MembershipSupport {
        &self.support
    }

    /// The configured enrollment id.
    pub fn enrollment_id(&self) -> &str {
        &self.enrollment_id
    }

    /// Issue a fresh identity, register its signer and return the
    /// serialized identity with its serialized audit info.
    pub fn identity(&self) -> Result<(Vec<u8>, Vec<u8>), MspError> {
        let issued = self.issue(Issuance::FULL)?;
        let audit = issued.audit.ok_or_else(|| {
            MspError::InternalInvariant("full issuance produced no audit info".to_string())
        })?;
        Ok((issued.serialized, audit.to_bytes()?))
    }

    /// Issue a transient signing identity whose pseudonym is not persisted
    /// and which is neither registered nor audited.
    pub fn signer_identity(&self) -> Result<SigningIdentity, MspError> {
        Ok(self.issue(Issuance::TRANSIENT)?.signing)
    }

    /// Parse and validate identity bytes into a verifier.
    pub fn deserialize_verifier(&self, raw: &[u8]) -> Result<PseudonymIdentity, MspError> {
        Ok(self.support.deserialize(raw, true)?.identity)
    }

    /// Resolve identity bytes issued by this process into a signer,
    /// self-testing the recovered key material.
    pub fn deserialize_signer(&self, raw: &[u8]) -> Result<SigningIdentity, MspError> {
        self.rehydrate(raw, true)
    }

    /// Resolve identity bytes into the live signing identity. Used to
    /// restore a node's own identity at startup.
    pub fn deserialize_signing_identity(&self, raw: &[u8]) -> Result<SigningIdentity, MspError> {
        self.rehydrate(raw, false)
    }

    /// Describe an identity as
    /// `MSP.Idemix: [<eid>][<unique id>][<authority>][<OU>][<ROLE>]`.
    ///
    /// The enrollment id is only filled in when `audit_info` is non-empty and
    /// matches the identity. Empty audit bytes count as absent.
    pub fn info(&self, raw: &[u8], audit_info: Option<&[u8]>) -> Result<String, MspError> {
        let parsed = self.support.deserialize(raw, true)?;
        let enrollment_id = match audit_info {
            Some(bytes) if !bytes.is_empty() => {
                let audit = AuditInfo::from_bytes(bytes)?;
                audit.match_identity(&self.support, raw)?;
                audit.enrollment_id().to_string()
            }
            _ => String::new(),
        };
        Ok(format!(
            "MSP.Idemix: [{}][{}][{}][{}][{}]",
            enrollment_id,
            sha256_hex(raw),
            parsed.envelope.mspid,
            parsed.ou.organizational_unit_identifier,
            parsed.identity.role()
        ))
    }

    fn issue(&self, mode: Issuance) -> Result<Issued, MspError> {
        let engine = self.support.engine();
        let issuer = self.support.issuer_key();

        let nym = engine
            .key_derive(
                &self.user_key,
                &NymDerivationOpts {
                    temporary: !mode.persist_nym,
                    issuer_public_key: Arc::clone(issuer),
                },
            )
            .map_err(MspError::engine("derive pseudonym"))?;
        let nym_public = nym.public_key().map_err(MspError::engine("pseudonym public key"))?;
        let nym_raw = nym_public
            .bytes()
            .map_err(MspError::engine("pseudonym public key"))?;

        let role = Role::from_mask(self.role_mask);
        let ou = OrganizationUnit {
            msp_identifier: self.support.name().to_string(),
            organizational_unit_identifier: self.organizational_unit.clone(),
            certifiers_identifier: issuer.ski().as_bytes().to_vec(),
        };

        self.check_credential()?;

        let proof_opts = SignerOpts::Proof(ProofSignerOpts {
            nym: Arc::clone(&nym),
            issuer_public_key: Arc::clone(issuer),
            credential: self.credential.clone(),
            attributes: vec![
                Attribute::Bytes(None),
                Attribute::Int(None),
                Attribute::Hidden,
                Attribute::Hidden,
            ],
            rh_index: REVOCATION_HANDLE_INDEX,
            eid_index: ENROLLMENT_ID_INDEX,
            cri: self.cri.clone(),
        });
        let proof = engine
            .sign(&self.user_key, &[], &proof_opts)
            .map_err(|e| MspError::SigningFailed(format!("membership proof: {e}")))?;

        let public = PseudonymIdentity::new(
            self.support.clone(),
            self.support.name().to_string(),
            nym_raw,
            nym_public,
            role,
            MspRole {
                msp_identifier: self.support.name().to_string(),
                role: role.to_wire() as i32,
            },
            ou,
            proof.signature,
        );
        let signing = SigningIdentity::new(
            public,
            self.credential.clone(),
            Arc::clone(&self.user_key),
            nym,
            self.enrollment_id.clone(),
        );
        let serialized = signing.serialize()?;
        tracing::debug!(identity = %signing.identifier(), persisted = mode.persist_nym, "issued identity");

        if mode.register {
            let verifier: Arc<dyn Verifier> = Arc::new(signing.public_version().clone());
            let signer: Arc<dyn Signer> = Arc::new(signing.clone());
            self.registry
                .register_signer(&serialized, signer, verifier)
                .map_err(|source| MspError::Registration {
                    identity: signing.identifier().to_string(),
                    source,
                })?;
            tracing::debug!(identity = %signing.identifier(), "registered signer");
        }

        let audit = if mode.audit {
            let randomness = proof.audit_data.ok_or_else(|| {
                MspError::InternalInvariant("engine returned no audit data for a proof".to_string())
            })?;
            Some(AuditInfo::new(
                randomness,
                &self.organizational_unit,
                role.code(),
                &self.enrollment_id,
            ))
        } else {
            None
        };

        Ok(Issued {
            signing,
            serialized,
            audit,
        })
    }

    fn check_credential(&self) -> Result<(), MspError> {
        let opts = VerifierOpts::Credential {
            issuer_public_key: Arc::clone(self.support.issuer_key()),
            attributes: vec![
                Attribute::Bytes(Some(self.organizational_unit.as_bytes().to_vec())),
                Attribute::Int(Some(Role::from_mask(self.role_mask).code())),
                Attribute::Bytes(Some(self.enrollment_id.as_bytes().to_vec())),
                Attribute::Hidden,
            ],
        };
        match self
            .support
            .engine()
            .verify(&self.user_key, &self.credential, &[], &opts)
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(MspError::InternalInvariant(
                "engine rejected the credential without an error".to_string(),
            )),
            Err(e) => {
                tracing::warn!(msp = %self.support.name(), "credential self-check failed");
                Err(MspError::CredentialInvalid(e.to_string()))
            }
        }
    }

    fn rehydrate(&self, raw: &[u8], self_test: bool) -> Result<SigningIdentity, MspError> {
        let parsed = self.support.deserialize(raw, true)?;
        let ski = parsed.nym_public_key.ski();
        let nym = self
            .support
            .engine()
            .get_key(&ski)
            .map_err(|e| MspError::NoSecretMaterial(format!("{}: {e}", parsed.identity.identifier())))?;
        if !nym.is_private() {
            return Err(MspError::NoSecretMaterial(format!(
                "{}: stored key is not a pseudonym secret",
                parsed.identity.identifier()
            )));
        }

        let signing = SigningIdentity::new(
            parsed.identity,
            self.credential.clone(),
            Arc::clone(&self.user_key),
            nym,
            self.enrollment_id.clone(),
        );
        if self_test {
            let signature = signing.sign(SELF_TEST_MESSAGE)?;
            signing.verify(SELF_TEST_MESSAGE, &signature)?;
        }
        tracing::debug!(identity = %signing.identifier(), "rehydrated signing identity");
        Ok(signing)
    }
}
