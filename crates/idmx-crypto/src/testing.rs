//! # Test Authority
//!
//! A credential-issuing membership authority for tests. Holds the issuer
//! and revocation secrets of the software engine and hands out
//! configuration blocks, so tests never assemble credentials by hand.
//!
//! Only compiled with the `test-utils` feature.

use ed25519_dalek::SigningKey;
use idmx_core::attributes::default_attribute_names;
use idmx_core::{MspConfig, Role, SignerConfig};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::digest::Ski;
use crate::error::EngineError;
use crate::software::{encode_canonical, Credential, CredentialAttribute, RevocationInfo};

const SALT_LEN: usize = 16;

/// A membership authority backed by in-memory Ed25519 secrets.
pub struct TestAuthority {
    name: String,
    issuer: SigningKey,
    revocation: SigningKey,
}

impl std::fmt::Debug for TestAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestAuthority")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TestAuthority {
    /// Create an authority with fresh random keys.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            issuer: SigningKey::generate(&mut OsRng),
            revocation: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw issuer public key.
    pub fn issuer_public_key(&self) -> Vec<u8> {
        self.issuer.verifying_key().to_bytes().to_vec()
    }

    /// Raw revocation public key.
    pub fn revocation_public_key(&self) -> Vec<u8> {
        self.revocation.verifying_key().to_bytes().to_vec()
    }

    /// Verification-only configuration (no signer block).
    pub fn config(&self) -> MspConfig {
        MspConfig {
            name: self.name.clone(),
            issuer_public_key: self.issuer_public_key(),
            revocation_public_key: self.revocation_public_key(),
            attribute_names: default_attribute_names(),
            signer: None,
        }
    }

    /// Enroll a new member and return a full configuration for it.
    ///
    /// `role` is the configured role mask (member = 1, admin = 2); the
    /// credential carries the role code it resolves to.
    pub fn enroll(
        &self,
        organizational_unit: &str,
        role: i64,
        enrollment_id: &str,
    ) -> Result<MspConfig, EngineError> {
        let user = SigningKey::generate(&mut OsRng);
        let revocation_handle = OsRng.next_u64() as i64;
        let values = [
            organizational_unit.as_bytes().to_vec(),
            Role::from_mask(role).code().to_be_bytes().to_vec(),
            enrollment_id.as_bytes().to_vec(),
            revocation_handle.to_be_bytes().to_vec(),
        ];
        let credential = self.issue_credential(&user.verifying_key().to_bytes(), &values)?;
        Ok(MspConfig {
            signer: Some(SignerConfig {
                user_secret_key: user.to_bytes().to_vec(),
                credential,
                organizational_unit: organizational_unit.to_string(),
                role,
                enrollment_id: enrollment_id.to_string(),
                credential_revocation_information: self.cri(0)?,
            }),
            ..self.config()
        })
    }

    /// Issue a credential over a holder public key and raw attribute values.
    pub fn issue_credential(&self, holder: &[u8], values: &[Vec<u8>]) -> Result<Vec<u8>, EngineError> {
        let attributes = values
            .iter()
            .map(|value| {
                let mut salt = vec![0u8; SALT_LEN];
                OsRng.fill_bytes(&mut salt);
                CredentialAttribute {
                    value: value.clone(),
                    salt,
                }
            })
            .collect();
        let mut credential = Credential {
            holder: holder.to_vec(),
            attributes,
            signature: Vec::new(),
        };
        let issuer_ski = Ski::of(self.issuer.verifying_key().as_bytes());
        credential.signature = credential
            .statement(issuer_ski.0.to_vec())
            .sign(&self.issuer)?;
        encode_canonical(&credential)
    }

    /// Credential revocation information for `epoch`.
    pub fn cri(&self, epoch: i64) -> Result<Vec<u8>, EngineError> {
        encode_canonical(&RevocationInfo::issue(&self.revocation, epoch))
    }
}
