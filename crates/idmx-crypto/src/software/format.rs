//! Encodings of software-engine artifacts.
//!
//! Credentials, revocation information, proofs and audit data are all
//! canonical JSON. Decoders re-canonicalize what they parsed and reject
//! any input that is not byte-identical to the canonical form, so a proof
//! cannot be altered without either failing to decode or changing a
//! signed value.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use idmx_core::CanonicalBytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::digest::tagged_hash;
use crate::error::EngineError;

const ATTRIBUTE_DOMAIN: &str = "idmx/attribute";
const ENROLLMENT_DOMAIN: &str = "idmx/enrollment";
const ISSUANCE_DOMAIN: &str = "idmx/issuance";
const EPOCH_DOMAIN: &str = "idmx/epoch";
const PROOF_DOMAIN: &str = "idmx/proof";

/// Decode a canonical JSON artifact, rejecting non-canonical encodings.
pub(crate) fn decode_canonical<T: Serialize + DeserializeOwned>(
    raw: &[u8],
    what: &str,
) -> Result<T, EngineError> {
    let value: T = serde_json::from_slice(raw)
        .map_err(|e| EngineError::Encoding(format!("malformed {what}: {e}")))?;
    if !CanonicalBytes::matches(&value, raw)? {
        return Err(EngineError::Encoding(format!("non-canonical {what}")));
    }
    Ok(value)
}

pub(crate) fn encode_canonical<T: Serialize>(value: &T) -> Result<Vec<u8>, EngineError> {
    Ok(CanonicalBytes::new(value)?.into_bytes())
}

/// Salted commitment to one credential attribute.
pub(crate) fn attribute_commitment(index: usize, value: &[u8], salt: &[u8]) -> Vec<u8> {
    let index = (index as u64).to_be_bytes();
    tagged_hash(ATTRIBUTE_DOMAIN, &[&index, value, salt]).to_vec()
}

/// Commitment to an enrollment id under proof randomness.
pub(crate) fn enrollment_commitment(enrollment_id: &[u8], randomness: &[u8]) -> Vec<u8> {
    tagged_hash(ENROLLMENT_DOMAIN, &[enrollment_id, randomness]).to_vec()
}

fn signature_from(raw: &[u8], what: &str) -> Result<Signature, EngineError> {
    Signature::from_slice(raw)
        .map_err(|e| EngineError::Verification(format!("malformed {what} signature: {e}")))
}

/// One credential attribute as held by the member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CredentialAttribute {
    pub value: Vec<u8>,
    pub salt: Vec<u8>,
}

/// What the issuer signs: the holder key and one commitment per attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct IssuedStatement {
    pub issuer: Vec<u8>,
    pub holder: Vec<u8>,
    pub commitments: Vec<Vec<u8>>,
}

impl IssuedStatement {
    fn message(&self) -> Result<Vec<u8>, EngineError> {
        let body = encode_canonical(self)?;
        Ok(tagged_hash(ISSUANCE_DOMAIN, &[&body]).to_vec())
    }

    pub fn sign(&self, issuer: &SigningKey) -> Result<Vec<u8>, EngineError> {
        Ok(issuer.sign(&self.message()?).to_bytes().to_vec())
    }

    pub fn verify(&self, issuer: &VerifyingKey, signature: &[u8]) -> Result<(), EngineError> {
        let sig = signature_from(signature, "issuer")?;
        issuer
            .verify(&self.message()?, &sig)
            .map_err(|e| EngineError::Verification(format!("issuer signature: {e}")))
    }
}

/// A credential: the holder's attributes plus the issuer's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Credential {
    pub holder: Vec<u8>,
    pub attributes: Vec<CredentialAttribute>,
    pub signature: Vec<u8>,
}

impl Credential {
    pub fn statement(&self, issuer: Vec<u8>) -> IssuedStatement {
        IssuedStatement {
            issuer,
            holder: self.holder.clone(),
            commitments: self
                .attributes
                .iter()
                .enumerate()
                .map(|(i, a)| attribute_commitment(i, &a.value, &a.salt))
                .collect(),
        }
    }
}

/// Credential revocation information: an epoch vouched for by the
/// revocation authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RevocationInfo {
    pub epoch: i64,
    pub signature: Vec<u8>,
}

impl RevocationInfo {
    fn message(epoch: i64) -> Vec<u8> {
        tagged_hash(EPOCH_DOMAIN, &[&epoch.to_be_bytes()]).to_vec()
    }

    pub fn issue(revocation: &SigningKey, epoch: i64) -> Self {
        Self {
            epoch,
            signature: revocation.sign(&Self::message(epoch)).to_bytes().to_vec(),
        }
    }

    pub fn verify(&self, revocation: &VerifyingKey) -> Result<(), EngineError> {
        let sig = signature_from(&self.signature, "revocation")?;
        revocation
            .verify(&Self::message(self.epoch), &sig)
            .map_err(|e| EngineError::Verification(format!("revocation signature: {e}")))
    }
}

/// An opened attribute inside a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Disclosure {
    pub index: u64,
    pub value: Vec<u8>,
    pub salt: Vec<u8>,
}

/// Everything a membership proof asserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ProofBody {
    pub statement: IssuedStatement,
    pub issuer_signature: Vec<u8>,
    pub nym: Vec<u8>,
    pub disclosed: Vec<Disclosure>,
    pub rh_index: u64,
    pub enrollment_commitment: Vec<u8>,
    pub revocation: RevocationInfo,
    pub message: Vec<u8>,
}

impl ProofBody {
    pub fn message_digest(&self) -> Result<Vec<u8>, EngineError> {
        let body = encode_canonical(self)?;
        Ok(tagged_hash(PROOF_DOMAIN, &[&body]).to_vec())
    }
}

/// A membership proof, signed by both the holder and the pseudonym.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Proof {
    pub body: ProofBody,
    pub holder_signature: Vec<u8>,
    pub nym_signature: Vec<u8>,
}

impl Proof {
    pub fn verify_signatures(&self, holder: &VerifyingKey, nym: &VerifyingKey) -> Result<(), EngineError> {
        let digest = self.body.message_digest()?;
        let holder_sig = signature_from(&self.holder_signature, "holder")?;
        holder
            .verify(&digest, &holder_sig)
            .map_err(|e| EngineError::Verification(format!("holder signature: {e}")))?;
        let nym_sig = signature_from(&self.nym_signature, "pseudonym")?;
        nym.verify(&digest, &nym_sig)
            .map_err(|e| EngineError::Verification(format!("pseudonym signature: {e}")))
    }
}

/// Proof randomness handed to the auditor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AuditData {
    pub enrollment_randomness: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_non_canonical() {
        let info = RevocationInfo {
            epoch: 3,
            signature: vec![1, 2],
        };
        let raw = encode_canonical(&info).expect("encode");
        let back: RevocationInfo = decode_canonical(&raw, "cri").expect("decode");
        assert_eq!(back, info);

        let spaced = br#"{"epoch":3, "signature":[1,2]}"#;
        assert!(matches!(
            decode_canonical::<RevocationInfo>(spaced, "cri"),
            Err(EngineError::Encoding(_))
        ));
    }

    #[test]
    fn decode_rejects_unknown_fields() {
        let raw = br#"{"epoch":3,"extra":1,"signature":[1,2]}"#;
        assert!(decode_canonical::<RevocationInfo>(raw, "cri").is_err());
    }

    #[test]
    fn revocation_info_binds_epoch() {
        let revocation = SigningKey::from_bytes(&[5u8; 32]);
        let mut info = RevocationInfo::issue(&revocation, 7);
        info.verify(&revocation.verifying_key()).expect("valid");
        info.epoch = 8;
        assert!(info.verify(&revocation.verifying_key()).is_err());
    }

    #[test]
    fn attribute_commitments_depend_on_position() {
        assert_ne!(
            attribute_commitment(0, b"v", b"s"),
            attribute_commitment(1, b"v", b"s")
        );
    }
}
