//! # Software Credential Engine
//!
//! A transparent reference implementation of [`CredentialEngine`] built on
//! Ed25519 and SHA-256. It enforces the full engine contract (attribute
//! disclosure, revocation epochs, pseudonym binding, enrollment id audit)
//! so the membership layer can be exercised end to end.
//!
//! ## Security Notice
//!
//! This engine provides NO unlinkability. The credential statement and
//! holder key travel inside every proof, so two proofs by the same member
//! are linkable. Hidden attributes stay hidden (salted commitments), but a
//! pairing-based engine must replace this one wherever pseudonymity
//! matters.
//!
//! ## Key Store
//!
//! Non-temporary keys are kept in a process-local store keyed by SKI and
//! resolved through `get_key`. Temporary keys live only as long as their
//! handles.

mod format;
mod keys;

use std::collections::HashMap;
use std::sync::Arc;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::digest::{tagged_hash, Ski};
use crate::engine::{
    Attribute, CredentialEngine, KeyHandle, KeyImportOpts, NymDerivationOpts, ProofSignerOpts,
    ProofVerifierOpts, Signed, SignerOpts, VerifierOpts,
};
use crate::error::EngineError;

pub(crate) use format::{encode_canonical, Credential, CredentialAttribute, RevocationInfo};
pub use keys::POINT_LEN;

use format::{
    attribute_commitment, decode_canonical, enrollment_commitment, AuditData, Disclosure, Proof,
    ProofBody,
};
use keys::{
    downcast, parse_point, IssuerPublicKey, NymPublicKey, NymSecretKey, RevocationPublicKey,
    UserSecretKey,
};

const NYM_DERIVATION_DOMAIN: &str = "idmx/nym";
const NYM_SIGNATURE_DOMAIN: &str = "idmx/nym-signature";

/// Transparent Ed25519/SHA-256 credential engine.
#[derive(Default)]
pub struct SoftwareEngine {
    store: RwLock<HashMap<Ski, KeyHandle>>,
}

impl std::fmt::Debug for SoftwareEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SoftwareEngine({} stored keys)", self.store.read().len())
    }
}

impl SoftwareEngine {
    /// Create an engine with an empty key store.
    pub fn new() -> Self {
        Self::default()
    }

    fn persist(&self, handle: &KeyHandle) {
        self.store.write().insert(handle.ski(), Arc::clone(handle));
    }

    fn parse_credential(
        raw: &[u8],
        user: &UserSecretKey,
        issuer: &IssuerPublicKey,
        issuer_ski: Ski,
    ) -> Result<Credential, EngineError> {
        let credential: Credential = decode_canonical(raw, "credential")
            .map_err(|e| EngineError::Credential(e.to_string()))?;
        if credential.holder != user.key.verifying_key().to_bytes() {
            return Err(EngineError::Credential(
                "credential was not issued to this user secret".to_string(),
            ));
        }
        if credential.attributes.len() != issuer.attribute_names.len() {
            return Err(EngineError::Credential(format!(
                "credential carries {} attributes, issuer defines {}",
                credential.attributes.len(),
                issuer.attribute_names.len()
            )));
        }
        credential
            .statement(issuer_ski.0.to_vec())
            .verify(&issuer.key, &credential.signature)
            .map_err(|e| EngineError::Credential(e.to_string()))?;
        Ok(credential)
    }

    fn nym_message(issuer: Ski, msg: &[u8]) -> Vec<u8> {
        tagged_hash(NYM_SIGNATURE_DOMAIN, &[issuer.as_bytes(), msg]).to_vec()
    }

    fn sign_proof(
        &self,
        user: &UserSecretKey,
        msg: &[u8],
        opts: &ProofSignerOpts,
    ) -> Result<Signed, EngineError> {
        let issuer = downcast::<IssuerPublicKey>(&opts.issuer_public_key, "issuer public key")?;
        let issuer_ski = opts.issuer_public_key.ski();
        let nym = downcast::<NymSecretKey>(&opts.nym, "pseudonym secret key")?;
        if nym.owner != user.key.verifying_key() {
            return Err(EngineError::Signing(
                "pseudonym was not derived from this user secret".to_string(),
            ));
        }
        let credential = Self::parse_credential(&opts.credential, user, issuer, issuer_ski)?;

        let count = credential.attributes.len();
        check_template(&opts.attributes, count, opts.rh_index, opts.eid_index)?;

        let mut disclosed = Vec::new();
        for (index, (slot, held)) in opts.attributes.iter().zip(&credential.attributes).enumerate() {
            if !slot.is_disclosed() {
                continue;
            }
            if let Some(expected) = slot.expected_value() {
                if expected != held.value {
                    return Err(EngineError::Signing(format!(
                        "attribute {index} does not match the credential"
                    )));
                }
            }
            disclosed.push(Disclosure {
                index: index as u64,
                value: held.value.clone(),
                salt: held.salt.clone(),
            });
        }

        if opts.cri.is_empty() {
            return Err(EngineError::InvalidOptions(
                "credential revocation information is required".to_string(),
            ));
        }
        let revocation: RevocationInfo = decode_canonical(&opts.cri, "revocation information")?;

        let mut randomness = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut randomness[..]);
        let enrollment = &credential.attributes[opts.eid_index].value;

        let body = ProofBody {
            statement: credential.statement(issuer_ski.0.to_vec()),
            issuer_signature: credential.signature.clone(),
            nym: nym.key.verifying_key().to_bytes().to_vec(),
            disclosed,
            rh_index: opts.rh_index as u64,
            enrollment_commitment: enrollment_commitment(enrollment, &randomness[..]),
            revocation,
            message: msg.to_vec(),
        };
        let digest = body.message_digest()?;
        let proof = Proof {
            holder_signature: user.key.sign(&digest).to_bytes().to_vec(),
            nym_signature: nym.key.sign(&digest).to_bytes().to_vec(),
            body,
        };
        let audit = AuditData {
            enrollment_randomness: randomness.to_vec(),
        };
        Ok(Signed {
            signature: encode_canonical(&proof)?,
            audit_data: Some(encode_canonical(&audit)?),
        })
    }

    fn verify_proof(
        &self,
        issuer_handle: &KeyHandle,
        raw: &[u8],
        msg: &[u8],
        opts: &ProofVerifierOpts,
    ) -> Result<bool, EngineError> {
        let issuer = downcast::<IssuerPublicKey>(issuer_handle, "issuer public key")?;
        let revocation =
            downcast::<RevocationPublicKey>(&opts.revocation_public_key, "revocation public key")?;
        let proof: Proof = decode_canonical(raw, "proof")?;
        let body = &proof.body;

        if body.statement.issuer != issuer_handle.ski().0 {
            return Err(EngineError::Verification(
                "proof was issued under a different issuer".to_string(),
            ));
        }
        if let Some(expected) = &opts.nym_public_key {
            if body.nym != expected.bytes()? {
                return Err(EngineError::Verification(
                    "proof is bound to a different pseudonym".to_string(),
                ));
            }
        }
        if body.message != msg {
            return Err(EngineError::Verification(
                "proof covers a different message".to_string(),
            ));
        }

        let count = body.statement.commitments.len();
        if count != issuer.attribute_names.len() {
            return Err(EngineError::Verification(format!(
                "proof commits to {count} attributes, issuer defines {}",
                issuer.attribute_names.len()
            )));
        }
        check_template(&opts.attributes, count, opts.rh_index, opts.eid_index)
            .map_err(|e| EngineError::Verification(e.to_string()))?;
        if body.rh_index != opts.rh_index as u64 {
            return Err(EngineError::Verification(format!(
                "revocation handle index {} does not match expected {}",
                body.rh_index, opts.rh_index
            )));
        }

        body.statement.verify(&issuer.key, &body.issuer_signature)?;
        check_disclosures(&body.disclosed, &body.statement.commitments, &opts.attributes)?;

        body.revocation.verify(&revocation.key)?;
        if body.revocation.epoch != opts.epoch {
            return Err(EngineError::Verification(format!(
                "proof epoch {} does not match expected {}",
                body.revocation.epoch, opts.epoch
            )));
        }

        let holder = parse_point(&body.statement.holder, "holder key")
            .map_err(|e| EngineError::Verification(e.to_string()))?;
        let nym = parse_point(&body.nym, "pseudonym")
            .map_err(|e| EngineError::Verification(e.to_string()))?;
        proof.verify_signatures(&holder, &nym)?;

        if let Some(audit) = &opts.audit {
            let data: AuditData = decode_canonical(&audit.audit_data, "audit data")?;
            let expected = enrollment_commitment(&audit.enrollment_id, &data.enrollment_randomness);
            if expected != body.enrollment_commitment {
                return Err(EngineError::Verification(
                    "enrollment id does not match the proof".to_string(),
                ));
            }
        }
        Ok(true)
    }

    fn verify_credential(
        &self,
        user: &UserSecretKey,
        raw: &[u8],
        issuer_handle: &KeyHandle,
        attributes: &[Attribute],
    ) -> Result<bool, EngineError> {
        let issuer = downcast::<IssuerPublicKey>(issuer_handle, "issuer public key")?;
        let credential = Self::parse_credential(raw, user, issuer, issuer_handle.ski())?;
        if attributes.len() != credential.attributes.len() {
            return Err(EngineError::Credential(format!(
                "expected {} attributes, credential carries {}",
                attributes.len(),
                credential.attributes.len()
            )));
        }
        for (index, (slot, held)) in attributes.iter().zip(&credential.attributes).enumerate() {
            if let Some(expected) = slot.expected_value() {
                if expected != held.value {
                    return Err(EngineError::Credential(format!(
                        "attribute {index} does not match the credential"
                    )));
                }
            }
        }
        Ok(true)
    }
}

fn check_template(
    template: &[Attribute],
    count: usize,
    rh_index: usize,
    eid_index: usize,
) -> Result<(), EngineError> {
    if template.len() != count {
        return Err(EngineError::InvalidOptions(format!(
            "template has {} slots, credential has {count} attributes",
            template.len()
        )));
    }
    for (what, index) in [("revocation handle", rh_index), ("enrollment id", eid_index)] {
        match template.get(index) {
            Some(Attribute::Hidden) => {}
            Some(_) => {
                return Err(EngineError::InvalidOptions(format!(
                    "{what} at index {index} must stay hidden"
                )))
            }
            None => {
                return Err(EngineError::InvalidOptions(format!(
                    "{what} index {index} is out of range"
                )))
            }
        }
    }
    Ok(())
}

fn check_disclosures(
    disclosed: &[Disclosure],
    commitments: &[Vec<u8>],
    template: &[Attribute],
) -> Result<(), EngineError> {
    let expected: Vec<usize> = template
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_disclosed())
        .map(|(i, _)| i)
        .collect();
    let opened: Vec<usize> = disclosed.iter().map(|d| d.index as usize).collect();
    if opened != expected {
        return Err(EngineError::Verification(format!(
            "proof discloses attributes {opened:?}, expected {expected:?}"
        )));
    }
    for d in disclosed {
        let index = d.index as usize;
        if attribute_commitment(index, &d.value, &d.salt) != commitments[index] {
            return Err(EngineError::Verification(format!(
                "opening of attribute {index} does not match its commitment"
            )));
        }
        if let Some(value) = template[index].expected_value() {
            if value != d.value {
                return Err(EngineError::Verification(format!(
                    "disclosed attribute {index} does not match the expected value"
                )));
            }
        }
    }
    Ok(())
}

impl CredentialEngine for SoftwareEngine {
    fn key_import(&self, raw: &[u8], opts: &KeyImportOpts) -> Result<KeyHandle, EngineError> {
        let (handle, temporary): (KeyHandle, bool) = match opts {
            KeyImportOpts::IssuerPublicKey {
                attribute_names,
                temporary,
            } => {
                if attribute_names.is_empty() {
                    return Err(EngineError::KeyImport(
                        "issuer public key requires attribute names".to_string(),
                    ));
                }
                let key = parse_point(raw, "issuer public key")?;
                let handle: KeyHandle = Arc::new(IssuerPublicKey {
                    key,
                    attribute_names: attribute_names.clone(),
                });
                (handle, *temporary)
            }
            KeyImportOpts::RevocationPublicKey { temporary } => {
                let key = parse_point(raw, "revocation public key")?;
                let handle: KeyHandle = Arc::new(RevocationPublicKey { key });
                (handle, *temporary)
            }
            KeyImportOpts::UserSecretKey { temporary } => {
                let seed: Zeroizing<[u8; 32]> = Zeroizing::new(raw.try_into().map_err(|_| {
                    EngineError::KeyImport(format!(
                        "user secret key must be 32 bytes, got {}",
                        raw.len()
                    ))
                })?);
                let handle: KeyHandle = Arc::new(UserSecretKey {
                    key: SigningKey::from_bytes(&seed),
                });
                (handle, *temporary)
            }
            KeyImportOpts::NymPublicKey { temporary } => {
                let key = parse_point(raw, "pseudonym public key")?;
                let handle: KeyHandle = Arc::new(NymPublicKey { key });
                (handle, *temporary)
            }
        };
        if !temporary {
            self.persist(&handle);
        }
        Ok(handle)
    }

    fn key_derive(
        &self,
        key: &KeyHandle,
        opts: &NymDerivationOpts,
    ) -> Result<KeyHandle, EngineError> {
        let user = downcast::<UserSecretKey>(key, "user secret key")?;
        downcast::<IssuerPublicKey>(&opts.issuer_public_key, "issuer public key")?;
        let issuer_ski = opts.issuer_public_key.ski();

        let mut nonce = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut nonce[..]);
        let user_seed = Zeroizing::new(user.key.to_bytes());
        let seed = Zeroizing::new(tagged_hash(
            NYM_DERIVATION_DOMAIN,
            &[&user_seed[..], issuer_ski.as_bytes(), &nonce[..]],
        ));

        let handle: KeyHandle = Arc::new(NymSecretKey {
            key: SigningKey::from_bytes(&seed),
            owner: user.key.verifying_key(),
            issuer: issuer_ski,
        });
        if !opts.temporary {
            self.persist(&handle);
        }
        tracing::debug!(ski = %handle.ski(), temporary = opts.temporary, "derived pseudonym");
        Ok(handle)
    }

    fn sign(&self, key: &KeyHandle, msg: &[u8], opts: &SignerOpts) -> Result<Signed, EngineError> {
        let user = downcast::<UserSecretKey>(key, "user secret key")?;
        match opts {
            SignerOpts::Nym {
                nym,
                issuer_public_key,
            } => {
                let nym = downcast::<NymSecretKey>(nym, "pseudonym secret key")?;
                if nym.owner != user.key.verifying_key() {
                    return Err(EngineError::Signing(
                        "pseudonym was not derived from this user secret".to_string(),
                    ));
                }
                let issuer_ski = issuer_public_key.ski();
                if nym.issuer != issuer_ski {
                    return Err(EngineError::Signing(
                        "pseudonym is bound to a different issuer".to_string(),
                    ));
                }
                let sig = nym.key.sign(&Self::nym_message(issuer_ski, msg));
                Ok(Signed {
                    signature: sig.to_bytes().to_vec(),
                    audit_data: None,
                })
            }
            SignerOpts::Proof(proof_opts) => self.sign_proof(user, msg, proof_opts),
        }
    }

    fn verify(
        &self,
        key: &KeyHandle,
        signature: &[u8],
        msg: &[u8],
        opts: &VerifierOpts,
    ) -> Result<bool, EngineError> {
        match opts {
            VerifierOpts::Nym { issuer_public_key } => {
                let nym = downcast::<NymPublicKey>(key, "pseudonym public key")?;
                let sig = Signature::from_slice(signature).map_err(|e| {
                    EngineError::Verification(format!("malformed pseudonym signature: {e}"))
                })?;
                nym.key
                    .verify(&Self::nym_message(issuer_public_key.ski(), msg), &sig)
                    .map_err(|e| EngineError::Verification(format!("pseudonym signature: {e}")))?;
                Ok(true)
            }
            VerifierOpts::Proof(proof_opts) => self.verify_proof(key, signature, msg, proof_opts),
            VerifierOpts::Credential {
                issuer_public_key,
                attributes,
            } => {
                let user = downcast::<UserSecretKey>(key, "user secret key")?;
                self.verify_credential(user, signature, issuer_public_key, attributes)
            }
        }
    }

    fn get_key(&self, ski: &Ski) -> Result<KeyHandle, EngineError> {
        self.store
            .read()
            .get(ski)
            .cloned()
            .ok_or_else(|| EngineError::KeyNotFound(ski.to_hex()))
    }

    fn engine_name(&self) -> &str {
        "SoftwareEngine"
    }
}
