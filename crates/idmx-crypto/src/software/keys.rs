//! Key material held by the software engine.
//!
//! Public keys and pseudonyms are 32-byte compressed Edwards points. Secret
//! keys wrap `ed25519_dalek::SigningKey`, which zeroizes on drop, and do not
//! expose their bytes.

use std::any::Any;
use std::sync::Arc;

use ed25519_dalek::{SigningKey, VerifyingKey};

use crate::digest::Ski;
use crate::engine::{Key, KeyHandle, KeyKind};
use crate::error::EngineError;

/// Length of every public point encoding produced by this engine.
pub const POINT_LEN: usize = 32;

pub(crate) fn parse_point(raw: &[u8], what: &str) -> Result<VerifyingKey, EngineError> {
    let bytes: [u8; POINT_LEN] = raw.try_into().map_err(|_| {
        EngineError::KeyImport(format!(
            "{what} must be {POINT_LEN} bytes, got {}",
            raw.len()
        ))
    })?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| EngineError::KeyImport(format!("invalid {what}: {e}")))
}

#[derive(Debug, Clone)]
pub(crate) struct IssuerPublicKey {
    pub key: VerifyingKey,
    pub attribute_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct RevocationPublicKey {
    pub key: VerifyingKey,
}

pub(crate) struct UserSecretKey {
    pub key: SigningKey,
}

pub(crate) struct NymSecretKey {
    pub key: SigningKey,
    /// Public key of the user secret the pseudonym was derived from.
    pub owner: VerifyingKey,
    /// Issuer the pseudonym is bound to.
    pub issuer: Ski,
}

#[derive(Debug, Clone)]
pub(crate) struct NymPublicKey {
    pub key: VerifyingKey,
}

impl std::fmt::Debug for UserSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserSecretKey(<private>)")
    }
}

impl std::fmt::Debug for NymSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NymSecretKey({:?}, <private>)", self.ski())
    }
}

impl Key for IssuerPublicKey {
    fn ski(&self) -> Ski {
        Ski::of(self.key.as_bytes())
    }

    fn bytes(&self) -> Result<Vec<u8>, EngineError> {
        Ok(self.key.to_bytes().to_vec())
    }

    fn is_private(&self) -> bool {
        false
    }

    fn public_key(&self) -> Result<KeyHandle, EngineError> {
        Ok(Arc::new(self.clone()))
    }

    fn kind(&self) -> KeyKind {
        KeyKind::IssuerPublic
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Key for RevocationPublicKey {
    fn ski(&self) -> Ski {
        Ski::of(self.key.as_bytes())
    }

    fn bytes(&self) -> Result<Vec<u8>, EngineError> {
        Ok(self.key.to_bytes().to_vec())
    }

    fn is_private(&self) -> bool {
        false
    }

    fn public_key(&self) -> Result<KeyHandle, EngineError> {
        Ok(Arc::new(self.clone()))
    }

    fn kind(&self) -> KeyKind {
        KeyKind::RevocationPublic
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Key for UserSecretKey {
    fn ski(&self) -> Ski {
        Ski::of(self.key.verifying_key().as_bytes())
    }

    fn bytes(&self) -> Result<Vec<u8>, EngineError> {
        Err(EngineError::UnsupportedKey(
            "user secret keys are not exportable".to_string(),
        ))
    }

    fn is_private(&self) -> bool {
        true
    }

    fn public_key(&self) -> Result<KeyHandle, EngineError> {
        Err(EngineError::UnsupportedKey(
            "user secret keys have no standalone public key".to_string(),
        ))
    }

    fn kind(&self) -> KeyKind {
        KeyKind::UserSecret
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Key for NymSecretKey {
    fn ski(&self) -> Ski {
        Ski::of(self.key.verifying_key().as_bytes())
    }

    fn bytes(&self) -> Result<Vec<u8>, EngineError> {
        Err(EngineError::UnsupportedKey(
            "pseudonym secret keys are not exportable".to_string(),
        ))
    }

    fn is_private(&self) -> bool {
        true
    }

    fn public_key(&self) -> Result<KeyHandle, EngineError> {
        Ok(Arc::new(NymPublicKey {
            key: self.key.verifying_key(),
        }))
    }

    fn kind(&self) -> KeyKind {
        KeyKind::NymSecret
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Key for NymPublicKey {
    fn ski(&self) -> Ski {
        Ski::of(self.key.as_bytes())
    }

    fn bytes(&self) -> Result<Vec<u8>, EngineError> {
        Ok(self.key.to_bytes().to_vec())
    }

    fn is_private(&self) -> bool {
        false
    }

    fn public_key(&self) -> Result<KeyHandle, EngineError> {
        Ok(Arc::new(self.clone()))
    }

    fn kind(&self) -> KeyKind {
        KeyKind::NymPublic
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Downcast a handle to a concrete key type of this engine.
pub(crate) fn downcast<'a, T: 'static>(
    handle: &'a KeyHandle,
    expected: &str,
) -> Result<&'a T, EngineError> {
    handle.as_any().downcast_ref::<T>().ok_or_else(|| {
        EngineError::UnsupportedKey(format!(
            "expected {expected}, got {:?} key",
            handle.kind()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nym_halves_share_ski() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let secret = NymSecretKey {
            owner: key.verifying_key(),
            key,
            issuer: Ski::of(b"issuer"),
        };
        let public = secret.public_key().expect("public");
        assert_eq!(public.ski(), secret.ski());
        assert_eq!(public.kind(), KeyKind::NymPublic);
        assert_eq!(public.bytes().expect("bytes").len(), POINT_LEN);
    }

    #[test]
    fn secret_keys_refuse_export() {
        let user = UserSecretKey {
            key: SigningKey::from_bytes(&[1u8; 32]),
        };
        assert!(user.bytes().is_err());
        assert!(user.is_private());
        assert_eq!(format!("{user:?}"), "UserSecretKey(<private>)");
    }

    #[test]
    fn parse_point_rejects_wrong_length() {
        assert!(matches!(
            parse_point(&[0u8; 31], "nym"),
            Err(EngineError::KeyImport(_))
        ));
    }

    #[test]
    fn downcast_reports_kind_mismatch() {
        let handle: KeyHandle = Arc::new(NymPublicKey {
            key: SigningKey::from_bytes(&[3u8; 32]).verifying_key(),
        });
        assert!(downcast::<NymPublicKey>(&handle, "nym public key").is_ok());
        let err = downcast::<IssuerPublicKey>(&handle, "issuer public key").unwrap_err();
        assert!(format!("{err}").contains("NymPublic"));
    }
}
