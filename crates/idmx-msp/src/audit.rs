//! # Audit Information
//!
//! Side-channel record handed to a designated auditor when an identity is
//! issued. It carries the proof randomness and the attribute values the
//! proof commits to, `[OU, role code as decimal text, enrollment id]`, so
//! the auditor can confirm which enrolled member stands behind an
//! otherwise anonymous identity.
//!
//! The encoding is canonical JSON: [`AuditInfo::to_bytes`] and
//! [`AuditInfo::from_bytes`] are exact inverses, and non-canonical input
//! is rejected.

use idmx_core::attributes::{ENROLLMENT_ID_INDEX, OU_INDEX, ROLE_INDEX};
use idmx_core::CanonicalBytes;
use idmx_crypto::AuditExpectation;
use serde::{Deserialize, Serialize};

use crate::error::MspError;
use crate::identity::Identity;
use crate::support::MembershipSupport;

const ATTRIBUTE_COUNT: usize = 3;

/// Proof randomness plus the committed attribute values of one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditInfo {
    #[serde(with = "hex")]
    randomness: Vec<u8>,
    attributes: Vec<String>,
}

impl AuditInfo {
    pub(crate) fn new(randomness: Vec<u8>, ou: &str, role_code: i64, enrollment_id: &str) -> Self {
        Self {
            randomness,
            attributes: vec![
                ou.to_string(),
                role_code.to_string(),
                enrollment_id.to_string(),
            ],
        }
    }

    /// Canonical encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MspError> {
        CanonicalBytes::new(self)
            .map(CanonicalBytes::into_bytes)
            .map_err(|e| MspError::InternalInvariant(format!("encode audit info: {e}")))
    }

    /// Decode audit info produced by [`AuditInfo::to_bytes`].
    pub fn from_bytes(raw: &[u8]) -> Result<Self, MspError> {
        let info: Self = serde_json::from_slice(raw)
            .map_err(|e| MspError::AuditMismatch(format!("malformed audit info: {e}")))?;
        let canonical = CanonicalBytes::matches(&info, raw)
            .map_err(|e| MspError::AuditMismatch(format!("malformed audit info: {e}")))?;
        if !canonical {
            return Err(MspError::AuditMismatch(
                "audit info is not canonically encoded".to_string(),
            ));
        }
        if info.attributes.len() != ATTRIBUTE_COUNT {
            return Err(MspError::AuditMismatch(format!(
                "audit info carries {} attributes, expected {ATTRIBUTE_COUNT}",
                info.attributes.len()
            )));
        }
        Ok(info)
    }

    /// The enrollment id of the audited member.
    pub fn enrollment_id(&self) -> &str {
        self.attributes
            .get(ENROLLMENT_ID_INDEX)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Disclosed organizational unit the proof commits to.
    pub fn organizational_unit(&self) -> &str {
        self.attributes
            .get(OU_INDEX)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Confirm that `raw` is the identity this audit info was produced for.
    pub fn match_identity(&self, support: &MembershipSupport, raw: &[u8]) -> Result<(), MspError> {
        let parsed = support.deserialize(raw, false)?;
        let identity = &parsed.identity;

        let ou = &parsed.ou.organizational_unit_identifier;
        if self.organizational_unit() != ou {
            tracing::warn!(identity = %identity.identifier(), "audit organizational unit mismatch");
            return Err(MspError::AuditMismatch(format!(
                "organizational unit of {} differs",
                identity.identifier()
            )));
        }
        let role = identity.role().code().to_string();
        if self.attributes.get(ROLE_INDEX) != Some(&role) {
            tracing::warn!(identity = %identity.identifier(), "audit role mismatch");
            return Err(MspError::AuditMismatch(format!(
                "role of {} differs",
                identity.identifier()
            )));
        }

        let expectation = AuditExpectation {
            enrollment_id: self.enrollment_id().as_bytes().to_vec(),
            audit_data: self.randomness.clone(),
        };
        match support.check_proof(
            identity.proof(),
            &parsed.nym_public_key,
            ou,
            identity.role(),
            Some(expectation),
        ) {
            Ok(true) => {
                tracing::debug!(identity = %identity.identifier(), "audit info matches");
                Ok(())
            }
            Ok(false) => Err(MspError::InternalInvariant(format!(
                "engine rejected the audit of {} without an error",
                identity.identifier()
            ))),
            Err(e) => {
                tracing::warn!(identity = %identity.identifier(), "audit proof mismatch");
                Err(MspError::AuditMismatch(format!(
                    "{}: {e}",
                    identity.identifier()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AuditInfo {
        AuditInfo::new(vec![1, 2, 3], "manufacturing", 2, "alice")
    }

    #[test]
    fn bytes_are_exact_inverses() {
        let info = sample();
        let raw = info.to_bytes().expect("encode");
        let back = AuditInfo::from_bytes(&raw).expect("decode");
        assert_eq!(back, info);
        assert_eq!(back.to_bytes().expect("re-encode"), raw);
    }

    #[test]
    fn accessors() {
        let info = sample();
        assert_eq!(info.enrollment_id(), "alice");
        assert_eq!(info.organizational_unit(), "manufacturing");
    }

    #[test]
    fn rejects_non_canonical_and_short() {
        let spaced = br#"{"attributes":["a","1","e"], "randomness":"01"}"#;
        assert!(matches!(
            AuditInfo::from_bytes(spaced),
            Err(MspError::AuditMismatch(_))
        ));
        let short = br#"{"attributes":["a"],"randomness":"01"}"#;
        assert!(matches!(
            AuditInfo::from_bytes(short),
            Err(MspError::AuditMismatch(_))
        ));
        assert!(AuditInfo::from_bytes(b"not json").is_err());
    }

    #[test]
    fn proof_rejection_without_error_is_internal() {
        use std::sync::Arc;

        use crate::test_engine::{enrolled, provider, rejecting_support};
        use idmx_crypto::testing::TestAuthority;
        use idmx_crypto::SoftwareEngine;

        let authority = TestAuthority::new("OrgXMSP");
        let config = enrolled(&authority);
        let (raw, audit) = provider(&config, Arc::new(SoftwareEngine::new()))
            .identity()
            .expect("identity");
        let audit = AuditInfo::from_bytes(&audit).expect("audit info");
        assert!(matches!(
            audit.match_identity(&rejecting_support(&config), &raw),
            Err(MspError::InternalInvariant(_))
        ));
    }
}
