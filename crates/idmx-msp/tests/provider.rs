mod common;

use std::sync::Arc;

use idmx_core::{Role, SerializedIdentity, SerializedNymIdentity};
use idmx_crypto::testing::TestAuthority;
use idmx_crypto::{sha256_hex, SoftwareEngine};
use idmx_msp::{
    AuditInfo, Identity, IdentityProvider, InMemorySignerRegistry, MspError, RegistryError,
    Signer, SignerRegistry, Verifier,
};
use prost::Message;

use common::{member, member_from};

// ─── Construction ───────────────────────────────────────────────────

#[test]
fn provider_without_signer_fails() {
    let authority = TestAuthority::new("OrgXMSP");
    let result = IdentityProvider::new(
        &authority.config(),
        Arc::new(SoftwareEngine::new()),
        Arc::new(InMemorySignerRegistry::new()),
    );
    assert!(matches!(result, Err(MspError::Setup(_))));
}

#[test]
fn provider_from_yaml() {
    let authority = TestAuthority::new("OrgXMSP");
    let config = authority
        .enroll("manufacturing", Role::MEMBER_CODE, "bob")
        .expect("enroll");
    let doc = config.to_yaml_string().expect("yaml");
    let provider = IdentityProvider::from_yaml_str(
        &doc,
        Arc::new(SoftwareEngine::new()),
        Arc::new(InMemorySignerRegistry::new()),
    )
    .expect("provider");
    assert_eq!(provider.enrollment_id(), "bob");
    provider.identity().expect("identity");
}

#[test]
fn provider_display_names_issuer_key() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    assert_eq!(
        m.provider.to_string(),
        format!("Idemix Provider [{}]", sha256_hex(&authority.issuer_public_key()))
    );
}

#[test]
fn tampered_credential_fails_self_check() {
    let authority = TestAuthority::new("OrgXMSP");
    let mut config = authority
        .enroll("manufacturing", Role::ADMIN_CODE, "alice")
        .expect("enroll");
    if let Some(signer) = config.signer.as_mut() {
        signer.enrollment_id = "mallory".to_string();
    }
    let m = member_from(config);
    assert!(matches!(
        m.provider.identity(),
        Err(MspError::CredentialInvalid(_))
    ));
    assert!(m.registry.is_empty());
}

#[test]
fn combined_role_mask_issues_admin_identity() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(
        &authority,
        "manufacturing",
        Role::MEMBER_CODE | Role::ADMIN_CODE,
        "carol",
    );
    let (raw, audit) = m.provider.identity().expect("identity");

    let verifier = m.provider.deserialize_verifier(&raw).expect("verifier");
    assert_eq!(verifier.role(), Role::Admin);
    let info = m.provider.info(&raw, Some(&audit)).expect("info");
    assert_eq!(
        info,
        format!("MSP.Idemix: [carol][{}][OrgXMSP][manufacturing][ADMIN]", sha256_hex(&raw))
    );
}

#[test]
fn configured_role_must_match_credential() {
    let authority = TestAuthority::new("OrgXMSP");
    let mut config = authority
        .enroll("manufacturing", Role::MEMBER_CODE, "bob")
        .expect("enroll");
    if let Some(signer) = config.signer.as_mut() {
        signer.role = Role::ADMIN_CODE;
    }
    let m = member_from(config);
    assert!(matches!(
        m.provider.identity(),
        Err(MspError::CredentialInvalid(_))
    ));
    assert!(m.registry.is_empty());
}

// ─── Issuance and round trip ────────────────────────────────────────

#[test]
fn identity_round_trips() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::ADMIN_CODE, "alice");
    let (raw, _audit) = m.provider.identity().expect("identity");

    let parsed = m.provider.support().deserialize(&raw, true).expect("deserialize");
    assert_eq!(parsed.identity.serialize().expect("serialize"), raw);
    assert_eq!(parsed.identity.msp_identifier(), "OrgXMSP");
    assert_eq!(parsed.identity.role(), Role::Admin);
    assert_eq!(parsed.ou.organizational_unit_identifier, "manufacturing");
    assert!(parsed.identity.anonymous());
    assert!(parsed.identity.expires_at().is_none());

    let again = m
        .provider
        .deserialize_verifier(&parsed.identity.serialize().expect("serialize"))
        .expect("verifier");
    assert_eq!(again.identifier(), parsed.identity.identifier());
    assert_eq!(again.role(), parsed.identity.role());
    assert_eq!(again.organizational_unit(), parsed.identity.organizational_unit());
}

#[test]
fn wire_form_splits_pseudonym_at_midpoint() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    let (raw, _) = m.provider.identity().expect("identity");

    let envelope = SerializedIdentity::decode(raw.as_slice()).expect("envelope");
    assert_eq!(envelope.mspid, "OrgXMSP");
    let inner = SerializedNymIdentity::decode(envelope.id_bytes.as_slice()).expect("inner");
    assert_eq!(inner.nym_x.len(), 16);
    assert_eq!(inner.nym_y.len(), 16);

    let identity = m.provider.deserialize_verifier(&raw).expect("verifier");
    assert_eq!(identity.nym_public_key(), inner.nym_public_key().as_slice());
    assert_eq!(identity.identifier().id, hex::encode(inner.nym_public_key()));
    assert_eq!(
        identity.identifier().to_string(),
        format!("OrgXMSP:{}", identity.identifier().id)
    );
}

#[test]
fn identity_registers_signer() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    let (raw, _) = m.provider.identity().expect("identity");
    assert_eq!(m.registry.len(), 1);

    let signer = m.registry.signer(&raw).expect("registered signer");
    let signature = signer.sign(b"payload").expect("sign");
    m.registry
        .verifier(&raw)
        .expect("registered verifier")
        .verify(b"payload", &signature)
        .expect("verify");
}

struct RefusingRegistry;

impl SignerRegistry for RefusingRegistry {
    fn register_signer(
        &self,
        _identity: &[u8],
        _signer: Arc<dyn Signer>,
        _verifier: Arc<dyn Verifier>,
    ) -> Result<(), RegistryError> {
        Err(RegistryError::Rejected("registry offline".to_string()))
    }
}

#[test]
fn registration_failure_fails_identity() {
    let authority = TestAuthority::new("OrgXMSP");
    let config = authority
        .enroll("manufacturing", Role::MEMBER_CODE, "bob")
        .expect("enroll");
    let provider = IdentityProvider::new(
        &config,
        Arc::new(SoftwareEngine::new()),
        Arc::new(RefusingRegistry),
    )
    .expect("provider");
    assert!(matches!(
        provider.identity(),
        Err(MspError::Registration { .. })
    ));
    // Transient identities never touch the registry.
    provider.signer_identity().expect("signer identity");
}

#[test]
fn organizational_units_keyed_by_issuer_key() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    let (raw, _) = m.provider.identity().expect("identity");
    let identity = m.provider.deserialize_verifier(&raw).expect("verifier");
    let units = identity.organizational_units();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].certifiers_identifier, authority.issuer_public_key());
    assert_eq!(units[0].organizational_unit_identifier, "manufacturing");
}

#[test]
fn satisfies_principal_is_not_implemented() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    let signing = m.provider.signer_identity().expect("signer identity");
    assert!(matches!(
        signing.satisfies_principal(b"principal"),
        Err(MspError::NotImplemented(_))
    ));
}

// ─── Validation ─────────────────────────────────────────────────────

#[test]
fn identity_from_other_authority_is_invalid() {
    let org_x = TestAuthority::new("OrgXMSP");
    let org_y = TestAuthority::new("OrgYMSP");
    let x = member(&org_x, "manufacturing", Role::MEMBER_CODE, "bob");
    let y = member(&org_y, "sales", Role::MEMBER_CODE, "carol");
    let (raw, _) = y.provider.identity().expect("identity");

    assert!(matches!(
        x.provider.deserialize_verifier(&raw),
        Err(MspError::InvalidIdentity(_))
    ));
    // Without the validity check the bytes still parse.
    x.provider.support().deserialize(&raw, false).expect("parse only");
}

#[test]
fn relabelled_authority_name_is_invalid() {
    let org_x = TestAuthority::new("OrgXMSP");
    let m = member(&org_x, "manufacturing", Role::MEMBER_CODE, "bob");
    let (raw, _) = m.provider.identity().expect("identity");

    let mut envelope = SerializedIdentity::decode(raw.as_slice()).expect("envelope");
    envelope.mspid = "OrgZMSP".to_string();
    let relabelled = envelope.encode_to_vec();
    assert!(matches!(
        m.provider.deserialize_verifier(&relabelled),
        Err(MspError::InvalidIdentity(_))
    ));
}

#[test]
fn upgraded_role_is_invalid() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    let (raw, _) = m.provider.identity().expect("identity");

    let mut envelope = SerializedIdentity::decode(raw.as_slice()).expect("envelope");
    let mut inner = SerializedNymIdentity::decode(envelope.id_bytes.as_slice()).expect("inner");
    inner.role = idmx_core::MspRole {
        msp_identifier: "OrgXMSP".to_string(),
        role: idmx_core::MspRoleType::Admin as i32,
    }
    .encode_to_vec();
    envelope.id_bytes = inner.encode_to_vec();
    assert!(matches!(
        m.provider.deserialize_verifier(&envelope.encode_to_vec()),
        Err(MspError::InvalidIdentity(_))
    ));
}

#[test]
fn role_message_is_reencoded_verbatim() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::ADMIN_CODE, "alice");
    let (raw, _) = m.provider.identity().expect("identity");

    let mut envelope = SerializedIdentity::decode(raw.as_slice()).expect("envelope");
    let mut inner = SerializedNymIdentity::decode(envelope.id_bytes.as_slice()).expect("inner");
    inner.role = idmx_core::MspRole {
        msp_identifier: "OrgYMSP".to_string(),
        role: idmx_core::MspRoleType::Admin as i32,
    }
    .encode_to_vec();
    envelope.id_bytes = inner.encode_to_vec();
    let relabelled = envelope.encode_to_vec();

    let parsed = m.provider.support().deserialize(&relabelled, true).expect("deserialize");
    assert_eq!(parsed.role.msp_identifier, "OrgYMSP");
    assert_eq!(parsed.identity.serialize().expect("serialize"), relabelled);
}

#[test]
fn garbage_is_malformed() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    for raw in [&b""[..], b"\xff\xff\xff", b"\x0a\x03Org"] {
        assert!(matches!(
            m.provider.support().deserialize(raw, false),
            Err(MspError::MalformedIdentity { .. })
        ));
    }

    let inner = SerializedNymIdentity {
        nym_x: vec![1; 16],
        nym_y: Vec::new(),
        ..Default::default()
    };
    let envelope = SerializedIdentity {
        mspid: "OrgXMSP".to_string(),
        id_bytes: inner.encode_to_vec(),
    };
    assert!(matches!(
        m.provider.support().deserialize(&envelope.encode_to_vec(), false),
        Err(MspError::MalformedIdentity { .. })
    ));
}

// ─── Signing ────────────────────────────────────────────────────────

#[test]
fn sign_and_verify() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    let signing = m.provider.signer_identity().expect("signer identity");
    let other = m.provider.signer_identity().expect("signer identity");

    let signature = signing.sign(b"transaction").expect("sign");
    signing
        .public_version()
        .verify(b"transaction", &signature)
        .expect("verify");
    assert!(matches!(
        signing.verify(b"transactioN", &signature),
        Err(MspError::InvalidSignature(_))
    ));
    assert!(matches!(
        other.public_version().verify(b"transaction", &signature),
        Err(MspError::InvalidSignature(_))
    ));
}

#[test]
fn deserialize_signer_recovers_persisted_pseudonym() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    let (raw, _) = m.provider.identity().expect("identity");

    let signer = m.provider.deserialize_signer(&raw).expect("signer");
    assert_eq!(signer.serialize().expect("serialize"), raw);
    assert_eq!(signer.enrollment_id(), "bob");
    let signature = signer.sign(b"block").expect("sign");

    let rehydrated = m
        .provider
        .deserialize_signing_identity(&raw)
        .expect("signing identity");
    rehydrated.verify(b"block", &signature).expect("verify");
}

#[test]
fn transient_pseudonym_is_not_recoverable() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    let transient = m.provider.signer_identity().expect("signer identity");
    let raw = transient.serialize().expect("serialize");
    assert!(matches!(
        m.provider.deserialize_signer(&raw),
        Err(MspError::NoSecretMaterial(_))
    ));
}

#[test]
fn deserialize_signer_on_other_provider_has_no_secret() {
    let authority = TestAuthority::new("OrgXMSP");
    let first = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    let second = member(&authority, "manufacturing", Role::MEMBER_CODE, "dave");
    let (raw, _) = first.provider.identity().expect("identity");

    second.provider.deserialize_verifier(&raw).expect("verifier");
    assert!(matches!(
        second.provider.deserialize_signer(&raw),
        Err(MspError::NoSecretMaterial(_))
    ));
    assert!(matches!(
        second.provider.deserialize_signing_identity(&raw),
        Err(MspError::NoSecretMaterial(_))
    ));
}

// ─── Audit ──────────────────────────────────────────────────────────

#[test]
fn info_scenario_with_and_without_audit() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::ADMIN_CODE, "alice");
    let (raw, audit) = m.provider.identity().expect("identity");

    let info = m.provider.info(&raw, Some(&audit)).expect("info");
    assert!(info.contains("alice"));
    assert!(info.contains("manufacturing"));
    assert!(info.contains("ADMIN"));
    assert_eq!(
        info,
        format!("MSP.Idemix: [alice][{}][OrgXMSP][manufacturing][ADMIN]", sha256_hex(&raw))
    );

    let anonymous = m.provider.info(&raw, None).expect("info");
    assert!(!anonymous.contains("alice"));
    assert!(anonymous.starts_with("MSP.Idemix: []["));
}

#[test]
fn empty_audit_info_is_treated_as_absent() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    let (raw, _) = m.provider.identity().expect("identity");

    let empty = m.provider.info(&raw, Some(&[])).expect("info");
    assert_eq!(empty, m.provider.info(&raw, None).expect("info"));
    assert!(empty.starts_with("MSP.Idemix: []["));
}

#[test]
fn audit_info_matches_only_its_identity() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    let (raw, audit_bytes) = m.provider.identity().expect("identity");
    let (other_raw, _) = m.provider.identity().expect("identity");

    let audit = AuditInfo::from_bytes(&audit_bytes).expect("audit info");
    assert_eq!(audit.to_bytes().expect("bytes"), audit_bytes);
    assert_eq!(audit.enrollment_id(), "bob");
    audit
        .match_identity(m.provider.support(), &raw)
        .expect("match");
    assert!(matches!(
        audit.match_identity(m.provider.support(), &other_raw),
        Err(MspError::AuditMismatch(_))
    ));
    assert!(matches!(
        m.provider.info(&other_raw, Some(&audit_bytes)),
        Err(MspError::AuditMismatch(_))
    ));
}

#[test]
fn audit_info_does_not_match_other_members_identity() {
    let authority = TestAuthority::new("OrgXMSP");
    let bob = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    let eve = member(&authority, "manufacturing", Role::MEMBER_CODE, "eve");
    let (_, bob_audit) = bob.provider.identity().expect("identity");
    let (eve_raw, _) = eve.provider.identity().expect("identity");

    let audit = AuditInfo::from_bytes(&bob_audit).expect("audit info");
    assert!(matches!(
        audit.match_identity(bob.provider.support(), &eve_raw),
        Err(MspError::AuditMismatch(_))
    ));
}

// ─── Concurrency ────────────────────────────────────────────────────

#[test]
fn concurrent_issuance_yields_distinct_identities() {
    let authority = TestAuthority::new("OrgXMSP");
    let m = member(&authority, "manufacturing", Role::MEMBER_CODE, "bob");
    let provider = &m.provider;

    let issued: Vec<Vec<u8>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| provider.identity().expect("identity").0))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect()
    });

    let mut ids: Vec<String> = issued
        .iter()
        .map(|raw| {
            provider
                .deserialize_verifier(raw)
                .expect("verifier")
                .identifier()
                .id
                .clone()
        })
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(m.registry.len(), 8);
}
