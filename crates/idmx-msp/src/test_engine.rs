//! Engine that delegates to [`SoftwareEngine`] but answers every
//! verification with a bare `Ok(false)`.

use std::sync::Arc;

use idmx_core::{MspConfig, Role};
use idmx_crypto::testing::TestAuthority;
use idmx_crypto::{
    CredentialEngine, EngineError, KeyHandle, KeyImportOpts, NymDerivationOpts, Signed,
    SignerOpts, Ski, SoftwareEngine, VerifierOpts,
};

use crate::provider::IdentityProvider;
use crate::registry::{InMemorySignerRegistry, SignerRegistry};
use crate::support::MembershipSupport;

pub(crate) struct RejectingEngine {
    inner: SoftwareEngine,
}

impl RejectingEngine {
    pub(crate) fn new() -> Self {
        Self {
            inner: SoftwareEngine::new(),
        }
    }
}

impl CredentialEngine for RejectingEngine {
    fn key_import(&self, raw: &[u8], opts: &KeyImportOpts) -> Result<KeyHandle, EngineError> {
        self.inner.key_import(raw, opts)
    }

    fn key_derive(
        &self,
        key: &KeyHandle,
        opts: &NymDerivationOpts,
    ) -> Result<KeyHandle, EngineError> {
        self.inner.key_derive(key, opts)
    }

    fn sign(&self, key: &KeyHandle, msg: &[u8], opts: &SignerOpts) -> Result<Signed, EngineError> {
        self.inner.sign(key, msg, opts)
    }

    fn verify(
        &self,
        _key: &KeyHandle,
        _signature: &[u8],
        _msg: &[u8],
        _opts: &VerifierOpts,
    ) -> Result<bool, EngineError> {
        Ok(false)
    }

    fn get_key(&self, ski: &Ski) -> Result<KeyHandle, EngineError> {
        self.inner.get_key(ski)
    }

    fn engine_name(&self) -> &str {
        "rejecting"
    }
}

pub(crate) fn enrolled(authority: &TestAuthority) -> MspConfig {
    authority
        .enroll("manufacturing", Role::ADMIN_CODE, "alice")
        .expect("enroll")
}

pub(crate) fn provider(config: &MspConfig, engine: Arc<dyn CredentialEngine>) -> IdentityProvider {
    let registry: Arc<dyn SignerRegistry> = Arc::new(InMemorySignerRegistry::new());
    IdentityProvider::new(config, engine, registry).expect("provider")
}

/// Support for `config` whose engine rejects every verification.
pub(crate) fn rejecting_support(config: &MspConfig) -> MembershipSupport {
    MembershipSupport::new(config, Arc::new(RejectingEngine::new())).expect("support")
}
