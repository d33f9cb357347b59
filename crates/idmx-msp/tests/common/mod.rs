#![allow(dead_code)]

use std::sync::{Arc, Once};

use idmx_core::MspConfig;
use idmx_crypto::testing::TestAuthority;
use idmx_crypto::{CredentialEngine, SoftwareEngine};
use idmx_msp::{IdentityProvider, InMemorySignerRegistry};

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub struct Member {
    pub engine: Arc<SoftwareEngine>,
    pub registry: Arc<InMemorySignerRegistry>,
    pub provider: IdentityProvider,
    pub config: MspConfig,
}

pub fn member(authority: &TestAuthority, ou: &str, role: i64, eid: &str) -> Member {
    init_tracing();
    let config = authority.enroll(ou, role, eid).expect("enroll");
    member_from(config)
}

pub fn member_from(config: MspConfig) -> Member {
    let engine = Arc::new(SoftwareEngine::new());
    let registry = Arc::new(InMemorySignerRegistry::new());
    let provider = IdentityProvider::new(
        &config,
        Arc::clone(&engine) as Arc<dyn CredentialEngine>,
        Arc::clone(&registry) as Arc<dyn idmx_msp::SignerRegistry>,
    )
    .expect("provider");
    Member {
        engine,
        registry,
        provider,
        config,
    }
}
