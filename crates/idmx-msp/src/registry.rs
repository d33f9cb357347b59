//! # Signer Registry
//!
//! Where freshly issued identities announce their signing capability.
//! The registry is handed to the provider at construction.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::identity::{Signer, Verifier};

/// Failure reported by a signer registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The identity already has a registered signer.
    #[error("identity already registered")]
    AlreadyRegistered,

    /// Registry-specific failure.
    #[error("{0}")]
    Rejected(String),
}

/// Receives the signing capability of issued identities.
pub trait SignerRegistry: Send + Sync {
    /// Register `signer` and `verifier` for the serialized `identity`.
    fn register_signer(
        &self,
        identity: &[u8],
        signer: Arc<dyn Signer>,
        verifier: Arc<dyn Verifier>,
    ) -> Result<(), RegistryError>;
}

struct Entry {
    signer: Arc<dyn Signer>,
    verifier: Arc<dyn Verifier>,
}

/// Process-local registry keyed by serialized identity bytes.
#[derive(Default)]
pub struct InMemorySignerRegistry {
    entries: RwLock<HashMap<Vec<u8>, Entry>>,
}

impl InMemorySignerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signer registered for `identity`.
    pub fn signer(&self, identity: &[u8]) -> Option<Arc<dyn Signer>> {
        self.entries
            .read()
            .get(identity)
            .map(|e| Arc::clone(&e.signer))
    }

    /// Verifier registered for `identity`.
    pub fn verifier(&self, identity: &[u8]) -> Option<Arc<dyn Verifier>> {
        self.entries
            .read()
            .get(identity)
            .map(|e| Arc::clone(&e.verifier))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for InMemorySignerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InMemorySignerRegistry({} signers)", self.len())
    }
}

impl SignerRegistry for InMemorySignerRegistry {
    fn register_signer(
        &self,
        identity: &[u8],
        signer: Arc<dyn Signer>,
        verifier: Arc<dyn Verifier>,
    ) -> Result<(), RegistryError> {
        let mut entries = self.entries.write();
        if entries.contains_key(identity) {
            return Err(RegistryError::AlreadyRegistered);
        }
        entries.insert(identity.to_vec(), Entry { signer, verifier });
        Ok(())
    }
}
