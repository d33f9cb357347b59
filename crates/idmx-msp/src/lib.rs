//! # idmx-msp: Pseudonymous Membership Identities
//!
//! Lets a member prove membership of an authority, together with a
//! disclosed organizational unit and role, without revealing a persistent
//! identifier.
//!
//! - [`PseudonymIdentity`] / [`SigningIdentity`] (`identity.rs`): the
//!   public and secret-holding faces of a member.
//! - [`MembershipSupport`] (`support.rs`): an authority's public anchors
//!   and the only parse path for identity bytes.
//! - [`IdentityProvider`] (`provider.rs`): issuance, rehydration and
//!   descriptors.
//! - [`AuditInfo`] (`audit.rs`): lets a designated auditor recover the
//!   enrollment id behind an identity.
//! - [`SignerRegistry`] (`registry.rs`): receives the signers of issued
//!   identities.
//!
//! All cryptography runs through an injected
//! [`idmx_crypto::CredentialEngine`].

pub mod audit;
pub mod error;
pub mod identity;
pub mod provider;
pub mod registry;
pub mod support;

#[cfg(test)]
mod test_engine;

pub use audit::AuditInfo;
pub use error::MspError;
pub use identity::{
    Identity, IdentityIdentifier, OuIdentifier, PseudonymIdentity, Signer, SigningIdentity,
    Verifier,
};
pub use provider::IdentityProvider;
pub use registry::{InMemorySignerRegistry, RegistryError, SignerRegistry};
pub use support::{Deserialized, MembershipSupport};
