//! # idmx-crypto: Credential Cryptography Engine
//!
//! The seam between the membership layer and attribute-based credential
//! cryptography.
//!
//! - **Engine contract** (`engine.rs`): [`CredentialEngine`] with opaque
//!   [`KeyHandle`]s and typed import, derivation, signing and verification
//!   options.
//! - **Digests** (`digest.rs`): domain-separated SHA-256 and the [`Ski`]
//!   key identifier.
//! - **Software engine** (`software/`, feature `software`): a transparent
//!   Ed25519/SHA-256 reference implementation of the contract.
//! - **Test authority** (`testing.rs`, feature `test-utils`): issues
//!   credentials and configuration blocks for tests.
//!
//! ## Crate Policy
//!
//! - Secret key bytes never cross the engine boundary.
//! - No `unsafe` code.

pub mod digest;
pub mod engine;
pub mod error;

#[cfg(feature = "software")]
pub mod software;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use digest::{sha256, sha256_hex, tagged_hash, Ski};
pub use engine::{
    Attribute, AuditExpectation, CredentialEngine, Key, KeyHandle, KeyImportOpts, KeyKind,
    NymDerivationOpts, ProofSignerOpts, ProofVerifierOpts, Signed, SignerOpts, VerifierOpts,
};
pub use error::EngineError;

#[cfg(feature = "software")]
pub use software::SoftwareEngine;
