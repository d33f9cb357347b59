//! # idmx-core: Foundational Types for Membership Identities
//!
//! The leaf of the workspace DAG. Defines the types every other crate
//! agrees on when handling pseudonymous membership identities:
//!
//! - **`CanonicalBytes`**: RFC 8785 canonical JSON. The only encoding used
//!   for values that are signed, hashed or must round-trip byte-exactly
//!   (audit records, reference-engine proofs).
//! - **Wire messages** (`wire.rs`): the protobuf envelope
//!   `SerializedIdentity { mspid, id_bytes }` and the inner
//!   `SerializedNymIdentity { nym_x, nym_y, ou, role, proof }`.
//! - **Attributes** (`attributes.rs`): `Role`, the fixed attribute template
//!   positions and the credential role codes.
//! - **Configuration** (`config.rs`): the authority and signer blocks a
//!   provider is built from.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `idmx-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod attributes;
pub mod canonical;
pub mod config;
pub mod error;
pub mod wire;

pub use attributes::Role;
pub use canonical::CanonicalBytes;
pub use config::{MspConfig, SignerConfig};
pub use error::{CanonicalizationError, ConfigError, WireError};
pub use wire::{MspRole, MspRoleType, OrganizationUnit, SerializedIdentity, SerializedNymIdentity};
