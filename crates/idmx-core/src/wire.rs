//! # Wire Messages
//!
//! Protobuf messages exchanged between nodes. Field numbers are part of
//! the wire contract and must not change.
//!
//! ```text
//! SerializedIdentity      { 1: mspid string, 2: id_bytes bytes }
//! SerializedNymIdentity   { 1: nym_x, 2: nym_y, 3: ou, 4: role, 5: proof }  (all bytes)
//! OrganizationUnit        { 1: msp_identifier, 2: organizational_unit_identifier, 3: certifiers_identifier }
//! MspRole                 { 1: msp_identifier, 2: role enum }
//! ```
//!
//! ## Point Encoding
//!
//! A pseudonym public key travels as two halves, `nym_x ‖ nym_y`, split at
//! the midpoint of its canonical encoding. The encoding length is fixed and
//! even; [`split_point`] refuses anything else.

use prost::Message;

use crate::error::WireError;

/// Outer envelope naming the authority that vouches for the identity.
#[derive(Clone, PartialEq, Message)]
pub struct SerializedIdentity {
    /// Name of the membership authority.
    #[prost(string, tag = "1")]
    pub mspid: String,
    /// Scheme-specific identity bytes.
    #[prost(bytes = "vec", tag = "2")]
    pub id_bytes: Vec<u8>,
}

/// Inner pseudonymous identity.
#[derive(Clone, PartialEq, Message)]
pub struct SerializedNymIdentity {
    /// First half of the pseudonym public key.
    #[prost(bytes = "vec", tag = "1")]
    pub nym_x: Vec<u8>,
    /// Second half of the pseudonym public key.
    #[prost(bytes = "vec", tag = "2")]
    pub nym_y: Vec<u8>,
    /// Marshaled [`OrganizationUnit`].
    #[prost(bytes = "vec", tag = "3")]
    pub ou: Vec<u8>,
    /// Marshaled [`MspRole`].
    #[prost(bytes = "vec", tag = "4")]
    pub role: Vec<u8>,
    /// Membership proof produced by the credential engine.
    #[prost(bytes = "vec", tag = "5")]
    pub proof: Vec<u8>,
}

/// Organizational unit disclosed by an identity.
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct OrganizationUnit {
    /// Authority the unit belongs to.
    #[prost(string, tag = "1")]
    pub msp_identifier: String,
    /// The unit identifier.
    #[prost(string, tag = "2")]
    pub organizational_unit_identifier: String,
    /// Key id of the certifying issuer.
    #[prost(bytes = "vec", tag = "3")]
    pub certifiers_identifier: Vec<u8>,
}

/// Role disclosed by an identity.
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct MspRole {
    /// Authority granting the role.
    #[prost(string, tag = "1")]
    pub msp_identifier: String,
    /// One of [`MspRoleType`].
    #[prost(enumeration = "MspRoleType", tag = "2")]
    pub role: i32,
}

/// Protobuf role values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MspRoleType {
    /// Ordinary member.
    Member = 0,
    /// Administrator.
    Admin = 1,
}

impl SerializedIdentity {
    /// Decode the outer envelope from untrusted bytes.
    pub fn decode_from(raw: &[u8]) -> Result<Self, WireError> {
        Self::decode(raw).map_err(|source| WireError::Decode {
            message: "SerializedIdentity",
            source,
        })
    }
}

impl SerializedNymIdentity {
    /// Decode the inner identity from untrusted bytes.
    ///
    /// Rejects messages where either half of the pseudonym is absent.
    pub fn decode_from(raw: &[u8]) -> Result<Self, WireError> {
        let nym = Self::decode(raw).map_err(|source| WireError::Decode {
            message: "SerializedNymIdentity",
            source,
        })?;
        if nym.nym_x.is_empty() || nym.nym_y.is_empty() {
            return Err(WireError::InvalidPseudonym(
                "missing pseudonym coordinate".to_string(),
            ));
        }
        Ok(nym)
    }

    /// Reassemble the raw pseudonym public key, `nym_x ‖ nym_y`.
    pub fn nym_public_key(&self) -> Vec<u8> {
        join_point(&self.nym_x, &self.nym_y)
    }
}

impl OrganizationUnit {
    /// Decode an organizational unit from untrusted bytes.
    pub fn decode_from(raw: &[u8]) -> Result<Self, WireError> {
        Self::decode(raw).map_err(|source| WireError::Decode {
            message: "OrganizationUnit",
            source,
        })
    }
}

impl MspRole {
    /// Decode a role from untrusted bytes, rejecting unknown role values.
    pub fn decode_from(raw: &[u8]) -> Result<Self, WireError> {
        let role = Self::decode(raw).map_err(|source| WireError::Decode {
            message: "MspRole",
            source,
        })?;
        if MspRoleType::try_from(role.role).is_err() {
            return Err(WireError::UnsupportedRole(role.role));
        }
        Ok(role)
    }
}

/// Split a canonical point encoding into its two wire halves.
pub fn split_point(raw: &[u8]) -> Result<(&[u8], &[u8]), WireError> {
    if raw.is_empty() || raw.len() % 2 != 0 {
        return Err(WireError::InvalidPseudonym(format!(
            "point encoding must have a non-zero even length, got {}",
            raw.len()
        )));
    }
    Ok(raw.split_at(raw.len() / 2))
}

/// Join the two wire halves of a point.
pub fn join_point(x: &[u8], y: &[u8]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(x.len() + y.len());
    raw.extend_from_slice(x);
    raw.extend_from_slice(y);
    raw
}
