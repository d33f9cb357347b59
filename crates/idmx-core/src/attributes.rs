//! # Membership Attributes
//!
//! Every credential issued by a membership authority carries the same
//! ordered attribute template:
//!
//! ```text
//! index 0  OU                organizational unit id     disclosed
//! index 1  Role              credential role code       disclosed
//! index 2  EnrollmentID      enrollment id              hidden
//! index 3  RevocationHandle  revocation handle          hidden
//! ```
//!
//! The positions are fixed; proofs, audit records and the credential
//! self-check all index into this template.

use serde::{Deserialize, Serialize};

use crate::error::WireError;
use crate::wire::MspRoleType;

/// Attribute name of the organizational unit.
pub const ATTRIBUTE_NAME_OU: &str = "OU";
/// Attribute name of the role.
pub const ATTRIBUTE_NAME_ROLE: &str = "Role";
/// Attribute name of the enrollment id.
pub const ATTRIBUTE_NAME_ENROLLMENT_ID: &str = "EnrollmentID";
/// Attribute name of the revocation handle.
pub const ATTRIBUTE_NAME_REVOCATION_HANDLE: &str = "RevocationHandle";

/// Position of the organizational unit in the attribute template.
pub const OU_INDEX: usize = 0;
/// Position of the role code.
pub const ROLE_INDEX: usize = 1;
/// Position of the enrollment id.
pub const ENROLLMENT_ID_INDEX: usize = 2;
/// Position of the revocation handle.
pub const REVOCATION_HANDLE_INDEX: usize = 3;

/// The attribute names in template order.
pub fn default_attribute_names() -> Vec<String> {
    [
        ATTRIBUTE_NAME_OU,
        ATTRIBUTE_NAME_ROLE,
        ATTRIBUTE_NAME_ENROLLMENT_ID,
        ATTRIBUTE_NAME_REVOCATION_HANDLE,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// The role a member holds within its authority.
///
/// Roles have two numeric encodings: the protobuf `MspRoleType` used on the
/// wire, and the credential role code (a bit in the role mask) that the
/// authority signs into the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Ordinary member.
    Member,
    /// Administrator.
    Admin,
}

impl Role {
    /// Credential role code for `Member`.
    pub const MEMBER_CODE: i64 = 1;
    /// Credential role code for `Admin`.
    pub const ADMIN_CODE: i64 = 2;

    /// The credential role code signed into the credential.
    pub fn code(&self) -> i64 {
        match self {
            Self::Member => Self::MEMBER_CODE,
            Self::Admin => Self::ADMIN_CODE,
        }
    }

    /// Resolve a role from a credential role mask.
    ///
    /// A mask with the admin bit set is `Admin`; anything else is `Member`.
    pub fn from_mask(mask: i64) -> Self {
        if mask & Self::ADMIN_CODE == Self::ADMIN_CODE {
            Self::Admin
        } else {
            Self::Member
        }
    }

    /// Resolve a role from its exact credential role code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            Self::MEMBER_CODE => Some(Self::Member),
            Self::ADMIN_CODE => Some(Self::Admin),
            _ => None,
        }
    }

    /// The protobuf role value.
    pub fn to_wire(&self) -> MspRoleType {
        match self {
            Self::Member => MspRoleType::Member,
            Self::Admin => MspRoleType::Admin,
        }
    }

    /// Parse a protobuf role value.
    pub fn from_wire(value: i32) -> Result<Self, WireError> {
        match MspRoleType::try_from(value) {
            Ok(MspRoleType::Member) => Ok(Self::Member),
            Ok(MspRoleType::Admin) => Ok(Self::Admin),
            Err(_) => Err(WireError::UnsupportedRole(value)),
        }
    }

    /// Upper-case token used in descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "MEMBER",
            Self::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
