//! # Authority Configuration
//!
//! The configuration a provider is built from: the authority's public
//! anchors plus an optional signer block holding the member's long-term
//! secret and credential.
//!
//! Byte fields are hex strings in YAML:
//!
//! ```yaml
//! name: OrgXMSP
//! issuer_public_key: "5c1f..."
//! revocation_public_key: "a04e..."
//! signer:
//!   user_secret_key: "11aa..."
//!   credential: "7b22..."
//!   organizational_unit: manufacturing
//!   role: 2
//!   enrollment_id: alice
//!   credential_revocation_information: "7b22..."
//! ```
//!
//! Loading files or environment variables is the caller's concern; this
//! module only parses documents handed to it.

use serde::{Deserialize, Serialize};

use crate::attributes::default_attribute_names;
use crate::error::ConfigError;

/// Public anchors of a membership authority, plus the local signer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MspConfig {
    /// Authority name, e.g. `"OrgXMSP"`.
    pub name: String,
    /// Raw issuer public key.
    #[serde(with = "hex")]
    pub issuer_public_key: Vec<u8>,
    /// Raw revocation public key.
    #[serde(with = "hex")]
    pub revocation_public_key: Vec<u8>,
    /// Credential attribute names in template order.
    #[serde(default = "default_attribute_names")]
    pub attribute_names: Vec<String>,
    /// Signer material. A provider refuses to start without it.
    #[serde(default)]
    pub signer: Option<SignerConfig>,
}

/// A member's long-term secret and the credential issued on it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerConfig {
    /// The member's long-term user secret.
    #[serde(with = "hex")]
    pub user_secret_key: Vec<u8>,
    /// Credential issued by the authority over the user secret.
    #[serde(with = "hex")]
    pub credential: Vec<u8>,
    /// Organizational unit identifier.
    pub organizational_unit: String,
    /// Credential role mask (member = 1, admin = 2).
    pub role: i64,
    /// Enrollment id. Never disclosed on the wire.
    pub enrollment_id: String,
    /// Credential revocation information for the current epoch.
    #[serde(default, with = "hex")]
    pub credential_revocation_information: Vec<u8>,
}

impl MspConfig {
    /// Parse a YAML configuration document.
    pub fn from_yaml_str(doc: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(doc)?;
        config.check()?;
        Ok(config)
    }

    /// Render the configuration as YAML.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::MissingField("name"));
        }
        if self.issuer_public_key.is_empty() {
            return Err(ConfigError::MissingField("issuer_public_key"));
        }
        if self.revocation_public_key.is_empty() {
            return Err(ConfigError::MissingField("revocation_public_key"));
        }
        Ok(())
    }
}

// Secret material stays out of debug output.
impl std::fmt::Debug for MspConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MspConfig")
            .field("name", &self.name)
            .field("attribute_names", &self.attribute_names)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerConfig")
            .field("organizational_unit", &self.organizational_unit)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
name: OrgXMSP
issuer_public_key: "0a0b0c"
revocation_public_key: "0d0e"
signer:
  user_secret_key: "01"
  credential: "02"
  organizational_unit: manufacturing
  role: 2
  enrollment_id: alice
"#;

    #[test]
    fn parses_yaml_with_hex_fields() {
        let config = MspConfig::from_yaml_str(DOC).expect("parse");
        assert_eq!(config.name, "OrgXMSP");
        assert_eq!(config.issuer_public_key, vec![0x0a, 0x0b, 0x0c]);
        assert_eq!(config.attribute_names, default_attribute_names());
        let signer = config.signer.expect("signer");
        assert_eq!(signer.role, 2);
        assert_eq!(signer.enrollment_id, "alice");
        assert!(signer.credential_revocation_information.is_empty());
    }

    #[test]
    fn signer_block_is_optional() {
        let doc = "name: OrgXMSP\nissuer_public_key: \"01\"\nrevocation_public_key: \"02\"\n";
        let config = MspConfig::from_yaml_str(doc).expect("parse");
        assert!(config.signer.is_none());
    }

    #[test]
    fn empty_name_rejected() {
        let doc = "name: \"\"\nissuer_public_key: \"01\"\nrevocation_public_key: \"02\"\n";
        assert!(matches!(
            MspConfig::from_yaml_str(doc),
            Err(ConfigError::MissingField("name"))
        ));
    }

    #[test]
    fn invalid_hex_rejected() {
        let doc = "name: A\nissuer_public_key: \"zz\"\nrevocation_public_key: \"02\"\n";
        assert!(matches!(MspConfig::from_yaml_str(doc), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn yaml_roundtrip() {
        let config = MspConfig::from_yaml_str(DOC).expect("parse");
        let rendered = config.to_yaml_string().expect("render");
        assert_eq!(MspConfig::from_yaml_str(&rendered).expect("reparse"), config);
    }

    #[test]
    fn debug_hides_secrets() {
        let config = MspConfig::from_yaml_str(DOC).expect("parse");
        let debug = format!("{config:?}");
        assert!(!debug.contains("user_secret_key"));
        assert!(!debug.contains("alice"));
    }
}
