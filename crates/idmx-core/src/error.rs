//! # Error Types
//!
//! Errors raised by the foundational types. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations; higher crates
//! wrap them with operation and identity context.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error while encoding or decoding a protobuf wire message.
#[derive(Error, Debug)]
pub enum WireError {
    /// The bytes are not a valid encoding of the named message.
    #[error("failed to decode {message}: {source}")]
    Decode {
        /// Name of the message being decoded.
        message: &'static str,
        /// Underlying protobuf error.
        #[source]
        source: prost::DecodeError,
    },

    /// A pseudonym point is missing one of its coordinates.
    #[error("pseudonym is invalid: {0}")]
    InvalidPseudonym(String),

    /// A role value outside the supported set.
    #[error("unsupported role value {0}")]
    UnsupportedRole(i32),
}

/// Error while loading authority configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The YAML document could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A required field was empty.
    #[error("missing configuration field: {0}")]
    MissingField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_decode_display_names_message() {
        let source = prost::DecodeError::new("buffer underflow");
        let err = WireError::Decode {
            message: "SerializedIdentity",
            source,
        };
        let msg = format!("{err}");
        assert!(msg.contains("SerializedIdentity"));
        assert!(msg.contains("buffer underflow"));
    }

    #[test]
    fn unsupported_role_display() {
        let err = WireError::UnsupportedRole(7);
        assert!(format!("{err}").contains('7'));
    }

    #[test]
    fn missing_field_display() {
        let err = ConfigError::MissingField("name");
        assert_eq!(format!("{err}"), "missing configuration field: name");
    }
}
