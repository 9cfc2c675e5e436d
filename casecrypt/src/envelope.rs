//! Ciphertext envelope format for the encrypted column.
//!
//! The envelope carries everything needed for decryption except the key:
//! - Version marker
//! - Initialization vector
//! - Ciphertext with the appended GCM tag

use crate::error::DecryptionError;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;

/// Version marker of the current envelope format.
pub const VERSION_MARKER: &str = "ENC1";

/// Separator between envelope parts.
pub const DELIMITER: char = ':';

/// AES-GCM initialization vector size (96 bits).
pub const IV_SIZE: usize = 12;

/// AES-GCM authentication tag size (128 bits).
pub const TAG_SIZE: usize = 16;

/// Parsed form of one encrypted column value.
///
/// Format:
/// ```text
/// ENC1:<base64(iv[12])>:<base64(ciphertext || tag[16])>
/// ```
///
/// Both base64 parts use the standard alphabet with padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiphertextEnvelope {
    iv: [u8; IV_SIZE],
    ciphertext: Vec<u8>,
}

impl CiphertextEnvelope {
    /// Creates an envelope from an IV and the sealed ciphertext (tag included).
    #[must_use]
    pub(crate) const fn new(iv: [u8; IV_SIZE], ciphertext: Vec<u8>) -> Self {
        Self { iv, ciphertext }
    }

    /// Returns `true` if `value` starts with the current version marker.
    ///
    /// Values without the marker were stored before encryption was
    /// introduced.
    #[must_use]
    pub fn is_envelope(value: &str) -> bool {
        value
            .strip_prefix(VERSION_MARKER)
            .is_some_and(|rest| rest.starts_with(DELIMITER))
    }

    /// Returns the initialization vector.
    #[must_use]
    pub const fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    /// Returns the ciphertext including the trailing authentication tag.
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Parses an envelope string.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The version marker is missing
    /// - The value does not have exactly three parts
    /// - A part is not valid base64
    /// - The IV is not 12 bytes, or the ciphertext is shorter than the tag
    pub fn parse(value: &str) -> Result<Self, DecryptionError> {
        let rest = value
            .strip_prefix(VERSION_MARKER)
            .and_then(|rest| rest.strip_prefix(DELIMITER))
            .ok_or(DecryptionError::Unencrypted)?;

        let (iv_part, ciphertext_part) = rest
            .split_once(DELIMITER)
            .ok_or(DecryptionError::MalformedEnvelope("missing ciphertext part"))?;

        if ciphertext_part.contains(DELIMITER) {
            return Err(DecryptionError::MalformedEnvelope("too many parts"));
        }

        let iv_bytes = STANDARD
            .decode(iv_part)
            .map_err(|_| DecryptionError::InvalidBase64 { part: "IV" })?;
        let iv: [u8; IV_SIZE] = iv_bytes.as_slice().try_into().map_err(|_| {
            DecryptionError::InvalidIvLength { expected: IV_SIZE, actual: iv_bytes.len() }
        })?;

        let ciphertext = STANDARD
            .decode(ciphertext_part)
            .map_err(|_| DecryptionError::InvalidBase64 { part: "ciphertext" })?;
        if ciphertext.len() < TAG_SIZE {
            return Err(DecryptionError::CiphertextTooShort {
                expected: TAG_SIZE,
                actual: ciphertext.len(),
            });
        }

        Ok(Self { iv, ciphertext })
    }
}

impl fmt::Display for CiphertextEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{VERSION_MARKER}{DELIMITER}{}{DELIMITER}{}",
            STANDARD.encode(self.iv),
            STANDARD.encode(&self.ciphertext)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serialization() {
        let envelope = CiphertextEnvelope::new([0u8; IV_SIZE], vec![0xAB; TAG_SIZE + 3]);
        let encoded = envelope.to_string();

        assert!(encoded.starts_with("ENC1:AAAAAAAAAAAAAAAA:"));

        let parsed = CiphertextEnvelope::parse(&encoded).expect("Failed to parse envelope");
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn test_is_envelope() {
        assert!(CiphertextEnvelope::is_envelope("ENC1:abc:def"));
        assert!(!CiphertextEnvelope::is_envelope("alice@example.com"));
        assert!(!CiphertextEnvelope::is_envelope("ENC1"));
        assert!(!CiphertextEnvelope::is_envelope("ENC10:abc:def"));
        assert!(!CiphertextEnvelope::is_envelope(""));
    }

    #[test]
    fn test_parse_unprefixed_value() {
        let result = CiphertextEnvelope::parse("alice@example.com");
        assert!(matches!(result, Err(DecryptionError::Unencrypted)));
    }

    #[test]
    fn test_parse_missing_ciphertext_part() {
        let result = CiphertextEnvelope::parse("ENC1:AAAAAAAAAAAAAAAA");
        assert!(matches!(result, Err(DecryptionError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_parse_too_many_parts() {
        let result = CiphertextEnvelope::parse("ENC1:AAAAAAAAAAAAAAAA:AAAA:AAAA");
        assert!(matches!(result, Err(DecryptionError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_parse_invalid_base64() {
        let result = CiphertextEnvelope::parse("ENC1:!!!!:AAAAAAAAAAAAAAAAAAAAAA==");
        assert!(matches!(result, Err(DecryptionError::InvalidBase64 { part: "IV" })));

        let result = CiphertextEnvelope::parse("ENC1:AAAAAAAAAAAAAAAA:***");
        assert!(matches!(result, Err(DecryptionError::InvalidBase64 { part: "ciphertext" })));
    }

    #[test]
    fn test_parse_wrong_iv_length() {
        // 8-byte IV
        let result = CiphertextEnvelope::parse("ENC1:AAAAAAAAAAA=:AAAAAAAAAAAAAAAAAAAAAA==");
        assert!(matches!(
            result,
            Err(DecryptionError::InvalidIvLength { expected: IV_SIZE, actual: 8 })
        ));
    }

    #[test]
    fn test_parse_ciphertext_shorter_than_tag() {
        let result = CiphertextEnvelope::parse("ENC1:AAAAAAAAAAAAAAAA:AAAA");
        assert!(matches!(
            result,
            Err(DecryptionError::CiphertextTooShort { expected: TAG_SIZE, actual: 3 })
        ));
    }
}
