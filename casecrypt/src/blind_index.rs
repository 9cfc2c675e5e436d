//! Blind index generation for searchable encryption.
//!
//! Blind indexes allow equality queries on encrypted data without revealing
//! the plaintext value. The index is a keyed HMAC of the exact input bytes,
//! so there is no way back from a token to the value it was computed from:
//! a token can only be compared against a freshly computed one.

use crate::error::CodecError;
use crate::secret::HmacKey;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Blind index digest size (full HMAC-SHA256 output, 32 bytes).
pub const BLIND_INDEX_SIZE: usize = 32;

/// Encoded token length: 32 bytes in unpadded base64url.
pub const BLIND_INDEX_ENCODED_LEN: usize = 43;

/// Deterministic search token stored in the index column.
///
/// Two tokens are equal iff they were computed from the same bytes under the
/// same key. The type deliberately exposes no conversion back into anything
/// the cipher accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlindIndexToken(String);

impl BlindIndexToken {
    /// Validates a token read back from storage.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidToken` if the value is not unpadded
    /// base64url encoding exactly 32 bytes.
    pub fn parse(value: &str) -> Result<Self, CodecError> {
        if value.len() != BLIND_INDEX_ENCODED_LEN {
            return Err(CodecError::InvalidToken(format!(
                "expected {BLIND_INDEX_ENCODED_LEN} characters, got {}",
                value.len()
            )));
        }
        let decoded = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|e| CodecError::InvalidToken(format!("not base64url: {e}")))?;
        if decoded.len() != BLIND_INDEX_SIZE {
            return Err(CodecError::InvalidToken(format!(
                "expected {BLIND_INDEX_SIZE} bytes, got {}",
                decoded.len()
            )));
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the encoded token for use in an equality predicate.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, returning the encoded column value.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BlindIndexToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates a blind index for searchable encryption.
///
/// The blind index is computed as:
/// `base64url_nopad(HMAC-SHA256(key, utf8(value)))`
///
/// No normalization is applied: `"Alice@example.com"` and
/// `"alice@example.com"` produce different tokens. Callers that want
/// case-insensitive lookup must normalize before calling.
///
/// # Arguments
///
/// * `value` - The plaintext value to index
/// * `key` - HMAC key from the loaded secret material
///
/// # Errors
///
/// Returns `CodecError::InvalidKey` if the MAC rejects the key.
///
/// # Example
///
/// ```
/// use casecrypt::blind_index::generate_blind_index;
/// use casecrypt::secret::HmacKey;
///
/// let key = HmacKey::from_bytes(b"pepper")?;
///
/// let index1 = generate_blind_index("alice@example.com", &key)?;
/// let index2 = generate_blind_index("alice@example.com", &key)?;
///
/// assert_eq!(index1, index2); // Same input produces same index
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn generate_blind_index(value: &str, key: &HmacKey) -> Result<BlindIndexToken, CodecError> {
    let mut mac = HmacSha256::new_from_slice(key.expose())
        .map_err(|e| CodecError::InvalidKey(e.to_string()))?;

    mac.update(value.as_bytes());

    let digest = mac.finalize().into_bytes();
    Ok(BlindIndexToken(URL_SAFE_NO_PAD.encode(digest)))
}

/// Indexes an optional column value. `None` maps to `None`.
///
/// # Errors
///
/// Returns error if index generation fails.
pub fn generate_optional_index(
    value: Option<&str>,
    key: &HmacKey,
) -> Result<Option<BlindIndexToken>, CodecError> {
    value.map(|v| generate_blind_index(v, key)).transpose()
}
