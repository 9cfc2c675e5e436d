//! Key material for the confidentiality and blind-index codecs.
//!
//! [`SecretMaterial`] is built once at startup by [`load`] and then shared
//! read-only (typically behind an `Arc`) with every component that encrypts,
//! decrypts or indexes. A misconfigured key must stop the process before it
//! serves a single request, so all validation happens here and never per call.

use crate::error::ConfigurationError;
use crate::key_source::KeySource;
use base64::{engine::general_purpose::STANDARD, Engine};
use secrecy::{ExposeSecret, SecretVec};
use std::fmt;
use zeroize::Zeroizing;

/// Required AES key size in bytes (AES-256).
pub const AES_KEY_SIZE: usize = 32;

/// AES-256 key for the confidentiality codec.
///
/// Always exactly [`AES_KEY_SIZE`] bytes. `Debug` output is redacted.
pub struct AesKey(SecretVec<u8>);

impl AesKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidAesKeyLength` unless `bytes` is
    /// exactly 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigurationError> {
        if bytes.len() != AES_KEY_SIZE {
            return Err(ConfigurationError::InvalidAesKeyLength {
                expected: AES_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self(SecretVec::new(bytes.to_vec())))
    }

    /// Decodes a standard-base64 key. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidAesKeyEncoding` if the value is not
    /// base64, or `InvalidAesKeyLength` if it does not decode to 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, ConfigurationError> {
        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|_| ConfigurationError::InvalidAesKeyEncoding)?,
        );
        Self::from_bytes(&decoded)
    }

    pub(crate) fn expose(&self) -> &[u8] {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AesKey([REDACTED])")
    }
}

/// HMAC-SHA256 key for the blind-index codec.
///
/// Any non-empty byte sequence. `Debug` output is redacted.
pub struct HmacKey(SecretVec<u8>);

impl HmacKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::EmptyHmacKey` if `bytes` is empty.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigurationError> {
        if bytes.is_empty() {
            return Err(ConfigurationError::EmptyHmacKey);
        }
        Ok(Self(SecretVec::new(bytes.to_vec())))
    }

    pub(crate) fn expose(&self) -> &[u8] {
        self.0.expose_secret()
    }
}

impl fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HmacKey([REDACTED])")
    }
}

/// The validated key pair used by the codecs.
#[derive(Debug)]
pub struct SecretMaterial {
    aes: AesKey,
    hmac: HmacKey,
}

impl SecretMaterial {
    /// Bundles already-validated keys.
    #[must_use]
    pub const fn new(aes: AesKey, hmac: HmacKey) -> Self {
        Self { aes, hmac }
    }

    /// Loads key material from a [`KeySource`] and validates it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::KeySource` if the source cannot supply a
    /// value, or any validation error from [`load`].
    pub fn from_source<S: KeySource + ?Sized>(source: &S) -> Result<Self, ConfigurationError> {
        let aes = source.aes_key()?;
        let hmac = source.hmac_key()?;
        load(aes.expose_secret(), hmac.expose_secret())
    }

    /// Returns the AES-256 key.
    #[must_use]
    pub const fn aes_key(&self) -> &AesKey {
        &self.aes
    }

    /// Returns the HMAC key.
    #[must_use]
    pub const fn hmac_key(&self) -> &HmacKey {
        &self.hmac
    }
}

/// Parses and validates both keys.
///
/// `aes_key_base64` must decode to exactly 32 bytes. `hmac_key_source` is
/// taken verbatim as key bytes and must be non-empty.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] describing the first invalid key. The
/// error never contains key bytes.
///
/// # Example
///
/// ```
/// use casecrypt::secret::load;
///
/// let material = load("QkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkI=", "pepper")?;
/// # Ok::<(), casecrypt::error::ConfigurationError>(())
/// ```
pub fn load(
    aes_key_base64: &str,
    hmac_key_source: &str,
) -> Result<SecretMaterial, ConfigurationError> {
    let aes = AesKey::from_base64(aes_key_base64)?;
    let hmac = HmacKey::from_bytes(hmac_key_source.as_bytes())?;

    tracing::info!(aes_key_bits = AES_KEY_SIZE * 8, "field encryption key material loaded");

    Ok(SecretMaterial::new(aes, hmac))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeySourceError;
    use secrecy::SecretString;

    const KEY_32: &str = "QkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkI=";
    const KEY_31: &str = "QkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQg==";

    struct StaticSource {
        aes: Option<&'static str>,
        hmac: &'static str,
    }

    impl KeySource for StaticSource {
        fn aes_key(&self) -> Result<SecretString, KeySourceError> {
            self.aes
                .map(|v| SecretString::new(v.to_string()))
                .ok_or_else(|| KeySourceError::Missing("aes".to_string()))
        }

        fn hmac_key(&self) -> Result<SecretString, KeySourceError> {
            Ok(SecretString::new(self.hmac.to_string()))
        }
    }

    #[test]
    fn test_load_valid_material() {
        let material = load(KEY_32, "pepper").expect("32-byte key must load");
        assert_eq!(material.aes_key().expose(), &[0x42u8; 32]);
        assert_eq!(material.hmac_key().expose(), b"pepper");
    }

    #[test]
    fn test_load_rejects_31_byte_key() {
        let result = load(KEY_31, "pepper");
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidAesKeyLength { expected: 32, actual: 31 })
        ));
    }

    #[test]
    fn test_load_rejects_33_byte_key() {
        let key = STANDARD.encode([7u8; 33]);
        let result = load(&key, "pepper");
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidAesKeyLength { expected: 32, actual: 33 })
        ));
    }

    #[test]
    fn test_load_rejects_non_base64_key() {
        let result = load("not base64 at all!", "pepper");
        assert!(matches!(result, Err(ConfigurationError::InvalidAesKeyEncoding)));
    }

    #[test]
    fn test_load_trims_trailing_newline() {
        let key = format!("{KEY_32}\n");
        assert!(load(&key, "pepper").is_ok());
    }

    #[test]
    fn test_load_rejects_empty_hmac_key() {
        let result = load(KEY_32, "");
        assert!(matches!(result, Err(ConfigurationError::EmptyHmacKey)));
    }

    #[test]
    fn test_hmac_key_is_used_verbatim() {
        let material = load(KEY_32, " spaced key ").unwrap();
        assert_eq!(material.hmac_key().expose(), b" spaced key ");
    }

    #[test]
    fn test_debug_output_is_redacted() {
        let material = load(KEY_32, "pepper").unwrap();
        let debug = format!("{material:?}");
        assert!(!debug.contains("pepper"));
        assert!(!debug.contains("66, 66"));
        assert!(debug.contains("AesKey([REDACTED])"));
        assert!(debug.contains("HmacKey([REDACTED])"));
    }

    #[test]
    fn test_key_debug_is_placeholder() {
        let aes = AesKey::from_bytes(&[0x42; AES_KEY_SIZE]).unwrap();
        let hmac = HmacKey::from_bytes(b"pepper").unwrap();

        assert_eq!(format!("{aes:?}"), "AesKey([REDACTED])");
        assert_eq!(format!("{hmac:?}"), "HmacKey([REDACTED])");
    }

    #[test]
    fn test_from_source() {
        let source = StaticSource { aes: Some(KEY_32), hmac: "pepper" };
        assert!(SecretMaterial::from_source(&source).is_ok());

        let source = StaticSource { aes: None, hmac: "pepper" };
        let result = SecretMaterial::from_source(&source);
        assert!(matches!(result, Err(ConfigurationError::KeySource(KeySourceError::Missing(_)))));
    }
}
