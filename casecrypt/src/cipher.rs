//! Confidentiality codec for the encrypted column.
//!
//! Values are sealed with AES-256-GCM under a fresh random IV and stored as a
//! [`CiphertextEnvelope`] string. Decryption is fail-closed: a value either
//! authenticates completely or the caller gets a [`DecryptionError`].

use crate::envelope::{CiphertextEnvelope, IV_SIZE};
use crate::error::{DecryptionError, Error};
use crate::secret::{AesKey, SecretMaterial};
use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use std::str::FromStr;
use std::sync::Arc;

/// How `decrypt` treats values that carry no version marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegacyPolicy {
    /// Return unprefixed values unchanged (rows written before encryption
    /// was introduced). Every hit is logged.
    #[default]
    PassThrough,
    /// Fail unprefixed values with `DecryptionError::Unencrypted`.
    Reject,
}

impl FromStr for LegacyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" | "pass-through" => Ok(Self::PassThrough),
            "reject" => Ok(Self::Reject),
            other => Err(other.to_string()),
        }
    }
}

/// Encrypts one value into a fresh envelope.
///
/// The IV is drawn from the OS random source on every call and cannot be
/// supplied by the caller.
///
/// # Errors
///
/// Returns `Error::EncryptionFailed` if the cipher rejects the key or input.
pub fn encrypt_value(plaintext: &str, key: &AesKey) -> Result<CiphertextEnvelope, Error> {
    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| Error::EncryptionFailed(format!("Invalid AES key: {e}")))?;

    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);
    let nonce = Nonce::from(iv);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| Error::EncryptionFailed(format!("AES-256-GCM encryption failed: {e}")))?;

    Ok(CiphertextEnvelope::new(iv, ciphertext))
}

/// Decrypts and authenticates one envelope.
///
/// # Errors
///
/// Returns `DecryptionError::AuthenticationFailed` on a wrong key or any
/// modification of the IV or ciphertext, and `InvalidUtf8` if the
/// authenticated bytes are not text.
pub fn decrypt_envelope(
    envelope: &CiphertextEnvelope,
    key: &AesKey,
) -> Result<String, DecryptionError> {
    let cipher =
        Aes256Gcm::new_from_slice(key.expose()).map_err(|_| DecryptionError::AuthenticationFailed)?;

    let nonce = Nonce::from(*envelope.iv());
    let plaintext = cipher
        .decrypt(&nonce, envelope.ciphertext())
        .map_err(|_| DecryptionError::AuthenticationFailed)?;

    String::from_utf8(plaintext).map_err(|_| DecryptionError::InvalidUtf8)
}

/// Encrypts an optional column value.
///
/// `None` maps to `None`; any string maps to a serialized envelope.
///
/// # Errors
///
/// Returns error if encryption fails.
///
/// # Example
///
/// ```
/// use casecrypt::cipher::{decrypt, encrypt};
/// use casecrypt::secret::load;
///
/// let material = load("QkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkI=", "pepper")?;
/// let key = material.aes_key();
///
/// let stored = encrypt(Some("alice@example.com"), key)?;
/// assert!(stored.as_deref().is_some_and(|s| s.starts_with("ENC1:")));
/// assert_eq!(decrypt(stored.as_deref(), key)?.as_deref(), Some("alice@example.com"));
/// assert_eq!(encrypt(None, key)?, None);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn encrypt(plaintext: Option<&str>, key: &AesKey) -> Result<Option<String>, Error> {
    plaintext.map(|value| encrypt_value(value, key).map(|env| env.to_string())).transpose()
}

/// Decrypts an optional column value, passing legacy plaintext through.
///
/// Equivalent to [`decrypt_with_policy`] with [`LegacyPolicy::PassThrough`].
///
/// # Errors
///
/// Returns error if a prefixed value fails to parse or authenticate.
pub fn decrypt(envelope: Option<&str>, key: &AesKey) -> Result<Option<String>, DecryptionError> {
    decrypt_with_policy(envelope, key, LegacyPolicy::PassThrough)
}

/// Decrypts an optional column value.
///
/// # Errors
///
/// Returns error if:
/// - The value is unprefixed and `policy` is [`LegacyPolicy::Reject`]
/// - The envelope is malformed
/// - Authentication fails
pub fn decrypt_with_policy(
    envelope: Option<&str>,
    key: &AesKey,
    policy: LegacyPolicy,
) -> Result<Option<String>, DecryptionError> {
    let Some(value) = envelope else {
        return Ok(None);
    };

    if !CiphertextEnvelope::is_envelope(value) {
        return match policy {
            LegacyPolicy::PassThrough => {
                tracing::warn!(
                    len = value.len(),
                    "unencrypted legacy value returned without decryption"
                );
                Ok(Some(value.to_string()))
            }
            LegacyPolicy::Reject => {
                tracing::warn!(len = value.len(), "rejected unencrypted value in encrypted column");
                Err(DecryptionError::Unencrypted)
            }
        };
    }

    let parsed = CiphertextEnvelope::parse(value)?;
    decrypt_envelope(&parsed, key).map(Some)
}

/// Cloneable handle bundling the shared key material with a legacy policy.
///
/// # Example
///
/// ```
/// use casecrypt::cipher::{FieldCipher, LegacyPolicy};
/// use casecrypt::secret::load;
/// use std::sync::Arc;
///
/// let material = Arc::new(load("QkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkI=", "pepper")?);
/// let cipher = FieldCipher::new(material, LegacyPolicy::Reject);
///
/// let stored = cipher.encrypt(Some("alice@example.com"))?;
/// assert_eq!(cipher.decrypt(stored.as_deref())?.as_deref(), Some("alice@example.com"));
/// assert!(cipher.decrypt(Some("alice@example.com")).is_err());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct FieldCipher {
    material: Arc<SecretMaterial>,
    legacy: LegacyPolicy,
}

impl FieldCipher {
    /// Creates a new cipher over shared key material.
    #[must_use]
    pub const fn new(material: Arc<SecretMaterial>, legacy: LegacyPolicy) -> Self {
        Self { material, legacy }
    }

    /// Returns the legacy policy in effect.
    #[must_use]
    pub const fn legacy_policy(&self) -> LegacyPolicy {
        self.legacy
    }

    /// Encrypts an optional column value.
    ///
    /// # Errors
    ///
    /// Returns error if encryption fails.
    pub fn encrypt(&self, plaintext: Option<&str>) -> Result<Option<String>, Error> {
        encrypt(plaintext, self.material.aes_key())
    }

    /// Decrypts an optional column value under this cipher's legacy policy.
    ///
    /// # Errors
    ///
    /// Returns error if decryption fails or a legacy value is rejected.
    pub fn decrypt(&self, envelope: Option<&str>) -> Result<Option<String>, DecryptionError> {
        decrypt_with_policy(envelope, self.material.aes_key(), self.legacy)
    }
}
