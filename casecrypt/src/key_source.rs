//! Key source abstraction for loading key material.

use crate::error::KeySourceError;
use secrecy::SecretString;

/// Environment variable holding the base64-encoded AES-256 key.
pub const AES_KEY_ENV: &str = "CASECRYPT_AES_KEY";

/// Environment variable holding the HMAC key.
pub const HMAC_KEY_ENV: &str = "CASECRYPT_HMAC_KEY";

/// Supplies the raw, still unvalidated key values.
///
/// Validation is not the source's job: [`SecretMaterial::from_source`]
/// checks whatever the source returns before any codec can use it.
///
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```rust,ignore
/// use casecrypt::key_source::KeySource;
///
/// struct VaultAgentSource;
///
/// impl KeySource for VaultAgentSource {
///     fn aes_key(&self) -> Result<SecretString, KeySourceError> {
///         // Implementation
///     }
///     // ... other methods
/// }
/// ```
///
/// [`SecretMaterial::from_source`]: crate::secret::SecretMaterial::from_source
pub trait KeySource: Send + Sync {
    /// Returns the base64-encoded AES-256 key.
    ///
    /// # Errors
    ///
    /// Returns `KeySourceError::Missing` if the source has no AES key.
    fn aes_key(&self) -> Result<SecretString, KeySourceError>;

    /// Returns the HMAC key, used verbatim as key bytes.
    ///
    /// # Errors
    ///
    /// Returns `KeySourceError::Missing` if the source has no HMAC key.
    fn hmac_key(&self) -> Result<SecretString, KeySourceError>;
}

/// Reads key material from process environment variables.
#[derive(Debug, Clone)]
pub struct EnvKeySource {
    aes_var: String,
    hmac_var: String,
}

impl EnvKeySource {
    /// Creates a source reading [`AES_KEY_ENV`] and [`HMAC_KEY_ENV`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_names(AES_KEY_ENV, HMAC_KEY_ENV)
    }

    /// Creates a source reading custom variable names.
    #[must_use]
    pub fn with_names(aes_var: impl Into<String>, hmac_var: impl Into<String>) -> Self {
        Self { aes_var: aes_var.into(), hmac_var: hmac_var.into() }
    }

    fn read(name: &str) -> Result<SecretString, KeySourceError> {
        match std::env::var(name) {
            Ok(value) => Ok(SecretString::new(value)),
            Err(std::env::VarError::NotPresent) => Err(KeySourceError::Missing(name.to_string())),
            Err(std::env::VarError::NotUnicode(_)) => {
                Err(KeySourceError::NotUnicode(name.to_string()))
            }
        }
    }
}

impl Default for EnvKeySource {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for EnvKeySource {
    fn aes_key(&self) -> Result<SecretString, KeySourceError> {
        Self::read(&self.aes_var)
    }

    fn hmac_key(&self) -> Result<SecretString, KeySourceError> {
        Self::read(&self.hmac_var)
    }
}
