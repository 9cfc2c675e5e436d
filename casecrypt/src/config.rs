//! Startup configuration for the field encryption layer.
//!
//! [`Settings::from_env`] reads the policy knobs; [`Settings::build`] loads
//! and validates key material from a [`KeySource`] and returns a ready
//! [`FieldCodec`]. Both fail with a [`ConfigurationError`], which callers are
//! expected to treat as fatal.

use crate::cipher::LegacyPolicy;
use crate::error::ConfigurationError;
use crate::field::{FieldCodec, IndexNormalization};
use crate::key_source::KeySource;
use crate::secret::SecretMaterial;
use std::sync::Arc;

/// Environment variable selecting the [`LegacyPolicy`].
pub const LEGACY_PLAINTEXT_ENV: &str = "CASECRYPT_LEGACY_PLAINTEXT";

/// Environment variable selecting the [`IndexNormalization`].
pub const INDEX_NORMALIZATION_ENV: &str = "CASECRYPT_INDEX_NORMALIZATION";

/// Policy settings for the encrypted columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    /// Treatment of unprefixed values in encrypted columns.
    pub legacy_plaintext: LegacyPolicy,
    /// Input normalization for blind indexes.
    pub index_normalization: IndexNormalization,
}

impl Settings {
    /// Reads settings from the process environment. Unset variables keep
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidSetting` for unrecognized values.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through an arbitrary lookup function.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidSetting` for unrecognized values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(value) = lookup(LEGACY_PLAINTEXT_ENV).filter(|v| !v.trim().is_empty()) {
            settings.legacy_plaintext =
                value.parse().map_err(|_| ConfigurationError::InvalidSetting {
                    name: LEGACY_PLAINTEXT_ENV,
                    value,
                    expected: "passthrough, reject",
                })?;
        }

        if let Some(value) = lookup(INDEX_NORMALIZATION_ENV).filter(|v| !v.trim().is_empty()) {
            settings.index_normalization =
                value.parse().map_err(|_| ConfigurationError::InvalidSetting {
                    name: INDEX_NORMALIZATION_ENV,
                    value,
                    expected: "exact, lowercase",
                })?;
        }

        Ok(settings)
    }

    /// Loads key material and builds the codec shared by the service.
    ///
    /// # Errors
    ///
    /// Returns error if the key source fails or the keys are invalid.
    pub fn build<S>(&self, source: &S) -> Result<FieldCodec, ConfigurationError>
    where
        S: KeySource + ?Sized,
    {
        let material = Arc::new(SecretMaterial::from_source(source)?);

        if self.legacy_plaintext == LegacyPolicy::PassThrough {
            tracing::warn!("legacy plaintext passthrough enabled for encrypted columns");
        }
        tracing::info!(
            legacy_plaintext = ?self.legacy_plaintext,
            index_normalization = ?self.index_normalization,
            "field codec ready"
        );

        Ok(FieldCodec::new(material, self.legacy_plaintext, self.index_normalization))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeySourceError;
    use secrecy::SecretString;
    use std::collections::HashMap;

    struct MapSource(HashMap<&'static str, &'static str>);

    impl KeySource for MapSource {
        fn aes_key(&self) -> Result<SecretString, KeySourceError> {
            self.0
                .get("aes")
                .map(|v| SecretString::new((*v).to_string()))
                .ok_or_else(|| KeySourceError::Missing("aes".to_string()))
        }

        fn hmac_key(&self) -> Result<SecretString, KeySourceError> {
            self.0
                .get("hmac")
                .map(|v| SecretString::new((*v).to_string()))
                .ok_or_else(|| KeySourceError::Missing("hmac".to_string()))
        }
    }

    fn lookup(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.legacy_plaintext, LegacyPolicy::PassThrough);
        assert_eq!(settings.index_normalization, IndexNormalization::Exact);
    }

    #[test]
    fn test_explicit_values() {
        let settings = Settings::from_lookup(lookup(&[
            (LEGACY_PLAINTEXT_ENV, "reject"),
            (INDEX_NORMALIZATION_ENV, "lowercase"),
        ]))
        .unwrap();

        assert_eq!(settings.legacy_plaintext, LegacyPolicy::Reject);
        assert_eq!(settings.index_normalization, IndexNormalization::Lowercase);
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let settings = Settings::from_lookup(lookup(&[(LEGACY_PLAINTEXT_ENV, "  ")])).unwrap();
        assert_eq!(settings.legacy_plaintext, LegacyPolicy::PassThrough);
    }

    #[test]
    fn test_invalid_value() {
        let result = Settings::from_lookup(lookup(&[(LEGACY_PLAINTEXT_ENV, "ignore")]));
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidSetting { name: LEGACY_PLAINTEXT_ENV, .. })
        ));
    }

    #[test]
    fn test_build_codec() {
        let source = MapSource(HashMap::from([
            ("aes", "QkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkI="),
            ("hmac", "test-hmac-key"),
        ]));
        let settings = Settings { legacy_plaintext: LegacyPolicy::Reject, ..Settings::default() };

        let codec = settings.build(&source).unwrap();
        assert_eq!(codec.cipher().legacy_policy(), LegacyPolicy::Reject);

        let field = codec.seal(Some("alice@example.com")).unwrap();
        assert_eq!(codec.open(&field).unwrap().as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_build_fails_on_short_key() {
        let source = MapSource(HashMap::from([
            ("aes", "QkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQg=="),
            ("hmac", "test-hmac-key"),
        ]));

        let result = Settings::default().build(&source);
        assert!(matches!(result, Err(ConfigurationError::InvalidAesKeyLength { actual: 31, .. })));
    }

    #[test]
    fn test_build_fails_on_missing_key() {
        let source = MapSource(HashMap::from([("aes", "QkJC")]));

        let result = Settings::default().build(&source);
        assert!(matches!(result, Err(ConfigurationError::KeySource(_))));
    }
}
