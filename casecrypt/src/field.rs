//! The encrypted-column-with-equality-search pattern.
//!
//! One logical attribute (an email address, say) is stored as two physical
//! columns:
//!
//! | column | contents | deterministic | reversible |
//! |---|---|---|---|
//! | ciphertext | [`CiphertextEnvelope`](crate::envelope::CiphertextEnvelope) | no | yes |
//! | blind index | [`BlindIndexToken`] | yes | no |
//!
//! [`FieldCodec::seal`] produces both from the same plaintext in a single call,
//! and the two must be written in the same storage operation. Lookups by
//! value go through [`FieldCodec::search_token`] and compare index columns;
//! uniqueness constraints belong on the index column only, because two
//! encryptions of the same value never share a ciphertext.

use crate::blind_index::{generate_blind_index, BlindIndexToken};
use crate::cipher::{FieldCipher, LegacyPolicy};
use crate::error::{CodecError, Error};
use crate::secret::SecretMaterial;
use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;

/// What the caller hashes when building a blind index.
///
/// The blind-index codec itself never normalizes. This choice lives with the
/// owner of the column and must stay fixed for the lifetime of the stored
/// data, or existing rows stop matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexNormalization {
    /// Hash the value exactly as given.
    #[default]
    Exact,
    /// Hash the Unicode-lowercased value. Gives case-insensitive lookup.
    Lowercase,
}

impl IndexNormalization {
    /// Applies the normalization to a value about to be hashed.
    #[must_use]
    pub fn apply<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self {
            Self::Exact => Cow::Borrowed(value),
            Self::Lowercase => Cow::Owned(value.to_lowercase()),
        }
    }
}

impl FromStr for IndexNormalization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "lowercase" => Ok(Self::Lowercase),
            other => Err(other.to_string()),
        }
    }
}

/// The two stored columns of one sensitive attribute.
///
/// Both columns are `Some` or both are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SensitiveField {
    ciphertext: Option<String>,
    blind_index: Option<String>,
}

impl SensitiveField {
    /// Rebuilds a field pair from column values loaded from storage.
    ///
    /// # Errors
    ///
    /// Returns `Error::IncompleteField` if exactly one column is present, or
    /// a `CodecError` if the index column is not a well-formed token.
    pub fn from_columns(
        ciphertext: Option<String>,
        blind_index: Option<String>,
    ) -> Result<Self, Error> {
        match (&ciphertext, &blind_index) {
            (None, None) => Ok(Self::default()),
            (Some(_), Some(index)) => {
                BlindIndexToken::parse(index)?;
                Ok(Self { ciphertext, blind_index })
            }
            _ => Err(Error::IncompleteField),
        }
    }

    /// Returns the ciphertext column.
    #[must_use]
    pub fn ciphertext(&self) -> Option<&str> {
        self.ciphertext.as_deref()
    }

    /// Returns the blind index column.
    #[must_use]
    pub fn blind_index(&self) -> Option<&str> {
        self.blind_index.as_deref()
    }

    /// Returns the index column as a token, if present.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidToken` if the stored value is malformed.
    pub fn index_token(&self) -> Result<Option<BlindIndexToken>, CodecError> {
        self.blind_index.as_deref().map(BlindIndexToken::parse).transpose()
    }

    /// Returns `true` if neither column holds a value.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ciphertext.is_none() && self.blind_index.is_none()
    }

    /// Splits into `(ciphertext, blind_index)` column values.
    #[must_use]
    pub fn into_columns(self) -> (Option<String>, Option<String>) {
        (self.ciphertext, self.blind_index)
    }
}

/// Encodes and decodes one sensitive attribute at the storage boundary.
///
/// Calls are explicit: the repository layer seals on write, opens on read by
/// identity, and asks for a search token on read by value.
///
/// # Example
///
/// ```
/// use casecrypt::field::{FieldCodec, IndexNormalization};
/// use casecrypt::cipher::LegacyPolicy;
/// use casecrypt::secret::load;
/// use std::sync::Arc;
///
/// let material = Arc::new(load("QkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkI=", "pepper")?);
/// let codec = FieldCodec::new(material, LegacyPolicy::Reject, IndexNormalization::Exact);
///
/// let field = codec.seal(Some("alice@example.com"))?;
/// let token = codec.search_token("alice@example.com")?;
///
/// assert_eq!(field.blind_index(), Some(token.as_str()));
/// assert_eq!(codec.open(&field)?.as_deref(), Some("alice@example.com"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct FieldCodec {
    cipher: FieldCipher,
    material: Arc<SecretMaterial>,
    normalization: IndexNormalization,
}

impl FieldCodec {
    /// Creates a codec over shared key material.
    #[must_use]
    pub fn new(
        material: Arc<SecretMaterial>,
        legacy: LegacyPolicy,
        normalization: IndexNormalization,
    ) -> Self {
        Self { cipher: FieldCipher::new(Arc::clone(&material), legacy), material, normalization }
    }

    /// Returns the index normalization in effect.
    #[must_use]
    pub const fn normalization(&self) -> IndexNormalization {
        self.normalization
    }

    /// Returns the underlying cipher.
    #[must_use]
    pub const fn cipher(&self) -> &FieldCipher {
        &self.cipher
    }

    /// Encrypts and indexes a value in one step.
    ///
    /// The ciphertext holds the value as given; only the index input is
    /// normalized.
    ///
    /// # Errors
    ///
    /// Returns error if encryption or index generation fails. No partial
    /// field is ever returned.
    pub fn seal(&self, plaintext: Option<&str>) -> Result<SensitiveField, Error> {
        let Some(value) = plaintext else {
            return Ok(SensitiveField::default());
        };

        let blind_index = self.search_token(value)?;
        let ciphertext = self.cipher.encrypt(Some(value))?;

        Ok(SensitiveField { ciphertext, blind_index: Some(blind_index.into_string()) })
    }

    /// Recovers the plaintext of a field located by identity.
    ///
    /// # Errors
    ///
    /// Returns `Error::IncompleteField` for a half-populated pair, or a
    /// `DecryptionError` if the ciphertext does not authenticate.
    pub fn open(&self, field: &SensitiveField) -> Result<Option<String>, Error> {
        if field.ciphertext.is_some() != field.blind_index.is_some() {
            return Err(Error::IncompleteField);
        }
        Ok(self.cipher.decrypt(field.ciphertext())?)
    }

    /// Computes the token to compare against the index column.
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if index generation fails.
    pub fn search_token(&self, value: &str) -> Result<BlindIndexToken, Error> {
        let normalized = self.normalization.apply(value);
        Ok(generate_blind_index(&normalized, self.material.hmac_key())?)
    }

    /// Returns `true` if `field` was sealed from `value`.
    ///
    /// Compares index columns only; nothing is decrypted.
    ///
    /// # Errors
    ///
    /// Returns error if index generation fails.
    pub fn matches(&self, field: &SensitiveField, value: &str) -> Result<bool, Error> {
        let token = self.search_token(value)?;
        Ok(field.blind_index() == Some(token.as_str()))
    }
}
