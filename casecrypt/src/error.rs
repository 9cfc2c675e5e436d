//! Error types for `casecrypt` operations.

use std::fmt;

/// Main error type for `casecrypt` operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Key material or settings were rejected at load time
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A stored envelope could not be decrypted
    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    /// Blind index computation or parsing failed
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Encryption operation failed
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// A field pair carried one column without the other
    #[error("incomplete field pair: ciphertext and blind index must be stored together")]
    IncompleteField,
}

/// Invalid key material or settings. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The AES key is not valid base64
    #[error("AES key is not valid base64")]
    InvalidAesKeyEncoding,

    /// The decoded AES key has the wrong length
    #[error("invalid AES key length: expected {expected} bytes, got {actual}")]
    InvalidAesKeyLength {
        /// Required key length
        expected: usize,
        /// Decoded key length
        actual: usize,
    },

    /// The HMAC key is empty
    #[error("HMAC key must not be empty")]
    EmptyHmacKey,

    /// A setting carried a value outside its allowed set
    #[error("invalid value for {name}: {value:?} (expected one of: {expected})")]
    InvalidSetting {
        /// Setting name
        name: &'static str,
        /// Rejected value
        value: String,
        /// Accepted values
        expected: &'static str,
    },

    /// Key material could not be read from its source
    #[error("key source error: {0}")]
    KeySource(#[from] KeySourceError),
}

/// Decryption failures. Always fail-closed: no partial plaintext is returned.
#[derive(Debug, thiserror::Error)]
pub enum DecryptionError {
    /// The value carries no version marker and legacy values are rejected
    #[error("value is not an encrypted envelope")]
    Unencrypted,

    /// The envelope does not have the `version:iv:ciphertext` shape
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(&'static str),

    /// One of the envelope parts is not valid base64
    #[error("invalid base64 in envelope {part}")]
    InvalidBase64 {
        /// Which part failed to decode
        part: &'static str,
    },

    /// The decoded IV has the wrong length
    #[error("invalid IV length: expected {expected} bytes, got {actual}")]
    InvalidIvLength {
        /// Required IV length
        expected: usize,
        /// Decoded IV length
        actual: usize,
    },

    /// The ciphertext cannot even hold an authentication tag
    #[error("ciphertext too short: expected at least {expected} bytes, got {actual}")]
    CiphertextTooShort {
        /// Minimum length (the tag size)
        expected: usize,
        /// Decoded length
        actual: usize,
    },

    /// Authentication tag verification failed (wrong key, corrupted or tampered data)
    #[error("authentication failed: wrong key or corrupted ciphertext")]
    AuthenticationFailed,

    /// The authenticated plaintext is not UTF-8
    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

/// Blind index failures.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The HMAC key was rejected by the MAC implementation
    #[error("invalid HMAC key: {0}")]
    InvalidKey(String),

    /// A stored index value is not a well-formed token
    #[error("invalid blind index token: {0}")]
    InvalidToken(String),
}

/// Errors specific to key source operations.
#[derive(Debug)]
pub enum KeySourceError {
    /// A required key value is not present in the source
    Missing(String),

    /// Key value could not be read as text
    NotUnicode(String),

    /// Key directory does not exist or is not a directory
    DirectoryNotFound(String),

    /// Key directory or file creation failed
    CreationFailed(String),

    /// I/O operation failed
    Io(std::io::Error),
}

impl fmt::Display for KeySourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "key value not found: {name}"),
            Self::NotUnicode(name) => write!(f, "key value is not valid unicode: {name}"),
            Self::DirectoryNotFound(path) => write!(f, "key directory not found: {path}"),
            Self::CreationFailed(msg) => write!(f, "key creation failed: {msg}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for KeySourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KeySourceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Errors raised at the storage boundary for a sensitive field.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another row already holds the same blind index
    #[error("a row with the same {column} value already exists")]
    DuplicateIndex {
        /// Logical column name
        column: String,
    },

    /// No row with this id
    #[error("row not found: {0}")]
    NotFound(u64),

    /// Encoding or decoding the field pair failed
    #[error(transparent)]
    Field(#[from] Error),
}

impl From<DecryptionError> for StoreError {
    fn from(err: DecryptionError) -> Self {
        Self::Field(err.into())
    }
}

impl From<CodecError> for StoreError {
    fn from(err: CodecError) -> Self {
        Self::Field(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_message_has_no_key_bytes() {
        let err = ConfigurationError::InvalidAesKeyLength { expected: 32, actual: 31 };
        assert_eq!(err.to_string(), "invalid AES key length: expected 32 bytes, got 31");
    }

    #[test]
    fn test_nested_errors_convert_into_error() {
        let err: Error = DecryptionError::AuthenticationFailed.into();
        assert!(matches!(err, Error::Decryption(DecryptionError::AuthenticationFailed)));

        let err: Error = CodecError::InvalidToken("short".to_string()).into();
        assert!(matches!(err, Error::Codec(CodecError::InvalidToken(_))));
    }

    #[test]
    fn test_key_source_error_source() {
        use std::error::Error as _;

        let err = KeySourceError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());
        assert!(KeySourceError::Missing("CASECRYPT_AES_KEY".to_string()).source().is_none());
    }

    #[test]
    fn test_missing_directory_message_differs_from_missing_value() {
        let dir = KeySourceError::DirectoryNotFound("/etc/casecrypt".to_string());
        let value = KeySourceError::Missing("/etc/casecrypt/aes.key".to_string());

        assert_eq!(dir.to_string(), "key directory not found: /etc/casecrypt");
        assert_eq!(value.to_string(), "key value not found: /etc/casecrypt/aes.key");
    }
}
