//! # `casecrypt`
//!
//! Field-level encryption for personally-identifying columns, with blind
//! indexes for exact-match lookup.
//!
//! ## Features
//!
//! - AES-256-GCM encryption into a versioned `ENC1:<iv>:<ciphertext>` envelope
//! - HMAC-SHA256 blind indexes for equality queries without decryption
//! - Field pairs that keep the ciphertext and index columns in lockstep
//! - Startup validation of key material from the environment or key files
//! - Explicit handling of legacy unencrypted values
//!
//! ## Example
//!
//! ```rust,ignore
//! use casecrypt::prelude::*;
//!
//! let codec = Settings::from_env()?.build(&EnvKeySource::new())?;
//!
//! let field = codec.seal(Some("alice@example.com"))?;
//! // persist field.ciphertext() and field.blind_index() in one write
//!
//! let token = codec.search_token("alice@example.com")?;
//! // SELECT ... WHERE email_index = token.as_str()
//!
//! let email = codec.open(&field)?;
//! ```

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod blind_index;
pub mod cipher;
pub mod config;
pub mod envelope;
pub mod error;
pub mod field;
pub mod key_source;
pub mod secret;
pub mod store;

pub mod prelude {
    //! Convenience re-exports for common use.
    pub use crate::blind_index::{generate_blind_index, BlindIndexToken};
    pub use crate::cipher::{decrypt, encrypt, FieldCipher, LegacyPolicy};
    pub use crate::config::Settings;
    pub use crate::error::{CodecError, ConfigurationError, DecryptionError, Error, StoreError};
    pub use crate::field::{FieldCodec, IndexNormalization, SensitiveField};
    pub use crate::key_source::{EnvKeySource, KeySource};
    pub use crate::secret::{load, SecretMaterial};
    pub use crate::store::{MemoryFieldStore, SensitiveFieldRepository, SensitiveFieldStore};
}
