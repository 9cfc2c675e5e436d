//! File-based key source for `casecrypt`.
//!
//! This source reads keys from the filesystem and is suitable for
//! development environments and deployments that mount secrets as files.

#![warn(clippy::pedantic, clippy::nursery)]

use base64::{engine::general_purpose::STANDARD, engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use casecrypt::error::KeySourceError;
use casecrypt::key_source::KeySource;
use casecrypt::secret::AES_KEY_SIZE;
use rand::{rngs::OsRng, RngCore};
use secrecy::SecretString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// File holding the base64-encoded AES-256 key.
pub const AES_KEY_FILE: &str = "aes.key";

/// File holding the HMAC key.
pub const HMAC_KEY_FILE: &str = "hmac.key";

/// Random bytes behind a generated HMAC key.
const HMAC_KEY_BYTES: usize = 32;

/// File-based key source.
///
/// Keys are stored in the filesystem with the following structure:
/// ```text
/// keys/
/// ├── aes.key     (base64 of 32 bytes, 0600 permissions)
/// └── hmac.key    (HMAC key text, 0600 permissions)
/// ```
///
/// A single trailing newline in either file is ignored.
#[derive(Debug, Clone)]
pub struct FileKeySource {
    key_dir: PathBuf,
}

impl FileKeySource {
    /// Creates a new `FileKeySource`.
    ///
    /// # Arguments
    ///
    /// * `key_dir` - Directory containing key files
    ///
    /// # Errors
    ///
    /// Returns `KeySourceError::DirectoryNotFound` if the directory doesn't
    /// exist.
    pub fn new(key_dir: impl Into<PathBuf>) -> Result<Self, KeySourceError> {
        let key_dir = key_dir.into();
        if !key_dir.is_dir() {
            return Err(KeySourceError::DirectoryNotFound(key_dir.display().to_string()));
        }
        Ok(Self { key_dir })
    }

    /// Returns the key directory.
    #[must_use]
    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    /// Initializes a key directory with a fresh AES key and HMAC key.
    ///
    /// Existing key files are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `KeySourceError::CreationFailed` if a key file already exists,
    /// or an I/O error if the directory or files cannot be written.
    pub fn init(key_dir: impl AsRef<Path>) -> Result<(), KeySourceError> {
        let key_dir = key_dir.as_ref();
        fs::create_dir_all(key_dir)?;

        for name in [AES_KEY_FILE, HMAC_KEY_FILE] {
            if key_dir.join(name).exists() {
                return Err(KeySourceError::CreationFailed(format!(
                    "refusing to overwrite existing key file: {}",
                    key_dir.join(name).display()
                )));
            }
        }

        let mut aes = Zeroizing::new([0u8; AES_KEY_SIZE]);
        OsRng.fill_bytes(aes.as_mut());
        let aes_encoded = Zeroizing::new(STANDARD.encode(aes.as_ref()));

        let mut hmac = Zeroizing::new([0u8; HMAC_KEY_BYTES]);
        OsRng.fill_bytes(hmac.as_mut());
        let hmac_encoded = Zeroizing::new(URL_SAFE_NO_PAD.encode(hmac.as_ref()));

        write_key_file(&key_dir.join(AES_KEY_FILE), &aes_encoded)?;
        write_key_file(&key_dir.join(HMAC_KEY_FILE), &hmac_encoded)?;

        tracing::info!(key_dir = %key_dir.display(), "initialized key directory");
        Ok(())
    }

    fn read(&self, name: &str) -> Result<SecretString, KeySourceError> {
        let path = self.key_dir.join(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(KeySourceError::Missing(path.display().to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let text = std::str::from_utf8(&bytes)
            .map_err(|_| KeySourceError::NotUnicode(path.display().to_string()))?;
        let text = text
            .strip_suffix("\r\n")
            .or_else(|| text.strip_suffix('\n'))
            .unwrap_or(text);

        Ok(SecretString::new(text.to_string()))
    }
}

impl KeySource for FileKeySource {
    fn aes_key(&self) -> Result<SecretString, KeySourceError> {
        self.read(AES_KEY_FILE)
    }

    fn hmac_key(&self) -> Result<SecretString, KeySourceError> {
        self.read(HMAC_KEY_FILE)
    }
}

fn write_key_file(path: &Path, contents: &str) -> Result<(), KeySourceError> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    Ok(())
}
