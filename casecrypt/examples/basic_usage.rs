//! Basic usage example for `casecrypt`.

use casecrypt::prelude::*;
use casecrypt_key_file::FileKeySource;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("casecrypt Basic Usage Example");
    println!("=============================\n");

    let key_dir = PathBuf::from("./example_keys");

    // Generate keys on first run
    if !key_dir.exists() {
        println!("Initializing key directory at {}...", key_dir.display());
        FileKeySource::init(&key_dir)?;
        println!("✓ Key directory initialized\n");
    }

    let source = FileKeySource::new(&key_dir)?;
    let settings = Settings {
        legacy_plaintext: LegacyPolicy::Reject,
        index_normalization: IndexNormalization::Lowercase,
    };
    let codec = settings.build(&source)?;
    println!("✓ Field codec ready ({settings:?})\n");

    // Seal one email into its column pair
    let field = codec.seal(Some("Alice@Example.com"))?;
    println!("email_encrypted: {}", field.ciphertext().unwrap_or_default());
    println!("email_index:     {}\n", field.blind_index().unwrap_or_default());

    // Open it again
    let email = codec.open(&field)?;
    println!("✓ Decrypted: {}\n", email.as_deref().unwrap_or_default());

    // Look it up without decrypting anything
    let users = SensitiveFieldRepository::new(codec, MemoryFieldStore::new("email"));
    let alice = users.create(Some("Alice@Example.com"))?;
    users.create(Some("bob@example.com"))?;

    let found = users.find("alice@example.com")?;
    assert_eq!(found, Some(alice));
    println!("✓ Found row {alice} by blind index");

    match users.create(Some("ALICE@example.com")) {
        Err(StoreError::DuplicateIndex { column }) => {
            println!("✓ Duplicate rejected on column {column}\n");
        }
        other => println!("unexpected result: {other:?}\n"),
    }

    println!("=============================");
    println!("All operations successful!");
    println!("\nNote: Key directory at {} can be deleted manually", key_dir.display());

    Ok(())
}
