//! `casecrypt` CLI tool for key management and one-off field operations.

#![warn(clippy::pedantic, clippy::nursery)]

use anyhow::{Context, Result};
use casecrypt::prelude::*;
use casecrypt_key_file::FileKeySource;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "casecrypt")]
#[command(about = "casecrypt key management and field encoding CLI", long_about = None)]
struct Cli {
    /// Log level when `RUST_LOG` is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new AES key and HMAC key
    Keygen {
        /// Output directory for keys
        #[arg(short, long, default_value = "./keys")]
        output: PathBuf,
    },
    /// Validate key material without touching any data
    Check {
        #[command(flatten)]
        keys: KeyArgs,
    },
    /// Encrypt a value into an `ENC1` envelope
    Encrypt {
        #[command(flatten)]
        keys: KeyArgs,
        /// Plaintext to encrypt
        value: String,
    },
    /// Decrypt an `ENC1` envelope
    Decrypt {
        #[command(flatten)]
        keys: KeyArgs,
        /// Fail on values without the envelope prefix
        #[arg(long)]
        reject_legacy: bool,
        /// Envelope to decrypt
        value: String,
    },
    /// Compute the blind index for a value
    Index {
        #[command(flatten)]
        keys: KeyArgs,
        /// Lowercase the value before hashing
        #[arg(long)]
        lowercase: bool,
        /// Value to index
        value: String,
    },
}

#[derive(clap::Args)]
struct KeyArgs {
    /// Read `aes.key` and `hmac.key` from this directory instead of the environment
    #[arg(long)]
    key_dir: Option<PathBuf>,
}

impl KeyArgs {
    fn codec(&self, settings: Settings) -> Result<FieldCodec> {
        let codec = match &self.key_dir {
            Some(dir) => {
                let source = FileKeySource::new(dir)
                    .with_context(|| format!("opening key directory {}", dir.display()))?;
                settings.build(&source)
            }
            None => settings.build(&EnvKeySource::new()),
        };
        codec.context("loading key material")
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    run(cli.command, Settings::from_env, &mut std::io::stdout().lock())
}

/// Executes one subcommand, writing its result to `out`.
///
/// Settings are only read by subcommands that build a codec.
fn run<F, W>(command: Commands, settings: F, out: &mut W) -> Result<()>
where
    F: Fn() -> Result<Settings, ConfigurationError>,
    W: Write,
{
    let load_settings = || settings().context("reading settings");

    match command {
        Commands::Keygen { output } => {
            FileKeySource::init(&output)
                .with_context(|| format!("generating keys in {}", output.display()))?;
            tracing::info!(key_dir = %output.display(), "generated key material");
            writeln!(out, "Keys written to {}", output.display())?;
        }
        Commands::Check { keys } => {
            keys.codec(load_settings()?)?;
            tracing::info!(key_dir = ?keys.key_dir, "key material validated");
            writeln!(out, "Key material OK")?;
        }
        Commands::Encrypt { keys, value } => {
            let codec = keys.codec(load_settings()?)?;
            let envelope =
                codec.cipher().encrypt(Some(value.as_str())).context("encrypting value")?;
            writeln!(out, "{}", envelope.unwrap_or_default())?;
        }
        Commands::Decrypt { keys, reject_legacy, value } => {
            let mut settings = load_settings()?;
            if reject_legacy {
                settings.legacy_plaintext = LegacyPolicy::Reject;
            }
            let codec = keys.codec(settings)?;
            let plaintext =
                codec.cipher().decrypt(Some(value.as_str())).context("decrypting value")?;
            writeln!(out, "{}", plaintext.unwrap_or_default())?;
        }
        Commands::Index { keys, lowercase, value } => {
            let mut settings = load_settings()?;
            if lowercase {
                settings.index_normalization = IndexNormalization::Lowercase;
            }
            let codec = keys.codec(settings)?;
            let token = codec.search_token(&value).context("computing blind index")?;
            writeln!(out, "{token}")?;
        }
    }

    Ok(())
}
