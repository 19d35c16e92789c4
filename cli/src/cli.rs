//! # CLI Interface
//!
//! Defines the command-line argument structure for `mkm` using `clap`
//! derive.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// MKM identity tool.
///
/// Generates accounts, inspects addresses and identifiers, and signs or
/// verifies meta records and documents. Results are printed to stdout as
/// JSON; logs go to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "mkm",
    about = "MKM identity tool",
    version,
    propagate_version = true
)]
pub struct MkmCli {
    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "MKM_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a private key, its meta and the resulting ID.
    Generate(GenerateArgs),
    /// Validate an address and show what it encodes.
    Address(AddressArgs),
    /// Parse an ID.
    Id(IdArgs),
    /// Validate a meta file, optionally against an ID.
    CheckMeta(CheckMetaArgs),
    /// Build and sign a document.
    SignDocument(SignDocumentArgs),
    /// Parse a document and verify it against a meta.
    CheckDocument(CheckDocumentArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for `generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Meta type tag: `1`/`mkm`, `2`/`btc`, `4`/`eth`.
    #[arg(long, short = 't', env = "MKM_META_TYPE", default_value = "1")]
    pub meta_type: String,

    /// Private key algorithm: `ECC`, `RSA` or `Ed25519`.
    #[arg(long, short = 'k', env = "MKM_KEY_ALGORITHM", default_value = "ECC")]
    pub key_algorithm: String,

    /// Seed (the ID name). Ignored by the BTC and ETH schemes.
    #[arg(long, short = 's')]
    pub seed: Option<String>,

    /// Entity type by name (`user`, `group`, `bot`, ...) or code.
    #[arg(long, short = 'n', default_value = "user")]
    pub network: String,

    /// Terminal suffix for the ID.
    #[arg(long)]
    pub terminal: Option<String>,

    /// Directory to write `meta.json` and `secret.json` into. When omitted,
    /// the private key is printed with the rest of the output.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

/// Arguments for `address`.
#[derive(Args, Debug)]
pub struct AddressArgs {
    /// Address text.
    pub address: String,
}

/// Arguments for `id`.
#[derive(Args, Debug)]
pub struct IdArgs {
    /// ID text: `[name@]address[/terminal]`.
    pub id: String,
}

/// Arguments for `check-meta`.
#[derive(Args, Debug)]
pub struct CheckMetaArgs {
    /// Path to a meta JSON file.
    pub meta: PathBuf,

    /// ID the meta should produce.
    #[arg(long)]
    pub id: Option<String>,
}

/// Arguments for `sign-document`.
#[derive(Args, Debug)]
pub struct SignDocumentArgs {
    /// Path to the signer's private key JSON.
    #[arg(long, short = 'k')]
    pub key: PathBuf,

    /// Owner of the document.
    #[arg(long)]
    pub id: String,

    /// Document type. Defaults to what the owner's entity type implies.
    #[arg(long = "type", short = 't')]
    pub doc_type: Option<String>,

    /// Path to a JSON object of properties to include.
    #[arg(long, short = 'p')]
    pub properties: Option<PathBuf>,

    /// Display name.
    #[arg(long)]
    pub name: Option<String>,
}

/// Arguments for `check-document`.
#[derive(Args, Debug)]
pub struct CheckDocumentArgs {
    /// Path to a document JSON file.
    pub document: PathBuf,

    /// Path to the owner's meta JSON.
    #[arg(long, short = 'm')]
    pub meta: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        MkmCli::command().debug_assert();
    }

    #[test]
    fn generate_defaults() {
        let cli = MkmCli::parse_from(["mkm", "generate", "--seed", "moky"]);
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.seed.as_deref(), Some("moky"));
                assert_eq!(args.network, "user");
                assert!(args.out.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
