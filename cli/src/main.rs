// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # mkm
//!
//! Entry point for the `mkm` binary. Parses CLI arguments, initializes
//! logging, loads the identity registries once, runs one subcommand and
//! prints its result as JSON.
//!
//! - `generate`       — new key, meta and ID
//! - `address`        — validate and inspect an address
//! - `id`             — parse an ID
//! - `check-meta`     — validate a meta, optionally against an ID
//! - `sign-document`  — build and sign a document
//! - `check-document` — verify a document against its owner's meta
//! - `version`        — print version information

mod cli;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use serde_json::Value;

use mkm_protocol::{Extensions, PluginLoader};

use cli::{Commands, MkmCli};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = MkmCli::parse();
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&cli.log_format),
    );

    let ext = load_extensions();
    let output = run(&ext, &cli.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Build and populate the registries. Nothing registers after this returns.
fn load_extensions() -> Extensions {
    let mut ext = Extensions::new();
    PluginLoader::default().load(&mut ext);
    tracing::debug!(
        metas = ext.metas.len(),
        documents = ext.documents.len(),
        "registries ready"
    );
    ext
}

fn run(ext: &Extensions, command: &Commands) -> Result<Value> {
    match command {
        Commands::Generate(args) => commands::generate(ext, args),
        Commands::Address(args) => commands::address(ext, args),
        Commands::Id(args) => commands::id(ext, args),
        Commands::CheckMeta(args) => commands::check_meta(ext, args),
        Commands::SignDocument(args) => commands::sign_document(ext, args),
        Commands::CheckDocument(args) => commands::check_document(ext, args),
        Commands::Version => Ok(commands::version()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_version() {
        let ext = load_extensions();
        let output = run(&ext, &Commands::Version).unwrap();
        assert_eq!(output["protocol"], mkm_protocol::config::PROTOCOL_VERSION);
    }

    #[test]
    fn dispatch_parsed_arguments() {
        let ext = load_extensions();
        let cli = MkmCli::parse_from(["mkm", "id", "moky@4DnqXWdTV8wuZgfqSCX9GjE2kNq7HJrUgQ"]);
        let output = run(&ext, &cli.command).unwrap();
        assert_eq!(output["name"], "moky");
        assert_eq!(output["is_user"], true);
    }
}
