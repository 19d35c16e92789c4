//! Walkthrough of the identity layer.
//!
//! Loads the default factories, creates a user and a group, publishes a visa
//! and a bulletin, then plays the receiving side: parse, match and verify.
//!
//! Run with:
//!   cargo run --example demo

use std::time::Instant;

use mkm_protocol::crypto::{EccPrivateKey, Ed25519PrivateKey, PrivateKey, VerifyKey};
use mkm_protocol::identity::{DocumentBuilder, DocumentType, EntityType};
use mkm_protocol::{Extensions, PluginLoader};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const YELLOW: &str = "\x1b[33m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn section(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]==================================================={RESET}");
    println!("{BOLD}  {title}{RESET}");
}

fn field(label: &str, value: impl std::fmt::Display) {
    println!("  {DIM}{label:<14}{RESET} {value}");
}

fn check(label: &str, ok: bool) {
    let mark = if ok { format!("{GREEN}ok{RESET}") } else { format!("{RED}FAILED{RESET}") };
    println!("  {label:<40} [{mark}]");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();

    section(1, "Load default factories");
    let mut ext = Extensions::new();
    PluginLoader::default().load(&mut ext);
    field("meta types", ext.metas.len());
    field("doc types", ext.documents.len());

    section(2, "Create user 'moky' (ECC, default scheme)");
    let user_key = EccPrivateKey::generate();
    let user_meta = ext.generate_meta("1", &user_key, Some("moky"))?;
    let user = ext.generate_id(&user_meta, EntityType::USER, None)?;
    field("id", &user);
    field("meta", user_meta.to_value());

    section(3, "Same key, Bitcoin and Ethereum schemes");
    for meta_type in ["BTC", "ETH"] {
        let meta = ext.generate_meta(meta_type, &user_key, None)?;
        field(meta_type, ext.generate_address(&meta, EntityType::USER)?);
    }

    section(4, "Create group 'club' (Ed25519 founder)");
    let founder_key = Ed25519PrivateKey::generate();
    let founder_meta = ext.generate_meta("1", &founder_key, Some("alice"))?;
    let founder = ext.generate_id(&founder_meta, EntityType::USER, None)?;
    let group_meta = ext.generate_meta("1", &founder_key, Some("club"))?;
    let group = ext.generate_id(&group_meta, EntityType::GROUP, None)?;
    field("founder", &founder);
    field("group", &group);

    section(5, "Publish documents");
    let visa = DocumentBuilder::new(user.clone(), DocumentType::Visa)
        .property("name", "Moky")
        .visa_key(user_key.public_key().to_map())
        .sign(&user_key)?;
    let bulletin = DocumentBuilder::new(group.clone(), DocumentType::Bulletin)
        .property("name", "The Club")
        .founder(&founder)
        .sign(&founder_key)?;
    field("visa", visa.to_value());
    field("bulletin", bulletin.to_value());

    section(6, "Receiving side");
    let meta = ext.parse_meta(&user_meta.to_value())?;
    let id = ext.parse_id(&user.to_string())?;
    check("user meta matches id", ext.meta_matches_id(&meta, &id));
    let doc = ext.parse_document(&visa.to_value())?;
    check("visa verifies", doc.verify(meta.public_key().as_ref()));

    let doc = ext.parse_document(&bulletin.to_value())?;
    check("bulletin verifies", doc.verify(group_meta.public_key().as_ref()));
    let claimed = doc.as_bulletin().and_then(|b| b.founder(&ext));
    check("bulletin founder parses", claimed.as_ref() == Some(&founder));

    let forged = ext.parse_id("moky@1EHNa6Q4Jz2uvNExL497mE43ikXhwF6kZn");
    check("tampered address rejected", forged.is_err());

    println!();
    println!("{DIM}done in {:.2?}{RESET}", started.elapsed());
    Ok(())
}
