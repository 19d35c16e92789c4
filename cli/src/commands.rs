//! # Command Handlers
//!
//! One function per subcommand. Each takes the loaded [`Extensions`] and
//! returns the JSON value `main` prints, so handlers are testable without
//! capturing stdout.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Map, Value};
use tracing::info;

use mkm_protocol::crypto::{KeyMap, PrivateKey, VerifyKey};
use mkm_protocol::identity::{DocumentBuilder, DocumentType, EntityType, Meta};
use mkm_protocol::Extensions;

use crate::cli::{
    AddressArgs, CheckDocumentArgs, CheckMetaArgs, GenerateArgs, IdArgs, SignDocumentArgs,
};

const META_FILE: &str = "meta.json";
const SECRET_FILE: &str = "secret.json";

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    match read_json(path)? {
        Value::Object(map) => Ok(map),
        _ => bail!("{} must contain a JSON object", path.display()),
    }
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

fn parse_network(text: &str) -> Result<EntityType> {
    EntityType::from_name(text).ok_or_else(|| anyhow!("unknown entity type '{text}'"))
}

fn load_meta(ext: &Extensions, path: &Path) -> Result<Meta> {
    let value = read_json(path)?;
    ext.parse_meta(&value)
        .with_context(|| format!("invalid meta in {}", path.display()))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub fn generate(ext: &Extensions, args: &GenerateArgs) -> Result<Value> {
    let network = parse_network(&args.network)?;
    let key = ext.generate_private_key(&args.key_algorithm)?;
    let meta = ext.generate_meta(&args.meta_type, key.as_ref(), args.seed.as_deref())?;
    let id = ext.generate_id(&meta, network, args.terminal.as_deref())?;
    info!(%id, meta_type = %meta.meta_type().as_tag(), "account generated");

    let mut output = json!({
        "id": id.to_string(),
        "meta": meta.to_value(),
    });
    match &args.out {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            write_json(&dir.join(META_FILE), &meta.to_value())?;
            write_json(&dir.join(SECRET_FILE), &Value::Object(key.to_map()))?;
            output["directory"] = json!(dir.display().to_string());
        }
        None => {
            output["secret"] = Value::Object(key.to_map());
        }
    }
    Ok(output)
}

pub fn address(ext: &Extensions, args: &AddressArgs) -> Result<Value> {
    let address = ext.parse_address(&args.address)?;
    let network = address.network();
    Ok(json!({
        "address": address.as_str(),
        "kind": format!("{:?}", address.kind()),
        "network": network.code(),
        "entity": network.name(),
        "is_user": address.is_user(),
        "is_group": address.is_group(),
        "is_broadcast": address.is_broadcast(),
    }))
}

pub fn id(ext: &Extensions, args: &IdArgs) -> Result<Value> {
    let id = ext.parse_id(&args.id)?;
    Ok(json!({
        "id": id.to_string(),
        "name": id.name(),
        "address": id.address().as_str(),
        "terminal": id.terminal(),
        "network": id.network().code(),
        "entity": id.network().name(),
        "is_user": id.is_user(),
        "is_group": id.is_group(),
        "is_broadcast": id.is_broadcast(),
    }))
}

pub fn check_meta(ext: &Extensions, args: &CheckMetaArgs) -> Result<Value> {
    let meta = load_meta(ext, &args.meta)?;
    let mut output = json!({
        "valid": meta.is_valid(),
        "type": meta.meta_type().as_tag(),
        "seed": meta.seed(),
        "key_algorithm": meta.public_key().algorithm(),
    });
    if let Some(text) = &args.id {
        let id = ext.parse_id(text)?;
        output["matches"] = json!(ext.meta_matches_id(&meta, &id));
    }
    Ok(output)
}

pub fn sign_document(ext: &Extensions, args: &SignDocumentArgs) -> Result<Value> {
    let key_map: KeyMap = read_object(&args.key)?;
    let key = ext
        .parse_private_key(&key_map)
        .with_context(|| format!("invalid private key in {}", args.key.display()))?;
    let did = ext.parse_id(&args.id)?;
    let doc_type = args
        .doc_type
        .as_deref()
        .map(DocumentType::from_tag)
        .unwrap_or_else(|| DocumentType::default_for(&did));

    let mut builder = DocumentBuilder::new(did, doc_type);
    if let Some(path) = &args.properties {
        builder = builder.properties(read_object(path)?);
    }
    if let Some(name) = &args.name {
        builder = builder.property("name", name.as_str());
    }
    let document = builder.sign(key.as_ref())?;
    info!(did = %document.did(), doc_type = %document.doc_type(), "document signed");
    Ok(document.to_value())
}

pub fn check_document(ext: &Extensions, args: &CheckDocumentArgs) -> Result<Value> {
    let meta = load_meta(ext, &args.meta)?;
    let value = read_json(&args.document)?;
    let document = ext
        .parse_document(&value)
        .with_context(|| format!("invalid document in {}", args.document.display()))?;
    let owner_matches = ext.meta_matches_id(&meta, document.did());
    let properties = document.verified_properties(meta.public_key().as_ref());
    Ok(json!({
        "did": document.did().to_string(),
        "type": document.doc_type().as_tag(),
        "owner_matches_meta": owner_matches,
        "verified": properties.is_some(),
        "name": properties.and(document.name()),
        "properties": properties.cloned().map(Value::Object),
    }))
}

pub fn version() -> Value {
    json!({
        "mkm": env!("CARGO_PKG_VERSION"),
        "protocol": mkm_protocol::config::PROTOCOL_VERSION,
    })
}
