//! # Extensions
//!
//! The host-owned set of registries, one per pluggable concern, and the
//! entry points the rest of a protocol stack calls. There is no global
//! state: a host builds one `Extensions`, loads it (see
//! [`PluginLoader`](crate::loader::PluginLoader)), wraps it in an `Arc`, and
//! passes that around.
//!
//! ```
//! use std::sync::Arc;
//! use mkm_protocol::extensions::Extensions;
//! use mkm_protocol::loader::PluginLoader;
//!
//! let mut ext = Extensions::new();
//! PluginLoader::default().load(&mut ext);
//! let ext = Arc::new(ext); // read-only from here on
//!
//! let id = ext.parse_id("moky@4DnqXWdTV8wuZgfqSCX9GjE2kNq7HJrUgQ").unwrap();
//! assert_eq!(id.name(), Some("moky"));
//! ```
//!
//! Tests build their own isolated instance the same way.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::config::WILDCARD_TAG;
use crate::crypto::keys::{
    key_algorithm, KeyError, KeyMap, PrivateKey, PrivateKeyFactory, PublicKeyFactory,
    SymmetricKey, SymmetricKeyFactory, VerifyKey,
};
use crate::format::pnf::{pnf_fields, PnfFactory, PortableNetworkFile};
use crate::format::ted::{json_map, ted_fields, TedFactory, TransportableData};
use crate::format::FormatError;
use crate::identity::address::{Address, AddressError, AddressFactory};
use crate::identity::document::{Document, DocumentError, DocumentFactory, DocumentType};
use crate::identity::entity::EntityType;
use crate::identity::id::{IdError, IdFactory, Identifier};
use crate::identity::meta::{Meta, MetaError, MetaFactory};
use crate::registry::AlgorithmRegistry;

/// All registries of one host.
///
/// Fields are public so that hosts can install their own factories during
/// init; every mutation needs `&mut self`.
#[derive(Default)]
pub struct Extensions {
    pub public_keys: AlgorithmRegistry<dyn PublicKeyFactory>,
    pub private_keys: AlgorithmRegistry<dyn PrivateKeyFactory>,
    pub symmetric_keys: AlgorithmRegistry<dyn SymmetricKeyFactory>,
    pub metas: AlgorithmRegistry<dyn MetaFactory>,
    pub documents: AlgorithmRegistry<dyn DocumentFactory>,
    pub addresses: AlgorithmRegistry<dyn AddressFactory>,
    pub ids: AlgorithmRegistry<dyn IdFactory>,
    pub transportable_data: AlgorithmRegistry<dyn TedFactory>,
    pub network_files: AlgorithmRegistry<dyn PnfFactory>,
    loaded: bool,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a loader has run.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Set the loaded flag. Returns `false` if it was already set, in which
    /// case the caller must not register anything.
    pub fn mark_loaded(&mut self) -> bool {
        !std::mem::replace(&mut self.loaded, true)
    }

    // -----------------------------------------------------------------------
    // Keys
    // -----------------------------------------------------------------------

    pub fn parse_public_key(&self, key: &KeyMap) -> Result<Arc<dyn VerifyKey>, KeyError> {
        let algorithm = key_algorithm(key);
        let factory = self
            .public_keys
            .resolve_or_wildcard(algorithm)
            .ok_or_else(|| unknown_key(algorithm))?;
        factory.parse_public_key(key)
    }

    pub fn parse_private_key(&self, key: &KeyMap) -> Result<Arc<dyn PrivateKey>, KeyError> {
        let algorithm = key_algorithm(key);
        let factory = self
            .private_keys
            .resolve_or_wildcard(algorithm)
            .ok_or_else(|| unknown_key(algorithm))?;
        factory.parse_private_key(key)
    }

    pub fn generate_private_key(&self, algorithm: &str) -> Result<Arc<dyn PrivateKey>, KeyError> {
        let factory = self
            .private_keys
            .lookup(algorithm)
            .ok_or_else(|| KeyError::UnknownAlgorithm(algorithm.to_string()))?;
        factory.generate_private_key()
    }

    pub fn parse_symmetric_key(&self, key: &KeyMap) -> Result<Arc<dyn SymmetricKey>, KeyError> {
        let algorithm = key_algorithm(key);
        let factory = self
            .symmetric_keys
            .resolve_or_wildcard(algorithm)
            .ok_or_else(|| unknown_key(algorithm))?;
        factory.parse_symmetric_key(key)
    }

    pub fn generate_symmetric_key(
        &self,
        algorithm: &str,
    ) -> Result<Arc<dyn SymmetricKey>, KeyError> {
        let factory = self
            .symmetric_keys
            .lookup(algorithm)
            .ok_or_else(|| KeyError::UnknownAlgorithm(algorithm.to_string()))?;
        Ok(factory.generate_symmetric_key())
    }

    // -----------------------------------------------------------------------
    // Metas
    // -----------------------------------------------------------------------

    fn meta_factory(&self, meta_type: &str) -> Result<&Arc<dyn MetaFactory>, MetaError> {
        self.metas
            .resolve(meta_type, WILDCARD_TAG)
            .ok_or_else(|| MetaError::UnknownAlgorithm(meta_type.to_string()))
    }

    pub fn generate_meta(
        &self,
        meta_type: &str,
        private_key: &dyn PrivateKey,
        seed: Option<&str>,
    ) -> Result<Meta, MetaError> {
        self.meta_factory(meta_type)?.generate_meta(private_key, seed)
    }

    pub fn create_meta(
        &self,
        meta_type: &str,
        key: Arc<dyn VerifyKey>,
        seed: Option<String>,
        fingerprint: Option<TransportableData>,
    ) -> Result<Meta, MetaError> {
        self.meta_factory(meta_type)?.create_meta(key, seed, fingerprint)
    }

    /// Parse a meta from its map (or JSON-encoded map) form.
    pub fn parse_meta(&self, value: &Value) -> Result<Meta, MetaError> {
        let info = object_of(value).ok_or_else(|| MetaError::Format("meta is not a map".into()))?;
        let Some(meta_type) = tag_of(info.get("type")) else {
            warn!("meta rejected: missing type");
            return Err(MetaError::Format("missing 'type'".into()));
        };
        self.meta_factory(&meta_type)?.parse_meta(&info, self)
    }

    // -----------------------------------------------------------------------
    // Addresses & identifiers
    // -----------------------------------------------------------------------

    fn address_factory(&self) -> Result<&Arc<dyn AddressFactory>, AddressError> {
        self.addresses
            .lookup(WILDCARD_TAG)
            .ok_or_else(|| AddressError::UnknownAlgorithm("no address factory".into()))
    }

    fn id_factory(&self) -> Result<&Arc<dyn IdFactory>, IdError> {
        self.ids
            .lookup(WILDCARD_TAG)
            .ok_or_else(|| IdError::Malformed("no identifier factory".into()))
    }

    pub fn generate_address(&self, meta: &Meta, network: EntityType) -> Result<Address, AddressError> {
        self.address_factory()?.generate_address(meta, network)
    }

    pub fn parse_address(&self, text: &str) -> Result<Address, AddressError> {
        self.address_factory()?.parse_address(text)
    }

    pub fn parse_id(&self, text: &str) -> Result<Identifier, IdError> {
        self.id_factory()?.parse_id(text)
    }

    pub fn create_id(
        &self,
        name: Option<&str>,
        address: Address,
        terminal: Option<&str>,
    ) -> Result<Identifier, IdError> {
        self.id_factory()?.create_id(name, address, terminal)
    }

    pub fn generate_id(
        &self,
        meta: &Meta,
        network: EntityType,
        terminal: Option<&str>,
    ) -> Result<Identifier, IdError> {
        self.id_factory()?.generate_id(meta, network, terminal)
    }

    /// Evict about half of the identifier and address caches. Returns the
    /// number of entries removed.
    pub fn reduce_memory(&self) -> usize {
        match self.id_factory() {
            Ok(ids) => ids.reduce_memory(),
            Err(_) => 0,
        }
    }

    /// Whether `meta` is the meta `id` was generated from: it is valid, its
    /// seed is the identifier's name, and it derives the same address.
    pub fn meta_matches_id(&self, meta: &Meta, id: &Identifier) -> bool {
        if !meta.is_valid() || meta.seed() != id.name() {
            return false;
        }
        match self.generate_address(meta, id.network()) {
            Ok(address) => &address == id.address(),
            Err(_) => false,
        }
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    /// Create a document. `doc_type` of `None` or `"*"` derives the type
    /// from the owner's entity type.
    pub fn create_document(
        &self,
        doc_type: Option<&str>,
        did: Identifier,
        data: Option<String>,
        signature: Option<TransportableData>,
    ) -> Result<Document, DocumentError> {
        let tag = match doc_type {
            Some(tag) if tag != WILDCARD_TAG => tag.to_string(),
            _ => DocumentType::default_for(&did).as_tag().to_string(),
        };
        let factory = self
            .documents
            .resolve(&tag, WILDCARD_TAG)
            .ok_or_else(|| DocumentError::UnknownAlgorithm(tag.clone()))?;
        factory.create_document(did, data, signature)
    }

    /// Parse a document from its map (or JSON-encoded map) form.
    pub fn parse_document(&self, value: &Value) -> Result<Document, DocumentError> {
        let info = object_of(value)
            .ok_or_else(|| DocumentError::Format("document is not a map".into()))?;
        let tag = tag_of(info.get("type"));
        let factory = self
            .documents
            .resolve_or_wildcard(tag.as_deref())
            .ok_or_else(|| DocumentError::UnknownAlgorithm(tag.unwrap_or_default()))?;
        factory.parse_document(&info, self)
    }

    // -----------------------------------------------------------------------
    // TED & PNF
    // -----------------------------------------------------------------------

    /// Wrap bytes with the codec registered under `algorithm` (default
    /// base64 when `None`).
    pub fn create_ted(
        &self,
        data: Vec<u8>,
        algorithm: Option<&str>,
    ) -> Result<TransportableData, FormatError> {
        let algorithm = algorithm.unwrap_or(crate::config::ENCODE_BASE64);
        let factory = self
            .transportable_data
            .lookup(algorithm)
            .ok_or_else(|| FormatError::UnknownAlgorithm(algorithm.to_string()))?;
        Ok(factory.create_ted(data))
    }

    pub fn parse_ted(&self, value: &Value) -> Result<TransportableData, FormatError> {
        let info = ted_fields(value)
            .ok_or_else(|| FormatError::Malformed("not a transportable value".into()))?;
        let algorithm = info.get("algorithm").and_then(Value::as_str);
        let factory = self
            .transportable_data
            .resolve_or_wildcard(algorithm)
            .ok_or_else(|| FormatError::UnknownAlgorithm(algorithm.unwrap_or("").to_string()))?;
        factory.parse_ted(&info)
    }

    pub fn create_pnf(
        &self,
        data: Option<TransportableData>,
        filename: Option<String>,
        url: Option<String>,
        password: Option<KeyMap>,
    ) -> Result<PortableNetworkFile, FormatError> {
        self.pnf_factory()?.create_pnf(data, filename, url, password)
    }

    pub fn parse_pnf(&self, value: &Value) -> Result<PortableNetworkFile, FormatError> {
        let info = pnf_fields(value)
            .ok_or_else(|| FormatError::Malformed("not a portable network file".into()))?;
        self.pnf_factory()?.parse_pnf(&info, self)
    }

    fn pnf_factory(&self) -> Result<&Arc<dyn PnfFactory>, FormatError> {
        self.network_files
            .lookup(WILDCARD_TAG)
            .ok_or_else(|| FormatError::UnknownAlgorithm(WILDCARD_TAG.to_string()))
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("loaded", &self.loaded)
            .field("public_keys", &self.public_keys)
            .field("private_keys", &self.private_keys)
            .field("symmetric_keys", &self.symmetric_keys)
            .field("metas", &self.metas)
            .field("documents", &self.documents)
            .field("transportable_data", &self.transportable_data)
            .finish_non_exhaustive()
    }
}

fn unknown_key(algorithm: Option<&str>) -> KeyError {
    match algorithm {
        Some(algorithm) => KeyError::UnknownAlgorithm(algorithm.to_string()),
        None => KeyError::Malformed("missing 'algorithm' field".into()),
    }
}

/// A map, or a string holding a JSON-encoded map.
fn object_of(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(text) => json_map(text),
        _ => None,
    }
}

/// Type tags are strings, but older peers send meta types as numbers.
fn tag_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(tag) if !tag.is_empty() => Some(tag.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ecc::EccPrivateKey;
    use crate::loader::PluginLoader;
    use serde_json::json;

    fn loaded() -> Extensions {
        let mut ext = Extensions::new();
        PluginLoader::default().load(&mut ext);
        ext
    }

    #[test]
    fn empty_extensions_report_unknown() {
        let ext = Extensions::new();
        assert!(!ext.is_loaded());
        let key = json!({"algorithm": "ECC", "data": "00"});
        assert!(matches!(
            ext.parse_public_key(key.as_object().unwrap()),
            Err(KeyError::UnknownAlgorithm(_))
        ));
        assert!(matches!(
            ext.parse_meta(&json!({"type": "1", "key": {}})),
            Err(MetaError::UnknownAlgorithm(_))
        ));
        assert!(ext.parse_id("anyone@anywhere").is_err());
    }

    #[test]
    fn reduce_memory_reaches_shared_address_cache() {
        let ext = loaded();
        for i in 0u32..64 {
            let address = Address::from_key_base58(&i.to_be_bytes(), EntityType::USER);
            ext.parse_id(&format!("{address}")).unwrap();
        }
        // 64 identifiers plus the 64 addresses they were parsed from.
        assert_eq!(ext.reduce_memory(), 64);
        assert_eq!(Extensions::new().reduce_memory(), 0);
    }

    #[test]
    fn mark_loaded_only_once() {
        let mut ext = Extensions::new();
        assert!(ext.mark_loaded());
        assert!(!ext.mark_loaded());
        assert!(ext.is_loaded());
    }

    #[test]
    fn numeric_meta_type_accepted() {
        let ext = loaded();
        let sk = EccPrivateKey::generate();
        let meta = ext.generate_meta("1", &sk, Some("moky")).unwrap();
        let mut info = meta.to_map();
        info.insert("type".into(), json!(1));
        assert_eq!(ext.parse_meta(&Value::Object(info)).unwrap(), meta);
    }

    #[test]
    fn meta_from_json_string() {
        let ext = loaded();
        let sk = EccPrivateKey::generate();
        let meta = ext.generate_meta("2", &sk, None).unwrap();
        let text = meta.to_value().to_string();
        assert_eq!(ext.parse_meta(&Value::String(text)).unwrap(), meta);
    }

    #[test]
    fn missing_meta_type_is_format_error() {
        let ext = loaded();
        assert!(matches!(
            ext.parse_meta(&json!({"key": {"algorithm": "ECC"}})),
            Err(MetaError::Format(_))
        ));
    }

    #[test]
    fn meta_matches_generated_id() {
        let ext = loaded();
        let sk = EccPrivateKey::generate();
        let meta = ext.generate_meta("1", &sk, Some("moky")).unwrap();
        let id = ext.generate_id(&meta, EntityType::USER, None).unwrap();
        assert_eq!(id.name(), Some("moky"));
        assert!(ext.meta_matches_id(&meta, &id));

        let other = ext.generate_meta("1", &EccPrivateKey::generate(), Some("moky")).unwrap();
        assert!(!ext.meta_matches_id(&other, &id));

        let renamed = ext.create_id(Some("someone"), id.address().clone(), None).unwrap();
        assert!(!ext.meta_matches_id(&meta, &renamed));
    }

    #[test]
    fn ted_default_and_unknown_codecs() {
        let ext = loaded();
        let ted = ext.create_ted(b"moky".to_vec(), None).unwrap();
        assert_eq!(ted.to_string(), "bW9reQ==");
        assert!(ext.create_ted(vec![], Some("rot13")).is_err());
        assert_eq!(ext.parse_ted(&json!("base58,3oF5MJ")).unwrap().data(), b"moky");
    }

    #[test]
    fn document_type_from_owner() {
        let ext = loaded();
        let doc = ext
            .create_document(None, Identifier::everyone(), None, None)
            .unwrap();
        assert_eq!(doc.doc_type(), &DocumentType::Bulletin);
    }

    #[test]
    fn symmetric_keys_through_registry() {
        let ext = loaded();
        let key = ext.generate_symmetric_key("AES").unwrap();
        let restored = ext.parse_symmetric_key(&key.to_map()).unwrap();
        let sealed = key.encrypt(b"hello").unwrap();
        assert_eq!(restored.decrypt(&sealed).unwrap(), b"hello");
        assert!(ext.generate_symmetric_key("DES").is_err());
    }

    #[test]
    fn shared_across_threads() {
        let ext = Arc::new(loaded());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ext = Arc::clone(&ext);
                std::thread::spawn(move || {
                    ext.parse_id("moky@4DnqXWdTV8wuZgfqSCX9GjE2kNq7HJrUgQ").unwrap()
                })
            })
            .collect();
        let ids: Vec<Identifier> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }
}
