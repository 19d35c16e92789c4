//! # Plugin Loader
//!
//! Installs the default factories into an [`Extensions`]. This is the whole
//! init phase: call it once, on one thread, before sharing the extensions.
//!
//! Meta type aliases are host configuration. The canonical numeric tags are
//! always registered; `LoaderOptions` decides whether `mkm`/`btc`/`eth` and
//! `MKM`/`BTC`/`ETH` resolve to the same factories.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{
    ENCODE_BASE58, ENCODE_BASE64, ENCODE_HEX, KEY_ALGORITHM_AES, KEY_ALGORITHM_AES_CBC,
    KEY_ALGORITHM_ECC, KEY_ALGORITHM_ED25519, KEY_ALGORITHM_PLAIN, KEY_ALGORITHM_RSA, META_ALIASES_LOWER, META_ALIASES_UPPER,
    META_TYPE_BTC, META_TYPE_ETH, META_TYPE_MKM, WILDCARD_TAG,
};
use crate::crypto::{
    AesCbcKeyFactory, AesKeyFactory, EccKeyFactory, Ed25519KeyFactory, PlainKeyFactory,
    RsaKeyFactory,
};
use crate::extensions::Extensions;
use crate::format::{BaseNetworkFileFactory, EncodeAlgorithm, EncodedDataFactory};
use crate::identity::{
    AddressFactory, BaseAddressFactory, BaseMetaFactory, DocumentType, GeneralDocumentFactory,
    IdentifierFactory, MetaType,
};

/// What the loader installs beyond the canonical defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Register `mkm`, `btc`, `eth` as meta type aliases.
    pub lowercase_meta_aliases: bool,
    /// Register `MKM`, `BTC`, `ETH` as meta type aliases.
    pub uppercase_meta_aliases: bool,
    /// Register a document factory under `"*"` that derives the type from
    /// the owner's entity type.
    pub wildcard_documents: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            lowercase_meta_aliases: true,
            uppercase_meta_aliases: true,
            wildcard_documents: true,
        }
    }
}

/// Installs the built-in factories.
#[derive(Debug, Clone, Default)]
pub struct PluginLoader {
    options: LoaderOptions,
}

impl PluginLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Register everything. Returns `false` (and changes nothing) if `ext`
    /// was already loaded.
    pub fn load(&self, ext: &mut Extensions) -> bool {
        if !ext.mark_loaded() {
            warn!("extensions already loaded; skipping");
            return false;
        }
        self.register_keys(ext);
        self.register_formats(ext);
        self.register_identity(ext);
        self.register_metas(ext);
        self.register_documents(ext);
        debug!(
            metas = ext.metas.len(),
            documents = ext.documents.len(),
            "plugins loaded"
        );
        true
    }

    fn register_keys(&self, ext: &mut Extensions) {
        let ecc = Arc::new(EccKeyFactory);
        ext.public_keys.register(KEY_ALGORITHM_ECC, ecc.clone());
        ext.private_keys.register(KEY_ALGORITHM_ECC, ecc);

        let rsa = Arc::new(RsaKeyFactory);
        ext.public_keys.register(KEY_ALGORITHM_RSA, rsa.clone());
        ext.private_keys.register(KEY_ALGORITHM_RSA, rsa);

        let ed25519 = Arc::new(Ed25519KeyFactory);
        ext.public_keys.register(KEY_ALGORITHM_ED25519, ed25519.clone());
        ext.private_keys.register(KEY_ALGORITHM_ED25519, ed25519);

        ext.symmetric_keys.register(KEY_ALGORITHM_AES, Arc::new(AesKeyFactory));
        ext.symmetric_keys
            .register(KEY_ALGORITHM_AES_CBC, Arc::new(AesCbcKeyFactory));
        ext.symmetric_keys.register(KEY_ALGORITHM_PLAIN, Arc::new(PlainKeyFactory));
    }

    fn register_formats(&self, ext: &mut Extensions) {
        let base64 = Arc::new(EncodedDataFactory::new(EncodeAlgorithm::Base64));
        ext.transportable_data.register(ENCODE_BASE64, base64.clone());
        ext.transportable_data.register(WILDCARD_TAG, base64);
        ext.transportable_data.register(
            ENCODE_BASE58,
            Arc::new(EncodedDataFactory::new(EncodeAlgorithm::Base58)),
        );
        ext.transportable_data.register(
            ENCODE_HEX,
            Arc::new(EncodedDataFactory::new(EncodeAlgorithm::Hex)),
        );
        ext.network_files
            .register(WILDCARD_TAG, BaseNetworkFileFactory::shared());
    }

    fn register_identity(&self, ext: &mut Extensions) {
        let addresses: Arc<dyn AddressFactory> = Arc::new(BaseAddressFactory::new());
        ext.addresses.register(WILDCARD_TAG, addresses.clone());
        ext.ids
            .register(WILDCARD_TAG, Arc::new(IdentifierFactory::new(addresses)));
    }

    fn register_metas(&self, ext: &mut Extensions) {
        for (tag, meta_type) in [
            (META_TYPE_MKM, MetaType::Default),
            (META_TYPE_BTC, MetaType::Btc),
            (META_TYPE_ETH, MetaType::Eth),
        ] {
            ext.metas.register(tag, Arc::new(BaseMetaFactory::new(meta_type)));
        }

        let mut aliases = Vec::new();
        if self.options.lowercase_meta_aliases {
            aliases.extend(META_ALIASES_LOWER);
        }
        if self.options.uppercase_meta_aliases {
            aliases.extend(META_ALIASES_UPPER);
        }
        for (canonical, alias) in aliases {
            if let Some(factory) = ext.metas.lookup(canonical).cloned() {
                ext.metas.register(alias, factory);
            }
        }
    }

    fn register_documents(&self, ext: &mut Extensions) {
        for doc_type in [DocumentType::Visa, DocumentType::Profile, DocumentType::Bulletin] {
            let tag = doc_type.as_tag().to_string();
            ext.documents
                .register(tag, Arc::new(GeneralDocumentFactory::new(doc_type)));
        }
        if self.options.wildcard_documents {
            ext.documents
                .register(WILDCARD_TAG, Arc::new(GeneralDocumentFactory::wildcard()));
        }
    }
}
