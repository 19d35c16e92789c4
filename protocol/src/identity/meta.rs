//! # Meta
//!
//! A meta is the minimal record an address is derived from: a public key,
//! and for the default scheme an optional seed (the account name) together
//! with a fingerprint, which is the seed signed by the matching private key.
//!
//! ```text
//! {
//!   "type": "1",
//!   "key": { "algorithm": "ECC", "curve": "secp256k1", "data": "04..." },
//!   "seed": "moky",
//!   "fingerprint": "MEUCIQD..."
//! }
//! ```
//!
//! Three schemes are built in:
//!
//! | Tag | Scheme  | Seed/fingerprint | Address                         |
//! |-----|---------|------------------|---------------------------------|
//! | `1` | default | optional, signed | Base58Check, any entity type    |
//! | `2` | BTC     | dropped          | Base58Check, users only         |
//! | `4` | ETH     | dropped          | `0x` + EIP-55 hex, users only   |
//!
//! A [`Meta`] is immutable. Every constructor validates it, so holding one
//! means holding a self-consistent record.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{
    KEY_ALGORITHM_ECC, META_ALIASES_LOWER, META_ALIASES_UPPER,
    META_TYPE_BTC, META_TYPE_ETH, META_TYPE_MKM,
};
use crate::crypto::ecc::uncompressed_point;
use crate::crypto::keys::{same_public_key, KeyError, KeyMap, PrivateKey, SignKey, VerifyKey};
use crate::extensions::Extensions;
use crate::format::TransportableData;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while building or parsing a meta.
#[derive(Debug, Error)]
pub enum MetaError {
    /// No meta factory for this type tag.
    #[error("unknown meta type: {0}")]
    UnknownAlgorithm(String),

    /// Missing fields, seed without fingerprint (or vice versa), or a
    /// fingerprint that does not verify.
    #[error("meta format error: {0}")]
    Format(String),

    #[error(transparent)]
    Key(#[from] KeyError),
}

// ---------------------------------------------------------------------------
// MetaType
// ---------------------------------------------------------------------------

/// The derivation scheme a meta selects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetaType {
    Default,
    Btc,
    Eth,
    /// A tag installed by the host with its own factory.
    Other(String),
}

impl MetaType {
    /// Resolve a canonical tag or one of its aliases.
    pub fn from_tag(tag: &str) -> Self {
        let canonical = META_ALIASES_LOWER
            .iter()
            .chain(META_ALIASES_UPPER.iter())
            .find(|(_, alias)| *alias == tag)
            .map(|(canonical, _)| *canonical)
            .unwrap_or(tag);
        match canonical {
            META_TYPE_MKM => Self::Default,
            META_TYPE_BTC => Self::Btc,
            META_TYPE_ETH => Self::Eth,
            _ => Self::Other(tag.to_string()),
        }
    }

    /// The canonical wire tag.
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Default => META_TYPE_MKM,
            Self::Btc => META_TYPE_BTC,
            Self::Eth => META_TYPE_ETH,
            Self::Other(tag) => tag,
        }
    }

    /// Whether this scheme carries a seed and fingerprint.
    pub fn has_seed(&self) -> bool {
        matches!(self, Self::Default | Self::Other(_))
    }
}

impl fmt::Display for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

// ---------------------------------------------------------------------------
// Meta
// ---------------------------------------------------------------------------

/// A validated meta record.
#[derive(Clone)]
pub struct Meta {
    meta_type: MetaType,
    key: Arc<dyn VerifyKey>,
    seed: Option<String>,
    fingerprint: Option<TransportableData>,
}

impl Meta {
    /// Build and validate.
    ///
    /// BTC and ETH metas drop `seed` and `fingerprint`. For the other
    /// schemes both must be present or both absent, and the fingerprint must
    /// verify against `key` over the seed's UTF-8 bytes.
    pub fn new(
        meta_type: MetaType,
        key: Arc<dyn VerifyKey>,
        seed: Option<String>,
        fingerprint: Option<TransportableData>,
    ) -> Result<Self, MetaError> {
        let (seed, fingerprint) = if meta_type.has_seed() {
            (seed, fingerprint)
        } else {
            (None, None)
        };
        if seed.is_some() != fingerprint.is_some() {
            return Err(MetaError::Format(
                "seed and fingerprint must be both present or both absent".into(),
            ));
        }
        let meta = Self {
            meta_type,
            key,
            seed,
            fingerprint,
        };
        if !meta.is_valid() {
            return Err(MetaError::Format(format!(
                "{} meta failed self-validation",
                meta.meta_type
            )));
        }
        Ok(meta)
    }

    pub fn meta_type(&self) -> &MetaType {
        &self.meta_type
    }

    pub fn public_key(&self) -> &Arc<dyn VerifyKey> {
        &self.key
    }

    pub fn seed(&self) -> Option<&str> {
        self.seed.as_deref()
    }

    pub fn fingerprint(&self) -> Option<&TransportableData> {
        self.fingerprint.as_ref()
    }

    /// Recompute validity from the fields.
    pub fn is_valid(&self) -> bool {
        match self.meta_type {
            MetaType::Btc => !self.key.data().is_empty(),
            MetaType::Eth => {
                self.key.algorithm() == KEY_ALGORITHM_ECC
                    && uncompressed_point(self.key.data()).is_ok()
            }
            MetaType::Default | MetaType::Other(_) => match (&self.seed, &self.fingerprint) {
                (None, None) => true,
                (Some(seed), Some(fingerprint)) => {
                    self.key.verify(seed.as_bytes(), fingerprint.data())
                }
                _ => false,
            },
        }
    }

    /// Whether `key` belongs to the owner of this meta.
    ///
    /// True for the meta key itself, and for a seeded meta also for any key
    /// that verifies the fingerprint.
    pub fn matches_public_key(&self, key: &dyn VerifyKey) -> bool {
        if same_public_key(self.key.as_ref(), key) {
            return true;
        }
        match (&self.seed, &self.fingerprint) {
            (Some(seed), Some(fingerprint)) => key.verify(seed.as_bytes(), fingerprint.data()),
            _ => false,
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut info = Map::new();
        info.insert("type".into(), Value::String(self.meta_type.as_tag().into()));
        info.insert("key".into(), Value::Object(self.key.to_map()));
        if let Some(seed) = &self.seed {
            info.insert("seed".into(), Value::String(seed.clone()));
        }
        if let Some(fingerprint) = &self.fingerprint {
            info.insert("fingerprint".into(), fingerprint.to_value());
        }
        info
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }
}

impl PartialEq for Meta {
    fn eq(&self, other: &Self) -> bool {
        self.meta_type == other.meta_type
            && same_public_key(self.key.as_ref(), other.key.as_ref())
            && self.seed == other.seed
            && self.fingerprint.as_ref().map(TransportableData::data)
                == other.fingerprint.as_ref().map(TransportableData::data)
    }
}

impl Eq for Meta {}

impl Hash for Meta {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta_type.hash(state);
        self.key.algorithm().hash(state);
        self.key.data().hash(state);
        self.seed.hash(state);
        self.fingerprint.as_ref().map(TransportableData::data).hash(state);
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meta")
            .field("type", &self.meta_type.as_tag())
            .field("key", &self.key)
            .field("seed", &self.seed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Generates, creates and parses metas of one type.
pub trait MetaFactory: Send + Sync {
    fn meta_type(&self) -> &MetaType;

    /// Sign `seed` with `private_key` and build a meta around its public half.
    fn generate_meta(
        &self,
        private_key: &dyn PrivateKey,
        seed: Option<&str>,
    ) -> Result<Meta, MetaError>;

    fn create_meta(
        &self,
        key: Arc<dyn VerifyKey>,
        seed: Option<String>,
        fingerprint: Option<TransportableData>,
    ) -> Result<Meta, MetaError>;

    /// Build from the wire map. Key and fingerprint are decoded through the
    /// registries of `ext`.
    fn parse_meta(&self, info: &Map<String, Value>, ext: &Extensions) -> Result<Meta, MetaError>;
}

/// The stock factory for the built-in schemes.
#[derive(Debug, Clone)]
pub struct BaseMetaFactory {
    meta_type: MetaType,
}

impl BaseMetaFactory {
    pub fn new(meta_type: MetaType) -> Self {
        Self { meta_type }
    }
}

impl MetaFactory for BaseMetaFactory {
    fn meta_type(&self) -> &MetaType {
        &self.meta_type
    }

    fn generate_meta(
        &self,
        private_key: &dyn PrivateKey,
        seed: Option<&str>,
    ) -> Result<Meta, MetaError> {
        let seed = seed.filter(|s| !s.is_empty() && self.meta_type.has_seed());
        let fingerprint =
            seed.map(|s| TransportableData::base64(SignKey::sign(private_key, s.as_bytes())));
        self.create_meta(private_key.public_key(), seed.map(str::to_string), fingerprint)
    }

    fn create_meta(
        &self,
        key: Arc<dyn VerifyKey>,
        seed: Option<String>,
        fingerprint: Option<TransportableData>,
    ) -> Result<Meta, MetaError> {
        if let MetaType::Other(tag) = &self.meta_type {
            return Err(MetaError::UnknownAlgorithm(tag.clone()));
        }
        let seed = seed.filter(|s| !s.is_empty());
        let meta = Meta::new(self.meta_type.clone(), key, seed, fingerprint)?;
        debug!(meta_type = %meta.meta_type, seeded = meta.seed.is_some(), "meta created");
        Ok(meta)
    }

    fn parse_meta(&self, info: &Map<String, Value>, ext: &Extensions) -> Result<Meta, MetaError> {
        let key_map: &KeyMap = match info.get("key") {
            Some(Value::Object(map)) => map,
            _ => {
                warn!("meta rejected: missing key");
                return Err(MetaError::Format("missing 'key'".into()));
            }
        };
        let seed = match info.get("seed") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(MetaError::Format("'seed' must be a string".into())),
        };
        let fingerprint = match info.get("fingerprint") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                ext.parse_ted(value)
                    .map_err(|e| MetaError::Format(format!("fingerprint: {e}")))?,
            ),
        };
        if seed.is_some() != fingerprint.is_some() {
            warn!("meta rejected: seed/fingerprint mismatch");
            return Err(MetaError::Format(
                "seed and fingerprint must be both present or both absent".into(),
            ));
        }
        let key = ext.parse_public_key(key_map)?;
        self.create_meta(key, seed, fingerprint)
    }
}
