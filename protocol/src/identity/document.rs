//! # Documents
//!
//! A document is a signed JSON payload an entity publishes about itself:
//!
//! ```text
//! {
//!   "did": "moky@4DnqXWdTV8wuZgfqSCX9GjE2kNq7HJrUgQ",
//!   "type": "visa",
//!   "data": "{\"name\":\"Moky\",\"time\":1700000000,...}",
//!   "signature": "MEUCIQD..."
//! }
//! ```
//!
//! `data` is kept as the exact string that was signed. Properties are parsed
//! from it, but nothing marks them trusted: callers go through
//! [`Document::verified_properties`] with the key from the owner's meta, or
//! consciously opt out via [`Document::properties_unverified`].
//!
//! ## Types
//!
//! | Tag        | Owner  | Extra properties              |
//! |------------|--------|-------------------------------|
//! | `visa`     | user   | `key` (encryption), `avatar`  |
//! | `bulletin` | group  | `founder`, `assistants`       |
//! | `profile`  | other  | none                          |

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::id::{IdError, Identifier};
use crate::config::{DOCUMENT_TYPE_BULLETIN, DOCUMENT_TYPE_PROFILE, DOCUMENT_TYPE_VISA, WILDCARD_TAG};
use crate::crypto::keys::{KeyError, KeyMap, SignKey, VerifyKey};
use crate::extensions::Extensions;
use crate::format::{FormatError, PortableNetworkFile, TransportableData};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while building or parsing a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unknown document type: {0}")]
    UnknownAlgorithm(String),

    /// Data without signature (or the reverse), or data that is not a JSON
    /// object.
    #[error("document format error: {0}")]
    Format(String),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error(transparent)]
    Encoding(#[from] FormatError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

// ---------------------------------------------------------------------------
// DocumentType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentType {
    Visa,
    Profile,
    Bulletin,
    Other(String),
}

impl DocumentType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            DOCUMENT_TYPE_VISA => Self::Visa,
            DOCUMENT_TYPE_PROFILE => Self::Profile,
            DOCUMENT_TYPE_BULLETIN => Self::Bulletin,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::Visa => DOCUMENT_TYPE_VISA,
            Self::Profile => DOCUMENT_TYPE_PROFILE,
            Self::Bulletin => DOCUMENT_TYPE_BULLETIN,
            Self::Other(tag) => tag,
        }
    }

    /// The type an entity publishes when none is named.
    pub fn default_for(did: &Identifier) -> Self {
        if did.is_group() {
            Self::Bulletin
        } else if did.is_user() {
            Self::Visa
        } else {
            Self::Profile
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    did: Identifier,
    doc_type: DocumentType,
    data: Option<String>,
    signature: Option<TransportableData>,
    properties: Map<String, Value>,
}

impl Document {
    /// Build from stored parts.
    ///
    /// Empty `data` means an unsigned placeholder and must come without a
    /// signature. Non-empty `data` needs a signature and must be a JSON
    /// object.
    pub fn new(
        did: Identifier,
        doc_type: DocumentType,
        data: Option<String>,
        signature: Option<TransportableData>,
    ) -> Result<Self, DocumentError> {
        let data = data.filter(|d| !d.is_empty());
        let properties = match (&data, &signature) {
            (None, None) => Map::new(),
            (Some(text), Some(_)) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => map,
                _ => {
                    return Err(DocumentError::Format("data is not a JSON object".into()));
                }
            },
            (None, Some(_)) => {
                return Err(DocumentError::Format("signature without data".into()));
            }
            (Some(_), None) => {
                return Err(DocumentError::Format("data without signature".into()));
            }
        };
        Ok(Self {
            did,
            doc_type,
            data,
            signature,
            properties,
        })
    }

    pub fn did(&self) -> &Identifier {
        &self.did
    }

    pub fn doc_type(&self) -> &DocumentType {
        &self.doc_type
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn signature(&self) -> Option<&TransportableData> {
        self.signature.as_ref()
    }

    /// An unsigned placeholder.
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Check the signature over `data`. Empty documents never verify.
    pub fn verify(&self, key: &dyn VerifyKey) -> bool {
        match (&self.data, &self.signature) {
            (Some(data), Some(signature)) => key.verify(data.as_bytes(), signature.data()),
            _ => false,
        }
    }

    /// Properties, if the signature verifies against `key`.
    pub fn verified_properties(&self, key: &dyn VerifyKey) -> Option<&Map<String, Value>> {
        if self.verify(key) {
            Some(&self.properties)
        } else {
            warn!(did = %self.did, "document signature did not verify");
            None
        }
    }

    /// Properties without any signature check. Do not trust these.
    pub fn properties_unverified(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(Value::as_str)
    }

    /// Signing time (UTC seconds, fractional allowed).
    pub fn time(&self) -> Option<DateTime<Utc>> {
        let seconds = self.properties.get("time").and_then(Value::as_f64)?;
        let whole = seconds.floor();
        let nanos = ((seconds - whole) * 1e9) as u32;
        Utc.timestamp_opt(whole as i64, nanos).single()
    }

    pub fn as_visa(&self) -> Option<Visa<'_>> {
        (self.doc_type == DocumentType::Visa).then_some(Visa { document: self })
    }

    pub fn as_bulletin(&self) -> Option<Bulletin<'_>> {
        (self.doc_type == DocumentType::Bulletin).then_some(Bulletin { document: self })
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut info = Map::new();
        info.insert("did".into(), Value::String(self.did.to_string()));
        info.insert("type".into(), Value::String(self.doc_type.as_tag().into()));
        if let Some(data) = &self.data {
            info.insert("data".into(), Value::String(data.clone()));
        }
        if let Some(signature) = &self.signature {
            info.insert("signature".into(), signature.to_value());
        }
        info
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }
}

// ---------------------------------------------------------------------------
// Typed views
// ---------------------------------------------------------------------------

/// A user's document.
#[derive(Debug, Clone, Copy)]
pub struct Visa<'a> {
    document: &'a Document,
}

impl<'a> Visa<'a> {
    /// The key others use to encrypt messages for this user.
    pub fn key_map(&self) -> Option<&'a KeyMap> {
        self.document.properties.get("key").and_then(Value::as_object)
    }

    pub fn avatar(&self, ext: &Extensions) -> Option<PortableNetworkFile> {
        let value = self.document.properties.get("avatar")?;
        ext.parse_pnf(value).ok()
    }
}

/// A group's document.
#[derive(Debug, Clone, Copy)]
pub struct Bulletin<'a> {
    document: &'a Document,
}

impl<'a> Bulletin<'a> {
    pub fn founder(&self, ext: &Extensions) -> Option<Identifier> {
        let text = self.document.properties.get("founder")?.as_str()?;
        ext.parse_id(text).ok()
    }

    /// Bots that help run the group. Unparseable entries are skipped.
    pub fn assistants(&self, ext: &Extensions) -> Vec<Identifier> {
        self.document
            .properties
            .get("assistants")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|text| ext.parse_id(text).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects properties and produces a signed [`Document`].
///
/// ```
/// use mkm_protocol::crypto::EccPrivateKey;
/// use mkm_protocol::identity::{DocumentBuilder, DocumentType, Identifier};
///
/// let key = EccPrivateKey::generate();
/// let doc = DocumentBuilder::new(Identifier::founder(), DocumentType::Visa)
///     .property("name", "Moky")
///     .sign(&key)
///     .unwrap();
/// assert_eq!(doc.name(), Some("Moky"));
/// ```
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    did: Identifier,
    doc_type: DocumentType,
    properties: Map<String, Value>,
}

impl DocumentBuilder {
    pub fn new(did: Identifier, doc_type: DocumentType) -> Self {
        Self {
            did,
            doc_type,
            properties: Map::new(),
        }
    }

    /// Start from an existing document's properties.
    pub fn from_document(document: &Document) -> Self {
        Self {
            did: document.did.clone(),
            doc_type: document.doc_type.clone(),
            properties: document.properties.clone(),
        }
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Visa encryption key.
    pub fn visa_key(self, key: KeyMap) -> Self {
        self.property("key", Value::Object(key))
    }

    pub fn avatar(self, avatar: &PortableNetworkFile) -> Self {
        self.property("avatar", avatar.to_value())
    }

    pub fn founder(self, founder: &Identifier) -> Self {
        self.property("founder", founder.to_string())
    }

    pub fn assistants(self, assistants: &[Identifier]) -> Self {
        let list: Vec<Value> = assistants.iter().map(|a| Value::String(a.to_string())).collect();
        self.property("assistants", list)
    }

    /// Stamp `time` if unset, serialise, and sign the JSON text.
    pub fn sign<K: SignKey + ?Sized>(mut self, key: &K) -> Result<Document, DocumentError> {
        if !self.properties.contains_key("time") {
            self.properties
                .insert("time".into(), Value::from(Utc::now().timestamp()));
        }
        let data = serde_json::to_string(&self.properties)
            .map_err(|e| DocumentError::Format(e.to_string()))?;
        let signature = TransportableData::base64(key.sign(data.as_bytes()));
        debug!(did = %self.did, doc_type = %self.doc_type, "document signed");
        Document::new(self.did, self.doc_type, Some(data), Some(signature))
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Creates and parses documents.
pub trait DocumentFactory: Send + Sync {
    fn create_document(
        &self,
        did: Identifier,
        data: Option<String>,
        signature: Option<TransportableData>,
    ) -> Result<Document, DocumentError>;

    fn parse_document(
        &self,
        info: &Map<String, Value>,
        ext: &Extensions,
    ) -> Result<Document, DocumentError>;
}

/// The stock factory. Built for one type, or for `None` meaning "whatever
/// the owner's entity type implies".
#[derive(Debug, Clone, Default)]
pub struct GeneralDocumentFactory {
    doc_type: Option<DocumentType>,
}

impl GeneralDocumentFactory {
    pub fn new(doc_type: DocumentType) -> Self {
        Self {
            doc_type: Some(doc_type),
        }
    }

    /// Registered under `"*"`.
    pub fn wildcard() -> Self {
        Self { doc_type: None }
    }

    fn resolve(&self, did: &Identifier) -> DocumentType {
        self.doc_type
            .clone()
            .unwrap_or_else(|| DocumentType::default_for(did))
    }
}

impl DocumentFactory for GeneralDocumentFactory {
    fn create_document(
        &self,
        did: Identifier,
        data: Option<String>,
        signature: Option<TransportableData>,
    ) -> Result<Document, DocumentError> {
        let doc_type = self.resolve(&did);
        Document::new(did, doc_type, data, signature)
    }

    fn parse_document(
        &self,
        info: &Map<String, Value>,
        ext: &Extensions,
    ) -> Result<Document, DocumentError> {
        let did = match info.get("did").and_then(Value::as_str) {
            Some(text) => ext.parse_id(text)?,
            None => {
                warn!("document rejected: missing did");
                return Err(DocumentError::Format("missing 'did'".into()));
            }
        };
        let data = match info.get("data") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(_) => return Err(DocumentError::Format("'data' must be a string".into())),
        };
        let signature = match info.get("signature") {
            None | Some(Value::Null) => None,
            Some(value) => Some(ext.parse_ted(value)?),
        };
        if data.is_some() != signature.is_some() {
            warn!(did = %did, "document rejected: data/signature mismatch");
            return Err(DocumentError::Format(
                "data and signature must be both present or both absent".into(),
            ));
        }
        let doc_type = match info.get("type").and_then(Value::as_str) {
            Some(tag) if tag != WILDCARD_TAG && !tag.is_empty() => DocumentType::from_tag(tag),
            _ => DocumentType::default_for(&did),
        };
        Document::new(did, doc_type, data, signature)
    }
}
