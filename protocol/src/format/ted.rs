//! # Transportable Encoded Data
//!
//! Binary values (fingerprints, signatures, inline file bodies) travel as
//! text. A TED remembers which codec produced the text so the receiver does
//! not have to guess:
//!
//! ```text
//! bW9reQ==                          base64, the default, written bare
//! hex,6d6f6b79                      any other codec, prefixed
//! data:image/png;base64,iVBOR...    with a MIME type, as a data URI
//! {"algorithm":"base58","data":"3oF5MJ"}
//! ```
//!
//! Parsing goes through the TED registry: the `algorithm` field selects a
//! [`TedFactory`], falling back to the one registered under `"*"`.

use std::fmt;

use serde_json::{Map, Value};

use super::data_uri::DataUri;
use super::{
    base58_decode, base58_encode, base64_decode, base64_encode, hex_decode, hex_encode,
    FormatError,
};
use crate::config::{ENCODE_BASE58, ENCODE_BASE64, ENCODE_HEX};

/// Shortest string that could be a JSON-encoded TED map.
const MIN_JSON_MAP_CHARS: usize = 8;

// ---------------------------------------------------------------------------
// Encode algorithms
// ---------------------------------------------------------------------------

/// The codecs a TED can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncodeAlgorithm {
    #[default]
    Base64,
    Base58,
    Hex,
}

impl EncodeAlgorithm {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            ENCODE_BASE64 => Some(Self::Base64),
            ENCODE_BASE58 => Some(Self::Base58),
            ENCODE_HEX => Some(Self::Hex),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base64 => ENCODE_BASE64,
            Self::Base58 => ENCODE_BASE58,
            Self::Hex => ENCODE_HEX,
        }
    }

    pub fn encode(&self, data: &[u8]) -> String {
        match self {
            Self::Base64 => base64_encode(data),
            Self::Base58 => base58_encode(data),
            Self::Hex => hex_encode(data),
        }
    }

    pub fn decode(&self, text: &str) -> Result<Vec<u8>, FormatError> {
        match self {
            Self::Base64 => base64_decode(text),
            Self::Base58 => base58_decode(text),
            Self::Hex => hex_decode(text),
        }
    }
}

impl fmt::Display for EncodeAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TransportableData
// ---------------------------------------------------------------------------

/// Bytes plus the codec (and optional MIME type) used to put them on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportableData {
    algorithm: EncodeAlgorithm,
    mime_type: Option<String>,
    data: Vec<u8>,
}

impl TransportableData {
    pub fn new(algorithm: EncodeAlgorithm, data: Vec<u8>) -> Self {
        Self {
            algorithm,
            mime_type: None,
            data,
        }
    }

    /// Base64, the default codec.
    pub fn base64(data: Vec<u8>) -> Self {
        Self::new(EncodeAlgorithm::Base64, data)
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn algorithm(&self) -> EncodeAlgorithm {
        self.algorithm
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// The encoded body without any prefix.
    pub fn encoded(&self) -> String {
        self.algorithm.encode(&self.data)
    }

    /// `{ "algorithm", "data", "mime-type"? }`.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut info = Map::new();
        info.insert("algorithm".into(), Value::String(self.algorithm.as_str().into()));
        info.insert("data".into(), Value::String(self.encoded()));
        if let Some(mime) = &self.mime_type {
            info.insert("mime-type".into(), Value::String(mime.clone()));
        }
        info
    }

    /// The compact string form; see the module docs.
    pub fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl fmt::Display for TransportableData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.mime_type, self.algorithm) {
            (None, EncodeAlgorithm::Base64) => f.write_str(&self.encoded()),
            (mime, algorithm) => {
                let uri = DataUri::new(mime.clone(), algorithm.as_str(), self.encoded());
                write!(f, "{uri}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

/// Creates and parses TEDs for one codec.
pub trait TedFactory: Send + Sync {
    fn create_ted(&self, data: Vec<u8>) -> TransportableData;

    /// Build from the normalised map form (see [`ted_fields`]).
    fn parse_ted(&self, info: &Map<String, Value>) -> Result<TransportableData, FormatError>;
}

/// The stock factory: one per [`EncodeAlgorithm`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodedDataFactory {
    algorithm: EncodeAlgorithm,
}

impl EncodedDataFactory {
    pub fn new(algorithm: EncodeAlgorithm) -> Self {
        Self { algorithm }
    }
}

impl TedFactory for EncodedDataFactory {
    fn create_ted(&self, data: Vec<u8>) -> TransportableData {
        TransportableData::new(self.algorithm, data)
    }

    fn parse_ted(&self, info: &Map<String, Value>) -> Result<TransportableData, FormatError> {
        let text = info
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| FormatError::Malformed("TED without 'data'".into()))?;
        let mut ted = TransportableData::new(self.algorithm, self.algorithm.decode(text)?);
        if let Some(mime) = info.get("mime-type").and_then(Value::as_str) {
            ted.mime_type = Some(mime.to_string());
        }
        Ok(ted)
    }
}

/// Normalise any wire form of a TED into its map form.
///
/// Maps pass through; strings are tried as a JSON map, then as a data URI,
/// and otherwise taken as bare default-codec text.
pub fn ted_fields(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(text) => Some(
            json_map(text)
                .or_else(|| DataUri::parse(text).map(|uri| uri.to_map()))
                .unwrap_or_else(|| {
                    let mut info = Map::new();
                    info.insert("data".into(), Value::String(text.clone()));
                    info
                }),
        ),
        _ => None,
    }
}

/// A string that is itself an encoded JSON object.
pub(crate) fn json_map(text: &str) -> Option<Map<String, Value>> {
    if text.len() > MIN_JSON_MAP_CHARS && text.starts_with('{') && text.ends_with('}') {
        serde_json::from_str(text).ok()
    } else {
        None
    }
}
