//! # Text and Binary Codecs
//!
//! Thin wrappers over `bs58`, `base64` and `hex` so the rest of the crate
//! speaks one error type, plus the two wire containers built on top of them:
//!
//! - [`TransportableData`] (TED) — bytes with their encoding attached, used
//!   for fingerprints and signatures.
//! - [`PortableNetworkFile`] (PNF) — inline data, a download URL, or both,
//!   used for avatars.

pub mod data_uri;
pub mod pnf;
pub mod ted;

use base64::Engine as _;
use thiserror::Error;

pub use data_uri::DataUri;
pub use pnf::{BaseNetworkFileFactory, PnfFactory, PortableNetworkFile};
pub use ted::{EncodeAlgorithm, EncodedDataFactory, TedFactory, TransportableData};

/// Errors from decoding text forms.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("invalid base58 text")]
    Base58,

    #[error("invalid base64 text")]
    Base64,

    #[error("invalid hex text")]
    Hex,

    #[error("invalid UTF-8 bytes")]
    Utf8,

    /// No codec or factory for this tag and no wildcard fallback.
    #[error("unknown encode algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("malformed value: {0}")]
    Malformed(String),
}

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(text: &str) -> Result<Vec<u8>, FormatError> {
    bs58::decode(text).into_vec().map_err(|_| FormatError::Base58)
}

pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Standard alphabet, padded. Surrounding whitespace is ignored.
pub fn base64_decode(text: &str) -> Result<Vec<u8>, FormatError> {
    base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|_| FormatError::Base64)
}

/// Lowercase hex.
pub fn hex_encode(data: &[u8]) -> String {
    hex::encode(data)
}

/// Accepts either case, with or without a `0x` prefix.
pub fn hex_decode(text: &str) -> Result<Vec<u8>, FormatError> {
    let text = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(text).map_err(|_| FormatError::Hex)
}

pub fn utf8_encode(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

pub fn utf8_decode(data: &[u8]) -> Result<String, FormatError> {
    String::from_utf8(data.to_vec()).map_err(|_| FormatError::Utf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base58_known_vector() {
        assert_eq!(base58_encode(b"moky"), "3oF5MJ");
        assert_eq!(base58_decode("3oF5MJ").unwrap(), b"moky");
    }

    #[test]
    fn base58_rejects_ambiguous_characters() {
        // '0', 'O', 'I' and 'l' are not in the alphabet.
        assert!(matches!(base58_decode("0OIl"), Err(FormatError::Base58)));
    }

    #[test]
    fn base64_known_vector() {
        assert_eq!(base64_encode(b"moky"), "bW9reQ==");
        assert_eq!(base64_decode(" bW9reQ==\n").unwrap(), b"moky");
        assert!(base64_decode("bW9reQ=").is_err());
    }

    #[test]
    fn hex_accepts_prefix_and_case() {
        assert_eq!(hex_encode(b"moky"), "6d6f6b79");
        assert_eq!(hex_decode("0x6D6F6B79").unwrap(), b"moky");
        assert!(matches!(hex_decode("xyz"), Err(FormatError::Hex)));
    }

    #[test]
    fn utf8_roundtrip_and_rejection() {
        assert_eq!(utf8_decode(&utf8_encode("moky")).unwrap(), "moky");
        assert!(utf8_decode(&[0xff, 0xfe]).is_err());
    }
}
