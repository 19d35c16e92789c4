//! # Key Capabilities
//!
//! The identity engines never touch curve arithmetic. They hold keys as
//! capability objects and call `sign`, `verify`, `encrypt`, `decrypt` on
//! them. This module defines those capabilities and the factory traits the
//! key registries are made of.
//!
//! ## Key maps
//!
//! On the wire a key is a JSON object with at least an `algorithm` field
//! and usually a `data` field:
//!
//! ```text
//! { "algorithm": "ECC", "curve": "secp256k1", "data": "04a3f1..." }
//! ```
//!
//! Factories are looked up by the `algorithm` value.
//!
//! ## Security considerations
//!
//! Key bytes are never logged and `Debug` implementations of private keys
//! print the public half only.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

/// A key in its wire form.
pub type KeyMap = Map<String, Value>;

/// Message signed when probing whether a private and public key pair up.
const PROBE_MESSAGE: &[u8] = b"Moky loves May Lee forever!";

/// Errors that can occur during key operations.
///
/// Deliberately vague about *why* key material was rejected.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No factory registered for the algorithm and no wildcard fallback.
    #[error("unknown key algorithm: {0}")]
    UnknownAlgorithm(String),

    /// The key map lacks a required field or has the wrong shape.
    #[error("malformed key map: {0}")]
    Malformed(String),

    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid public key bytes")]
    InvalidPublicKey,

    #[error("key generation failed")]
    GenerationFailed,

    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed -- wrong key or corrupted ciphertext")]
    DecryptFailed,
}

/// The public half of an asymmetric key: anything that can check a signature.
pub trait VerifyKey: fmt::Debug + Send + Sync {
    /// Algorithm tag, e.g. `"ECC"`.
    fn algorithm(&self) -> &str;

    /// Raw public key bytes. Address derivation hashes exactly these.
    fn data(&self) -> &[u8];

    /// Check `signature` over `data`. Never panics; malformed input is `false`.
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool;

    /// Wire representation.
    fn to_map(&self) -> KeyMap;
}

/// Anything that can produce a signature.
pub trait SignKey: Send + Sync {
    fn algorithm(&self) -> &str;

    fn sign(&self, data: &[u8]) -> Vec<u8>;
}

/// A signing key that knows its own public half.
pub trait PrivateKey: SignKey + fmt::Debug {
    fn public_key(&self) -> Arc<dyn VerifyKey>;

    /// Wire representation. Contains secret material; handle accordingly.
    fn to_map(&self) -> KeyMap;
}

/// A symmetric cipher key.
pub trait SymmetricKey: fmt::Debug + Send + Sync {
    fn algorithm(&self) -> &str;

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KeyError>;

    fn to_map(&self) -> KeyMap;
}

/// Builds public keys from key maps.
pub trait PublicKeyFactory: Send + Sync {
    fn parse_public_key(&self, key: &KeyMap) -> Result<Arc<dyn VerifyKey>, KeyError>;
}

/// Generates and parses private keys.
pub trait PrivateKeyFactory: Send + Sync {
    fn generate_private_key(&self) -> Result<Arc<dyn PrivateKey>, KeyError>;

    fn parse_private_key(&self, key: &KeyMap) -> Result<Arc<dyn PrivateKey>, KeyError>;
}

/// Generates and parses symmetric keys.
pub trait SymmetricKeyFactory: Send + Sync {
    fn generate_symmetric_key(&self) -> Arc<dyn SymmetricKey>;

    fn parse_symmetric_key(&self, key: &KeyMap) -> Result<Arc<dyn SymmetricKey>, KeyError>;
}

/// Read the `algorithm` field of a key map.
pub fn key_algorithm(key: &KeyMap) -> Option<&str> {
    key.get("algorithm").and_then(Value::as_str)
}

/// Read a required string field of a key map.
pub fn required_str<'a>(key: &'a KeyMap, field: &str) -> Result<&'a str, KeyError> {
    key.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| KeyError::Malformed(format!("missing '{}' field", field)))
}

/// Two public keys are the same key when algorithm and bytes agree.
pub fn same_public_key(a: &dyn VerifyKey, b: &dyn VerifyKey) -> bool {
    a.algorithm() == b.algorithm() && a.data() == b.data()
}

/// Whether `verify_key` is the public half of `sign_key`.
///
/// Compares algorithms, then signs a fixed probe message and checks it.
pub fn keys_match<K: SignKey + ?Sized>(sign_key: &K, verify_key: &dyn VerifyKey) -> bool {
    if sign_key.algorithm() != verify_key.algorithm() {
        return false;
    }
    let signature = sign_key.sign(PROBE_MESSAGE);
    verify_key.verify(PROBE_MESSAGE, &signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ecc::EccPrivateKey;
    use crate::crypto::ed25519::Ed25519PrivateKey;
    use serde_json::json;

    #[test]
    fn algorithm_field_lookup() {
        let map = json!({"algorithm": "ECC", "data": "00"});
        let map = map.as_object().unwrap();
        assert_eq!(key_algorithm(map), Some("ECC"));
        assert_eq!(required_str(map, "data").unwrap(), "00");
        assert!(matches!(required_str(map, "curve"), Err(KeyError::Malformed(_))));
    }

    #[test]
    fn empty_field_is_missing() {
        let map = json!({"algorithm": "ECC", "data": ""});
        assert!(required_str(map.as_object().unwrap(), "data").is_err());
    }

    #[test]
    fn matching_pair_detected() {
        let sk = EccPrivateKey::generate();
        let pk = sk.public_key();
        assert!(keys_match(&sk, pk.as_ref()));
    }

    #[test]
    fn foreign_public_key_rejected() {
        let sk = EccPrivateKey::generate();
        let other = EccPrivateKey::generate().public_key();
        assert!(!keys_match(&sk, other.as_ref()));
    }

    #[test]
    fn cross_algorithm_never_matches() {
        let ecc = EccPrivateKey::generate();
        let ed = Ed25519PrivateKey::generate().public_key();
        assert!(!keys_match(&ecc, ed.as_ref()));
        assert!(!same_public_key(ecc.public_key().as_ref(), ed.as_ref()));
    }

    #[test]
    fn same_public_key_by_bytes() {
        let sk = Ed25519PrivateKey::generate();
        assert!(same_public_key(sk.public_key().as_ref(), sk.public_key().as_ref()));
    }
}
