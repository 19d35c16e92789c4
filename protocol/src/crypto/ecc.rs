//! # secp256k1 Keys
//!
//! ECDSA over secp256k1 with SHA-256 message digests and DER-encoded
//! signatures, via `k256`. This is the key type BTC- and ETH-style metas
//! are built on.
//!
//! Public key data is accepted in either SEC1 form (33-byte compressed or
//! 65-byte uncompressed, hex encoded) and kept exactly as received.
//! Base58Check addresses hash these bytes, so a compressed key and its
//! uncompressed twin yield different addresses. Keys derived from a private
//! key are uncompressed. PEM/X.509 wrapped keys are not handled here.

use std::fmt;
use std::sync::Arc;

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde_json::json;

use super::keys::{
    required_str, KeyError, KeyMap, PrivateKey, PrivateKeyFactory, PublicKeyFactory, SignKey,
    VerifyKey,
};
use crate::config::{
    ECC_COMPRESSED_KEY_LENGTH, ECC_CURVE, ECC_UNCOMPRESSED_KEY_LENGTH, KEY_ALGORITHM_ECC,
    SECRET_KEY_LENGTH,
};

// ---------------------------------------------------------------------------
// EccPublicKey
// ---------------------------------------------------------------------------

/// A secp256k1 public key.
#[derive(Clone)]
pub struct EccPublicKey {
    key: VerifyingKey,
    /// SEC1 encoding as received.
    data: Vec<u8>,
}

impl EccPublicKey {
    /// Parse SEC1 bytes (compressed or uncompressed).
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let key = VerifyingKey::from_sec1_bytes(bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self {
            key,
            data: bytes.to_vec(),
        })
    }

    /// Parse hex-encoded SEC1 bytes (66 or 130 hex digits).
    pub fn from_hex(text: &str) -> Result<Self, KeyError> {
        let expected = [ECC_COMPRESSED_KEY_LENGTH * 2, ECC_UNCOMPRESSED_KEY_LENGTH * 2];
        if !expected.contains(&text.len()) {
            return Err(KeyError::Malformed(format!(
                "ECC public key must be 66 or 130 hex digits, got {}",
                text.len()
            )));
        }
        let bytes = hex::decode(text).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::from_sec1_bytes(&bytes)
    }

    fn from_verifying_key(key: VerifyingKey) -> Self {
        let data = key.to_encoded_point(false).as_bytes().to_vec();
        Self { key, data }
    }

    /// `0x04 || X || Y`, whatever form the key arrived in.
    pub fn uncompressed(&self) -> Vec<u8> {
        self.key.to_encoded_point(false).as_bytes().to_vec()
    }

    pub fn is_compressed(&self) -> bool {
        self.data.len() == ECC_COMPRESSED_KEY_LENGTH
    }
}

/// Expand SEC1 bytes (compressed or uncompressed) to the 65-byte point.
pub fn uncompressed_point(sec1: &[u8]) -> Result<Vec<u8>, KeyError> {
    Ok(EccPublicKey::from_sec1_bytes(sec1)?.uncompressed())
}

impl VerifyKey for EccPublicKey {
    fn algorithm(&self) -> &str {
        KEY_ALGORITHM_ECC
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let parsed = Signature::from_der(signature).or_else(|_| Signature::from_slice(signature));
        let Ok(signature) = parsed else {
            return false;
        };
        // Accept high-S encodings produced by other signers.
        let signature = signature.normalize_s().unwrap_or(signature);
        self.key.verify(data, &signature).is_ok()
    }

    fn to_map(&self) -> KeyMap {
        let value = json!({
            "algorithm": KEY_ALGORITHM_ECC,
            "curve": ECC_CURVE,
            "data": hex::encode(&self.data),
        });
        match value {
            serde_json::Value::Object(map) => map,
            _ => KeyMap::new(),
        }
    }
}

impl fmt::Debug for EccPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EccPublicKey({})", &hex::encode(&self.data)[..18])
    }
}

// ---------------------------------------------------------------------------
// EccPrivateKey
// ---------------------------------------------------------------------------

/// A secp256k1 signing key.
pub struct EccPrivateKey {
    key: SigningKey,
    public: Arc<EccPublicKey>,
}

impl EccPrivateKey {
    /// Generate a fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Reconstruct from a raw 32-byte scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(KeyError::InvalidSecretKey);
        }
        let key = SigningKey::from_slice(bytes).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_signing_key(key))
    }

    /// Reconstruct from a hex-encoded 32-byte scalar.
    pub fn from_hex(text: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(text).map_err(|_| KeyError::InvalidSecretKey)?;
        Self::from_bytes(&bytes)
    }

    fn from_signing_key(key: SigningKey) -> Self {
        let public = Arc::new(EccPublicKey::from_verifying_key(*key.verifying_key()));
        Self { key, public }
    }
}

impl SignKey for EccPrivateKey {
    fn algorithm(&self) -> &str {
        KEY_ALGORITHM_ECC
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let signature: Signature = self.key.sign(data);
        signature.to_der().as_bytes().to_vec()
    }
}

impl PrivateKey for EccPrivateKey {
    fn public_key(&self) -> Arc<dyn VerifyKey> {
        self.public.clone()
    }

    fn to_map(&self) -> KeyMap {
        let value = json!({
            "algorithm": KEY_ALGORITHM_ECC,
            "curve": ECC_CURVE,
            "data": hex::encode(self.key.to_bytes()),
        });
        match value {
            serde_json::Value::Object(map) => map,
            _ => KeyMap::new(),
        }
    }
}

impl fmt::Debug for EccPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EccPrivateKey(pub={:?})", self.public)
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Registered under `"ECC"` in both the public and private key registries.
#[derive(Debug, Default, Clone, Copy)]
pub struct EccKeyFactory;

impl PublicKeyFactory for EccKeyFactory {
    fn parse_public_key(&self, key: &KeyMap) -> Result<Arc<dyn VerifyKey>, KeyError> {
        let data = required_str(key, "data")?;
        Ok(Arc::new(EccPublicKey::from_hex(data)?))
    }
}

impl PrivateKeyFactory for EccKeyFactory {
    fn generate_private_key(&self) -> Result<Arc<dyn PrivateKey>, KeyError> {
        Ok(Arc::new(EccPrivateKey::generate()))
    }

    fn parse_private_key(&self, key: &KeyMap) -> Result<Arc<dyn PrivateKey>, KeyError> {
        let data = required_str(key, "data")?;
        Ok(Arc::new(EccPrivateKey::from_hex(data)?))
    }
}
