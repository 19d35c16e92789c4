//! # Ed25519 Keys
//!
//! Ed25519 signing keys via `ed25519-dalek`. Not one of the address schemes'
//! native curves, but any registered key algorithm can back a default-scheme
//! meta: the address is derived from whatever bytes [`VerifyKey::data`]
//! returns.
//!
//! Signatures are deterministic (RFC 8032), 64 bytes, no DER wrapping.

use std::fmt;
use std::sync::Arc;

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde_json::json;

use super::keys::{
    required_str, KeyError, KeyMap, PrivateKey, PrivateKeyFactory, PublicKeyFactory, SignKey,
    VerifyKey,
};
use crate::config::{KEY_ALGORITHM_ED25519, SECRET_KEY_LENGTH};

fn to_key_map(value: serde_json::Value) -> KeyMap {
    match value {
        serde_json::Value::Object(map) => map,
        _ => KeyMap::new(),
    }
}

/// An Ed25519 verifying key.
#[derive(Clone, PartialEq, Eq)]
pub struct Ed25519PublicKey {
    bytes: [u8; 32],
}

impl Ed25519PublicKey {
    /// Validate that `slice` is a 32-byte Ed25519 point.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    pub fn from_hex(text: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(text).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }
}

impl VerifyKey for Ed25519PublicKey {
    fn algorithm(&self) -> &str {
        KEY_ALGORITHM_ED25519
    }

    fn data(&self) -> &[u8] {
        &self.bytes
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let signature = DalekSignature::from_bytes(&sig_bytes);
        verifying_key.verify(data, &signature).is_ok()
    }

    fn to_map(&self) -> KeyMap {
        to_key_map(json!({
            "algorithm": KEY_ALGORITHM_ED25519,
            "data": hex::encode(self.bytes),
        }))
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519PublicKey({})", &hex::encode(self.bytes)[..16])
    }
}

/// An Ed25519 signing key.
pub struct Ed25519PrivateKey {
    signing_key: SigningKey,
}

impl Ed25519PrivateKey {
    /// Generate a fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic construction from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn from_hex(text: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(text).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; SECRET_KEY_LENGTH] =
            bytes.as_slice().try_into().map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    fn public(&self) -> Ed25519PublicKey {
        Ed25519PublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }
}

impl SignKey for Ed25519PrivateKey {
    fn algorithm(&self) -> &str {
        KEY_ALGORITHM_ED25519
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.signing_key.sign(data).to_bytes().to_vec()
    }
}

impl PrivateKey for Ed25519PrivateKey {
    fn public_key(&self) -> Arc<dyn VerifyKey> {
        Arc::new(self.public())
    }

    fn to_map(&self) -> KeyMap {
        to_key_map(json!({
            "algorithm": KEY_ALGORITHM_ED25519,
            "data": hex::encode(self.signing_key.to_bytes()),
        }))
    }
}

impl fmt::Debug for Ed25519PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material, not even partially.
        write!(f, "Ed25519PrivateKey(pub={:?})", self.public())
    }
}

/// Registered under `"Ed25519"` in both the public and private key registries.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519KeyFactory;

impl PublicKeyFactory for Ed25519KeyFactory {
    fn parse_public_key(&self, key: &KeyMap) -> Result<Arc<dyn VerifyKey>, KeyError> {
        Ok(Arc::new(Ed25519PublicKey::from_hex(required_str(key, "data")?)?))
    }
}

impl PrivateKeyFactory for Ed25519KeyFactory {
    fn generate_private_key(&self) -> Result<Arc<dyn PrivateKey>, KeyError> {
        Ok(Arc::new(Ed25519PrivateKey::generate()))
    }

    fn parse_private_key(&self, key: &KeyMap) -> Result<Arc<dyn PrivateKey>, KeyError> {
        Ok(Arc::new(Ed25519PrivateKey::from_hex(required_str(key, "data")?)?))
    }
}
