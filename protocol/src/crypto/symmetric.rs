//! # Symmetric Keys
//!
//! Three symmetric key types are registered by default:
//!
//! - **AES** — AES-256-GCM with a fresh random 96-bit nonce per message.
//! - **AES/CBC/PKCS7Padding** — AES-256-CBC with a fixed per-key IV, the
//!   cipher older peers put in `password` fields. An `"AES"` key map that
//!   carries an `iv` field is parsed as this type too.
//! - **PLAIN** — the identity cipher. Broadcast messages are "encrypted" with
//!   it so that every message goes through the same envelope code path.
//!
//! ## Wire format
//!
//! `AesKey::encrypt()` returns `nonce || ciphertext` as a single `Vec<u8>`.
//! The first 12 bytes are the nonce, the rest is the ciphertext plus the
//! 16-byte GCM tag. `decrypt()` expects the same layout.
//!
//! GCM does not survive nonce reuse. Random nonces give a birthday bound of
//! roughly 2^48 messages per key; session keys are rotated long before that.
//!
//! `AesCbcKey` output is the bare PKCS#7-padded ciphertext. The IV travels
//! in the key map (`{"algorithm":"AES","data":<base64>,"iv":<base64>}`), and
//! there is no authentication tag.

use std::fmt;
use std::sync::Arc;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::Engine as _;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use serde_json::json;

use super::keys::{required_str, KeyError, KeyMap, SymmetricKey, SymmetricKeyFactory};
use crate::config::{
    AES_IV_LENGTH, AES_KEY_LENGTH, AES_NONCE_LENGTH, KEY_ALGORITHM_AES, KEY_ALGORITHM_PLAIN,
};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

fn to_key_map(value: serde_json::Value) -> KeyMap {
    match value {
        serde_json::Value::Object(map) => map,
        _ => KeyMap::new(),
    }
}

fn decode_base64(text: &str, what: &str) -> Result<Vec<u8>, KeyError> {
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .map_err(|_| KeyError::Malformed(format!("{what} is not base64")))
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes
}

// ---------------------------------------------------------------------------
// AES-256-GCM
// ---------------------------------------------------------------------------

/// An AES-256-GCM key.
#[derive(Clone)]
pub struct AesKey {
    bytes: [u8; AES_KEY_LENGTH],
}

impl AesKey {
    /// A fresh random key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            bytes: random_bytes(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; AES_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| KeyError::Malformed(format!("AES key must be {AES_KEY_LENGTH} bytes")))?;
        Ok(Self { bytes })
    }

    /// Parse the base64 `data` field of a key map.
    pub fn from_base64(text: &str) -> Result<Self, KeyError> {
        Self::from_bytes(&decode_base64(text, "AES key data")?)
    }
}

impl SymmetricKey for AesKey {
    fn algorithm(&self) -> &str {
        KEY_ALGORITHM_AES
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
        let cipher = Aes256Gcm::new_from_slice(&self.bytes).map_err(|_| KeyError::EncryptFailed)?;

        let nonce_bytes: [u8; AES_NONCE_LENGTH] = random_bytes();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| KeyError::EncryptFailed)?;

        let mut out = Vec::with_capacity(AES_NONCE_LENGTH + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        if data.len() < AES_NONCE_LENGTH {
            return Err(KeyError::DecryptFailed);
        }
        let (nonce_bytes, ciphertext) = data.split_at(AES_NONCE_LENGTH);
        let cipher = Aes256Gcm::new_from_slice(&self.bytes).map_err(|_| KeyError::DecryptFailed)?;
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| KeyError::DecryptFailed)
    }

    fn to_map(&self) -> KeyMap {
        to_key_map(json!({
            "algorithm": KEY_ALGORITHM_AES,
            "data": base64::engine::general_purpose::STANDARD.encode(self.bytes),
        }))
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AesKey(***)")
    }
}

// ---------------------------------------------------------------------------
// AES-256-CBC / PKCS#7
// ---------------------------------------------------------------------------

/// An AES-256-CBC key with its IV.
#[derive(Clone)]
pub struct AesCbcKey {
    bytes: [u8; AES_KEY_LENGTH],
    iv: [u8; AES_IV_LENGTH],
}

impl AesCbcKey {
    /// A fresh random key and IV from the OS RNG.
    pub fn generate() -> Self {
        Self {
            bytes: random_bytes(),
            iv: random_bytes(),
        }
    }

    pub fn from_parts(bytes: &[u8], iv: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; AES_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| KeyError::Malformed(format!("AES key must be {AES_KEY_LENGTH} bytes")))?;
        let iv: [u8; AES_IV_LENGTH] = iv
            .try_into()
            .map_err(|_| KeyError::Malformed(format!("AES IV must be {AES_IV_LENGTH} bytes")))?;
        Ok(Self { bytes, iv })
    }

    /// Parse the base64 `data` and `iv` fields of a key map. A missing IV
    /// means all zeroes.
    pub fn from_map(key: &KeyMap) -> Result<Self, KeyError> {
        let bytes = decode_base64(required_str(key, "data")?, "AES key data")?;
        let iv = match key.get("iv").and_then(serde_json::Value::as_str) {
            Some(text) if !text.is_empty() => decode_base64(text, "AES IV")?,
            _ => vec![0u8; AES_IV_LENGTH],
        };
        Self::from_parts(&bytes, &iv)
    }
}

impl SymmetricKey for AesCbcKey {
    fn algorithm(&self) -> &str {
        KEY_ALGORITHM_AES
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
        let cipher = Aes256CbcEnc::new_from_slices(&self.bytes, &self.iv)
            .map_err(|_| KeyError::EncryptFailed)?;
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KeyError> {
        let cipher = Aes256CbcDec::new_from_slices(&self.bytes, &self.iv)
            .map_err(|_| KeyError::DecryptFailed)?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| KeyError::DecryptFailed)
    }

    fn to_map(&self) -> KeyMap {
        let engine = &base64::engine::general_purpose::STANDARD;
        to_key_map(json!({
            "algorithm": KEY_ALGORITHM_AES,
            "mode": "CBC",
            "padding": "PKCS7",
            "data": engine.encode(self.bytes),
            "iv": engine.encode(self.iv),
        }))
    }
}

impl fmt::Debug for AesCbcKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AesCbcKey(***)")
    }
}

// ---------------------------------------------------------------------------
// PLAIN
// ---------------------------------------------------------------------------

/// The identity cipher.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainKey;

impl SymmetricKey for PlainKey {
    fn algorithm(&self) -> &str {
        KEY_ALGORITHM_PLAIN
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KeyError> {
        Ok(ciphertext.to_vec())
    }

    fn to_map(&self) -> KeyMap {
        to_key_map(json!({ "algorithm": KEY_ALGORITHM_PLAIN }))
    }
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

/// Generates GCM keys. Parses GCM keys, or CBC keys when the map has an
/// `iv` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct AesKeyFactory;

impl SymmetricKeyFactory for AesKeyFactory {
    fn generate_symmetric_key(&self) -> Arc<dyn SymmetricKey> {
        Arc::new(AesKey::generate())
    }

    fn parse_symmetric_key(&self, key: &KeyMap) -> Result<Arc<dyn SymmetricKey>, KeyError> {
        if key.contains_key("iv") {
            return Ok(Arc::new(AesCbcKey::from_map(key)?));
        }
        Ok(Arc::new(AesKey::from_base64(required_str(key, "data")?)?))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AesCbcKeyFactory;

impl SymmetricKeyFactory for AesCbcKeyFactory {
    fn generate_symmetric_key(&self) -> Arc<dyn SymmetricKey> {
        Arc::new(AesCbcKey::generate())
    }

    fn parse_symmetric_key(&self, key: &KeyMap) -> Result<Arc<dyn SymmetricKey>, KeyError> {
        Ok(Arc::new(AesCbcKey::from_map(key)?))
    }
}

/// Every PLAIN key is the same key; parsing ignores all fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainKeyFactory;

impl SymmetricKeyFactory for PlainKeyFactory {
    fn generate_symmetric_key(&self) -> Arc<dyn SymmetricKey> {
        Arc::new(PlainKey)
    }

    fn parse_symmetric_key(&self, _key: &KeyMap) -> Result<Arc<dyn SymmetricKey>, KeyError> {
        Ok(Arc::new(PlainKey))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes_roundtrip() {
        let key = AesKey::generate();
        let sealed = key.encrypt(b"secret message").unwrap();
        assert_eq!(sealed.len(), AES_NONCE_LENGTH + 14 + 16);
        assert_eq!(key.decrypt(&sealed).unwrap(), b"secret message");
    }

    #[test]
    fn aes_nonces_are_fresh() {
        let key = AesKey::generate();
        let a = key.encrypt(b"same").unwrap();
        let b = key.encrypt(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn aes_wrong_key_fails() {
        let sealed = AesKey::generate().encrypt(b"data").unwrap();
        assert!(matches!(
            AesKey::generate().decrypt(&sealed),
            Err(KeyError::DecryptFailed)
        ));
    }

    #[test]
    fn aes_tampered_ciphertext_fails() {
        let key = AesKey::generate();
        let mut sealed = key.encrypt(b"data").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(key.decrypt(&sealed).is_err());
    }

    #[test]
    fn aes_short_input_fails() {
        assert!(AesKey::generate().decrypt(&[0u8; 5]).is_err());
    }

    #[test]
    fn aes_map_roundtrip() {
        let key = AesKey::from_bytes(&[0x42u8; 32]).unwrap();
        let restored = AesKeyFactory.parse_symmetric_key(&key.to_map()).unwrap();
        let sealed = key.encrypt(b"hello").unwrap();
        assert_eq!(restored.decrypt(&sealed).unwrap(), b"hello");
    }

    #[test]
    fn aes_bad_key_length_rejected() {
        assert!(AesKey::from_bytes(&[0u8; 16]).is_err());
        assert!(AesKey::from_base64("!!!").is_err());
    }

    // NIST SP 800-38A, F.2.5 (CBC-AES256), first block.
    const NIST_KEY: &str = "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4";
    const NIST_IV: &str = "000102030405060708090a0b0c0d0e0f";

    #[test]
    fn cbc_matches_nist_vector() {
        let key = AesCbcKey::from_parts(
            &hex::decode(NIST_KEY).unwrap(),
            &hex::decode(NIST_IV).unwrap(),
        )
        .unwrap();
        let plaintext = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        let sealed = key.encrypt(&plaintext).unwrap();
        // A full block gains a whole block of padding.
        assert_eq!(sealed.len(), 32);
        assert_eq!(hex::encode(&sealed[..16]), "f58c4c04d6e5f1ba779eabfb5f7bfbd6");
        assert_eq!(key.decrypt(&sealed).unwrap(), plaintext);
    }

    #[test]
    fn aes_map_with_iv_parses_as_cbc() {
        let engine = &base64::engine::general_purpose::STANDARD;
        let map = to_key_map(json!({
            "algorithm": "AES",
            "data": engine.encode(hex::decode(NIST_KEY).unwrap()),
            "iv": engine.encode(hex::decode(NIST_IV).unwrap()),
        }));
        let key = AesKeyFactory.parse_symmetric_key(&map).unwrap();
        let sealed = key.encrypt(b"from an older peer").unwrap();
        assert_eq!(sealed.len() % AES_IV_LENGTH, 0);

        let same = AesCbcKeyFactory.parse_symmetric_key(&key.to_map()).unwrap();
        assert_eq!(same.decrypt(&sealed).unwrap(), b"from an older peer");
    }

    #[test]
    fn cbc_bad_padding_or_length_fails() {
        let key = AesCbcKey::generate();
        assert!(matches!(key.decrypt(&[0u8; 15]), Err(KeyError::DecryptFailed)));
        let sealed = AesCbcKey::generate().encrypt(b"data").unwrap();
        assert_ne!(key.decrypt(&sealed).ok(), Some(b"data".to_vec()));
        assert!(AesCbcKey::from_parts(&[0u8; 32], &[0u8; 8]).is_err());
    }

    #[test]
    fn cbc_missing_iv_is_zero() {
        let engine = &base64::engine::general_purpose::STANDARD;
        let map = to_key_map(json!({"algorithm": "AES", "data": engine.encode([7u8; 32])}));
        let key = AesCbcKey::from_map(&map).unwrap();
        assert_eq!(key.to_map()["iv"], engine.encode([0u8; 16]));
    }

    #[test]
    fn plain_is_identity() {
        let key = PlainKeyFactory.generate_symmetric_key();
        assert_eq!(key.encrypt(b"open").unwrap(), b"open");
        assert_eq!(key.decrypt(b"open").unwrap(), b"open");
        assert_eq!(key.to_map()["algorithm"], KEY_ALGORITHM_PLAIN);
    }

    #[test]
    fn aes_debug_hides_key() {
        let key = AesKey::from_bytes(&[0x42u8; 32]).unwrap();
        assert_eq!(format!("{:?}", key), "AesKey(***)");
    }
}
