//! # Cryptographic Collaborators
//!
//! The identity engines only ever call `sign`, `verify`, `encrypt` and
//! `decrypt` through the capability traits in [`keys`]. Everything else in
//! this module is a default implementation of those traits, plus the hash
//! functions the address schemes are defined in terms of.
//!
//! - **secp256k1** (`ecc`) for BTC/ETH-style metas.
//! - **RSA** (`rsa`), PKCS#1 v1.5 over SHA-256, for default-scheme metas.
//! - **Ed25519** (`ed25519`) as an alternative default-scheme key.
//! - **AES-256-GCM**, **AES-256-CBC** and **PLAIN** (`symmetric`) for
//!   payload encryption.
//!
//! Nothing here is hand-rolled; every primitive is a thin wrapper around an
//! audited crate.

pub mod ecc;
pub mod ed25519;
pub mod hash;
pub mod keys;
pub mod rsa;
pub mod symmetric;

pub use ecc::{uncompressed_point, EccKeyFactory, EccPrivateKey, EccPublicKey};
pub use ed25519::{Ed25519KeyFactory, Ed25519PrivateKey, Ed25519PublicKey};
pub use hash::{double_sha256, hash160, keccak256, ripemd160, sha256};
pub use keys::{
    keys_match, same_public_key, KeyError, KeyMap, PrivateKey, PrivateKeyFactory,
    PublicKeyFactory, SignKey, SymmetricKey, SymmetricKeyFactory, VerifyKey,
};
pub use self::rsa::{RsaKeyFactory, RsaPrivateKey, RsaPublicKey};
pub use symmetric::{
    AesCbcKey, AesCbcKeyFactory, AesKey, AesKeyFactory, PlainKey, PlainKeyFactory,
};
