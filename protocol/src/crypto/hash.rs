//! # Hashing Utilities
//!
//! The digests the address schemes are built from. None of these are
//! implemented here; they are thin wrappers over the RustCrypto crates so
//! that the rest of the code never touches a hasher directly.
//!
//! - **SHA-256** — the outer hash of the default/BTC key digest, the
//!   Base58Check checksum (doubled), and the ECDSA message digest.
//! - **RIPEMD-160** — the inner 20-byte key digest of Base58Check addresses.
//! - **Keccak-256** — Ethereum's pre-standard SHA-3. Note: *not* FIPS-202
//!   SHA3-256; the padding differs and so do the outputs.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// Compute the SHA-256 digest of `data`.
///
/// # Example
///
/// ```
/// use mkm_protocol::crypto::sha256;
///
/// let hash = sha256(b"moky");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// `SHA-256(SHA-256(data))`, the Base58Check checksum hash.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Compute the RIPEMD-160 digest of `data`.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// `RIPEMD160(SHA256(data))`, a.k.a. Bitcoin's HASH160.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

/// Compute the Keccak-256 digest of `data` (Ethereum flavour).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}
