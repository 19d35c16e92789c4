//! # Addresses
//!
//! An address is derived one-way from a meta and carries the entity type of
//! its owner. Two encodings exist on the wire:
//!
//! ## Base58Check (default and BTC metas)
//!
//! ```text
//! digest   = RIPEMD160(SHA256(key.data))              20 bytes
//! payload  = network || digest                        21 bytes
//! checksum = SHA256(SHA256(payload))[..4]
//! address  = Base58(payload || checksum)              26..35 chars
//! ```
//!
//! With network `0x00` this is exactly a Bitcoin P2PKH address.
//!
//! ## Ethereum (ETH metas)
//!
//! ```text
//! point   = uncompressed(key.data)                    0x04 || X || Y
//! digest  = Keccak256(point[1..])                     skip the 0x04 prefix
//! address = "0x" + EIP55(hex(digest[12..]))           42 chars
//! ```
//!
//! Addresses are always generated in EIP-55 mixed case. On input,
//! all-lowercase and all-uppercase hex is accepted without a checksum and
//! normalised; mixed case must match the checksum exactly.
//!
//! ## Broadcast
//!
//! `anywhere` (ANY) and `everywhere` (EVERY) are reserved and derive from no
//! meta.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use super::entity::EntityType;
use super::meta::{Meta, MetaType};
use crate::config::{
    ADDRESS_ANYWHERE, ADDRESS_EVERYWHERE, BTC_ADDRESS_BYTES, BTC_ADDRESS_MAX_CHARS,
    BTC_ADDRESS_MIN_CHARS, CHECKSUM_LENGTH, ETH_ADDRESS_CHARS,
};
use crate::crypto::ecc::uncompressed_point;
use crate::crypto::hash::{double_sha256, hash160, keccak256};
use crate::format::{base58_decode, base58_encode};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while deriving or decoding an address.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The scheme cannot produce an address for this entity type.
    #[error("{scheme} addresses cannot carry network {network}")]
    UnsupportedNetwork {
        scheme: &'static str,
        network: EntityType,
    },

    /// Decoded fine, but the 4-byte checksum (or EIP-55 case) is wrong.
    #[error("address checksum mismatch: {0}")]
    ChecksumMismatch(String),

    /// Not an address in any known encoding.
    #[error("malformed address: {0}")]
    Malformed(String),

    /// The meta type has no built-in derivation.
    #[error("no address scheme for meta type {0}")]
    UnknownAlgorithm(String),
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Which encoding an address uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    Base58Check,
    Ethereum,
    Broadcast,
}

/// A network address. Equality and hashing use the text alone.
#[derive(Debug, Clone)]
pub struct Address {
    text: String,
    network: EntityType,
    kind: AddressKind,
}

impl Address {
    /// Broadcast to any one member.
    pub fn anywhere() -> Self {
        Self {
            text: ADDRESS_ANYWHERE.to_string(),
            network: EntityType::ANY,
            kind: AddressKind::Broadcast,
        }
    }

    /// Broadcast to all members.
    pub fn everywhere() -> Self {
        Self {
            text: ADDRESS_EVERYWHERE.to_string(),
            network: EntityType::EVERY,
            kind: AddressKind::Broadcast,
        }
    }

    /// Base58Check address for `key_data` under `network`.
    pub fn from_key_base58(key_data: &[u8], network: EntityType) -> Self {
        let mut payload = Vec::with_capacity(BTC_ADDRESS_BYTES);
        payload.push(network.code());
        payload.extend_from_slice(&hash160(key_data));
        let checksum = double_sha256(&payload);
        payload.extend_from_slice(&checksum[..CHECKSUM_LENGTH]);
        Self {
            text: base58_encode(&payload),
            network,
            kind: AddressKind::Base58Check,
        }
    }

    /// Ethereum address for a SEC1 secp256k1 point, compressed or not.
    pub fn from_key_eth(key_data: &[u8]) -> Result<Self, AddressError> {
        let point = uncompressed_point(key_data).map_err(|_| {
            AddressError::Malformed(format!(
                "ETH address needs a secp256k1 point, got {} bytes",
                key_data.len()
            ))
        })?;
        let digest = keccak256(&point[1..]);
        Ok(Self {
            text: format!("0x{}", eip55(&hex::encode(&digest[12..]))),
            network: EntityType::USER,
            kind: AddressKind::Ethereum,
        })
    }

    /// Decode and validate any address text.
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        if text.eq_ignore_ascii_case(ADDRESS_ANYWHERE) {
            return Ok(Self::anywhere());
        }
        if text.eq_ignore_ascii_case(ADDRESS_EVERYWHERE) {
            return Ok(Self::everywhere());
        }
        let len = text.len();
        if len == ETH_ADDRESS_CHARS && text.starts_with("0x") {
            return parse_eth(text);
        }
        if (BTC_ADDRESS_MIN_CHARS..=BTC_ADDRESS_MAX_CHARS).contains(&len) {
            return parse_base58(text);
        }
        Err(AddressError::Malformed(format!("unrecognised address length {len}")))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn network(&self) -> EntityType {
        self.network
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn is_user(&self) -> bool {
        self.network.is_user()
    }

    pub fn is_group(&self) -> bool {
        self.network.is_group()
    }

    pub fn is_broadcast(&self) -> bool {
        self.network.is_broadcast()
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Codec helpers
// ---------------------------------------------------------------------------

fn parse_base58(text: &str) -> Result<Address, AddressError> {
    let data = base58_decode(text).map_err(|_| AddressError::Malformed(text.to_string()))?;
    if data.len() != BTC_ADDRESS_BYTES {
        return Err(AddressError::Malformed(format!(
            "expected {BTC_ADDRESS_BYTES} bytes, decoded {}",
            data.len()
        )));
    }
    let (payload, checksum) = data.split_at(BTC_ADDRESS_BYTES - CHECKSUM_LENGTH);
    if double_sha256(payload)[..CHECKSUM_LENGTH] != *checksum {
        warn!(address = text, "base58 checksum mismatch");
        return Err(AddressError::ChecksumMismatch(text.to_string()));
    }
    Ok(Address {
        text: text.to_string(),
        network: EntityType(payload[0]),
        kind: AddressKind::Base58Check,
    })
}

fn parse_eth(text: &str) -> Result<Address, AddressError> {
    let body = &text[2..];
    if !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressError::Malformed(text.to_string()));
    }
    let has_lower = body.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = body.bytes().any(|b| b.is_ascii_uppercase());
    let checksummed = eip55(&body.to_ascii_lowercase());
    if has_lower && has_upper && checksummed != body {
        warn!(address = text, "EIP-55 checksum mismatch");
        return Err(AddressError::ChecksumMismatch(text.to_string()));
    }
    Ok(Address {
        text: format!("0x{checksummed}"),
        network: EntityType::USER,
        kind: AddressKind::Ethereum,
    })
}

/// Mixed-case checksum over 40 lowercase hex digits: a letter is uppercased
/// when the matching nibble of `Keccak256(lower_hex)` is 8 or more.
fn eip55(lower_hex: &str) -> String {
    let hash = keccak256(lower_hex.as_bytes());
    lower_hex
        .char_indices()
        .map(|(i, c)| {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Derives and parses addresses.
pub trait AddressFactory: Send + Sync {
    fn generate_address(&self, meta: &Meta, network: EntityType) -> Result<Address, AddressError>;

    fn parse_address(&self, text: &str) -> Result<Address, AddressError>;

    /// Evict about half of any memoised addresses. Returns the number of
    /// entries removed.
    fn reduce_memory(&self) -> usize {
        0
    }
}

/// Drop every other entry of `map`. Returns the number removed.
pub(crate) fn evict_half<K: Eq + Hash, V>(map: &DashMap<K, V>) -> usize {
    let before = map.len();
    let mut index = 0usize;
    map.retain(|_, _| {
        index += 1;
        index % 2 == 0
    });
    before.saturating_sub(map.len())
}

/// The stock factory. Derivations are memoised by `(meta, network)` and
/// parses by text; both caches are safe to share between threads.
#[derive(Debug, Default)]
pub struct BaseAddressFactory {
    generated: DashMap<(Meta, EntityType), Address>,
    parsed: DashMap<String, Address>,
}

impl BaseAddressFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive without consulting the cache.
    pub fn derive(meta: &Meta, network: EntityType) -> Result<Address, AddressError> {
        let key = meta.public_key();
        match meta.meta_type() {
            MetaType::Default => {
                if !network.is_derivable() {
                    return Err(AddressError::UnsupportedNetwork {
                        scheme: "default",
                        network,
                    });
                }
                Ok(Address::from_key_base58(key.data(), network))
            }
            MetaType::Btc => {
                if network != EntityType::USER {
                    return Err(AddressError::UnsupportedNetwork {
                        scheme: "BTC",
                        network,
                    });
                }
                Ok(Address::from_key_base58(key.data(), network))
            }
            MetaType::Eth => {
                if network != EntityType::USER {
                    return Err(AddressError::UnsupportedNetwork {
                        scheme: "ETH",
                        network,
                    });
                }
                Address::from_key_eth(key.data())
            }
            MetaType::Other(tag) => Err(AddressError::UnknownAlgorithm(tag.clone())),
        }
    }

    /// Number of memoised derivations and parses.
    pub fn cached(&self) -> usize {
        self.generated.len() + self.parsed.len()
    }

    /// Drop both caches.
    pub fn clear(&self) {
        self.generated.clear();
        self.parsed.clear();
    }
}

impl AddressFactory for BaseAddressFactory {
    fn generate_address(&self, meta: &Meta, network: EntityType) -> Result<Address, AddressError> {
        let key = (meta.clone(), network);
        if let Some(hit) = self.generated.get(&key) {
            return Ok(hit.clone());
        }
        let address = Self::derive(meta, network)?;
        debug!(address = %address, network = %network, "address derived");
        self.generated.insert(key, address.clone());
        Ok(address)
    }

    fn parse_address(&self, text: &str) -> Result<Address, AddressError> {
        if let Some(hit) = self.parsed.get(text) {
            return Ok(hit.clone());
        }
        let address = Address::parse(text)?;
        self.parsed.insert(text.to_string(), address.clone());
        Ok(address)
    }

    fn reduce_memory(&self) -> usize {
        let removed = evict_half(&self.generated) + evict_half(&self.parsed);
        debug!(removed, remaining = self.cached(), "address cache reduced");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ecc::{EccPrivateKey, EccPublicKey};
    use crate::crypto::keys::{PrivateKey, VerifyKey};
    use std::sync::Arc;
    use crate::identity::meta::{BaseMetaFactory, MetaFactory};

    fn scalar_one() -> EccPrivateKey {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        EccPrivateKey::from_bytes(&bytes).unwrap()
    }

    fn meta_of(meta_type: MetaType) -> Meta {
        BaseMetaFactory::new(meta_type)
            .generate_meta(&scalar_one(), None)
            .unwrap()
    }

    #[test]
    fn btc_vector_for_generator_point() {
        let address = BaseAddressFactory::derive(&meta_of(MetaType::Btc), EntityType::USER).unwrap();
        assert_eq!(address.as_str(), "1EHNa6Q4Jz2uvNExL497mE43ikXhwF6kZm");
        assert_eq!(address.kind(), AddressKind::Base58Check);
    }

    const G_COMPRESSED: &str =
        "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    fn compressed_meta_of(meta_type: MetaType) -> Meta {
        let key: Arc<dyn VerifyKey> = Arc::new(EccPublicKey::from_hex(G_COMPRESSED).unwrap());
        BaseMetaFactory::new(meta_type).create_meta(key, None, None).unwrap()
    }

    #[test]
    fn btc_vector_for_compressed_generator_point() {
        let meta = compressed_meta_of(MetaType::Btc);
        assert_eq!(hex::encode(meta.public_key().data()), G_COMPRESSED);
        let address = BaseAddressFactory::derive(&meta, EntityType::USER).unwrap();
        assert_eq!(address.as_str(), "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
    }

    #[test]
    fn eth_expands_compressed_generator_point() {
        let meta = compressed_meta_of(MetaType::Eth);
        let address = BaseAddressFactory::derive(&meta, EntityType::USER).unwrap();
        assert_eq!(address.as_str(), "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
    }

    #[test]
    fn eth_rejects_non_point_key_data() {
        assert!(matches!(
            Address::from_key_eth(&[0x04; 20]),
            Err(AddressError::Malformed(_))
        ));
    }

    #[test]
    fn default_scheme_matches_btc_for_users() {
        let default = BaseAddressFactory::derive(&meta_of(MetaType::Default), EntityType::USER);
        let btc = BaseAddressFactory::derive(&meta_of(MetaType::Btc), EntityType::USER);
        assert_eq!(default.unwrap(), btc.unwrap());
    }

    #[test]
    fn eth_vector_for_generator_point() {
        let address = BaseAddressFactory::derive(&meta_of(MetaType::Eth), EntityType::USER).unwrap();
        assert_eq!(address.as_str(), "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        assert_eq!(address.network(), EntityType::USER);
    }

    #[test]
    fn network_byte_is_recoverable() {
        let meta = meta_of(MetaType::Default);
        for network in [EntityType::GROUP, EntityType::STATION, EntityType::BOT] {
            let address = BaseAddressFactory::derive(&meta, network).unwrap();
            let parsed = Address::parse(address.as_str()).unwrap();
            assert_eq!(parsed.network(), network);
            assert_eq!(parsed, address);
        }
    }

    #[test]
    fn unsupported_networks_rejected() {
        let default = meta_of(MetaType::Default);
        assert!(matches!(
            BaseAddressFactory::derive(&default, EntityType::ANY),
            Err(AddressError::UnsupportedNetwork { .. })
        ));
        assert!(matches!(
            BaseAddressFactory::derive(&meta_of(MetaType::Btc), EntityType::GROUP),
            Err(AddressError::UnsupportedNetwork { scheme: "BTC", .. })
        ));
        assert!(matches!(
            BaseAddressFactory::derive(&meta_of(MetaType::Eth), EntityType::BOT),
            Err(AddressError::UnsupportedNetwork { scheme: "ETH", .. })
        ));
    }

    #[test]
    fn satoshi_address_parses_as_user() {
        let address = Address::parse("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").unwrap();
        assert_eq!(address.network(), EntityType::USER);
        assert!(address.is_user());
    }

    #[test]
    fn single_character_change_is_detected() {
        let text = "1EHNa6Q4Jz2uvNExL497mE43ikXhwF6kZm";
        let mut chars: Vec<char> = text.chars().collect();
        chars[10] = if chars[10] == 'z' { 'y' } else { 'z' };
        let mutated: String = chars.into_iter().collect();
        assert!(matches!(
            Address::parse(&mutated),
            Err(AddressError::ChecksumMismatch(_))
        ));
    }

    #[test]
    fn eth_case_rules() {
        let lower = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";
        let parsed = Address::parse(lower).unwrap();
        assert_eq!(parsed.as_str(), "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");

        let upper = format!("0x{}", lower[2..].to_ascii_uppercase());
        assert!(Address::parse(&upper).is_ok());

        let bad = "0x7e5F4552091A69125d5DfCb7b8C2659029395Bdf";
        assert!(matches!(
            Address::parse(bad),
            Err(AddressError::ChecksumMismatch(_))
        ));
    }

    #[test]
    fn broadcast_addresses() {
        let any = Address::parse("Anywhere").unwrap();
        assert_eq!(any, Address::anywhere());
        assert!(any.is_broadcast());
        assert!(any.is_user());
        let every = Address::parse("everywhere").unwrap();
        assert!(every.is_group());
    }

    #[test]
    fn garbage_rejected() {
        assert!(matches!(Address::parse("short"), Err(AddressError::Malformed(_))));
        assert!(Address::parse(&"0".repeat(30)).is_err());
        assert!(Address::parse(&format!("0x{}", "g".repeat(40))).is_err());
    }

    #[test]
    fn factory_memoises_derivations() {
        let factory = BaseAddressFactory::new();
        let meta = meta_of(MetaType::Default);
        let first = factory.generate_address(&meta, EntityType::USER).unwrap();
        let second = factory.generate_address(&meta, EntityType::USER).unwrap();
        assert_eq!(first, second);
        assert_eq!(factory.cached(), 1);
        factory.parse_address(first.as_str()).unwrap();
        assert_eq!(factory.cached(), 2);
        factory.clear();
        assert_eq!(factory.cached(), 0);
    }

    #[test]
    fn reduce_memory_halves_both_caches() {
        let factory = BaseAddressFactory::new();
        let meta = meta_of(MetaType::Default);
        for network in [EntityType::USER, EntityType::GROUP, EntityType::STATION, EntityType::BOT] {
            let address = factory.generate_address(&meta, network).unwrap();
            factory.parse_address(address.as_str()).unwrap();
        }
        assert_eq!(factory.cached(), 8);
        assert_eq!(factory.reduce_memory(), 4);
        assert_eq!(factory.cached(), 4);
        // Evicted entries are simply derived again.
        let again = factory.generate_address(&meta, EntityType::USER).unwrap();
        assert_eq!(again, BaseAddressFactory::derive(&meta, EntityType::USER).unwrap());
    }

    #[test]
    fn other_meta_type_has_no_scheme() {
        let meta = Meta::new(
            MetaType::Other("9".into()),
            scalar_one().public_key(),
            None,
            None,
        )
        .unwrap();
        assert!(matches!(
            BaseAddressFactory::derive(&meta, EntityType::USER),
            Err(AddressError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn serde_as_string() {
        let address = Address::parse("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
