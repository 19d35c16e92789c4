//! # Protocol Configuration & Constants
//!
//! Every tag, code and magic length in the identity layer lives here. The
//! string tags are part of the wire format: a meta or document produced by
//! one client is parsed by another purely on the strength of these values,
//! so changing one is a protocol break, not a refactor.

/// Identity layer wire version.
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Reserved registry tag used as the fallback for unrecognized tags.
pub const WILDCARD_TAG: &str = "*";

// ---------------------------------------------------------------------------
// Meta Types
// ---------------------------------------------------------------------------

/// Default scheme: key + optional seed/fingerprint, Base58Check address.
pub const META_TYPE_MKM: &str = "1";

/// Bitcoin-style scheme: key only, person addresses only.
pub const META_TYPE_BTC: &str = "2";

/// Ethereum-style scheme: key only, `0x` + 40 hex digit addresses.
pub const META_TYPE_ETH: &str = "4";

/// Lowercase aliases, registered by the loader when enabled.
pub const META_ALIASES_LOWER: [(&str, &str); 3] = [
    (META_TYPE_MKM, "mkm"),
    (META_TYPE_BTC, "btc"),
    (META_TYPE_ETH, "eth"),
];

/// Uppercase aliases, registered by the loader when enabled.
pub const META_ALIASES_UPPER: [(&str, &str); 3] = [
    (META_TYPE_MKM, "MKM"),
    (META_TYPE_BTC, "BTC"),
    (META_TYPE_ETH, "ETH"),
];

// ---------------------------------------------------------------------------
// Document Types
// ---------------------------------------------------------------------------

/// Person document.
pub const DOCUMENT_TYPE_VISA: &str = "visa";

/// Generic entity profile.
pub const DOCUMENT_TYPE_PROFILE: &str = "profile";

/// Group document.
pub const DOCUMENT_TYPE_BULLETIN: &str = "bulletin";

// ---------------------------------------------------------------------------
// Key Algorithms
// ---------------------------------------------------------------------------

/// secp256k1 ECDSA over SHA-256.
pub const KEY_ALGORITHM_ECC: &str = "ECC";

/// Curve name written into ECC key maps.
pub const ECC_CURVE: &str = "secp256k1";

/// Ed25519 (RFC 8032).
pub const KEY_ALGORITHM_ED25519: &str = "Ed25519";

/// AES-256-GCM symmetric key (CBC when the key map carries an `iv`).
pub const KEY_ALGORITHM_AES: &str = "AES";

/// AES-256-CBC with PKCS#7 padding.
pub const KEY_ALGORITHM_AES_CBC: &str = "AES/CBC/PKCS7Padding";

/// RSA, PKCS#1 v1.5 signatures over SHA-256.
pub const KEY_ALGORITHM_RSA: &str = "RSA";

/// Modulus size of generated RSA keys.
pub const RSA_KEY_BITS: usize = 1024;

/// Identity "cipher", used for broadcast payloads.
pub const KEY_ALGORITHM_PLAIN: &str = "PLAIN";

/// Uncompressed SEC1 point length (0x04 || X || Y).
pub const ECC_UNCOMPRESSED_KEY_LENGTH: usize = 65;

/// Compressed SEC1 point length (0x02/0x03 || X).
pub const ECC_COMPRESSED_KEY_LENGTH: usize = 33;

/// Raw secp256k1 / Ed25519 secret length.
pub const SECRET_KEY_LENGTH: usize = 32;

/// AES-256 key length in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-GCM nonce length in bytes.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-CBC IV length in bytes (one block).
pub const AES_IV_LENGTH: usize = 16;

// ---------------------------------------------------------------------------
// Encode Algorithms
// ---------------------------------------------------------------------------

/// Default encoding for transportable data.
pub const ENCODE_BASE64: &str = "base64";

pub const ENCODE_BASE58: &str = "base58";

pub const ENCODE_HEX: &str = "hex";

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Length of the Base58Check checksum suffix.
pub const CHECKSUM_LENGTH: usize = 4;

/// `network (1) || RIPEMD160 digest (20) || checksum (4)`.
pub const BTC_ADDRESS_BYTES: usize = 25;

/// Shortest Base58 rendering of a 25-byte payload we accept.
pub const BTC_ADDRESS_MIN_CHARS: usize = 26;

/// Longest Base58 rendering of a 25-byte payload.
pub const BTC_ADDRESS_MAX_CHARS: usize = 35;

/// `"0x"` + 40 hex digits.
pub const ETH_ADDRESS_CHARS: usize = 42;

/// Broadcast address for "any single member".
pub const ADDRESS_ANYWHERE: &str = "anywhere";

/// Broadcast address for "all members".
pub const ADDRESS_EVERYWHERE: &str = "everywhere";

/// Broadcast user ID.
pub const ID_ANYONE: &str = "anyone@anywhere";

/// Broadcast group ID.
pub const ID_EVERYONE: &str = "everyone@everywhere";

/// The founder's broadcast ID.
pub const ID_FOUNDER: &str = "moky@anywhere";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_tags_are_distinct() {
        assert_ne!(META_TYPE_MKM, META_TYPE_BTC);
        assert_ne!(META_TYPE_MKM, META_TYPE_ETH);
        assert_ne!(META_TYPE_BTC, META_TYPE_ETH);
    }

    #[test]
    fn aliases_point_at_canonical_tags() {
        for ((lower_tag, lower), (upper_tag, upper)) in
            META_ALIASES_LOWER.iter().zip(META_ALIASES_UPPER.iter())
        {
            assert_eq!(lower_tag, upper_tag);
            assert_eq!(lower.to_uppercase(), *upper);
        }
    }

    #[test]
    fn broadcast_ids_use_broadcast_addresses() {
        assert!(ID_ANYONE.ends_with(ADDRESS_ANYWHERE));
        assert!(ID_EVERYONE.ends_with(ADDRESS_EVERYWHERE));
        assert!(ID_FOUNDER.ends_with(ADDRESS_ANYWHERE));
    }

    #[test]
    fn address_length_bounds() {
        assert!(BTC_ADDRESS_MIN_CHARS < BTC_ADDRESS_MAX_CHARS);
        assert_eq!(BTC_ADDRESS_BYTES, 1 + 20 + CHECKSUM_LENGTH);
        assert_eq!(ETH_ADDRESS_CHARS, 2 + 40);
    }
}
