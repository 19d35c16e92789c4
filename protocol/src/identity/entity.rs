//! # Entity Types
//!
//! The network byte embedded in every address. The low bit separates
//! individuals from groups and the high bit marks broadcast addresses:
//!
//! ```text
//! 0b1000_0000  broadcast
//! 0b0000_0001  group
//! ```
//!
//! | Code | Name        | Kind                                 |
//! |------|-------------|--------------------------------------|
//! | 0x00 | USER        | person                               |
//! | 0x01 | GROUP       | group of persons                     |
//! | 0x02 | STATION     | server node                          |
//! | 0x03 | ISP         | group of stations                    |
//! | 0x04 | BOT         | automated account                    |
//! | 0x05 | ICP         | group of bots                        |
//! | 0x06 | SUPERVISOR  | company-level operator               |
//! | 0x07 | COMPANY     | group of supervisors                 |
//! | 0x80 | ANY         | broadcast to any one member          |
//! | 0x81 | EVERY       | broadcast to all members             |

use std::fmt;

use serde::{Deserialize, Serialize};

/// A network/entity code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(pub u8);

impl EntityType {
    pub const USER: Self = Self(0x00);
    pub const GROUP: Self = Self(0x01);
    pub const STATION: Self = Self(0x02);
    pub const ISP: Self = Self(0x03);
    pub const BOT: Self = Self(0x04);
    pub const ICP: Self = Self(0x05);
    pub const SUPERVISOR: Self = Self(0x06);
    pub const COMPANY: Self = Self(0x07);
    pub const ANY: Self = Self(0x80);
    pub const EVERY: Self = Self(0x81);

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn is_user(self) -> bool {
        self.0 & 0x01 == 0x00
    }

    pub fn is_group(self) -> bool {
        self.0 & 0x01 == 0x01
    }

    pub fn is_broadcast(self) -> bool {
        self.0 & 0x80 == 0x80
    }

    /// Codes the default scheme can derive addresses for.
    pub fn is_derivable(self) -> bool {
        self.0 <= Self::COMPANY.0
    }

    /// Human-readable name, or `None` for an unassigned code.
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::USER => "USER",
            Self::GROUP => "GROUP",
            Self::STATION => "STATION",
            Self::ISP => "ISP",
            Self::BOT => "BOT",
            Self::ICP => "ICP",
            Self::SUPERVISOR => "SUPERVISOR",
            Self::COMPANY => "COMPANY",
            Self::ANY => "ANY",
            Self::EVERY => "EVERY",
            _ => return None,
        })
    }

    /// Parse a name (case-insensitive) or a decimal / `0x` hex code.
    pub fn from_name(text: &str) -> Option<Self> {
        let upper = text.trim().to_ascii_uppercase();
        let named = [
            Self::USER,
            Self::GROUP,
            Self::STATION,
            Self::ISP,
            Self::BOT,
            Self::ICP,
            Self::SUPERVISOR,
            Self::COMPANY,
            Self::ANY,
            Self::EVERY,
        ];
        if let Some(found) = named.into_iter().find(|t| t.name() == Some(upper.as_str())) {
            return Some(found);
        }
        match upper.strip_prefix("0X") {
            Some(hex) => u8::from_str_radix(hex, 16).ok().map(Self),
            None => upper.parse::<u8>().ok().map(Self),
        }
    }
}

impl From<u8> for EntityType {
    fn from(code: u8) -> Self {
        Self(code)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02x}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_and_group_bits() {
        for user in [EntityType::USER, EntityType::STATION, EntityType::BOT] {
            assert!(user.is_user());
            assert!(!user.is_group());
        }
        for group in [EntityType::GROUP, EntityType::ISP, EntityType::ICP] {
            assert!(group.is_group());
            assert!(!group.is_user());
        }
    }

    #[test]
    fn broadcast_bit() {
        assert!(EntityType::ANY.is_broadcast());
        assert!(EntityType::EVERY.is_broadcast());
        assert!(EntityType::ANY.is_user());
        assert!(EntityType::EVERY.is_group());
        assert!(!EntityType::COMPANY.is_broadcast());
    }

    #[test]
    fn derivable_range() {
        assert!(EntityType::USER.is_derivable());
        assert!(EntityType::COMPANY.is_derivable());
        assert!(!EntityType(0x08).is_derivable());
        assert!(!EntityType::ANY.is_derivable());
    }

    #[test]
    fn names_and_parsing() {
        assert_eq!(EntityType::from_name("group"), Some(EntityType::GROUP));
        assert_eq!(EntityType::from_name("0x04"), Some(EntityType::BOT));
        assert_eq!(EntityType::from_name("129"), Some(EntityType::EVERY));
        assert_eq!(EntityType::from_name("nobody"), None);
        assert_eq!(EntityType(0x42).to_string(), "0x42");
        assert_eq!(EntityType::STATION.to_string(), "STATION");
    }
}
