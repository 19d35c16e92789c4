//! # Identifiers
//!
//! The full addressable identity:
//!
//! ```text
//! [name "@"] address ["/" terminal]
//!
//! moky@4DnqXWdTV8wuZgfqSCX9GjE2kNq7HJrUgQ
//! moky@4DnqXWdTV8wuZgfqSCX9GjE2kNq7HJrUgQ/phone
//! anyone@anywhere
//! ```
//!
//! The name is usually the meta seed. The terminal distinguishes the
//! devices of one account. Neither may contain `@` or `/`, and neither may
//! be empty when present. The address must decode and pass its checksum on
//! its own; an identifier never wraps a half-valid address.
//!
//! Identifiers compare and hash by their canonical text.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use super::address::{evict_half, Address, AddressError, AddressFactory};
use super::entity::EntityType;
use super::meta::Meta;
use crate::config::{ID_ANYONE, ID_EVERYONE, ID_FOUNDER};

/// Errors that can occur while parsing or composing an identifier.
#[derive(Debug, Error)]
pub enum IdError {
    #[error("malformed identifier: {0}")]
    Malformed(String),

    #[error("invalid address in identifier: {0}")]
    Address(#[from] AddressError),
}

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// `name@address/terminal`.
#[derive(Debug, Clone)]
pub struct Identifier {
    name: Option<String>,
    address: Address,
    terminal: Option<String>,
    text: String,
}

impl Identifier {
    /// Compose from parts, validating `name` and `terminal`.
    pub fn new(
        name: Option<&str>,
        address: Address,
        terminal: Option<&str>,
    ) -> Result<Self, IdError> {
        if let Some(name) = name {
            check_part("name", name)?;
        }
        if let Some(terminal) = terminal {
            check_part("terminal", terminal)?;
        }
        Ok(Self::compose(
            name.map(str::to_string),
            address,
            terminal.map(str::to_string),
        ))
    }

    /// Parse without a factory or cache.
    pub fn parse(text: &str) -> Result<Self, IdError> {
        let (name, address, terminal) = split(text)?;
        Self::new(name, Address::parse(address)?, terminal)
    }

    fn compose(name: Option<String>, address: Address, terminal: Option<String>) -> Self {
        let mut text = String::new();
        if let Some(name) = &name {
            text.push_str(name);
            text.push('@');
        }
        text.push_str(address.as_str());
        if let Some(terminal) = &terminal {
            text.push('/');
            text.push_str(terminal);
        }
        Self {
            name,
            address,
            terminal,
            text,
        }
    }

    /// `anyone@anywhere`.
    pub fn anyone() -> Self {
        Self::compose(Some(name_of(ID_ANYONE)), Address::anywhere(), None)
    }

    /// `everyone@everywhere`.
    pub fn everyone() -> Self {
        Self::compose(Some(name_of(ID_EVERYONE)), Address::everywhere(), None)
    }

    /// `moky@anywhere`.
    pub fn founder() -> Self {
        Self::compose(Some(name_of(ID_FOUNDER)), Address::anywhere(), None)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn terminal(&self) -> Option<&str> {
        self.terminal.as_deref()
    }

    pub fn network(&self) -> EntityType {
        self.address.network()
    }

    pub fn is_user(&self) -> bool {
        self.address.is_user()
    }

    pub fn is_group(&self) -> bool {
        self.address.is_group()
    }

    pub fn is_broadcast(&self) -> bool {
        self.address.is_broadcast()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The same identity without the terminal.
    pub fn without_terminal(&self) -> Self {
        match self.terminal {
            None => self.clone(),
            Some(_) => Self::compose(self.name.clone(), self.address.clone(), None),
        }
    }
}

fn name_of(id: &str) -> String {
    id.split_once('@').map(|(name, _)| name).unwrap_or(id).to_string()
}

fn check_part(what: &str, part: &str) -> Result<(), IdError> {
    if part.is_empty() {
        return Err(IdError::Malformed(format!("empty {what}")));
    }
    if part.contains(['@', '/']) {
        return Err(IdError::Malformed(format!("{what} contains '@' or '/': {part}")));
    }
    Ok(())
}

/// Split the canonical text into `(name, address, terminal)`.
fn split(text: &str) -> Result<(Option<&str>, &str, Option<&str>), IdError> {
    if text.is_empty() {
        return Err(IdError::Malformed("empty identifier".into()));
    }
    let (rest, terminal) = match text.split_once('/') {
        Some((rest, terminal)) => (rest, Some(terminal)),
        None => (text, None),
    };
    let (name, address) = match rest.split_once('@') {
        Some((name, address)) => (Some(name), address),
        None => (None, rest),
    };
    if address.is_empty() {
        return Err(IdError::Malformed(format!("no address in {text}")));
    }
    Ok((name, address, terminal))
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Identifier {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Generates, creates and parses identifiers.
pub trait IdFactory: Send + Sync {
    /// Derive the address of `meta` and name the result after its seed.
    fn generate_id(
        &self,
        meta: &Meta,
        network: EntityType,
        terminal: Option<&str>,
    ) -> Result<Identifier, IdError>;

    fn create_id(
        &self,
        name: Option<&str>,
        address: Address,
        terminal: Option<&str>,
    ) -> Result<Identifier, IdError>;

    fn parse_id(&self, text: &str) -> Result<Identifier, IdError>;

    /// Evict about half of any cached identifiers and addresses. Returns the
    /// number of entries removed.
    fn reduce_memory(&self) -> usize {
        0
    }
}

/// The stock factory with a process-wide cache keyed by canonical text.
///
/// Concurrent inserts of the same text are harmless: both values are equal.
pub struct IdentifierFactory {
    addresses: Arc<dyn AddressFactory>,
    cache: DashMap<String, Identifier>,
}

impl IdentifierFactory {
    pub fn new(addresses: Arc<dyn AddressFactory>) -> Self {
        Self {
            addresses,
            cache: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn remember(&self, id: Identifier) -> Identifier {
        self.cache.insert(id.text.clone(), id.clone());
        id
    }
}

impl fmt::Debug for IdentifierFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifierFactory")
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl IdFactory for IdentifierFactory {
    fn generate_id(
        &self,
        meta: &Meta,
        network: EntityType,
        terminal: Option<&str>,
    ) -> Result<Identifier, IdError> {
        let address = self.addresses.generate_address(meta, network)?;
        self.create_id(meta.seed(), address, terminal)
    }

    fn create_id(
        &self,
        name: Option<&str>,
        address: Address,
        terminal: Option<&str>,
    ) -> Result<Identifier, IdError> {
        let id = Identifier::new(name, address, terminal)?;
        if let Some(hit) = self.cache.get(id.as_str()) {
            return Ok(hit.clone());
        }
        Ok(self.remember(id))
    }

    fn parse_id(&self, text: &str) -> Result<Identifier, IdError> {
        if let Some(hit) = self.cache.get(text) {
            return Ok(hit.clone());
        }
        let (name, address, terminal) = split(text).map_err(|e| {
            warn!(id = text, error = %e, "identifier rejected");
            e
        })?;
        let address = self.addresses.parse_address(address).map_err(|e| {
            warn!(id = text, error = %e, "identifier rejected");
            IdError::from(e)
        })?;
        let id = Identifier::new(name, address, terminal)?;
        // Keyed by the input text as well, so equivalent spellings (an
        // all-lowercase ETH address) hit the cache next time.
        if id.as_str() != text {
            self.cache.insert(text.to_string(), id.clone());
        }
        Ok(self.remember(id))
    }

    /// Halves the identifier cache and the address factory's caches.
    fn reduce_memory(&self) -> usize {
        let removed = evict_half(&self.cache);
        debug!(removed, remaining = self.cache.len(), "identifier cache reduced");
        removed + self.addresses.reduce_memory()
    }
}
