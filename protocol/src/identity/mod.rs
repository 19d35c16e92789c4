//! # Identity Module
//!
//! Every participant is identified by an address derived from a meta, bound
//! into an identifier, and optionally described by a signed document.
//!
//! The identity stack is layered:
//!
//! 1. **Meta** — public key plus optional seed and fingerprint. Validated
//!    on construction.
//! 2. **Address** — deterministic, checksummed, one-way derived from a meta
//!    and an entity type. Base58Check or Ethereum encoding.
//! 3. **Identifier** — `name@address/terminal`, cached by canonical text.
//! 4. **Document** — visa, bulletin or profile, signed with the meta key.
//!
//! ## Design Decisions
//!
//! - Scheme dispatch is an exhaustive `match` on [`MetaType`] and
//!   [`DocumentType`], each with an `Other` variant for host-installed tags.
//! - Values are immutable. Memoisation (addresses, identifiers) lives in the
//!   factories, keyed by value, never inside the values themselves.
//! - Nothing here knows about curves. Keys are reached only through the
//!   capability traits in [`crate::crypto::keys`].

pub mod address;
pub mod document;
pub mod entity;
pub mod id;
pub mod meta;

pub use address::{Address, AddressError, AddressFactory, AddressKind, BaseAddressFactory};
pub use document::{
    Bulletin, Document, DocumentBuilder, DocumentError, DocumentFactory, DocumentType,
    GeneralDocumentFactory, Visa,
};
pub use entity::EntityType;
pub use id::{IdError, IdFactory, Identifier, IdentifierFactory};
pub use meta::{BaseMetaFactory, Meta, MetaError, MetaFactory, MetaType};
