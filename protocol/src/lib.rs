// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # MKM Protocol — Identity Layer
//!
//! Accounts in a peer-to-peer messaging network are identified by an
//! address derived from a public key, bound into an identifier, and
//! described by signed documents. This crate implements that layer: meta
//! records, address derivation and validation, identifier parsing and
//! caching, and document creation, all dispatched through registries the
//! host fills at startup.
//!
//! ## Architecture
//!
//! - **registry** — the tag → factory map every pluggable concern uses.
//! - **identity** — meta, address, identifier and document engines.
//! - **crypto** — key capability traits plus secp256k1, Ed25519 and AES
//!   implementations, and the hash functions addresses are built from.
//! - **format** — base58/base64/hex codecs, transportable data and
//!   portable network files.
//! - **extensions** — the host-owned set of registries and entry points.
//! - **loader** — installs the default factories.
//! - **config** — protocol constants.
//!
//! ## Quick start
//!
//! ```
//! use mkm_protocol::crypto::EccPrivateKey;
//! use mkm_protocol::extensions::Extensions;
//! use mkm_protocol::identity::EntityType;
//! use mkm_protocol::loader::PluginLoader;
//!
//! let mut ext = Extensions::new();
//! PluginLoader::default().load(&mut ext);
//!
//! let key = EccPrivateKey::generate();
//! let meta = ext.generate_meta("1", &key, Some("moky")).unwrap();
//! let id = ext.generate_id(&meta, EntityType::USER, None).unwrap();
//! assert!(ext.meta_matches_id(&meta, &id));
//! ```
//!
//! ## Design Philosophy
//!
//! 1. No global state. Hosts own their registries; tests build their own.
//! 2. Values are immutable and validated on construction.
//! 3. No hand-rolled cryptography. Every primitive comes from an audited
//!    crate.

pub mod config;
pub mod crypto;
pub mod extensions;
pub mod format;
pub mod identity;
pub mod loader;
pub mod registry;

pub use extensions::Extensions;
pub use loader::{LoaderOptions, PluginLoader};
pub use registry::AlgorithmRegistry;
