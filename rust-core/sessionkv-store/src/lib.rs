// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sessionkv Session Store
//
// Persists web sessions in an expiring key-value backend. The host framework
// owns session ids, cookies and lifecycle; this crate turns its four calls
// (fetch, commit, destroy, touch) into single backend commands:
//
//   commit:  record --PayloadCodec--> JSON --CryptoBox?--> envelope
//                   --KeyCodec/TtlPolicy--> SETEX prefix+id ttl value
//   fetch:   GET prefix+id --CryptoBox?--> JSON --PayloadCodec--> record
//
// # Modules
//
// - [`key`] -- Session id to backend key mapping.
// - [`ttl`] -- Expiry derivation from config and cookie `maxAge`.
// - [`codec`] -- JSON payload serialization.
// - [`crypto`] -- Optional envelope encryption with a MAC.
// - [`config`] -- Recognized options, env loading, validation.
// - [`store`] -- The `SessionStore` trait and `KvSessionStore`.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod key;
pub mod record;
pub mod secret;
pub mod store;
pub mod ttl;

pub use codec::PayloadCodec;
pub use config::{ConfigError, ConfigWarning, StoreConfig};
pub use crypto::{CipherAlgorithm, CryptoBox, CryptoError, Envelope};
pub use error::{Result, SessionError};
pub use key::KeyCodec;
pub use record::{CookieDescriptor, SessionRecord};
pub use secret::SecretString;
pub use store::{KvSessionStore, SessionStore};
pub use ttl::{effective_ttl, TtlPolicy, DEFAULT_TTL_SECS, MAX_TTL_SECS};

// Backend types hosts need to construct a store.
pub use sessionkv_storage::{ConnectionEvent, ConnectionState, KvBackend, StorageError};
