// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The session store contract and its key-value implementation.
//
// `KvSessionStore` composes the key codec, TTL policy, payload codec and
// optional crypto box against any `KvBackend`. Every operation issues at most
// one backend command and never retries; failures surface to the caller as
// `SessionError`. The store holds no per-call mutable state, so one instance
// can serve any number of concurrent requests.

use async_trait::async_trait;
use sessionkv_storage::{ConnectionEvent, ConnectionState, KvBackend};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::codec::PayloadCodec;
use crate::config::{ConfigWarning, StoreConfig};
use crate::crypto::{CryptoBox, Envelope};
use crate::error::{Result, SessionError};
use crate::key::KeyCodec;
use crate::record::SessionRecord;
use crate::ttl::TtlPolicy;

/// The four-operation session persistence contract a host framework drives.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session.
    ///
    /// Returns `Ok(None)` if no session is stored under `session_id`.
    async fn fetch(&self, session_id: &str) -> Result<Option<SessionRecord>>;

    /// Store a session, replacing any previous value, with an expiry derived
    /// from the record unless TTLs are disabled.
    async fn commit(&self, session_id: &str, record: &SessionRecord) -> Result<()>;

    /// Remove a session. Removing a missing session succeeds.
    async fn destroy(&self, session_id: &str) -> Result<()>;

    /// Refresh a session's expiry without rewriting it.
    async fn touch(&self, session_id: &str, record: &SessionRecord) -> Result<()>;

    /// Subscribe to backend connect/disconnect notifications.
    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent>;

    /// The backend's current connection state.
    fn connection_state(&self) -> ConnectionState;
}

/// A [`SessionStore`] persisting sessions in a [`KvBackend`].
///
/// # Example
///
/// ```rust
/// use sessionkv_storage::InMemoryBackend;
/// use sessionkv_store::{KvSessionStore, SessionRecord, SessionStore, StoreConfig};
///
/// # tokio_test::block_on(async {
/// let config = StoreConfig::new().with_secret("keyboard cat");
/// let store = KvSessionStore::new(InMemoryBackend::new(), config).unwrap();
///
/// let session = SessionRecord::new().with_max_age(60_000).with("user", "alice");
/// store.commit("abc", &session).await.unwrap();
///
/// assert_eq!(store.fetch("abc").await.unwrap(), Some(session));
/// assert_eq!(store.fetch("missing").await.unwrap(), None);
/// # });
/// ```
pub struct KvSessionStore<B: KvBackend> {
    backend: B,
    keys: KeyCodec,
    ttl: TtlPolicy,
    disable_ttl: bool,
    codec: PayloadCodec,
    crypto: Option<CryptoBox>,
    warnings: Vec<ConfigWarning>,
}

impl<B: KvBackend> KvSessionStore<B> {
    /// Build a store over `backend`.
    ///
    /// Fails on invalid options; configuration warnings are logged and kept
    /// available through [`KvSessionStore::warnings`].
    pub fn new(backend: B, config: StoreConfig) -> Result<Self> {
        let warnings = config.validate()?;
        for warning in &warnings {
            warn!(backend = backend.name(), "session store configuration: {}", warning);
        }

        let ttl = config.ttl_policy()?;
        let algorithm = config.cipher_algorithm()?;
        let crypto = config
            .secret
            .map(|secret| CryptoBox::new(secret, algorithm));

        debug!(
            backend = backend.name(),
            prefix = %config.prefix,
            disable_ttl = config.disable_ttl,
            encrypted = crypto.is_some(),
            "session store ready"
        );

        Ok(Self {
            backend,
            keys: KeyCodec::new(config.prefix),
            ttl,
            disable_ttl: config.disable_ttl,
            codec: PayloadCodec,
            crypto,
            warnings,
        })
    }

    /// Return a reference to the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The key codec, for hosts that need to address sessions directly.
    pub fn keys(&self) -> &KeyCodec {
        &self.keys
    }

    /// True if payloads are sealed before they are stored.
    pub fn is_encrypted(&self) -> bool {
        self.crypto.is_some()
    }

    /// Non-fatal findings from configuration validation.
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Serialize, and seal if a secret is configured, the value to store.
    fn encode_value(&self, record: &SessionRecord) -> Result<Vec<u8>> {
        let payload = self.codec.encode(record)?;
        match &self.crypto {
            Some(crypto) => Ok(crypto.seal(&payload)?.to_vec()?),
            None => Ok(payload.into_bytes()),
        }
    }

    /// Reverse of [`Self::encode_value`].
    fn decode_value(&self, stored: &[u8]) -> Result<SessionRecord> {
        match &self.crypto {
            Some(crypto) => {
                let envelope = Envelope::from_slice(stored)?;
                let payload = crypto.open(&envelope)?;
                Ok(self.codec.decode(&payload)?)
            }
            None => Ok(self.codec.decode_bytes(stored)?),
        }
    }
}

#[async_trait]
impl<B: KvBackend> SessionStore for KvSessionStore<B> {
    async fn fetch(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let key = self.keys.to_storage_key(session_id);
        debug!(session_id = %session_id, "GET");

        let stored = match self.backend.get(&key).await? {
            Some(stored) => stored,
            None => return Ok(None),
        };

        match self.decode_value(&stored) {
            Ok(record) => {
                debug!(session_id = %session_id, bytes = stored.len(), "GOT");
                Ok(Some(record))
            }
            Err(err) => {
                if err.is_integrity() {
                    warn!(session_id = %session_id, "encrypted session failed integrity check");
                }
                Err(err)
            }
        }
    }

    async fn commit(&self, session_id: &str, record: &SessionRecord) -> Result<()> {
        let key = self.keys.to_storage_key(session_id);
        let value = self.encode_value(record)?;

        if self.disable_ttl {
            debug!(session_id = %session_id, bytes = value.len(), "SET");
            self.backend.set(&key, &value).await?;
            debug!("SET complete");
            return Ok(());
        }

        let ttl = self.ttl.ttl_for(record);
        debug!(session_id = %session_id, ttl = ttl.get(), bytes = value.len(), "SETEX");
        self.backend.set_ex(&key, &value, ttl).await?;
        debug!("SETEX complete");
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<()> {
        let key = self.keys.to_storage_key(session_id);
        debug!(session_id = %session_id, "DEL");
        self.backend.delete(&key).await?;
        Ok(())
    }

    async fn touch(&self, session_id: &str, record: &SessionRecord) -> Result<()> {
        if self.disable_ttl {
            // Sessions are stored without expiry; adding one here would make
            // them expire after all.
            debug!(session_id = %session_id, "touch skipped, TTL disabled");
            return Ok(());
        }

        let key = self.keys.to_storage_key(session_id);
        let ttl = self.ttl.ttl_for(record);
        debug!(session_id = %session_id, ttl = ttl.get(), "EXPIRE");
        if !self.backend.expire(&key, ttl).await? {
            debug!(session_id = %session_id, "EXPIRE on missing session");
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.backend.subscribe()
    }

    fn connection_state(&self) -> ConnectionState {
        self.backend.connection_state()
    }
}
