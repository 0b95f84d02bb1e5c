// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage key derivation.

/// Prefix applied when none is configured.
pub const DEFAULT_PREFIX: &str = "sess:";

/// Maps session ids to backend keys by prepending a fixed prefix.
///
/// The prefix is fixed at construction, so every operation on a given
/// session id derives the same key. Two stores with different prefixes can
/// share one backend without seeing each other's sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodec {
    prefix: String,
}

impl KeyCodec {
    /// Create a codec with the given prefix. An empty prefix is allowed and
    /// stores sessions under their bare ids.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `prefix ++ session_id`.
    pub fn to_storage_key(&self, session_id: &str) -> String {
        let mut key = String::with_capacity(self.prefix.len() + session_id.len());
        key.push_str(&self.prefix);
        key.push_str(session_id);
        key
    }
}

impl Default for KeyCodec {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}
