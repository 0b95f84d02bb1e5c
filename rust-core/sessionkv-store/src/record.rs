// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session record model.
//
// The host framework owns the shape of a session; the adapter only needs the
// cookie's `maxAge` to derive a TTL. Everything else is carried as an open
// JSON map so that unknown fields survive a write/read cycle untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Name of the field holding the cookie descriptor.
pub const COOKIE_FIELD: &str = "cookie";

/// The cookie descriptor nested inside every session.
///
/// Only `maxAge` is interpreted; any other attribute the host stores
/// (`expires`, `httpOnly`, `path`, ...) round-trips through `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CookieDescriptor {
    /// Cookie lifetime in milliseconds, as the host wrote it.
    ///
    /// Kept as a raw JSON value: a host may store `null` or a non-numeric
    /// value, which the TTL policy treats as "no max age". An explicit
    /// `null` is `Some(Value::Null)` and is written back as `null`; only an
    /// absent key is `None`.
    #[serde(
        rename = "maxAge",
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_age: Option<Value>,

    /// Remaining cookie attributes.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Deserialize a present field as `Some`, even when it is `null`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl CookieDescriptor {
    /// `maxAge` in milliseconds, if it is a JSON number.
    pub fn max_age_ms(&self) -> Option<f64> {
        self.max_age.as_ref().and_then(Value::as_f64)
    }
}

/// An opaque session as handed over by the host framework.
///
/// `data` never holds a `"cookie"` key: the cookie lives in its own field,
/// and [`SessionRecord::insert`] routes a `"cookie"` object there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The session cookie descriptor.
    #[serde(default)]
    pub cookie: CookieDescriptor,

    /// Application session state.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl SessionRecord {
    /// Create an empty session with a default cookie.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cookie `maxAge` in milliseconds.
    pub fn with_max_age(mut self, max_age_ms: u64) -> Self {
        self.cookie.max_age = Some(Value::from(max_age_ms));
        self
    }

    /// Insert a session field, returning the previous value if any.
    ///
    /// `"cookie"` replaces the cookie descriptor instead; a value that is not
    /// a cookie object is left out and returned unchanged.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        if key != COOKIE_FIELD {
            return self.data.insert(key, value);
        }

        match serde_json::from_value::<CookieDescriptor>(value.clone()) {
            Ok(cookie) => {
                let previous = std::mem::replace(&mut self.cookie, cookie);
                serde_json::to_value(previous).ok()
            }
            Err(_) => Some(value),
        }
    }

    /// Builder-style [`SessionRecord::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a session field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}
