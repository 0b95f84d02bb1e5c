// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session payload serialization.

use serde::ser::Error as _;

use crate::record::{SessionRecord, COOKIE_FIELD};

/// Converts sessions to and from their JSON text form.
///
/// Encoding is lossless for every field the host put in the record. Decoding
/// rejects anything that is not a JSON object shaped like a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadCodec;

impl PayloadCodec {
    /// Serialize a session.
    ///
    /// A `"cookie"` entry in `data` would shadow the cookie descriptor and
    /// make the stored text unreadable, so it is refused here.
    pub fn encode(&self, record: &SessionRecord) -> Result<String, serde_json::Error> {
        if record.data.contains_key(COOKIE_FIELD) {
            return Err(serde_json::Error::custom(
                "session data must not contain a \"cookie\" field",
            ));
        }
        serde_json::to_string(record)
    }

    /// Deserialize a session from text.
    pub fn decode(&self, text: &str) -> Result<SessionRecord, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Deserialize a session straight from stored bytes.
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<SessionRecord, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
