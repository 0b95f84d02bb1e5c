// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TTL derivation for stored sessions.
//
// Priority order:
//   1. a configured override, in seconds, wins unconditionally;
//   2. otherwise a numeric cookie `maxAge` (milliseconds) is converted to
//      whole seconds, truncating toward zero;
//   3. otherwise one day.
//
// The result is always at least one second. A cookie whose max age truncates
// to zero or below (already expired, or shorter than a second) gets the
// shortest expiry the backend can express instead of an invalid one. A
// cookie too large for the backend is capped at `MAX_TTL_SECS`.

use std::num::NonZeroU64;

use crate::record::SessionRecord;

/// One day, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Longest expiry Redis accepts for EXPIRE/SETEX: the deadline in
/// milliseconds must fit in an `i64`.
pub const MAX_TTL_SECS: u64 = (i64::MAX / 1000) as u64;

const ONE_SECOND: NonZeroU64 = NonZeroU64::MIN;

const MAX_TTL: NonZeroU64 = match NonZeroU64::new(MAX_TTL_SECS) {
    Some(n) => n,
    None => unreachable!(),
};

const ONE_DAY: NonZeroU64 = match NonZeroU64::new(DEFAULT_TTL_SECS) {
    Some(n) => n,
    None => unreachable!(),
};

/// Compute the expiry for a session.
///
/// `override_secs` is the configured TTL, `cookie_max_age_ms` the cookie's
/// `maxAge` if it is numeric.
pub fn effective_ttl(override_secs: Option<NonZeroU64>, cookie_max_age_ms: Option<f64>) -> NonZeroU64 {
    if let Some(ttl) = override_secs {
        return ttl;
    }

    match cookie_max_age_ms {
        Some(max_age) => {
            let secs = (max_age / 1000.0).trunc();
            if secs >= MAX_TTL_SECS as f64 {
                MAX_TTL
            } else if secs >= 1.0 {
                NonZeroU64::new(secs as u64).unwrap_or(ONE_SECOND)
            } else {
                ONE_SECOND
            }
        }
        None => ONE_DAY,
    }
}

/// The TTL policy of one store: an optional fixed override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtlPolicy {
    override_secs: Option<NonZeroU64>,
}

impl TtlPolicy {
    /// Derive TTLs from each session's cookie.
    pub fn from_cookie() -> Self {
        Self::default()
    }

    /// Always use `secs`, ignoring cookies.
    pub fn fixed(secs: NonZeroU64) -> Self {
        Self {
            override_secs: Some(secs),
        }
    }

    /// The configured override, if any.
    pub fn override_secs(&self) -> Option<NonZeroU64> {
        self.override_secs
    }

    /// Expiry for `record` under this policy.
    pub fn ttl_for(&self, record: &SessionRecord) -> NonZeroU64 {
        effective_ttl(self.override_secs, record.cookie.max_age_ms())
    }
}
