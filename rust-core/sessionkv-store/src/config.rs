// SPDX-License-Identifier: PMPL-1.0-or-later
//! Session store configuration.
//!
//! Defaults:
//! - prefix: `"sess:"`
//! - ttl: derived from the cookie `maxAge`, else one day
//! - disableTTL: false
//! - secret: none (payloads stored in plaintext)
//! - algorithm: `"aes-256-gcm"` when a secret is set
//!
//! Problems are split in two: [`ConfigError`]s abort store construction,
//! [`ConfigWarning`]s are logged and otherwise ignored.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::crypto::{CipherAlgorithm, UnknownAlgorithm};
use crate::key::DEFAULT_PREFIX;
use crate::secret::SecretString;
use crate::ttl::{TtlPolicy, MAX_TTL_SECS};

/// Environment variable prefix used by [`StoreConfig::from_env`].
pub const ENV_PREFIX: &str = "SESSIONKV_";

/// Fatal configuration problems.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ttl must be between 1 and {} seconds", MAX_TTL_SECS)]
    InvalidTtl,

    #[error(transparent)]
    UnknownAlgorithm(#[from] UnknownAlgorithm),

    #[error("secret must not be empty")]
    EmptySecret,

    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        var: String,
        value: String,
        reason: String,
    },
}

/// Non-fatal configuration problems, logged at store construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// The backend database selector is not a number.
    #[error("expected a number for the \"db\" option, got {0}")]
    NonNumericDatabase(Value),

    /// An algorithm was named but no secret enables encryption.
    #[error("algorithm {0:?} has no effect without a secret")]
    AlgorithmWithoutSecret(String),

    /// A TTL override was given while TTLs are disabled.
    #[error("ttl of {0}s is ignored because disableTTL is set")]
    TtlIgnored(u64),

    /// The deterministic legacy cipher is selected.
    #[error("aes-256-ecb leaks equality of identical sessions; use it only while legacy sessions must stay readable")]
    LegacyCipher,
}

/// Options recognized by the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prepended to every session id to form the backend key.
    pub prefix: String,

    /// Fixed TTL in seconds, overriding the cookie `maxAge`.
    pub ttl: Option<u64>,

    /// Store sessions without expiry.
    #[serde(rename = "disableTTL", alias = "disable_ttl")]
    pub disable_ttl: bool,

    /// Enables envelope encryption when present.
    #[serde(skip_serializing)]
    pub secret: Option<SecretString>,

    /// Cipher name, `"aes-256-gcm"` or `"aes-256-ecb"`.
    pub algorithm: Option<String>,

    /// Backend database selector, passed through to backend constructors.
    pub db: Option<Value>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            ttl: None,
            disable_ttl: false,
            secret: None,
            algorithm: None,
            db: None,
        }
    }
}

impl StoreConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `SESSIONKV_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source. `lookup` receives full
    /// variable names such as `SESSIONKV_TTL`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        let mut config = Self::default();

        if let Some((_, prefix)) = var("PREFIX") {
            config.prefix = prefix;
        }
        if let Some((name, ttl)) = var("TTL") {
            let secs = ttl.trim().parse::<u64>().map_err(|err| ConfigError::InvalidEnv {
                var: name,
                value: ttl.clone(),
                reason: err.to_string(),
            })?;
            config.ttl = Some(secs);
        }
        if let Some((name, flag)) = var("DISABLE_TTL") {
            config.disable_ttl = parse_flag(&name, &flag)?;
        }
        if let Some((_, secret)) = var("SECRET") {
            config.secret = Some(SecretString::new(secret));
        }
        if let Some((_, algorithm)) = var("ALGORITHM") {
            config.algorithm = Some(algorithm);
        }
        if let Some((_, db)) = var("DB") {
            config.db = Some(match db.trim().parse::<u64>() {
                Ok(index) => Value::from(index),
                Err(_) => Value::String(db),
            });
        }

        Ok(config)
    }

    /// Set the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set a fixed TTL in seconds.
    pub fn with_ttl(mut self, secs: u64) -> Self {
        self.ttl = Some(secs);
        self
    }

    /// Enable or disable expiry on writes.
    pub fn with_disable_ttl(mut self, disabled: bool) -> Self {
        self.disable_ttl = disabled;
        self
    }

    /// Enable encryption with `secret`.
    pub fn with_secret(mut self, secret: impl Into<SecretString>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Select the cipher by name.
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    /// Set the backend database selector.
    pub fn with_db(mut self, db: impl Into<Value>) -> Self {
        self.db = Some(db.into());
        self
    }

    /// The TTL policy these options describe.
    pub fn ttl_policy(&self) -> Result<TtlPolicy, ConfigError> {
        match self.ttl {
            None => Ok(TtlPolicy::from_cookie()),
            Some(secs) => NonZeroU64::new(secs)
                .filter(|secs| secs.get() <= MAX_TTL_SECS)
                .map(TtlPolicy::fixed)
                .ok_or(ConfigError::InvalidTtl),
        }
    }

    /// The selected cipher; defaults to AES-256-GCM.
    pub fn cipher_algorithm(&self) -> Result<CipherAlgorithm, ConfigError> {
        match &self.algorithm {
            None => Ok(CipherAlgorithm::default()),
            Some(name) => Ok(name.parse()?),
        }
    }

    /// Numeric database selector, if one was given as a number.
    pub fn database_index(&self) -> Option<u64> {
        self.db.as_ref().and_then(Value::as_u64)
    }

    /// Check the options, returning the non-fatal findings.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        let mut warnings = Vec::new();

        self.ttl_policy()?;
        let algorithm = self.cipher_algorithm()?;

        match &self.secret {
            Some(secret) if secret.is_empty() => return Err(ConfigError::EmptySecret),
            Some(_) => {
                if algorithm == CipherAlgorithm::LegacyAes256Ecb {
                    warnings.push(ConfigWarning::LegacyCipher);
                }
            }
            None => {
                if let Some(name) = &self.algorithm {
                    warnings.push(ConfigWarning::AlgorithmWithoutSecret(name.clone()));
                }
            }
        }

        if let (true, Some(secs)) = (self.disable_ttl, self.ttl) {
            warnings.push(ConfigWarning::TtlIgnored(secs));
        }

        if let Some(db) = &self.db {
            if !db.is_number() {
                warnings.push(ConfigWarning::NonNumericDatabase(db.clone()));
            }
        }

        Ok(warnings)
    }
}

fn parse_flag(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.prefix, "sess:");
        assert_eq!(config.ttl, None);
        assert!(!config.disable_ttl);
        assert!(config.secret.is_none());
        assert_eq!(config.cipher_algorithm().unwrap(), CipherAlgorithm::Aes256Gcm);
        assert_eq!(config.ttl_policy().unwrap(), TtlPolicy::from_cookie());
        assert!(config.validate().unwrap().is_empty());
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let config = StoreConfig::new().with_ttl(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidTtl));
    }

    #[test]
    fn test_out_of_range_ttl_is_rejected() {
        let config = StoreConfig::new().with_ttl(u64::MAX);
        assert_eq!(config.validate(), Err(ConfigError::InvalidTtl));

        let config = StoreConfig::new().with_ttl(MAX_TTL_SECS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        let config = StoreConfig::new().with_secret("s").with_algorithm("rot13");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let config = StoreConfig::new().with_secret("");
        assert_eq!(config.validate(), Err(ConfigError::EmptySecret));
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let config = StoreConfig::new()
            .with_algorithm("aes-256-gcm")
            .with_ttl(60)
            .with_disable_ttl(true)
            .with_db("sessions");

        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.contains(&ConfigWarning::AlgorithmWithoutSecret(
            "aes-256-gcm".to_string()
        )));
        assert!(warnings.contains(&ConfigWarning::TtlIgnored(60)));
        assert!(warnings.contains(&ConfigWarning::NonNumericDatabase(Value::from(
            "sessions"
        ))));
    }

    #[test]
    fn test_legacy_cipher_warns() {
        let config = StoreConfig::new()
            .with_secret("s")
            .with_algorithm("aes-256-ecb");
        assert_eq!(config.validate().unwrap(), vec![ConfigWarning::LegacyCipher]);
    }

    #[test]
    fn test_numeric_db_is_accepted() {
        let config = StoreConfig::new().with_db(3);
        assert!(config.validate().unwrap().is_empty());
        assert_eq!(config.database_index(), Some(3));
    }

    #[test]
    fn test_from_lookup() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("SESSIONKV_PREFIX", "app:"),
            ("SESSIONKV_TTL", "120"),
            ("SESSIONKV_DISABLE_TTL", "no"),
            ("SESSIONKV_SECRET", "keyboard cat"),
            ("SESSIONKV_ALGORITHM", "aes-256-ecb"),
            ("SESSIONKV_DB", "2"),
        ]))
        .unwrap();

        assert_eq!(config.prefix, "app:");
        assert_eq!(config.ttl, Some(120));
        assert!(!config.disable_ttl);
        assert_eq!(config.secret.unwrap().expose_secret(), "keyboard cat");
        assert_eq!(config.algorithm.as_deref(), Some("aes-256-ecb"));
        assert_eq!(config.db, Some(Value::from(2u64)));
    }

    #[test]
    fn test_from_lookup_empty_uses_defaults() {
        let config = StoreConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.prefix, "sess:");
        assert!(config.secret.is_none());
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = StoreConfig::from_lookup(lookup(&[("SESSIONKV_TTL", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "SESSIONKV_TTL"));

        let err =
            StoreConfig::from_lookup(lookup(&[("SESSIONKV_DISABLE_TTL", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_non_numeric_env_db_warns() {
        let config = StoreConfig::from_lookup(lookup(&[("SESSIONKV_DB", "primary")])).unwrap();
        assert_eq!(
            config.validate().unwrap(),
            vec![ConfigWarning::NonNumericDatabase(Value::from("primary"))]
        );
    }

    #[test]
    fn test_deserialize_express_style_options() {
        let config: StoreConfig = serde_json::from_str(
            r#"{"prefix": "myapp:", "disableTTL": true, "secret": "s3cret", "db": 1}"#,
        )
        .unwrap();
        assert_eq!(config.prefix, "myapp:");
        assert!(config.disable_ttl);
        assert_eq!(config.secret.as_ref().unwrap().expose_secret(), "s3cret");
        assert_eq!(config.database_index(), Some(1));
    }

    #[test]
    fn test_serialize_omits_secret() {
        let config = StoreConfig::new().with_secret("s3cret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(!json.contains("secret"));
        assert!(json.contains("\"disableTTL\":false"));
    }
}
