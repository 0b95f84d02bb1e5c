// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Envelope encryption for stored sessions.
//
// When a secret is configured, the serialized session is sealed into an
// envelope `{"ct": <hex ciphertext>, "mac": <hex HMAC of the ct text>}`
// before it reaches the backend. Opening an envelope always verifies the MAC
// first and refuses to decrypt on mismatch.
//
// Two ciphers are supported:
//
// - `aes-256-gcm` (default): key = SHA-256(secret), a fresh random 96-bit
//   nonce per write, ct = hex(nonce || ciphertext || tag), MAC = HMAC-SHA256.
//   Identical sessions encrypt differently on every write.
//
// - `aes-256-ecb` (legacy compatibility): key derived from the secret with
//   OpenSSL's EVP_BytesToKey (MD5, one round, no salt), AES-256-ECB with
//   PKCS#7 padding, MAC = HMAC-SHA1. This reads and writes envelopes created
//   by older Node.js session stores byte for byte. It has no nonce, so equal
//   plaintexts give equal ciphertexts across sessions and keys leak equality.
//   Only select it while existing sessions still have to be readable.
//
// In both modes the plaintext is the JSON string literal of the serialized
// session (the session JSON is encoded a second time as a JSON string).

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::secret::SecretString;

type HmacSha256 = Hmac<sha2::Sha256>;
type HmacSha1 = Hmac<sha1::Sha1>;

/// Length of the random nonce prepended to AES-GCM ciphertexts.
pub const GCM_NONCE_LEN: usize = 12;

/// AES block size, for ECB length validation.
const AES_BLOCK_LEN: usize = 16;

/// Errors raised while sealing or opening an envelope.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The MAC did not match the ciphertext: the envelope was modified, or it
    /// was sealed with a different secret.
    #[error("encrypted session was tampered with or the secret is wrong")]
    Integrity,

    /// The envelope, or the plaintext inside it, is not well-formed JSON.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The MAC verified but the ciphertext could not be decrypted. Usually a
    /// mismatch between the configured algorithm and the one that sealed it.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The cipher rejected the plaintext.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// A derived key had the wrong length for the primitive.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// The `algorithm` option named something other than a supported cipher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported cipher algorithm {0:?} (expected \"aes-256-gcm\" or \"aes-256-ecb\")")]
pub struct UnknownAlgorithm(pub String);

/// Cipher used to seal envelopes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CipherAlgorithm {
    /// Randomized authenticated encryption. The default for new deployments.
    #[default]
    Aes256Gcm,
    /// Deterministic, nonce-less AES-256-ECB, wire compatible with sessions
    /// written by legacy stores.
    LegacyAes256Ecb,
}

impl CipherAlgorithm {
    /// The option string naming this cipher.
    pub fn as_str(self) -> &'static str {
        match self {
            CipherAlgorithm::Aes256Gcm => "aes-256-gcm",
            CipherAlgorithm::LegacyAes256Ecb => "aes-256-ecb",
        }
    }

    /// True if sealing the same payload twice yields the same envelope.
    pub fn is_deterministic(self) -> bool {
        matches!(self, CipherAlgorithm::LegacyAes256Ecb)
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CipherAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-256-gcm" => Ok(CipherAlgorithm::Aes256Gcm),
            "aes-256-ecb" => Ok(CipherAlgorithm::LegacyAes256Ecb),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

/// The value stored in place of a plaintext session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Hex-encoded ciphertext.
    #[serde(rename = "ct")]
    pub ciphertext: String,
    /// Hex-encoded HMAC over the `ciphertext` text.
    pub mac: String,
}

impl Envelope {
    /// Parse an envelope from its stored JSON form.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Render the envelope in its stored JSON form.
    pub fn to_vec(&self) -> Result<Vec<u8>, CryptoError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Seals and opens envelopes with one secret and one cipher.
#[derive(Clone)]
pub struct CryptoBox {
    secret: SecretString,
    algorithm: CipherAlgorithm,
    /// Cipher key derived from the secret for `algorithm`.
    key: [u8; 32],
}

impl CryptoBox {
    /// Derive the cipher key for `algorithm` from `secret`.
    pub fn new(secret: SecretString, algorithm: CipherAlgorithm) -> Self {
        let key = match algorithm {
            CipherAlgorithm::Aes256Gcm => sha256_key(secret.expose_secret().as_bytes()),
            CipherAlgorithm::LegacyAes256Ecb => {
                evp_bytes_to_key_md5(secret.expose_secret().as_bytes())
            }
        };
        Self {
            secret,
            algorithm,
            key,
        }
    }

    /// The cipher in use.
    pub fn algorithm(&self) -> CipherAlgorithm {
        self.algorithm
    }

    /// Encrypt `payload` (a serialized session) and MAC the result.
    pub fn seal(&self, payload: &str) -> Result<Envelope, CryptoError> {
        let transport = serde_json::to_string(payload)?;

        let raw = match self.algorithm {
            CipherAlgorithm::Aes256Gcm => encrypt_gcm(&self.key, transport.as_bytes())?,
            CipherAlgorithm::LegacyAes256Ecb => encrypt_ecb(&self.key, transport.as_bytes())?,
        };
        let ciphertext = hex::encode(raw);
        let mac = self.mac_hex(&ciphertext)?;

        Ok(Envelope { ciphertext, mac })
    }

    /// Verify `envelope` and recover the serialized session inside it.
    ///
    /// The MAC is checked in constant time against the stored hex text before
    /// any decryption is attempted.
    pub fn open(&self, envelope: &Envelope) -> Result<String, CryptoError> {
        let expected = self.mac_hex(&envelope.ciphertext)?;
        let matches: bool = expected.as_bytes().ct_eq(envelope.mac.as_bytes()).into();
        if !matches {
            return Err(CryptoError::Integrity);
        }

        let raw = hex::decode(&envelope.ciphertext)
            .map_err(|err| CryptoError::Decryption(format!("ciphertext is not hex: {err}")))?;
        let plaintext = match self.algorithm {
            CipherAlgorithm::Aes256Gcm => decrypt_gcm(&self.key, &raw)?,
            CipherAlgorithm::LegacyAes256Ecb => decrypt_ecb(&self.key, &raw)?,
        };
        let transport = String::from_utf8(plaintext)
            .map_err(|err| CryptoError::Decryption(format!("plaintext is not UTF-8: {err}")))?;

        Ok(serde_json::from_str(&transport)?)
    }

    fn mac_hex(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let secret = self.secret.expose_secret().as_bytes();
        let tag = match self.algorithm {
            CipherAlgorithm::Aes256Gcm => {
                let mut mac = HmacSha256::new_from_slice(secret)
                    .map_err(|err| CryptoError::InvalidKey(err.to_string()))?;
                mac.update(ciphertext.as_bytes());
                mac.finalize().into_bytes().to_vec()
            }
            CipherAlgorithm::LegacyAes256Ecb => {
                let mut mac = HmacSha1::new_from_slice(secret)
                    .map_err(|err| CryptoError::InvalidKey(err.to_string()))?;
                mac.update(ciphertext.as_bytes());
                mac.finalize().into_bytes().to_vec()
            }
        };
        Ok(hex::encode(tag))
    }
}

impl fmt::Debug for CryptoBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoBox")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

fn sha256_key(secret: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    Sha256::digest(secret).into()
}

/// OpenSSL `EVP_BytesToKey` with MD5, one iteration and no salt, truncated to
/// a 256-bit key. This is how legacy `crypto.createCipher` turned a password
/// into an AES key.
fn evp_bytes_to_key_md5(secret: &[u8]) -> [u8; 32] {
    use md5::{Digest, Md5};

    let first = Md5::digest(secret);
    let mut hasher = Md5::new();
    hasher.update(first);
    hasher.update(secret);
    let second = hasher.finalize();

    let mut key = [0u8; 32];
    key[..16].copy_from_slice(&first);
    key[16..].copy_from_slice(&second);
    key
}

fn encrypt_gcm(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    use aes_gcm::aead::generic_array::GenericArray;
    use aes_gcm::aead::{Aead, KeyInit};
    use aes_gcm::Aes256Gcm;
    use rand::RngCore;

    let cipher = Aes256Gcm::new(GenericArray::from_slice(key));

    let mut nonce = [0u8; GCM_NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(GenericArray::from_slice(&nonce), plaintext)
        .map_err(|err| CryptoError::Encryption(format!("AES-256-GCM: {err}")))?;

    // Prepend nonce to ciphertext
    let mut result = nonce.to_vec();
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

fn decrypt_gcm(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    use aes_gcm::aead::generic_array::GenericArray;
    use aes_gcm::aead::{Aead, KeyInit};
    use aes_gcm::Aes256Gcm;

    if data.len() < GCM_NONCE_LEN {
        return Err(CryptoError::Decryption(
            "data too short for AES-256-GCM".to_string(),
        ));
    }

    let (nonce, ciphertext) = data.split_at(GCM_NONCE_LEN);
    let cipher = Aes256Gcm::new(GenericArray::from_slice(key));

    cipher
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|err| CryptoError::Decryption(format!("AES-256-GCM: {err}")))
}

fn encrypt_ecb(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    use ecb::cipher::block_padding::Pkcs7;
    use ecb::cipher::{BlockEncryptMut, KeyInit};

    let cipher = ecb::Encryptor::<aes::Aes256>::new_from_slice(key)
        .map_err(|err| CryptoError::InvalidKey(err.to_string()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn decrypt_ecb(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    use ecb::cipher::block_padding::Pkcs7;
    use ecb::cipher::{BlockDecryptMut, KeyInit};

    if data.is_empty() || data.len() % AES_BLOCK_LEN != 0 {
        return Err(CryptoError::Decryption(format!(
            "AES-256-ECB: {} bytes is not a whole number of blocks",
            data.len()
        )));
    }

    let cipher = ecb::Decryptor::<aes::Aes256>::new_from_slice(key)
        .map_err(|err| CryptoError::InvalidKey(err.to_string()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|_| CryptoError::Decryption("AES-256-ECB: invalid padding".to_string()))
}
