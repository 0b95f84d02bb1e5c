// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for stored envelope parsing and verification

#![no_main]

use libfuzzer_sys::fuzz_target;
use sessionkv_store::{CipherAlgorithm, CryptoBox, Envelope, SecretString};

fuzz_target!(|data: &[u8]| {
    let envelope = match Envelope::from_slice(data) {
        Ok(envelope) => envelope,
        Err(_) => return,
    };

    // Forged envelopes must be rejected, never panic.
    for algorithm in [CipherAlgorithm::Aes256Gcm, CipherAlgorithm::LegacyAes256Ecb] {
        let crypto = CryptoBox::new(SecretString::from("fuzz secret"), algorithm);
        let _ = crypto.open(&envelope);
    }
});
