// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for stored session payload decoding

#![no_main]

use libfuzzer_sys::fuzz_target;
use sessionkv_store::PayloadCodec;

fuzz_target!(|data: &[u8]| {
    let codec = PayloadCodec;
    if let Ok(record) = codec.decode_bytes(data) {
        // Anything that decodes must encode again.
        let text = codec.encode(&record).expect("decoded record re-encodes");
        let _ = codec.decode(&text);
    }
});
