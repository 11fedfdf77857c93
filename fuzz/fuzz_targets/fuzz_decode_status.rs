//! Fuzzes status-frame decoding.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_decode_status
#![no_main]
use cryptoauth_protocol::decode_status;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = decode_status(data);
});
