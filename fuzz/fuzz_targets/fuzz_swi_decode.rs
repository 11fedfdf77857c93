//! Fuzzes the single-wire bit decoder and checks that encoding inverts it.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_swi_decode
#![no_main]
use cryptoauth_hal::swi::{decode, encode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let bytes = decode(data);
    assert_eq!(bytes.len(), data.len() / 8);
    assert_eq!(decode(&encode(data)), data);
});
