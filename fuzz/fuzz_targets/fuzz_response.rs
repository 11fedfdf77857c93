//! Fuzzes response accessors on arbitrary received bytes.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_response
#![no_main]
use cryptoauth_protocol::Response;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let response = Response::new(data.to_vec());
    let _ = response.count();
    let _ = response.data();
    let _ = response.verify_crc();
    assert!(response.data().len() <= response.len());
});
