//! Fuzzes CRC frame verification with arbitrary byte sequences.
//!
//! Any input must either verify or be rejected without panicking. A frame
//! built from any payload with a correct count byte and CRC must verify.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_verify_frame
#![no_main]
use cryptoauth_protocol::crc::append_crc;
use cryptoauth_protocol::verify_frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = verify_frame(data);

    if let Ok(count) = u8::try_from(data.len() + 3) {
        let mut frame = Vec::with_capacity(usize::from(count));
        frame.push(count);
        frame.extend_from_slice(data);
        append_crc(&mut frame);
        assert!(verify_frame(&frame).is_ok());
    }
});
