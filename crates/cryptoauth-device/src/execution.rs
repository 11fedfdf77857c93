//! One command round trip.
//!
//! ```text
//! build ──(BadOpcode/BadParam: no I/O)──┐
//!   │                                   │
//! wake → send → wait → receive → CRC → status
//!   └──────────── idle, always ─────────┘
//! ```
//!
//! Once the wake has been attempted the device is returned to idle exactly
//! once, whatever happened in between. An idle failure is logged and never
//! replaces the result of the command.

use cryptoauth_hal::{Delay, Transport};
use cryptoauth_protocol::{
    AtcaError, AtcaResult, Command, CommandBuilder, Packet, RSP_SIZE_MIN, Response, decode_status,
    verify_frame,
};
use tracing::{debug, trace, warn};

/// Builds and runs one command, bracketed by wake and idle.
///
/// # Errors
///
/// `BadOpcode` or `BadParam` from the builder (nothing is sent), any
/// transport error, `RxNoResponse`, `RxFail`, `CrcError`, or the status the
/// device reported.
pub fn execute(
    builder: &CommandBuilder,
    transport: &mut dyn Transport,
    delay: &dyn Delay,
    command: Command,
    param1: u8,
    param2: u16,
    data: &[u8],
) -> AtcaResult<Response> {
    let packet = builder.build(command, param1, param2, data)?;
    let exec_ms = builder.execution_time_ms(packet.opcode())?;

    let result = match transport.wake() {
        Ok(()) => exchange(transport, delay, &packet, exec_ms),
        Err(e) => Err(e),
    };

    if let Err(e) = transport.idle() {
        warn!(error = %e, opcode = %packet.opcode(), "idle after command failed");
    }

    match &result {
        Ok(response) => debug!(opcode = %packet.opcode(), len = response.len(), "command complete"),
        Err(e) => debug!(opcode = %packet.opcode(), error = %e, "command failed"),
    }
    result
}

/// Sends an already built packet and collects the response.
///
/// The device must already be awake; nothing here wakes or idles it.
pub fn exchange(
    transport: &mut dyn Transport,
    delay: &dyn Delay,
    packet: &Packet,
    exec_ms: u32,
) -> AtcaResult<Response> {
    transport.send(packet.as_bytes())?;
    trace!(opcode = %packet.opcode(), exec_ms, "waiting for execution");
    delay.delay_ms(exec_ms);

    let mut buf = vec![0u8; packet.rx_size().max(RSP_SIZE_MIN)];
    let received = transport.receive(&mut buf)?;
    match received {
        0 => return Err(AtcaError::RxNoResponse),
        n if n < RSP_SIZE_MIN => return Err(AtcaError::RxFail { received: n }),
        n => buf.truncate(n),
    }
    trace!(received, "response received");

    verify_frame(&buf)?;
    decode_status(&buf)?;
    Ok(Response::new(buf))
}
