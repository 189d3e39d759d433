//! Line-oriented command protocol the device firmware speaks.
//!
//! Commands are ASCII, CRLF-terminated, with a fixed vocabulary. Responses
//! are read by polling with short per-read timeouts and accumulating bytes
//! until a newline or an overall deadline; a silent deadline is a negative
//! result, not a distinguishable error.

use std::time::Instant;

use tracing::debug;

use super::{SerialTiming, Wire};
use crate::DeviceError;

/// Identification probe; a device answers with [`PROBE_ACK_PREFIX`].
pub(crate) const CMD_PROBE: &str = "BUCHI:WHO";
/// URL-write command; the address follows the `?`.
pub(crate) const CMD_WRITE_URL: &str = "BUCHI:WRITE.URL?";
/// Token-validate command; the token follows the `?`.
pub(crate) const CMD_VALIDATE_TOKEN: &str = "BUCHI:VALIDATE.TOKEN?";

/// Response prefix identifying our firmware.
pub(crate) const PROBE_ACK_PREFIX: &str = "BUCHI:OK?";
/// Substring marking a successful token validation.
pub(crate) const VALIDATE_OK_MARKER: &str = "BUCHI:OK";

const READ_CHUNK: usize = 64;

fn frame(command: &str, payload: &str) -> Vec<u8> {
    format!("{command}{payload}\r\n").into_bytes()
}

/// Throw away whatever is sitting in the device's output buffer.
fn drain(wire: &mut dyn Wire, timing: &SerialTiming) {
    let mut buf = [0u8; READ_CHUNK];
    while let Ok(n) = wire.recv(&mut buf, timing.drain_read) {
        if n == 0 {
            break;
        }
    }
}

/// Poll for a response, accumulating until a newline or the deadline.
///
/// Returns the trimmed accumulated text, possibly empty if the device
/// stayed silent.
fn read_response(wire: &mut dyn Wire, timing: &SerialTiming) -> Result<String, DeviceError> {
    let deadline = Instant::now() + timing.response_deadline;
    let mut collected: Vec<u8> = Vec::new();
    let mut buf = [0u8; READ_CHUNK];

    loop {
        let n = wire.recv(&mut buf, timing.read_poll)?;
        if n > 0 {
            collected.extend_from_slice(&buf[..n]);
            if collected.last() == Some(&b'\n') {
                break;
            }
        }
        if Instant::now() >= deadline {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&collected).trim().to_string())
}

/// Send the identification probe; true iff the reply carries our prefix.
pub(crate) fn probe(wire: &mut dyn Wire, timing: &SerialTiming) -> bool {
    if wire.send(&frame(CMD_PROBE, "")).is_err() {
        return false;
    }
    std::thread::sleep(timing.settle_after_write);
    match read_response(wire, timing) {
        Ok(resp) => resp.starts_with(PROBE_ACK_PREFIX),
        Err(_) => false,
    }
}

/// Write the share URL; any non-empty response is the acknowledgement.
pub(crate) fn write_url(
    wire: &mut dyn Wire,
    timing: &SerialTiming,
    url: &str,
) -> Result<(), DeviceError> {
    wire.send(&frame(CMD_WRITE_URL, url))?;
    std::thread::sleep(timing.settle_after_write);
    let resp = read_response(wire, timing)?;
    if resp.is_empty() {
        return Err(DeviceError::transport(
            "no acknowledgement from device after url write",
        ));
    }
    debug!(response = %resp, "device acknowledged url write");
    Ok(())
}

/// Validate a token; success iff the response contains the OK marker
/// before the deadline. Silence or anything else is a rejection.
pub(crate) fn validate_token(
    wire: &mut dyn Wire,
    timing: &SerialTiming,
    token: &str,
) -> Result<bool, DeviceError> {
    drain(wire, timing);
    wire.send(&frame(CMD_VALIDATE_TOKEN, token))?;
    let resp = read_response(wire, timing)?;
    if resp.is_empty() {
        debug!("no validation response within deadline");
        return Ok(false);
    }
    debug!(response = %resp, "token validation response");
    Ok(resp.contains(VALIDATE_OK_MARKER))
}
