//! Serial port discovery.
//!
//! Every enumerated port is opened at the configured baud rate, given its
//! settle time, and sent the identification probe. Ports that fail to
//! open, stay silent, or answer with the wrong prefix are skipped; only
//! finding no qualifying port at all is an error.

use tracing::{debug, info};

use super::{SerialTiming, Wire, protocol};
use crate::DeviceError;

/// Enumerate system serial ports and keep those that identify as ours.
pub(crate) fn discover(baud_rate: u32, timing: &SerialTiming) -> Result<Vec<String>, DeviceError> {
    let ports = serialport::available_ports()?;
    debug!(count = ports.len(), "enumerating serial ports");
    let names = ports.into_iter().map(|p| p.port_name);
    select_responsive(names, |name| open_wire(name, baud_rate, timing), timing)
}

fn open_wire(name: &str, baud_rate: u32, timing: &SerialTiming) -> Option<Box<dyn Wire>> {
    match serialport::new(name, baud_rate)
        .timeout(timing.read_poll)
        .open()
    {
        Ok(port) => Some(Box::new(port)),
        Err(e) => {
            debug!(port = %name, error = %e, "port failed to open, skipping");
            None
        },
    }
}

/// Probe each openable candidate and keep the ones that answer correctly.
///
/// Generic over the opener so tests can feed scripted wires.
pub(crate) fn select_responsive<I, F>(
    names: I,
    mut open: F,
    timing: &SerialTiming,
) -> Result<Vec<String>, DeviceError>
where
    I: IntoIterator<Item = String>,
    F: FnMut(&str) -> Option<Box<dyn Wire>>,
{
    let mut responsive = Vec::new();

    for name in names {
        let Some(mut wire) = open(&name) else {
            continue;
        };
        std::thread::sleep(timing.settle_after_open);
        if protocol::probe(wire.as_mut(), timing) {
            info!(port = %name, "device identified");
            responsive.push(name);
        } else {
            debug!(port = %name, "no identification response, skipping");
        }
    }

    if responsive.is_empty() {
        return Err(DeviceError::NoPortFound);
    }
    Ok(responsive)
}
