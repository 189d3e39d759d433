use std::{
    io::{self, Read, Write},
    time::Duration,
};

use serialport::SerialPort;

/// Minimal byte transport the protocol layer runs over.
///
/// The production implementation is a serial port; tests substitute
/// scripted fakes. A read that times out reports `Ok(0)`: at this layer
/// silence is data the protocol interprets, not a failure.
pub(crate) trait Wire: Send {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read available bytes, waiting at most `timeout`. `Ok(0)` on timeout.
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}

impl Wire for Box<dyn SerialPort> {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.flush()
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        self.set_timeout(timeout).map_err(io::Error::other)?;
        match self.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::VecDeque;

    use super::*;

    /// Scripted wire for protocol tests.
    ///
    /// Stale bytes are readable immediately (left over in the device's
    /// output buffer); scripted replies only start once a command has been
    /// sent, like hardware that speaks when spoken to.
    #[derive(Default)]
    pub struct FakeWire {
        pub stale: VecDeque<Vec<u8>>,
        pub replies: VecDeque<Vec<u8>>,
        pub sent: Vec<Vec<u8>>,
    }

    impl FakeWire {
        pub fn replying(replies: &[&[u8]]) -> Self {
            Self {
                replies: replies.iter().map(|r| r.to_vec()).collect(),
                ..Self::default()
            }
        }

        pub fn silent() -> Self {
            Self::default()
        }

        pub fn sent_lines(&self) -> Vec<String> {
            self.sent
                .iter()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .collect()
        }
    }

    impl Wire for FakeWire {
        fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.sent.push(bytes.to_vec());
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
            if let Some(chunk) = self.stale.pop_front() {
                buf[..chunk.len()].copy_from_slice(&chunk);
                return Ok(chunk.len());
            }
            if self.sent.is_empty() {
                return Ok(0);
            }
            match self.replies.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                },
                None => Ok(0),
            }
        }
    }
}
