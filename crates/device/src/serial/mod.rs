//! Direct serial backend.
//!
//! The hardware speaks a line-oriented ASCII protocol (see [`protocol`])
//! and needs generous settle delays: bytes written right after the port
//! opens are dropped, and responses take a couple of seconds to appear.
//! All delays are collected in [`SerialTiming`] so tests run instantly and
//! future firmware with a real handshake only needs different numbers.

mod discovery;
mod protocol;
mod wire;

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use {
    async_trait::async_trait,
    serialport::SerialPort,
    tracing::{debug, info},
};

use buchi_config::SerialTimingConfig;

use crate::{DeviceError, DeviceLink};

pub(crate) use wire::Wire;

// ── Timing ───────────────────────────────────────────────────────────────────

/// Fixed delays the hardware needs around serial I/O.
#[derive(Debug, Clone)]
pub struct SerialTiming {
    /// Pause after opening a port before anything is written.
    pub settle_after_open: Duration,
    /// Pause after a command write before the response is read.
    pub settle_after_write: Duration,
    /// Per-read timeout while polling for response bytes.
    pub read_poll: Duration,
    /// Overall wall-clock deadline for one response.
    pub response_deadline: Duration,
    /// Per-read timeout while draining stale input.
    pub drain_read: Duration,
}

impl Default for SerialTiming {
    fn default() -> Self {
        Self::from(&SerialTimingConfig::default())
    }
}

impl From<&SerialTimingConfig> for SerialTiming {
    fn from(cfg: &SerialTimingConfig) -> Self {
        Self {
            settle_after_open: Duration::from_millis(cfg.settle_after_open_ms),
            settle_after_write: Duration::from_millis(cfg.settle_after_write_ms),
            read_poll: Duration::from_millis(cfg.read_poll_ms),
            response_deadline: Duration::from_millis(cfg.response_deadline_ms),
            drain_read: Duration::from_millis(cfg.drain_read_ms),
        }
    }
}

impl SerialTiming {
    /// No settle delays and a tight deadline, for scripted test wires.
    ///
    /// The deadline stays non-zero so responses split across reads can
    /// still accumulate.
    #[cfg(test)]
    pub(crate) fn immediate() -> Self {
        Self {
            settle_after_open: Duration::ZERO,
            settle_after_write: Duration::ZERO,
            read_poll: Duration::ZERO,
            response_deadline: Duration::from_millis(50),
            drain_read: Duration::ZERO,
        }
    }
}

// ── Device ───────────────────────────────────────────────────────────────────

/// Device reached directly over a serial port.
///
/// Owns the port handle exclusively for the process lifetime. The
/// `serialport` API is blocking, so every operation runs on the blocking
/// thread pool; the port mutex is only ever held inside those closures.
pub struct SerialDevice {
    port: Arc<Mutex<Option<Box<dyn SerialPort>>>>,
    timing: SerialTiming,
}

impl SerialDevice {
    /// Discover responsive ports and open the first one.
    pub async fn open_first(baud_rate: u32, timing: SerialTiming) -> Result<Self, DeviceError> {
        let t = timing.clone();
        let port = tokio::task::spawn_blocking(move || -> Result<Box<dyn SerialPort>, DeviceError> {
            let names = discovery::discover(baud_rate, &t)?;
            // discover() never returns an empty list.
            let name = names[0].as_str();
            let port = serialport::new(name, baud_rate).timeout(t.read_poll).open()?;
            std::thread::sleep(t.settle_after_open);
            info!(port = %name, baud = baud_rate, "serial device connected");
            Ok(port)
        })
        .await
        .map_err(worker_failed)??;

        Ok(Self {
            port: Arc::new(Mutex::new(Some(port))),
            timing,
        })
    }

    /// Run a protocol operation against the owned port on the blocking pool.
    async fn run_blocking<R, F>(&self, op: F) -> Result<R, DeviceError>
    where
        R: Send + 'static,
        F: FnOnce(&mut dyn Wire, &SerialTiming) -> Result<R, DeviceError> + Send + 'static,
    {
        let port = Arc::clone(&self.port);
        let timing = self.timing.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = lock_port(&port);
            let Some(handle) = guard.as_mut() else {
                return Err(DeviceError::Closed);
            };
            op(handle, &timing)
        })
        .await
        .map_err(worker_failed)?
    }
}

#[async_trait]
impl DeviceLink for SerialDevice {
    async fn validate_token(&self, token: &str) -> Result<bool, DeviceError> {
        let token = token.to_string();
        self.run_blocking(move |wire, timing| protocol::validate_token(wire, timing, &token))
            .await
    }

    async fn write_url(&self, url: &str) -> Result<(), DeviceError> {
        let url = url.to_string();
        self.run_blocking(move |wire, timing| protocol::write_url(wire, timing, &url))
            .await
    }

    async fn close(&self) -> Result<(), DeviceError> {
        let port = Arc::clone(&self.port);
        tokio::task::spawn_blocking(move || {
            // Dropping the handle releases the port.
            if lock_port(&port).take().is_some() {
                info!("serial port closed");
            } else {
                debug!("serial port already closed");
            }
        })
        .await
        .map_err(worker_failed)?;
        Ok(())
    }
}

fn lock_port(
    port: &Mutex<Option<Box<dyn SerialPort>>>,
) -> MutexGuard<'_, Option<Box<dyn SerialPort>>> {
    port.lock().unwrap_or_else(|e| e.into_inner())
}

fn worker_failed(e: tokio::task::JoinError) -> DeviceError {
    DeviceError::transport(format!("serial worker failed: {e}"))
}
