//! Communication with the access-gating device.
//!
//! The device (real hardware on a serial port, a companion service
//! fronting that hardware, or an in-process simulation) does two things
//! for the share service: it decides whether a presented token is valid,
//! and it receives the shareable download URL once the listener is up.
//!
//! All three backends sit behind [`DeviceLink`]; the rest of the service
//! never knows which one it is talking to.

mod error;
mod mock;
mod remote;
mod serial;

use std::sync::Arc;

use {async_trait::async_trait, tracing::info};

use buchi_config::{DeviceConfig, DeviceMode};

pub use {
    error::DeviceError,
    mock::MockDevice,
    remote::RemoteDevice,
    serial::{SerialDevice, SerialTiming},
};

/// Capability surface of the access-gating device.
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// Ask the device whether `token` grants access.
    ///
    /// `Ok(false)` means the device explicitly (or by staying silent past
    /// its deadline) declined the token; errors are reserved for an
    /// unreachable or misbehaving backend.
    async fn validate_token(&self, token: &str) -> Result<bool, DeviceError>;

    /// Push the shareable download URL to the device. Best-effort: callers
    /// log a failure and keep serving.
    async fn write_url(&self, url: &str) -> Result<(), DeviceError>;

    /// Release the backend's connection resource. Idempotent.
    async fn close(&self) -> Result<(), DeviceError>;
}

/// Construct the configured backend.
///
/// Chosen once at startup; every later call site depends only on the
/// [`DeviceLink`] contract.
pub async fn connect(config: &DeviceConfig) -> Result<Arc<dyn DeviceLink>, DeviceError> {
    match config.mode {
        DeviceMode::Mock => {
            info!("device: using in-process mock");
            Ok(Arc::new(MockDevice::new()))
        },
        DeviceMode::Remote => {
            info!(url = %config.remote_url, "device: using remote companion");
            Ok(Arc::new(RemoteDevice::new(&config.remote_url)))
        },
        DeviceMode::Serial => {
            let timing = SerialTiming::from(&config.timing);
            let device = SerialDevice::open_first(config.baud_rate, timing).await?;
            Ok(Arc::new(device))
        },
    }
}
