use std::sync::Mutex;

use {async_trait::async_trait, tracing::info};

use crate::{DeviceError, DeviceLink};

/// Simulated device: accepts every token, remembers every URL written to
/// it, never fails. The default backend when no hardware is configured.
#[derive(Default)]
pub struct MockDevice {
    written_urls: Mutex<Vec<String>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs received via `write_url`, in call order.
    pub fn written_urls(&self) -> Vec<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.written_urls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DeviceLink for MockDevice {
    async fn validate_token(&self, token: &str) -> Result<bool, DeviceError> {
        info!(%token, "mock device: token accepted");
        Ok(true)
    }

    async fn write_url(&self, url: &str) -> Result<(), DeviceError> {
        info!(%url, "mock device: url written");
        self.lock().push(url.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<(), DeviceError> {
        info!("mock device: closed");
        Ok(())
    }
}
