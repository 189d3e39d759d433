use {
    async_trait::async_trait,
    reqwest::StatusCode,
    tracing::{debug, info},
};

use crate::{DeviceError, DeviceLink};

/// Device reached through its HTTP companion service.
///
/// The companion owns the actual serial connection; this backend only
/// translates the two capabilities into `GET` requests:
/// `/validate-token?token=…` and `/write-url?url=…`.
pub struct RemoteDevice {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteDevice {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DeviceLink for RemoteDevice {
    async fn validate_token(&self, token: &str) -> Result<bool, DeviceError> {
        let resp = self
            .client
            .get(format!("{}/validate-token", self.base_url))
            .query(&[("token", token)])
            .send()
            .await
            .map_err(|e| DeviceError::transport(format!("token validation request: {e}")))?;

        match resp.status() {
            StatusCode::OK => Ok(true),
            // The companion's explicit "this token is wrong" answer.
            StatusCode::FORBIDDEN => Ok(false),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(DeviceError::transport(format!(
                    "companion returned {status}: {body}"
                )))
            },
        }
    }

    async fn write_url(&self, url: &str) -> Result<(), DeviceError> {
        let resp = self
            .client
            .get(format!("{}/write-url", self.base_url))
            .query(&[("url", url)])
            .send()
            .await
            .map_err(|e| DeviceError::transport(format!("url write request: {e}")))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(DeviceError::transport(format!(
                "companion returned {status}: {body}"
            )));
        }
        info!(%url, "companion accepted share url");
        Ok(())
    }

    async fn close(&self) -> Result<(), DeviceError> {
        // The companion owns the serial port; nothing to release here.
        debug!("remote device: closed");
        Ok(())
    }
}
