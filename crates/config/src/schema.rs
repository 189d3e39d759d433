use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuchiConfig {
    /// Port the share listener binds on.
    pub http_port: u16,

    /// Seconds an issued download pass stays valid if never consumed.
    pub pass_ttl_secs: u64,

    pub device: DeviceConfig,
}

impl Default for BuchiConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            pass_ttl_secs: 300,
            device: DeviceConfig::default(),
        }
    }
}

/// Which device backend to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    /// In-process simulated device; accepts every token.
    Mock,
    /// Companion service reached over HTTP.
    Remote,
    /// Hardware reached directly over a serial port.
    Serial,
}

/// Device backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub mode: DeviceMode,

    /// Base URL of the remote companion service (`remote` mode).
    pub remote_url: String,

    /// Baud rate for direct serial communication (`serial` mode).
    pub baud_rate: u32,

    pub timing: SerialTimingConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mode: DeviceMode::Mock,
            remote_url: "http://127.0.0.1:28245".into(),
            baud_rate: 115_200,
            timing: SerialTimingConfig::default(),
        }
    }
}

/// Serial timing knobs, all in milliseconds.
///
/// The defaults match what the supported hardware needs: it drops bytes
/// written too soon after the port opens, and takes a couple of seconds to
/// produce a response after each command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialTimingConfig {
    /// Settle delay after opening a port before the first write.
    pub settle_after_open_ms: u64,
    /// Settle delay after each command write before reading.
    pub settle_after_write_ms: u64,
    /// Per-read timeout while polling for a response.
    pub read_poll_ms: u64,
    /// Overall wall-clock deadline for one response.
    pub response_deadline_ms: u64,
    /// Per-read timeout while draining stale input.
    pub drain_read_ms: u64,
}

impl Default for SerialTimingConfig {
    fn default() -> Self {
        Self {
            settle_after_open_ms: 5_000,
            settle_after_write_ms: 2_000,
            read_poll_ms: 200,
            response_deadline_ms: 3_000,
            drain_read_ms: 50,
        }
    }
}
