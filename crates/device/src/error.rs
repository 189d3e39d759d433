use thiserror::Error;

/// Errors from a device backend.
///
/// Token rejection is not an error; `validate_token` reports it as
/// `Ok(false)`. These variants cover the backend being unreachable or
/// answering outside its protocol.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Backend unreachable or returned an unexpected status.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Serial port operation failed.
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error on the device connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port discovery found no device that answers the identification probe.
    #[error("no responsive device port found")]
    NoPortFound,

    /// Operation attempted after `close()`.
    #[error("device link is closed")]
    Closed,
}

impl DeviceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}
