// Byte transport consumed by the session
//
// One call = one request/response exchange. The transport owns delimiting;
// the session never sees partial frames.

mod serial;

pub use serial::{FRAME_HEADER, SerialTransport};

use std::time::Duration;

/// Failures of the underlying link
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Timed out after {timeout:?} waiting for response")]
    Timeout { timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Framing error: {reason}")]
    Framing { reason: String },

    #[error("Transport closed")]
    Closed,
}

/// A blocking request/response link to the controller
pub trait Transport {
    /// Write `request` and read back exactly one complete response frame.
    ///
    /// Must fail with `TransportError::Timeout` if no full response arrives within `timeout`.
    fn exchange(&mut self, request: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn exchange(&mut self, request: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).exchange(request, timeout)
    }
}
