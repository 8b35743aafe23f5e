// Error taxonomy for the drive link
//
// Usage errors never reach the wire. Protocol errors carry the raw response.
// Transport errors come from the byte link and leave the device state unknown.

pub use crate::transport::TransportError;

/// Caller broke a precondition; raised before any transport I/O
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UsageError {
    #[error("Must give only one of rad or deg, not both")]
    AngleUnitsAmbiguous,

    #[error("Must give one of rad or deg")]
    AngleUnitsMissing,

    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("{field} out of range: {value} does not fit in a signed 16-bit field")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("Cannot change target heading; not currently targeting any heading")]
    NoTargetHeading,

    #[error("Cannot change target heading; last exchange failed and the device heading is unknown")]
    HeadingUnknown,

    #[error("Heartbeat period must be non-zero")]
    ZeroHeartbeatPeriod,
}

/// Device answered, but not with what the command expects
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Empty response from controller")]
    Empty,

    #[error("Controller rejected command (NCK); response={response:02X?}")]
    Nack { response: Vec<u8> },

    #[error("Expected ACK, got 0x{discriminator:02X}; response={response:02X?}")]
    UnexpectedAck { discriminator: u8, response: Vec<u8> },

    #[error("Expected {expected} response bytes, got {}; response={response:02X?}", .response.len())]
    UnexpectedLength { expected: usize, response: Vec<u8> },

    #[error("Battery percent {percent} outside 0..=100; response={response:02X?}")]
    BatteryOutOfRange { percent: u8, response: Vec<u8> },
}

impl ProtocolError {
    /// The raw response that triggered the error
    pub fn response(&self) -> &[u8] {
        match self {
            ProtocolError::Empty => &[],
            ProtocolError::Nack { response }
            | ProtocolError::UnexpectedAck { response, .. }
            | ProtocolError::UnexpectedLength { response, .. }
            | ProtocolError::BatteryOutOfRange { response, .. } => response,
        }
    }
}

/// Any failure surfaced by a session operation
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Usage error: {0}")]
    Usage(#[from] UsageError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, DriveError>;
