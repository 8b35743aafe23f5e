// Host -> controller command frames
//
// Frame format: [opcode, payload...], payload fields are big-endian i16.
// Physical quantities travel as hundredths (cm/s, centirad/s, centirad).

use crate::angle::normalize;
use crate::error::UsageError;

/// Longest request frame: opcode + one i16
pub const MAX_FRAME_LEN: usize = 3;

/// Scale between SI units and the on-wire hundredths
const CENTI: f64 = 100.0;

/// Opcode set understood by the motor controller
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Heartbeat = 0x00,
    GetStatus = 0x01,
    SetLinearVelocity = 0x02,
    SetAngularVelocity = 0x03,
    SetTargetHeading = 0x04,
    Stop = 0x05,
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Opcode::Heartbeat),
            0x01 => Some(Opcode::GetStatus),
            0x02 => Some(Opcode::SetLinearVelocity),
            0x03 => Some(Opcode::SetAngularVelocity),
            0x04 => Some(Opcode::SetTargetHeading),
            0x05 => Some(Opcode::Stop),
            _ => None,
        }
    }

    /// Number of payload bytes following the opcode
    pub fn payload_len(self) -> usize {
        match self {
            Opcode::Heartbeat | Opcode::GetStatus | Opcode::Stop => 0,
            Opcode::SetLinearVelocity | Opcode::SetAngularVelocity | Opcode::SetTargetHeading => 2,
        }
    }
}

/// A single request to the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Heartbeat,
    GetStatus,
    /// Linear velocity in m/s
    SetLinearVelocity(f64),
    /// Angular velocity in rad/s
    SetAngularVelocity(f64),
    /// Heading to hold in radians; normalized on encode
    SetTargetHeading(f64),
    Stop,
}

/// One encoded request, ready for the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; MAX_FRAME_LEN],
    len: usize,
}

impl Frame {
    fn opcode_only(opcode: Opcode) -> Self {
        Self {
            bytes: [opcode as u8, 0, 0],
            len: 1,
        }
    }

    fn with_i16(opcode: Opcode, value: i16) -> Self {
        let [hi, lo] = value.to_be_bytes();
        Self {
            bytes: [opcode as u8, hi, lo],
            len: 3,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Device-side decoding failures (used by the simulator)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Empty frame")]
    Empty,

    #[error("Unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),

    #[error("Opcode {opcode:?} expects {expected} payload bytes, got {actual}")]
    BadLength {
        opcode: Opcode,
        expected: usize,
        actual: usize,
    },
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::Heartbeat => Opcode::Heartbeat,
            Command::GetStatus => Opcode::GetStatus,
            Command::SetLinearVelocity(_) => Opcode::SetLinearVelocity,
            Command::SetAngularVelocity(_) => Opcode::SetAngularVelocity,
            Command::SetTargetHeading(_) => Opcode::SetTargetHeading,
            Command::Stop => Opcode::Stop,
        }
    }

    /// Encode into a wire frame
    ///
    /// Rejects non-finite values and values whose scaled form does not fit an i16.
    /// Rounding is half-to-even.
    pub fn encode(&self) -> Result<Frame, UsageError> {
        let opcode = self.opcode();
        let frame = match *self {
            Command::Heartbeat | Command::GetStatus | Command::Stop => Frame::opcode_only(opcode),
            Command::SetLinearVelocity(v) => Frame::with_i16(opcode, to_centi("linear velocity", v)?),
            Command::SetAngularVelocity(w) => {
                Frame::with_i16(opcode, to_centi("angular velocity", w)?)
            }
            Command::SetTargetHeading(heading) => {
                if !heading.is_finite() {
                    return Err(UsageError::NonFinite {
                        field: "target heading",
                        value: heading,
                    });
                }
                Frame::with_i16(opcode, to_centi("target heading", normalize(heading))?)
            }
        };
        Ok(frame)
    }

    /// Decode a request frame the way the controller does
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let (&first, payload) = bytes.split_first().ok_or(FrameError::Empty)?;
        let opcode = Opcode::from_byte(first).ok_or(FrameError::UnknownOpcode(first))?;

        if payload.len() != opcode.payload_len() {
            return Err(FrameError::BadLength {
                opcode,
                expected: opcode.payload_len(),
                actual: payload.len(),
            });
        }

        let value = || from_centi(i16::from_be_bytes([payload[0], payload[1]]));

        Ok(match opcode {
            Opcode::Heartbeat => Command::Heartbeat,
            Opcode::GetStatus => Command::GetStatus,
            Opcode::Stop => Command::Stop,
            Opcode::SetLinearVelocity => Command::SetLinearVelocity(value()),
            Opcode::SetAngularVelocity => Command::SetAngularVelocity(value()),
            Opcode::SetTargetHeading => Command::SetTargetHeading(value()),
        })
    }
}

/// Scale to hundredths, round half-to-even, and range-check against i16
fn to_centi(field: &'static str, value: f64) -> Result<i16, UsageError> {
    if !value.is_finite() {
        return Err(UsageError::NonFinite { field, value });
    }

    let scaled = (value * CENTI).round_ties_even();
    if scaled < i16::MIN as f64 || scaled > i16::MAX as f64 {
        return Err(UsageError::OutOfRange { field, value });
    }

    Ok(scaled as i16)
}

fn from_centi(raw: i16) -> f64 {
    raw as f64 / CENTI
}
