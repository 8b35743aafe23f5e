// Telemetry records returned by GetStatus
//
// Only the battery percent is wired to real telemetry today. The kinematic
// fields are `None` until the controller reports them, so an unpopulated field
// can never be mistaken for a measured zero.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::protocol::expect_ack;

/// Response length for GetStatus: ACK + battery percent
pub const STATUS_RESPONSE_LEN: usize = 2;

/// Full status snapshot of the drive controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    /// Battery charge, 0..=100
    pub battery_percent: u8,
    pub battery_voltage: Option<f32>,
    pub left_motor: Option<MotorStatus>,
    pub right_motor: Option<MotorStatus>,
    pub body: Option<BodyStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorStatus {
    pub ticks_per_s: f32,
    pub meters_per_s: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyStatus {
    pub linear_meters_per_s: f32,
    pub angular_rad_per_s: f32,
    pub heading: BodyHeading,
}

/// Body orientation in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyHeading {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl StatusPayload {
    /// A record with only the battery populated
    pub fn with_battery(battery_percent: u8) -> Self {
        Self {
            battery_percent,
            battery_voltage: None,
            left_motor: None,
            right_motor: None,
            body: None,
        }
    }

    /// Decode a full GetStatus response (ACK byte included)
    pub fn decode(response: &[u8]) -> Result<Self, ProtocolError> {
        let rest = expect_ack(response)?;

        let &[percent] = rest else {
            return Err(ProtocolError::UnexpectedLength {
                expected: STATUS_RESPONSE_LEN,
                response: response.to_vec(),
            });
        };

        if percent > 100 {
            return Err(ProtocolError::BatteryOutOfRange {
                percent,
                response: response.to_vec(),
            });
        }

        Ok(Self::with_battery(percent))
    }

    /// True once the controller reports motor and body kinematics
    pub fn has_kinematics(&self) -> bool {
        self.left_motor.is_some() && self.right_motor.is_some() && self.body.is_some()
    }
}
