// Heading math shared by the session and the simulator
//
// All angles are radians internally. Callers may hand in degrees through `Angle`.

use std::f64::consts::{PI, TAU};

use crate::error::UsageError;

/// Map any finite angle (radians) onto its representative in [-PI, PI).
///
/// Uses a single modular reduction, so huge inputs cost the same as small ones.
/// `normalize(PI)` and `normalize(-PI)` both return `-PI`.
pub fn normalize(theta: f64) -> f64 {
    if (-PI..PI).contains(&theta) {
        return theta;
    }

    let wrapped = (theta + PI).rem_euclid(TAU) - PI;

    // rem_euclid may round up to TAU for tiny negative inputs
    if wrapped >= PI { -PI } else { wrapped }
}

/// An angle (or angular rate) given in exactly one unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Angle {
    Radians(f64),
    Degrees(f64),
}

impl Angle {
    /// Build from optional radian/degree inputs, as a CLI or RPC layer receives them.
    ///
    /// Exactly one of the two must be present.
    pub fn from_parts(rad: Option<f64>, deg: Option<f64>) -> Result<Self, UsageError> {
        match (rad, deg) {
            (Some(_), Some(_)) => Err(UsageError::AngleUnitsAmbiguous),
            (Some(rad), None) => Ok(Angle::Radians(rad)),
            (None, Some(deg)) => Ok(Angle::Degrees(deg)),
            (None, None) => Err(UsageError::AngleUnitsMissing),
        }
    }

    pub fn radians(self) -> f64 {
        match self {
            Angle::Radians(rad) => rad,
            Angle::Degrees(deg) => deg.to_radians(),
        }
    }
}
