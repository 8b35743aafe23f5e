// Host-side session with the drive motor controller
//
// Turns motion intents into command frames, runs exactly one exchange per call,
// and tracks the last commanded heading. Every call doubles as a heartbeat.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::angle::{Angle, normalize};
use crate::error::{DriveError, ProtocolError, Result, UsageError};
use crate::protocol::{Command, expect_ack_only};
use crate::status::StatusPayload;
use crate::transport::Transport;

/// Last heading the session commanded
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeadingState {
    /// No heading hold is active
    Unset,
    /// Holding this normalized heading, in radians
    Target(f64),
    /// A transport failure left the device heading unknown
    Unknown,
}

impl HeadingState {
    pub fn target(self) -> Option<f64> {
        match self {
            HeadingState::Target(heading) => Some(heading),
            _ => None,
        }
    }
}

struct Link<T> {
    transport: T,
    heading: HeadingState,
    poisoned: bool,
}

impl<T: Transport> Link<T> {
    /// Encode, exchange, and return the raw response
    fn exchange(&mut self, command: Command, timeout: Duration) -> Result<Vec<u8>> {
        let frame = command.encode()?;
        debug!("-> {:?} {:02X?}", command, frame.as_bytes());

        match self.transport.exchange(frame.as_bytes(), timeout) {
            Ok(response) => {
                debug!("<- {:02X?}", response);
                Ok(response)
            }
            Err(e) => {
                warn!("{:?} failed on transport: {}; device state unknown", command, e);
                self.poisoned = true;
                self.heading = HeadingState::Unknown;
                Err(e.into())
            }
        }
    }

    /// Clear the poisoned flag once a reply proves the device parser is in step.
    ///
    /// A bare ACK of the right length or a bare NCK counts; anything else does not.
    fn settle(&mut self, outcome: std::result::Result<(), &ProtocolError>) {
        let in_step = match outcome {
            Ok(()) => true,
            Err(ProtocolError::Nack { response }) => response.len() == 1,
            Err(_) => false,
        };
        if in_step && self.poisoned {
            info!("Drive link resynchronized");
            self.poisoned = false;
        }
    }

    fn exchange_ack(&mut self, command: Command, timeout: Duration) -> Result<()> {
        let response = self.exchange(command, timeout)?;
        let outcome = expect_ack_only(&response);
        self.settle(outcome.as_ref().map(|_| ()));
        outcome.map_err(|e| {
            warn!("{:?} not acknowledged: {}", command, e);
            DriveError::from(e)
        })
    }

    fn exchange_status(&mut self, timeout: Duration) -> Result<StatusPayload> {
        let response = self.exchange(Command::GetStatus, timeout)?;
        let decoded = StatusPayload::decode(&response);
        self.settle(decoded.as_ref().map(|_| ()));
        decoded.map_err(|e| {
            warn!("Status response rejected: {}", e);
            DriveError::from(e)
        })
    }

    fn set_target_heading(&mut self, heading: f64, timeout: Duration) -> Result<()> {
        let heading = normalize(heading);
        self.exchange_ack(Command::SetTargetHeading(heading), timeout)?;
        self.heading = HeadingState::Target(heading);
        Ok(())
    }
}

/// Session with one drive motor controller
///
/// Operations take `&self` and serialize on an internal lock, so the session can be
/// shared (e.g. in an `Arc`) between a control loop and a heartbeat task.
/// Nothing is retried; every failure goes straight back to the caller.
pub struct Session<T: Transport> {
    link: Mutex<Link<T>>,
    timeout: Duration,
}

impl<T: Transport> Session<T> {
    /// Wrap an already-open transport; `timeout` bounds every exchange
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self {
            link: Mutex::new(Link {
                transport,
                heading: HeadingState::Unset,
                poisoned: false,
            }),
            timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Link<T>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set linear velocity in m/s
    pub fn set_linear_velocity(&self, v: f64) -> Result<()> {
        self.lock().exchange_ack(Command::SetLinearVelocity(v), self.timeout)
    }

    /// Set angular velocity (rad/s or deg/s); releases any heading hold
    pub fn set_angular_velocity(&self, w: Angle) -> Result<()> {
        let mut link = self.lock();
        link.exchange_ack(Command::SetAngularVelocity(w.radians()), self.timeout)?;
        link.heading = HeadingState::Unset;
        Ok(())
    }

    /// Hold an absolute heading (yaw)
    pub fn set_target_heading(&self, heading: Angle) -> Result<()> {
        self.lock().set_target_heading(heading.radians(), self.timeout)
    }

    /// Shift the held heading by `change`
    ///
    /// Fails without touching the wire if no heading is held, or if a transport
    /// failure has made the device heading unknown.
    pub fn change_target_heading(&self, change: Angle) -> Result<()> {
        let mut link = self.lock();
        let current = match link.heading {
            HeadingState::Target(heading) => heading,
            HeadingState::Unset => return Err(UsageError::NoTargetHeading.into()),
            HeadingState::Unknown => return Err(UsageError::HeadingUnknown.into()),
        };

        let change = change.radians();
        if !change.is_finite() {
            return Err(UsageError::NonFinite {
                field: "heading change",
                value: change,
            }
            .into());
        }

        link.set_target_heading(current + change, self.timeout)
    }

    /// Stop translation; the heading hold stays in place
    pub fn stop(&self) -> Result<()> {
        self.lock().exchange_ack(Command::Stop, self.timeout)
    }

    /// Keep the controller's watchdog from safing the motors
    pub fn send_heartbeat(&self) -> Result<()> {
        self.lock().exchange_ack(Command::Heartbeat, self.timeout)
    }

    /// Read controller telemetry
    pub fn get_status(&self) -> Result<StatusPayload> {
        self.lock().exchange_status(self.timeout)
    }

    pub fn heading(&self) -> HeadingState {
        self.lock().heading
    }

    /// True from a transport failure until a well-formed ACK or NCK comes back
    pub fn is_poisoned(&self) -> bool {
        self.lock().poisoned
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        // Try to stop the base when the session goes away
        let timeout = self.timeout;
        let link = self.link.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = link.exchange_ack(Command::Stop, timeout) {
            warn!("Failed to stop drive on drop: {}", e);
        }
    }
}
