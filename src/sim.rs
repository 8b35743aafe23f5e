// Simulated drive controller with watchdog
//
// Plays the device side of the link so sessions can run without hardware.
// Time is virtual: nothing expires until `advance` moves the clock.
//
// Watchdog: Safed at boot, Armed by any valid command, Safed again (all targets
// zeroed) once no command has arrived for longer than the watchdog timeout.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::protocol::{ACK, Command, NCK};
use crate::transport::{Transport, TransportError};

/// Battery level reported until told otherwise
pub const DEFAULT_BATTERY_PERCENT: u8 = 100;

/// Watchdog state of the controller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Armed,
    Safed,
}

/// Motion targets held by the controller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct DriveTargets {
    /// m/s
    pub linear: f64,
    /// rad/s
    pub angular: f64,
    /// rad, when a heading hold is active
    pub heading: Option<f64>,
}

/// One-shot faults applied to the next exchange
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// Request lost on the way in; nothing applied, exchange times out
    DropRequest,
    /// Request applied, reply lost; exchange times out
    DropResponse,
    /// Controller refuses the command
    Nack,
    /// Reply with these bytes instead of the real response
    Garbage(Vec<u8>),
}

struct Controller {
    watchdog_timeout: Duration,
    clock: Duration,
    last_command_at: Option<Duration>,
    health: Health,
    targets: DriveTargets,
    battery_percent: u8,
    faults: VecDeque<Fault>,
    received: Vec<Command>,
}

impl Controller {
    /// Safe the motors if the host has gone quiet
    fn check_watchdog(&mut self) {
        let Some(last) = self.last_command_at else {
            return;
        };

        let cmd_age = self.clock.saturating_sub(last);
        if cmd_age > self.watchdog_timeout && self.health == Health::Armed {
            warn!("No command for {:?}, safing motors", cmd_age);
            self.health = Health::Safed;
            self.targets = DriveTargets::default();
        }
    }

    fn apply(&mut self, command: Command) -> Vec<u8> {
        if self.health == Health::Safed {
            info!("Command received, arming motors");
        }
        self.health = Health::Armed;
        self.last_command_at = Some(self.clock);
        self.received.push(command);

        match command {
            Command::Heartbeat => {}
            Command::GetStatus => return vec![ACK, self.battery_percent],
            Command::SetLinearVelocity(v) => self.targets.linear = v,
            Command::SetAngularVelocity(w) => {
                self.targets.angular = w;
                self.targets.heading = None;
            }
            Command::SetTargetHeading(heading) => {
                self.targets.angular = 0.0;
                self.targets.heading = Some(heading);
            }
            Command::Stop => {
                self.targets.linear = 0.0;
                self.targets.angular = 0.0;
            }
        }
        vec![ACK]
    }

    fn exchange(&mut self, request: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.check_watchdog();

        let fault = self.faults.pop_front();
        if fault == Some(Fault::DropRequest) {
            debug!("Dropping request {:02X?}", request);
            return Err(TransportError::Timeout { timeout });
        }

        let command = match Command::decode(request) {
            Ok(command) => command,
            Err(e) => {
                warn!("Rejecting malformed frame {:02X?}: {}", request, e);
                return Ok(vec![NCK]);
            }
        };

        match fault {
            Some(Fault::Nack) => Ok(vec![NCK]),
            Some(Fault::Garbage(bytes)) => {
                self.apply(command);
                Ok(bytes)
            }
            Some(Fault::DropResponse) => {
                self.apply(command);
                Err(TransportError::Timeout { timeout })
            }
            Some(Fault::DropRequest) | None => Ok(self.apply(command)),
        }
    }
}

/// Handle to a simulated controller
///
/// Clones share the same controller, so a test can keep one handle while a
/// session owns another.
#[derive(Clone)]
pub struct SimulatedController {
    inner: Arc<Mutex<Controller>>,
}

impl SimulatedController {
    pub fn new(watchdog_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Controller {
                watchdog_timeout,
                clock: Duration::ZERO,
                last_command_at: None,
                health: Health::Safed, // Safed until the first command
                targets: DriveTargets::default(),
                battery_percent: DEFAULT_BATTERY_PERCENT,
                faults: VecDeque::new(),
                received: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Controller> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the virtual clock forward and run the watchdog
    pub fn advance(&self, dt: Duration) {
        let mut controller = self.lock();
        controller.clock += dt;
        controller.check_watchdog();
    }

    /// Queue a fault for an upcoming exchange (applied in order)
    pub fn inject(&self, fault: Fault) {
        self.lock().faults.push_back(fault);
    }

    /// Battery level reported by GetStatus; not range-checked, so tests can
    /// make the controller misbehave
    pub fn set_battery_percent(&self, percent: u8) {
        self.lock().battery_percent = percent;
    }

    pub fn health(&self) -> Health {
        self.lock().health
    }

    /// Targets as commanded
    pub fn targets(&self) -> DriveTargets {
        self.lock().targets
    }

    /// What the motors actually get: nothing while safed
    pub fn actuation(&self) -> DriveTargets {
        let controller = self.lock();
        match controller.health {
            Health::Armed => controller.targets,
            Health::Safed => DriveTargets::default(),
        }
    }

    /// Every command the controller accepted, in order
    pub fn received(&self) -> Vec<Command> {
        self.lock().received.clone()
    }
}

impl Transport for SimulatedController {
    fn exchange(&mut self, request: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.lock().exchange(request, timeout)
    }
}
