use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sentrybot_drive::config::DriveConfig;
use sentrybot_drive::sim::SimulatedController;
use sentrybot_drive::{Angle, SerialTransport, Session, Transport, heartbeat};

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type DriveSession = Session<Box<dyn Transport + Send>>;

/// Talk to the drive motor controller over serial
#[derive(Parser)]
#[command(name = "sentrybot-drive", version)]
struct Cli {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port path
    #[arg(long)]
    port: Option<String>,

    #[arg(long)]
    baud: Option<u32>,

    /// Per-exchange timeout
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Run against a simulated controller instead of the serial port
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Cmd,
}

/// Exactly one of --rad / --deg
#[derive(Args)]
struct AngleArgs {
    #[arg(long, allow_hyphen_values = true)]
    rad: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    deg: Option<f64>,
}

impl AngleArgs {
    fn angle(&self) -> Result<Angle, BoxError> {
        Ok(Angle::from_parts(self.rad, self.deg)?)
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Print controller status
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Send one heartbeat
    Heartbeat,
    /// Stop translation
    Stop,
    /// Drive at a linear velocity (m/s) for a while, then stop
    Drive {
        #[arg(long, allow_hyphen_values = true)]
        linear: f64,
        #[arg(long, default_value_t = 1000)]
        hold_ms: u64,
    },
    /// Rotate at an angular velocity (per second) for a while, then stop
    Turn {
        #[command(flatten)]
        rate: AngleArgs,
        #[arg(long, default_value_t = 1000)]
        hold_ms: u64,
    },
    /// Hold an absolute heading for a while
    Heading {
        #[command(flatten)]
        heading: AngleArgs,
        #[arg(long, default_value_t = 3000)]
        hold_ms: u64,
    },
    /// Drive a square: straight leg, stop, turn -90 deg, repeat
    Patrol {
        #[arg(long, default_value_t = 0.2)]
        speed: f64,
        #[arg(long, default_value_t = 4)]
        legs: u32,
        #[arg(long, default_value_t = 4000)]
        leg_ms: u64,
        #[arg(long, default_value_t = 3000)]
        turn_ms: u64,
    },
}

fn load_config(cli: &Cli) -> Result<DriveConfig, BoxError> {
    let mut config = match &cli.config {
        Some(path) => DriveConfig::from_json_file(path)?,
        None => DriveConfig::default(),
    };

    if let Some(port) = &cli.port {
        config.serial.path = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.serial.baudrate = baud;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.serial.timeout_ms = timeout_ms;
    }

    config.validate()?;
    Ok(config)
}

fn open_session(cli: &Cli, config: &DriveConfig) -> Result<Arc<DriveSession>, BoxError> {
    let transport: Box<dyn Transport + Send> = if cli.simulate {
        info!("Using simulated controller");
        Box::new(SimulatedController::new(config.heartbeat.watchdog_timeout()))
    } else {
        Box::new(SerialTransport::open(
            &config.serial.path,
            config.serial.baudrate,
            config.serial.timeout(),
        )?)
    };

    Ok(Arc::new(Session::new(transport, config.serial.timeout())))
}

/// Keep the link alive for `duration` while the current motion runs
async fn hold(
    session: &Arc<DriveSession>,
    config: &DriveConfig,
    duration: Duration,
) -> Result<(), BoxError> {
    let beat = heartbeat::spawn(session.clone(), config.heartbeat.period())?;
    tokio::time::sleep(duration).await;
    beat.stop();
    Ok(())
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let config = load_config(&cli)?;
    let session = open_session(&cli, &config)?;

    match &cli.command {
        Cmd::Status { json } => {
            let status = session.get_status()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("battery:     {}%", status.battery_percent);
                let known = |present: bool| if present { "reported" } else { "unknown" };
                println!("left motor:  {}", known(status.left_motor.is_some()));
                println!("right motor: {}", known(status.right_motor.is_some()));
                println!("body:        {}", known(status.body.is_some()));
            }
        }
        Cmd::Heartbeat => {
            session.send_heartbeat()?;
            println!("ACK");
        }
        Cmd::Stop => {
            session.stop()?;
            println!("ACK");
        }
        Cmd::Drive { linear, hold_ms } => {
            session.set_linear_velocity(*linear)?;
            hold(&session, &config, Duration::from_millis(*hold_ms)).await?;
            session.stop()?;
        }
        Cmd::Turn { rate, hold_ms } => {
            session.set_angular_velocity(rate.angle()?)?;
            hold(&session, &config, Duration::from_millis(*hold_ms)).await?;
            session.set_angular_velocity(Angle::Radians(0.0))?;
        }
        Cmd::Heading { heading, hold_ms } => {
            session.set_target_heading(heading.angle()?)?;
            hold(&session, &config, Duration::from_millis(*hold_ms)).await?;
        }
        Cmd::Patrol {
            speed,
            legs,
            leg_ms,
            turn_ms,
        } => {
            // Relative turns need an absolute heading to start from
            session.set_target_heading(Angle::Radians(0.0))?;

            for leg in 0..*legs {
                info!("Patrol leg {}/{}", leg + 1, legs);
                session.set_linear_velocity(*speed)?;
                hold(&session, &config, Duration::from_millis(*leg_ms)).await?;

                session.set_linear_velocity(0.0)?;
                session.change_target_heading(Angle::Degrees(-90.0))?;
                hold(&session, &config, Duration::from_millis(*turn_ms)).await?;
            }
            session.stop()?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=debug to see every frame)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
