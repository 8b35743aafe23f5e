//! End-to-end tests: a session driving the simulated controller.

use sentrybot_drive::protocol::Command;
use sentrybot_drive::sim::{Fault, Health, SimulatedController};
use sentrybot_drive::{Angle, DriveError, HeadingState, ProtocolError, Session, UsageError};
use std::time::Duration;

const WATCHDOG: Duration = Duration::from_millis(500);
const TIMEOUT: Duration = Duration::from_millis(100);

fn connect() -> (Session<SimulatedController>, SimulatedController) {
    let sim = SimulatedController::new(WATCHDOG);
    (Session::new(sim.clone(), TIMEOUT), sim)
}

#[test]
fn test_regular_heartbeats_keep_motion_alive() {
    let (session, sim) = connect();
    session.set_linear_velocity(0.3).unwrap();

    // Beat every 200ms for 5s of virtual time
    for _ in 0..25 {
        sim.advance(Duration::from_millis(200));
        session.send_heartbeat().unwrap();
    }

    assert_eq!(sim.health(), Health::Armed);
    assert_eq!(sim.actuation().linear, 0.3);
}

#[test]
fn test_any_command_counts_as_heartbeat() {
    let (session, sim) = connect();

    for i in 0..10 {
        sim.advance(Duration::from_millis(400));
        session.set_linear_velocity(0.1 * (i % 3) as f64).unwrap();
        sim.advance(Duration::from_millis(400));
        session.get_status().unwrap();
    }

    assert_eq!(sim.health(), Health::Armed);
}

#[test]
fn test_silent_host_gets_safed() {
    let (session, sim) = connect();
    session.set_linear_velocity(0.5).unwrap();
    session.set_angular_velocity(Angle::Degrees(30.0)).unwrap();

    sim.advance(WATCHDOG + Duration::from_millis(1));
    assert_eq!(sim.health(), Health::Safed);
    assert_eq!(sim.actuation().linear, 0.0);
    assert_eq!(sim.actuation().angular, 0.0);

    // Next command re-arms, with motion starting from zero
    session.send_heartbeat().unwrap();
    assert_eq!(sim.health(), Health::Armed);
    assert_eq!(sim.actuation().linear, 0.0);
}

#[test]
fn test_relative_heading_scenario_reaches_controller() {
    let (session, sim) = connect();

    session.set_target_heading(Angle::Degrees(0.0)).unwrap();
    session.change_target_heading(Angle::Degrees(-45.0)).unwrap();

    assert_eq!(
        sim.received(),
        vec![
            Command::SetTargetHeading(0.0),
            Command::SetTargetHeading(-0.79),
        ]
    );
    assert_eq!(sim.targets().heading, Some(-0.79));

    let heading = session.heading().target().unwrap();
    assert!((heading + 0.7854).abs() < 1e-4);
}

#[test]
fn test_lost_reply_poisons_session() {
    let (session, sim) = connect();
    session.set_target_heading(Angle::Radians(0.5)).unwrap();

    // Controller applies the heading but the reply never arrives
    sim.inject(Fault::DropResponse);
    let err = session.set_target_heading(Angle::Radians(1.5)).unwrap_err();
    assert!(matches!(err, DriveError::Transport(_)));
    assert_eq!(sim.targets().heading, Some(1.5));
    assert!(session.is_poisoned());

    let err = session.change_target_heading(Angle::Radians(0.1)).unwrap_err();
    assert!(matches!(err, DriveError::Usage(UsageError::HeadingUnknown)));

    // Fresh ground truth
    session.set_target_heading(Angle::Radians(1.5)).unwrap();
    assert!(!session.is_poisoned());
    session.change_target_heading(Angle::Radians(0.1)).unwrap();
    assert_eq!(sim.targets().heading, Some(1.6));
}

#[test]
fn test_lost_request_then_angular_velocity_resyncs() {
    let (session, sim) = connect();
    session.set_target_heading(Angle::Radians(0.5)).unwrap();

    sim.inject(Fault::DropRequest);
    assert!(session.set_linear_velocity(0.2).is_err());
    assert_eq!(session.heading(), HeadingState::Unknown);

    session.set_angular_velocity(Angle::Radians(0.2)).unwrap();
    assert_eq!(session.heading(), HeadingState::Unset);
    assert!(!session.is_poisoned());
}

#[test]
fn test_nck_leaves_both_sides_unchanged() {
    let (session, sim) = connect();
    session.set_target_heading(Angle::Radians(-2.0)).unwrap();

    sim.inject(Fault::Nack);
    let err = session.set_target_heading(Angle::Radians(2.0)).unwrap_err();
    match err {
        DriveError::Protocol(ProtocolError::Nack { response }) => assert_eq!(response, vec![0x01]),
        other => panic!("expected NCK, got {:?}", other),
    }

    assert_eq!(session.heading(), HeadingState::Target(-2.0));
    assert_eq!(sim.targets().heading, Some(-2.0));
}

#[test]
fn test_status_battery_and_unknown_fields() {
    let (session, sim) = connect();
    sim.set_battery_percent(75);

    let status = session.get_status().unwrap();
    assert_eq!(status.battery_percent, 75);
    assert!(!status.has_kinematics());

    sim.set_battery_percent(150);
    assert!(matches!(
        session.get_status().unwrap_err(),
        DriveError::Protocol(ProtocolError::BatteryOutOfRange { percent: 150, .. })
    ));
}

#[test]
fn test_garbage_reply_keeps_session_poisoned() {
    let (session, sim) = connect();

    sim.inject(Fault::DropResponse);
    sim.inject(Fault::Garbage(vec![0x7E, 0x7E]));

    assert!(matches!(
        session.send_heartbeat().unwrap_err(),
        DriveError::Transport(_)
    ));
    assert!(session.is_poisoned());

    let err = session.send_heartbeat().unwrap_err();
    match err {
        DriveError::Protocol(e) => assert_eq!(e.response(), &[0x7E, 0x7E]),
        other => panic!("expected protocol error, got {:?}", other),
    }
    assert!(session.is_poisoned());

    // A clean ACK brings the link back
    session.send_heartbeat().unwrap();
    assert!(!session.is_poisoned());
}

#[test]
fn test_drop_stops_the_base() {
    let (session, sim) = connect();
    session.set_linear_velocity(0.4).unwrap();
    drop(session);

    assert_eq!(sim.targets().linear, 0.0);
    assert_eq!(sim.received().last(), Some(&Command::Stop));
}
