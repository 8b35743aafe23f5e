// Periodic heartbeat task
//
// The session never ticks on its own; this is the caller-side scheduler that keeps
// the controller's watchdog fed while motion is wanted. Failures are logged and
// counted, and the next beat simply happens on schedule.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::error::UsageError;
use crate::session::Session;
use crate::transport::Transport;

/// Handle to a running heartbeat task
pub struct HeartbeatTask {
    handle: JoinHandle<()>,
    sent: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
}

/// Start sending heartbeats every `period` on the current tokio runtime
///
/// `period` must be non-zero and shorter than the controller's watchdog timeout.
pub fn spawn<T>(session: Arc<Session<T>>, period: Duration) -> Result<HeartbeatTask, UsageError>
where
    T: Transport + Send + 'static,
{
    if period.is_zero() {
        return Err(UsageError::ZeroHeartbeatPeriod);
    }

    let sent = Arc::new(AtomicU64::new(0));
    let failures = Arc::new(AtomicU64::new(0));
    let (sent_count, failure_count) = (sent.clone(), failures.clone());

    let handle = tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Heartbeat started: every {}ms", period.as_millis());

        loop {
            tick.tick().await;

            // An exchange can't be abandoned mid-frame, so it runs to completion
            // on the blocking pool even if this task is aborted.
            let session = session.clone();
            match tokio::task::spawn_blocking(move || session.send_heartbeat()).await {
                Ok(Ok(())) => {
                    sent_count.fetch_add(1, Ordering::Relaxed);
                    debug!("Heartbeat acknowledged");
                }
                Ok(Err(e)) => {
                    failure_count.fetch_add(1, Ordering::Relaxed);
                    warn!("Heartbeat failed: {}", e);
                }
                Err(e) => {
                    warn!("Heartbeat worker died: {}", e);
                    break;
                }
            }
        }
    });

    Ok(HeartbeatTask {
        handle,
        sent,
        failures,
    })
}

impl HeartbeatTask {
    /// Heartbeats the controller acknowledged
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Heartbeats that failed
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop scheduling heartbeats
    pub fn stop(self) {
        info!("Heartbeat stopped after {} beats", self.sent());
        self.handle.abort();
    }
}
