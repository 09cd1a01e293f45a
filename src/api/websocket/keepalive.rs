//! Keep-alive driver
//!
//! One process-wide timer that broadcasts the heartbeat sentinel every
//! interval for as long as it runs.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::broadcaster::EventBroadcaster;

/// Handle to the running heartbeat task. Dropping it stops the task.
pub struct KeepAlive {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl KeepAlive {
    /// Start broadcasting heartbeats; the first fires one `period` from now
    pub fn spawn(broadcaster: Arc<EventBroadcaster>, period: Duration) -> Self {
        let token = CancellationToken::new();
        let first_tick = Instant::now() + period;
        let handle = tokio::spawn(run(broadcaster, first_tick, period, token.clone()));
        info!(interval_secs = period.as_secs_f64(), "keep-alive started");
        Self {
            token,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the timer and wait for an in-flight heartbeat to finish
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("keep-alive stopped");
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run(
    broadcaster: Arc<EventBroadcaster>,
    first_tick: Instant,
    period: Duration,
    token: CancellationToken,
) {
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                debug!(subscribers = broadcaster.registry().len(), "sending heartbeat");
                broadcaster.heartbeat().await;
            }
        }
    }
}
