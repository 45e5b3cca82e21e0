//! TimeoutSweeper - runs the timeout sweep on a fixed interval.
//!
//! Expiry must be enforced even when nobody reads the session, so the
//! sweep runs in-process on a tokio interval. A failed pass is logged and
//! the next tick tries again.
//!
//! ## Graceful Shutdown
//!
//! The service listens on a watch channel and runs one final pass before
//! stopping.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::handlers::session::{
    SweepReport, SweepTimeoutsCommand, SweepTimeoutsHandler,
};
use crate::domain::foundation::{CommandMetadata, Timestamp};
use crate::domain::session::SessionError;

#[derive(Debug, Clone)]
pub struct TimeoutSweeperConfig {
    /// Time between passes.
    pub interval: Duration,
}

impl Default for TimeoutSweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
        }
    }
}

impl TimeoutSweeperConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Background service driving [`SweepTimeoutsHandler`].
pub struct TimeoutSweeper {
    handler: Arc<SweepTimeoutsHandler>,
    config: TimeoutSweeperConfig,
}

impl TimeoutSweeper {
    pub fn new(handler: Arc<SweepTimeoutsHandler>, config: TimeoutSweeperConfig) -> Self {
        Self { handler, config }
    }

    /// Run until `shutdown` turns true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.config.interval.as_secs(), "Timeout sweeper started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.tick().await;
                        info!("Timeout sweeper stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// Run exactly one pass.
    pub async fn sweep_once(&self) -> Result<SweepReport, SessionError> {
        self.handler
            .handle(
                SweepTimeoutsCommand {
                    now: Timestamp::now(),
                },
                CommandMetadata::system("sweeper"),
            )
            .await
    }

    async fn tick(&self) {
        match self.sweep_once().await {
            Ok(report) => debug!(
                ended = report.ended.len(),
                reconciled = report.reconciled.len(),
                "Sweep pass complete"
            ),
            Err(err) => warn!(error = %err, "Sweep pass failed"),
        }
    }
}
