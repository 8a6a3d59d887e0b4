//! Periodic triggering of scheduled passes.
//!
//! Whatever fires the tick (an in-process timer in a long-running server, or
//! an external scheduler invoking the binary once) ends up calling the same
//! [`TickHandler::on_tick`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

use crate::runner::TaskRunner;
use crate::schedule::TickSchedule;

/// Something that runs once per tick
#[async_trait]
pub trait TickHandler: Send + Sync {
    async fn on_tick(&self);
}

#[async_trait]
impl TickHandler for TaskRunner {
    async fn on_tick(&self) {
        info!("Scheduled pass triggered at {}", Utc::now().to_rfc3339());
        let run = self.run_scheduled(Utc::now()).await;
        info!(
            "Scheduled pass finished: {} ({} probed, {} skipped)",
            run.report.summary,
            run.report.outcomes.len(),
            run.skipped.len()
        );
    }
}

/// In-process timer for long-running deployments
pub struct IntervalTicker {
    schedule: TickSchedule,
}

impl IntervalTicker {
    pub fn new(schedule: TickSchedule) -> Self {
        Self { schedule }
    }

    /// Tick right away, then once per period until the task is aborted.
    ///
    /// A pass that overruns the period delays the next tick instead of
    /// queueing extra ones.
    pub fn spawn(&self, handler: Arc<dyn TickHandler>) -> JoinHandle<()> {
        let period = self.schedule.period();
        info!("Scheduled passes every {:?} ({})", period, self.schedule);

        tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                timer.tick().await;
                handler.on_tick().await;
            }
        })
    }
}

/// Run a single pass, for platform scheduled events or an external cron
pub async fn fire_once(handler: &dyn TickHandler) {
    handler.on_tick().await;
}
