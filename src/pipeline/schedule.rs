// src/pipeline/schedule.rs

//! Periodic detection loop.
//!
//! Runs a cycle every `interval`; after any failure the next cycle runs
//! after the shorter `retry` delay instead. Nothing that happens in a cycle
//! ends the loop.

use std::sync::Arc;
use std::time::Duration;

use crate::app::App;
use crate::error::DetectError;
use crate::models::{Item, ScheduleConfig};

/// How a periodic cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing new
    Quiet,
    /// New items found and pushed
    Notified(usize),
    /// Detection or delivery failed
    Failed,
}

/// Drives periodic detection cycles.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    retry: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration, retry: Duration) -> Self {
        Self { interval, retry }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.interval(), config.retry())
    }

    /// Delay before the next cycle.
    pub fn next_delay(&self, outcome: CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Failed => self.retry,
            CycleOutcome::Quiet | CycleOutcome::Notified(_) => self.interval,
        }
    }

    /// Run cycles until the task is dropped.
    pub async fn run(&self, app: Arc<App>) {
        log::info!(
            "Watching {} every {}s (retry after {}s)",
            app.detector.target(),
            self.interval.as_secs(),
            self.retry.as_secs()
        );
        loop {
            let outcome = self.run_cycle(&app).await;
            let delay = self.next_delay(outcome);
            log::info!("Next check in {}s", delay.as_secs());
            tokio::time::sleep(delay).await;
        }
    }

    /// Run one cycle and push any new items to the recipient.
    pub async fn run_cycle(&self, app: &App) -> CycleOutcome {
        match app.detector.detect().await {
            Ok(detection) if detection.has_new() => push_items(app, &detection.new_items).await,
            Ok(_) => CycleOutcome::Quiet,
            Err(DetectError::StoreWriteFailed { new_items, .. }) => {
                // Detection itself succeeded; deliver this once and retry soon.
                push_items(app, &new_items).await;
                CycleOutcome::Failed
            }
            Err(e) => {
                log::error!("Periodic check failed: {}", e);
                CycleOutcome::Failed
            }
        }
    }
}

async fn push_items(app: &App, items: &[Item]) -> CycleOutcome {
    let site = app.site();
    let template = app.config.messages.push_item.replace("{site}", &site);
    let mut delivered = 0;

    for item in items {
        match app.notifier.push(&item.format(&template)).await {
            Ok(()) => delivered += 1,
            Err(e) => log::error!("Could not push '{}': {}", item.title, e),
        }
    }

    log::info!("Pushed {}/{} new item(s)", delivered, items.len());
    if delivered == items.len() {
        CycleOutcome::Notified(delivered)
    } else {
        CycleOutcome::Failed
    }
}
