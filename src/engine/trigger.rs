//! Trigger sources that drive poll cycles.
//!
//! An instance is driven either by a fixed interval or by "timer finished"
//! events for an external Home Assistant timer entity. The choice is made
//! once at setup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use super::coordinator::PollCoordinator;
use crate::types::LottoError;

/// Host timer operations needed for event-driven triggering.
#[async_trait]
pub trait TimerControl: Send + Sync {
    /// Whether the timer entity exists on the host.
    async fn timer_exists(&self, entity_id: &str) -> Result<bool, LottoError>;

    /// Start the timer again after it finished.
    async fn restart_timer(&self, entity_id: &str) -> Result<(), LottoError>;
}

/// A host timer reached zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerFinished {
    pub entity_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerSource {
    Interval {
        #[serde(with = "secs")]
        period: Duration,
    },
    TimerEvents {
        entity_id: String,
        auto_restart: bool,
    },
}

impl TriggerSource {
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            TriggerSource::Interval { .. } => None,
            TriggerSource::TimerEvents { entity_id, .. } => Some(entity_id),
        }
    }

    /// Drive `coordinator` until the event channel closes or the task is
    /// aborted. The setup cycle is the caller's job.
    pub async fn run(
        self,
        coordinator: Arc<PollCoordinator>,
        mut events: mpsc::Receiver<TimerFinished>,
        control: Option<Arc<dyn TimerControl>>,
    ) {
        match self {
            TriggerSource::Interval { period } => {
                info!(period_secs = period.as_secs_f64(), "Interval trigger started");
                let mut ticker = interval_at(Instant::now() + period, period);
                loop {
                    ticker.tick().await;
                    let report = coordinator.run_cycle().await;
                    debug!(cycle = report.cycle_number, scraped = report.scraped, display = %report.display, "Interval cycle");
                }
            }
            TriggerSource::TimerEvents { entity_id, auto_restart } => {
                info!(timer = %entity_id, auto_restart, "Timer trigger started");
                while let Some(event) = events.recv().await {
                    if event.entity_id != entity_id {
                        debug!(timer = %event.entity_id, "Ignoring event for other timer");
                        continue;
                    }

                    let report = coordinator.run_cycle().await;
                    debug!(cycle = report.cycle_number, scraped = report.scraped, display = %report.display, "Timer cycle");

                    if !auto_restart {
                        continue;
                    }
                    match &control {
                        Some(control) => {
                            if let Err(e) = control.restart_timer(&entity_id).await {
                                warn!(timer = %entity_id, error = %e, "Failed to restart timer");
                            }
                        }
                        None => warn!(timer = %entity_id, "Auto-restart enabled but no Home Assistant client configured"),
                    }
                }
                info!(timer = %entity_id, "Timer event channel closed");
            }
        }
    }
}

mod secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
