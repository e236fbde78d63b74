//! Poll coordinator: the per-instance scrape→cache→scroll cycle.
//!
//! Every trigger (interval tick, timer event, manual update) calls
//! [`PollCoordinator::run_cycle`]. Only the first call after the scrape
//! deadline touches the network; all others just advance the scroll text.
//! The deadline check-and-set is one critical section, so overlapping
//! triggers never fetch twice. The lock is released before any I/O.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::cursor::RoundRobinCursor;
use crate::scrape::extractor::extract_amount;
use crate::scrape::PageSource;
use crate::types::{JackpotCache, LotteryKind, LottoError, Subscriptions};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Timing knobs for one coordinator.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Minimum gap between two scrapes.
    pub scrape_interval: chrono::Duration,
    /// Budget for a single page fetch.
    pub request_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            scrape_interval: chrono::Duration::minutes(60),
            request_timeout: Duration::from_secs(3),
        }
    }
}

// ---------------------------------------------------------------------------
// Reports and snapshots
// ---------------------------------------------------------------------------

/// Outcome of one cycle. Informational only; a cycle never fails.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub cycle_number: u64,
    /// Whether this cycle passed the deadline and scraped.
    pub scraped: bool,
    pub updated: Vec<LotteryKind>,
    pub failed: Vec<LotteryKind>,
    pub display: String,
}

/// Read-only view of the coordinator for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorSnapshot {
    pub subscriptions: Subscriptions,
    pub cache: JackpotCache,
    pub cursor: LotteryKind,
    pub display: String,
    pub cycles: u64,
    pub last_cycle: Option<DateTime<Utc>>,
    pub next_scrape: DateTime<Utc>,
}

impl CoordinatorSnapshot {
    /// At least one cycle has completed.
    pub fn available(&self) -> bool {
        self.cycles > 0
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

struct PollState {
    subscriptions: Subscriptions,
    cache: JackpotCache,
    cursor: RoundRobinCursor,
    deadline: DateTime<Utc>,
    cycles: u64,
    last_cycle: Option<DateTime<Utc>>,
}

pub struct PollCoordinator {
    source: Arc<dyn PageSource>,
    settings: PollSettings,
    state: Mutex<PollState>,
}

impl PollCoordinator {
    /// Create a coordinator. The first cycle always scrapes.
    pub fn new(
        source: Arc<dyn PageSource>,
        subscriptions: Subscriptions,
        settings: PollSettings,
    ) -> Result<Self, LottoError> {
        subscriptions.validate()?;
        Ok(Self {
            source,
            settings,
            state: Mutex::new(PollState {
                subscriptions,
                cache: JackpotCache::default(),
                cursor: RoundRobinCursor::new(),
                deadline: DateTime::<Utc>::MIN_UTC,
                cycles: 0,
                last_cycle: None,
            }),
        })
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Run one cycle now.
    pub async fn run_cycle(&self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle as if the clock read `now`.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleReport {
        let to_scrape: Option<Vec<LotteryKind>> = {
            let mut state = self.state.lock().await;
            if now < state.deadline {
                None
            } else {
                state.deadline = now
                    .checked_add_signed(self.settings.scrape_interval)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                Some(state.subscriptions.iter().collect())
            }
        };

        let mut report = CycleReport {
            scraped: to_scrape.is_some(),
            ..Default::default()
        };

        let mut results = Vec::new();
        match &to_scrape {
            Some(kinds) => {
                info!(lotteries = kinds.len(), "Scraping jackpot pages");
                for kind in kinds {
                    results.push((*kind, self.fetch_amount(*kind).await));
                }
            }
            None => debug!("Scrape deadline not reached, refreshing scroll only"),
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        for (kind, result) in results {
            match result {
                Ok(amount) if amount > 0 => {
                    state.cache.set(kind, amount);
                    report.updated.push(kind);
                    info!(lottery = %kind, amount, "Jackpot updated");
                }
                Ok(_) => {
                    debug!(lottery = %kind, "Zero jackpot discarded");
                    report.failed.push(kind);
                }
                Err(e) => {
                    warn!(lottery = %kind, error = %e, "Jackpot scrape failed, keeping last value");
                    report.failed.push(kind);
                }
            }
        }

        report.display = state
            .cursor
            .step(&state.cache, &state.subscriptions)
            .to_string();
        state.cycles += 1;
        state.last_cycle = Some(now);
        report.cycle_number = state.cycles;

        report
    }

    /// Operator "update" action: run a cycle immediately.
    pub async fn force_update(&self) -> CycleReport {
        info!("Manual update requested");
        self.run_cycle().await
    }

    /// Replace the subscription set in place.
    pub async fn apply_subscriptions(&self, subscriptions: Subscriptions) -> Result<(), LottoError> {
        subscriptions.validate()?;
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.subscriptions = subscriptions;
        state.cursor.realign(&state.cache, &subscriptions);
        info!(?subscriptions, cursor = %state.cursor.current(), "Subscriptions updated");
        Ok(())
    }

    pub async fn snapshot(&self) -> CoordinatorSnapshot {
        let state = self.state.lock().await;
        CoordinatorSnapshot {
            subscriptions: state.subscriptions,
            cache: state.cache,
            cursor: state.cursor.current(),
            display: state.cursor.display().to_string(),
            cycles: state.cycles,
            last_cycle: state.last_cycle,
            next_scrape: state.deadline,
        }
    }

    async fn fetch_amount(&self, kind: LotteryKind) -> Result<u64, LottoError> {
        let html = tokio::time::timeout(self.settings.request_timeout, self.source.fetch_page(kind))
            .await
            .map_err(|_| LottoError::Timeout {
                lottery: kind,
                millis: self.settings.request_timeout.as_millis() as u64,
            })??;
        extract_amount(&html)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
