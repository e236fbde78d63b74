//! Instance registry, one coordinator per configured entry.
//!
//! Each entry owns its coordinator, its cache and its trigger task, keyed
//! by entry id. Options updates are applied in place: the cache survives,
//! and the trigger task is only replaced when the trigger source changed.

use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::coordinator::{CycleReport, PollCoordinator, PollSettings};
use super::trigger::{TimerControl, TimerFinished, TriggerSource};
use crate::config::{EntryConfig, EntryOptions};
use crate::scrape::PageSource;
use crate::types::LottoError;

/// Buffered timer events per entry.
const TIMER_EVENT_BUFFER: usize = 16;

/// A problem worth surfacing to the operator without failing setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub key: String,
    pub message: String,
    pub raised_at: String,
}

struct TriggerHandle {
    source: TriggerSource,
    events: mpsc::Sender<TimerFinished>,
    task: Option<JoinHandle<()>>,
}

impl TriggerHandle {
    fn stop(&mut self) -> Option<JoinHandle<()>> {
        let task = self.task.take()?;
        task.abort();
        Some(task)
    }
}

/// Per-entry context.
pub struct Instance {
    pub id: String,
    pub title: String,
    coordinator: Arc<PollCoordinator>,
    options: RwLock<EntryOptions>,
    trigger: Mutex<TriggerHandle>,
    issues: RwLock<Vec<Issue>>,
}

impl Instance {
    pub fn coordinator(&self) -> &Arc<PollCoordinator> {
        &self.coordinator
    }

    pub async fn options(&self) -> EntryOptions {
        self.options.read().await.clone()
    }

    pub async fn trigger_source(&self) -> TriggerSource {
        self.trigger.lock().await.source.clone()
    }

    pub async fn issues(&self) -> Vec<Issue> {
        self.issues.read().await.clone()
    }

    async fn raise_issue(&self, key: &str, message: String) {
        warn!(entry = %self.id, key, %message, "Issue raised");
        self.issues.write().await.push(Issue {
            key: key.to_string(),
            message,
            raised_at: chrono::Utc::now().to_rfc3339(),
        });
    }
}

fn spawn_trigger(
    source: TriggerSource,
    coordinator: Arc<PollCoordinator>,
    control: Option<Arc<dyn TimerControl>>,
) -> TriggerHandle {
    let (events, rx) = mpsc::channel(TIMER_EVENT_BUFFER);
    let task = tokio::spawn(source.clone().run(coordinator, rx, control));
    TriggerHandle { source, events, task: Some(task) }
}

pub struct IntegrationRegistry {
    source: Arc<dyn PageSource>,
    settings: PollSettings,
    timer_control: Option<Arc<dyn TimerControl>>,
    entries: RwLock<HashMap<String, Arc<Instance>>>,
}

impl IntegrationRegistry {
    pub fn new(
        source: Arc<dyn PageSource>,
        settings: PollSettings,
        timer_control: Option<Arc<dyn TimerControl>>,
    ) -> Self {
        Self {
            source,
            settings,
            timer_control,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Set up one entry: validate, run the first refresh, start its trigger.
    pub async fn setup_entry(&self, entry: &EntryConfig) -> Result<Arc<Instance>, LottoError> {
        entry.options.validate()?;

        let id = entry
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if self.entries.read().await.contains_key(&id) {
            return Err(LottoError::Config(format!("Duplicate entry id: {id}")));
        }

        let coordinator = Arc::new(PollCoordinator::new(
            self.source.clone(),
            entry.options.subscriptions(),
            self.settings.clone(),
        )?);

        let first = coordinator.run_cycle().await;
        info!(entry = %id, updated = first.updated.len(), failed = first.failed.len(), "First refresh done");

        let source = entry.options.trigger_source();
        let instance = Arc::new(Instance {
            id: id.clone(),
            title: entry.title.clone().unwrap_or_else(|| "Lotto DK".into()),
            coordinator: coordinator.clone(),
            options: RwLock::new(entry.options.clone()),
            trigger: Mutex::new(spawn_trigger(
                source.clone(),
                coordinator,
                self.timer_control.clone(),
            )),
            issues: RwLock::new(Vec::new()),
        });

        {
            // Re-checked under the write lock: another setup may have won
            // the id while the first refresh was in flight.
            let mut entries = self.entries.write().await;
            if entries.contains_key(&id) {
                instance.trigger.lock().await.stop();
                return Err(LottoError::Config(format!("Duplicate entry id: {id}")));
            }
            entries.insert(id.clone(), instance.clone());
        }

        self.check_timer_entity(&instance, &source).await;
        info!(entry = %id, trigger = ?source, "Entry set up");
        Ok(instance)
    }

    async fn check_timer_entity(&self, instance: &Instance, source: &TriggerSource) {
        let (Some(entity_id), Some(control)) = (source.entity_id(), &self.timer_control) else {
            return;
        };
        match control.timer_exists(entity_id).await {
            Ok(true) => {}
            Ok(false) => {
                instance
                    .raise_issue(
                        "missing_timer_entity",
                        LottoError::MissingTimerEntity(entity_id.to_string()).to_string(),
                    )
                    .await
            }
            Err(e) => warn!(entry = %instance.id, timer = entity_id, error = %e, "Could not verify timer entity"),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Arc<Instance>, LottoError> {
        self.entries
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| LottoError::UnknownEntry(id.to_string()))
    }

    /// All entries, sorted by id.
    pub async fn list(&self) -> Vec<Arc<Instance>> {
        let mut all: Vec<_> = self.entries.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Options flow: validate, then re-apply in place.
    pub async fn update_options(&self, id: &str, options: EntryOptions) -> Result<(), LottoError> {
        options.validate()?;
        let instance = self.get(id).await?;

        instance
            .coordinator
            .apply_subscriptions(options.subscriptions())
            .await?;

        let source = options.trigger_source();
        let mut trigger = instance.trigger.lock().await;
        if trigger.source != source {
            trigger.stop();
            *trigger = spawn_trigger(
                source.clone(),
                instance.coordinator.clone(),
                self.timer_control.clone(),
            );
            drop(trigger);
            info!(entry = %id, trigger = ?source, "Trigger replaced");
            self.check_timer_entity(&instance, &source).await;
        }

        *instance.options.write().await = options;
        Ok(())
    }

    /// Operator "update" action.
    pub async fn force_update(&self, id: &str) -> Result<CycleReport, LottoError> {
        let instance = self.get(id).await?;
        Ok(instance.coordinator.force_update().await)
    }

    /// Deliver a timer event. Returns whether the entry listens to that timer.
    pub async fn notify_timer(&self, id: &str, event: TimerFinished) -> Result<bool, LottoError> {
        let instance = self.get(id).await?;
        let (listening, events) = {
            let trigger = instance.trigger.lock().await;
            (
                trigger.source.entity_id() == Some(event.entity_id.as_str()),
                trigger.events.clone(),
            )
        };
        if !listening {
            return Ok(false);
        }
        events
            .send(event)
            .await
            .map_err(|_| LottoError::Config(format!("Trigger for {id} is not running")))?;
        Ok(true)
    }

    /// Stop an entry's trigger and forget it.
    pub async fn unload_entry(&self, id: &str) -> Result<(), LottoError> {
        let instance = self
            .entries
            .write()
            .await
            .remove(id)
            .ok_or_else(|| LottoError::UnknownEntry(id.to_string()))?;
        instance.trigger.lock().await.stop();
        info!(entry = %id, "Entry unloaded");
        Ok(())
    }

    /// Stop every trigger task and wait for them to wind down.
    pub async fn shutdown(&self) {
        let drained: Vec<Arc<Instance>> =
            self.entries.write().await.drain().map(|(_, i)| i).collect();
        let mut tasks = Vec::new();
        for instance in &drained {
            tasks.extend(instance.trigger.lock().await.stop());
        }
        let count = drained.len();
        join_all(tasks).await;
        info!(entries = count, "All triggers stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
