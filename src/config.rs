//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The Home Assistant token is referenced by env-var name in the config
//! and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use crate::engine::coordinator::PollSettings;
use crate::engine::trigger::TriggerSource;
use crate::types::{LotteryKind, LottoError, Subscriptions};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub home_assistant: Option<HomeAssistantConfig>,
    #[serde(default)]
    pub entries: Vec<EntryConfig>,
    /// Per-lottery page URL overrides, keyed by lottery id.
    #[serde(default)]
    pub urls: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { name: "Lotto DK".into() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_scrape_interval_mins")]
    pub scrape_interval_mins: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            scrape_interval_mins: default_scrape_interval_mins(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl PollingConfig {
    /// Saturates instead of panicking; `validate` keeps real values in range.
    pub fn settings(&self) -> PollSettings {
        let scrape_interval = i64::try_from(self.scrape_interval_mins)
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .unwrap_or(chrono::Duration::MAX);
        PollSettings {
            scrape_interval,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { enabled: true, port: 8089 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HomeAssistantConfig {
    pub base_url: String,
    pub token_env: String,
}

/// One integration instance as written in the config file.
#[derive(Debug, Deserialize, Clone)]
pub struct EntryConfig {
    /// Stable instance id; a UUID is generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub options: EntryOptions,
}

/// The user-editable part of an entry (what the options form edits).
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct EntryOptions {
    #[serde(default = "default_true")]
    pub euro_jackpot: bool,
    #[serde(default = "default_true")]
    pub lotto: bool,
    #[serde(default = "default_true")]
    pub viking_lotto: bool,
    /// External timer entity driving the scroll sensor.
    #[serde(default)]
    pub listen_to_timer_trigger: Option<String>,
    /// Restart that timer after it finishes.
    #[serde(default)]
    pub restart_timer: bool,
    #[serde(default = "default_scroll_interval_secs")]
    pub scroll_interval_secs: u64,
}

impl Default for EntryOptions {
    fn default() -> Self {
        Self {
            euro_jackpot: true,
            lotto: true,
            viking_lotto: true,
            listen_to_timer_trigger: None,
            restart_timer: false,
            scroll_interval_secs: default_scroll_interval_secs(),
        }
    }
}

impl EntryOptions {
    pub fn subscriptions(&self) -> Subscriptions {
        Subscriptions {
            euro_jackpot: self.euro_jackpot,
            lotto: self.lotto,
            viking_lotto: self.viking_lotto,
        }
    }

    /// Timer entity, treating a blank string as unset.
    pub fn timer_entity(&self) -> Option<&str> {
        self.listen_to_timer_trigger
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn trigger_source(&self) -> TriggerSource {
        match self.timer_entity() {
            Some(entity_id) => TriggerSource::TimerEvents {
                entity_id: entity_id.to_string(),
                auto_restart: self.restart_timer,
            },
            None => TriggerSource::Interval {
                period: Duration::from_secs(self.scroll_interval_secs),
            },
        }
    }

    pub fn validate(&self) -> Result<(), LottoError> {
        self.subscriptions().validate()?;
        if self.timer_entity().is_none() {
            if self.restart_timer {
                return Err(LottoError::Config(
                    "restart_timer requires listen_to_timer_trigger".into(),
                ));
            }
            if !(1..=MAX_SCROLL_INTERVAL_SECS).contains(&self.scroll_interval_secs) {
                return Err(LottoError::Config(format!(
                    "scroll_interval_secs must be between 1 and {MAX_SCROLL_INTERVAL_SECS}"
                )));
            }
        }
        if let Some(entity) = self.timer_entity() {
            if !entity.starts_with("timer.") {
                return Err(LottoError::Config(format!(
                    "listen_to_timer_trigger must be a timer entity, got {entity}"
                )));
            }
        }
        Ok(())
    }
}

/// One week.
pub const MAX_SCRAPE_INTERVAL_MINS: u64 = 7 * 24 * 60;
/// One day.
pub const MAX_SCROLL_INTERVAL_SECS: u64 = 24 * 60 * 60;
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 60;

fn default_true() -> bool {
    true
}

fn default_scrape_interval_mins() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    3
}

fn default_scroll_interval_secs() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    /// Parse and validate configuration text.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut config: AppConfig =
            toml::from_str(contents).context("Failed to parse config")?;
        if config.entries.is_empty() {
            config.entries.push(EntryConfig {
                id: Some("default".into()),
                title: None,
                options: EntryOptions::default(),
            });
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&self.polling.request_timeout_secs) {
            anyhow::bail!("polling.request_timeout_secs must be between 1 and {MAX_REQUEST_TIMEOUT_SECS}");
        }
        if !(1..=MAX_SCRAPE_INTERVAL_MINS).contains(&self.polling.scrape_interval_mins) {
            anyhow::bail!("polling.scrape_interval_mins must be between 1 and {MAX_SCRAPE_INTERVAL_MINS}");
        }
        self.url_overrides()?;
        for (i, entry) in self.entries.iter().enumerate() {
            entry
                .options
                .validate()
                .with_context(|| format!("entries[{i}] ({})", entry.id.as_deref().unwrap_or("unnamed")))?;
        }
        Ok(())
    }

    /// URL overrides with their keys parsed into lottery kinds.
    pub fn url_overrides(&self) -> Result<HashMap<LotteryKind, String>, LottoError> {
        self.urls
            .iter()
            .map(|(key, url)| Ok((key.parse::<LotteryKind>()?, url.clone())))
            .collect()
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<SecretString> {
        std::env::var(env_name)
            .map(SecretString::new)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
