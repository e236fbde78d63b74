//! Lotto DK: Danish lottery jackpot poller
//!
//! Entry point. Loads configuration, initialises structured logging,
//! sets up one coordinator per configured entry, serves the dashboard
//! and waits for Ctrl+C to shut down.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use lotto_dk::config::{self, AppConfig};
use lotto_dk::dashboard::{self, DashboardState};
use lotto_dk::engine::registry::IntegrationRegistry;
use lotto_dk::engine::trigger::TimerControl;
use lotto_dk::ha::HomeAssistantClient;
use lotto_dk::scrape::fetcher::HttpFetcher;

/// Env var holding the config file path.
const CONFIG_PATH_ENV: &str = "LOTTO_DK_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    info!(
        service = %cfg.service.name,
        config = %config_path,
        scrape_interval_mins = cfg.polling.scrape_interval_mins,
        request_timeout_secs = cfg.polling.request_timeout_secs,
        entries = cfg.entries.len(),
        "Lotto DK starting up"
    );

    // -- Initialise components -------------------------------------------

    let fetcher = HttpFetcher::with_urls(&cfg.url_overrides()?)?;
    let timer_control = build_timer_control(cfg.home_assistant.as_ref())?;

    let registry = Arc::new(IntegrationRegistry::new(
        Arc::new(fetcher),
        cfg.polling.settings(),
        timer_control,
    ));

    for entry in &cfg.entries {
        if let Err(e) = registry.setup_entry(entry).await {
            error!(entry = entry.id.as_deref().unwrap_or("unnamed"), error = %e, "Entry setup failed");
        }
    }
    if registry.list().await.is_empty() {
        anyhow::bail!("No entry could be set up");
    }

    let dashboard_task = if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(cfg.service.name.clone(), registry.clone()));
        Some(dashboard::spawn_dashboard(state, cfg.dashboard.port).await?)
    } else {
        None
    };

    // -- Run until interrupted -------------------------------------------

    info!("Running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received.");

    if let Some(task) = dashboard_task {
        task.abort();
    }
    registry.shutdown().await;
    info!("Lotto DK shut down cleanly.");

    Ok(())
}

/// Home Assistant client for timer lookups and restarts, when configured.
fn build_timer_control(
    ha: Option<&config::HomeAssistantConfig>,
) -> Result<Option<Arc<dyn TimerControl>>> {
    let Some(ha) = ha else {
        info!("No Home Assistant configured; timer restarts disabled");
        return Ok(None);
    };
    let token = match AppConfig::resolve_env(&ha.token_env) {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "Home Assistant token missing; timer restarts disabled");
            return Ok(None);
        }
    };
    let client = HomeAssistantClient::new(&ha.base_url, token)?;
    Ok(Some(Arc::new(client)))
}

/// Initialise structured logging via `tracing-subscriber`.
///
/// Uses JSON format if `LOTTO_DK_LOG_JSON` is set, otherwise human-readable.
/// Log level controlled by `RUST_LOG` env var (default: `lotto_dk=info`).
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lotto_dk=info"));

    let json_logging = std::env::var("LOTTO_DK_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
