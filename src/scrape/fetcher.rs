//! HTTP page fetcher.
//!
//! Fetches the three jackpot pages from danskespil.dk. No authentication,
//! no query parameters; the body is returned as opaque HTML text.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::PageSource;
use crate::types::{LotteryKind, LottoError};

/// Transport-level timeout. The coordinator applies the tighter
/// per-request budget on top of this.
const CLIENT_TIMEOUT_SECS: u64 = 15;

pub struct HttpFetcher {
    http: Client,
    urls: HashMap<LotteryKind, String>,
}

impl HttpFetcher {
    /// Build a fetcher for the default Danske Spil URLs.
    pub fn new() -> Result<Self, LottoError> {
        Self::with_urls(&HashMap::new())
    }

    /// Build a fetcher, overriding the URL of any kind present in `overrides`.
    pub fn with_urls(overrides: &HashMap<LotteryKind, String>) -> Result<Self, LottoError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
            .user_agent("lotto-dk/0.1.0")
            .build()
            .map_err(|e| LottoError::Config(format!("Failed to build HTTP client: {e}")))?;

        let urls = LotteryKind::CYCLE
            .into_iter()
            .map(|kind| {
                let url = overrides
                    .get(&kind)
                    .cloned()
                    .unwrap_or_else(|| kind.default_url().to_string());
                (kind, url)
            })
            .collect();

        Ok(Self { http, urls })
    }

    pub fn url(&self, kind: LotteryKind) -> &str {
        self.urls
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_url())
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch_page(&self, kind: LotteryKind) -> Result<String, LottoError> {
        let url = self.url(kind);
        debug!(lottery = %kind, url, "Fetching jackpot page");

        let fetch_err = |message: String| LottoError::Fetch {
            url: url.to_string(),
            message,
        };

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(fetch_err(format!("HTTP {status}")));
        }

        resp.text().await.map_err(|e| fetch_err(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
