//! Minimal Home Assistant REST client.
//!
//! Only what event-driven triggering needs: look up a timer entity and
//! call `timer.start` on it.
//!
//! API: `{base_url}/api/states/{entity_id}`, `{base_url}/api/services/{domain}/{service}`
//! Auth: long-lived access token as bearer.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::engine::trigger::TimerControl;
use crate::types::LottoError;

/// Subset of an entity state object.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Value,
}

pub struct HomeAssistantClient {
    base_url: String,
    token: SecretString,
    http: Client,
}

impl HomeAssistantClient {
    pub fn new(base_url: impl Into<String>, token: SecretString) -> Result<Self, LottoError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LottoError::Config(format!("Failed to build HTTP client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(base_url = %base_url, "Home Assistant client configured");
        Ok(Self { base_url, token, http })
    }

    /// Fetch one entity. `Ok(None)` when the entity does not exist.
    pub async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>, LottoError> {
        let url = format!(
            "{}/api/states/{}",
            self.base_url,
            urlencoding::encode(entity_id)
        );
        debug!(url = %url, "Fetching entity state");

        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| LottoError::HostApi(format!("GET {entity_id} failed: {e}")))?;

        match resp.status() {
            StatusCode::OK => resp
                .json::<EntityState>()
                .await
                .map(Some)
                .map_err(|e| LottoError::HostApi(format!("Bad state for {entity_id}: {e}"))),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(LottoError::HostApi(format!("GET {entity_id}: HTTP {status}"))),
        }
    }

    /// Call a `domain.service` with a JSON payload.
    pub async fn call_service(&self, service: &str, data: Value) -> Result<(), LottoError> {
        let (domain, name) = service
            .split_once('.')
            .filter(|(d, n)| !d.is_empty() && !n.is_empty() && !n.contains('.'))
            .ok_or_else(|| {
                LottoError::HostApi(format!("Invalid service {service:?}, expected 'domain.service'"))
            })?;

        let url = format!("{}/api/services/{domain}/{name}", self.base_url);
        debug!(service, url = %url, "Calling service");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&data)
            .send()
            .await
            .map_err(|e| LottoError::HostApi(format!("{service} failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LottoError::HostApi(format!("{service}: HTTP {status} {body}")));
        }
        Ok(())
    }
}

#[async_trait]
impl TimerControl for HomeAssistantClient {
    async fn timer_exists(&self, entity_id: &str) -> Result<bool, LottoError> {
        Ok(self.get_state(entity_id).await?.is_some())
    }

    async fn restart_timer(&self, entity_id: &str) -> Result<(), LottoError> {
        self.call_service("timer.start", json!({ "entity_id": entity_id }))
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client(url: &str) -> HomeAssistantClient {
        HomeAssistantClient::new(url, SecretString::new("test_token".into())).unwrap()
    }

    #[tokio::test]
    async fn test_get_state_found() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/states/timer.lotto_scroll")
            .match_header("authorization", "Bearer test_token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "entity_id": "timer.lotto_scroll",
                    "state": "active",
                    "attributes": { "duration": "0:01:00" }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let state = client(&server.url())
            .get_state("timer.lotto_scroll")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(state.entity_id, "timer.lotto_scroll");
        assert_eq!(state.state, "active");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_timer_missing() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/states/timer.gone")
            .with_status(404)
            .create_async()
            .await;

        let exists = client(&server.url()).timer_exists("timer.gone").await.unwrap();
        assert!(!exists);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_state_unauthorized() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/states/timer.x")
            .with_status(401)
            .create_async()
            .await;

        let result = client(&server.url()).get_state("timer.x").await;
        assert!(matches!(result, Err(LottoError::HostApi(_))));
    }

    #[tokio::test]
    async fn test_restart_timer_calls_timer_start() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/services/timer/start")
            .match_header("authorization", "Bearer test_token")
            .match_body(Matcher::Json(json!({ "entity_id": "timer.lotto_scroll" })))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let result = client(&server.url()).restart_timer("timer.lotto_scroll").await;
        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_call_service_invalid_format() {
        let c = client("http://localhost");
        assert!(c.call_service("invalid", json!({})).await.is_err());
        assert!(c.call_service("a.b.c", json!({})).await.is_err());
        assert!(c.call_service(".start", json!({})).await.is_err());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let c = client("http://ha.local:8123/");
        assert_eq!(c.base_url, "http://ha.local:8123");
    }
}
