//! HTTP access to the exchange's public API.
//!
//! The same client type serves the primary endpoint and the mirror path;
//! only the URL prefix differs.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    config::Settings,
    error::EngineError,
    models::{Equity, LiveStock},
};

#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &str;

    /// `/live/{symbol}`
    async fn live(&self, symbol: &str) -> Result<LiveStock, EngineError>;

    /// `/live`
    async fn live_all(&self) -> Result<Vec<LiveStock>, EngineError>;

    /// `/equities/{symbol}`
    async fn equity(&self, symbol: &str) -> Result<Equity, EngineError>;
}

/// Builds the pooled client shared by every upstream call.
pub fn build_http_client(settings: &Settings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(settings.http_timeout)
        .connect_timeout(settings.http_timeout)
        .pool_max_idle_per_host(settings.http_pool_max_idle_per_host)
        .build()
}

#[derive(Clone)]
pub struct GseClient {
    name: String,
    http: Client,
    url_prefix: String,
}

impl GseClient {
    pub fn direct(http: Client, base_url: &str) -> Self {
        Self {
            name: "gse-direct".to_string(),
            http,
            url_prefix: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Same API reached through a pass-through proxy (`{proxy}{base}{path}`).
    pub fn mirrored(http: Client, proxy_url: &str, base_url: &str) -> Self {
        Self {
            name: "gse-proxy".to_string(),
            http,
            url_prefix: format!("{}{}", proxy_url, base_url.trim_end_matches('/')),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.url_prefix, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, EngineError> {
        let url = self.url_for(path);

        let res = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::Timeout(format!("{} {path}", self.name))
            } else {
                EngineError::upstream(&self.name, e.to_string())
            }
        })?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(EngineError::upstream(
                &self.name,
                format!("{path} failed: {status} {body}"),
            ));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| EngineError::upstream(&self.name, e.to_string()))?;
        let parsed = serde_json::from_slice::<T>(&bytes)
            .map_err(|e| EngineError::Decode(format!("{} {path}: {e}", self.name)))?;

        debug!(source = %self.name, %url, "upstream success");
        Ok(parsed)
    }
}

#[async_trait]
impl QuoteSource for GseClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn live(&self, symbol: &str) -> Result<LiveStock, EngineError> {
        self.get_json(&format!("/live/{symbol}")).await
    }

    async fn live_all(&self) -> Result<Vec<LiveStock>, EngineError> {
        self.get_json("/live").await
    }

    async fn equity(&self, symbol: &str) -> Result<Equity, EngineError> {
        self.get_json(&format!("/equities/{symbol}")).await
    }
}
