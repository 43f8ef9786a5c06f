//! Dividend yields for listed stocks.
//!
//! The upstream publishes the whole table in one document, so one fetch
//! (cached) serves every yield alert in a tick.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::{
    config::Settings,
    error::EngineError,
    models::{DividendStock, DividendYieldResponse},
    services::market_cache::{MarketCache, YIELDS_KEY},
};

const SOURCE_NAME: &str = "dividend-yields";

#[async_trait]
pub trait YieldSource: Send + Sync {
    async fn fetch_yields(&self) -> Result<Vec<DividendStock>, EngineError>;
}

#[derive(Clone)]
pub struct DividendYieldClient {
    http: Client,
    url: String,
}

impl DividendYieldClient {
    pub fn new(http: Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl YieldSource for DividendYieldClient {
    async fn fetch_yields(&self) -> Result<Vec<DividendStock>, EngineError> {
        let res = self.http.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::Timeout(SOURCE_NAME.to_string())
            } else {
                EngineError::upstream(SOURCE_NAME, e.to_string())
            }
        })?;

        if !res.status().is_success() {
            return Err(EngineError::upstream(
                SOURCE_NAME,
                format!("returned status {}", res.status()),
            ));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| EngineError::upstream(SOURCE_NAME, e.to_string()))?;
        parse_yield_table(&bytes)
    }
}

pub fn parse_yield_table(raw: &[u8]) -> Result<Vec<DividendStock>, EngineError> {
    let parsed: DividendYieldResponse = serde_json::from_slice(raw)
        .map_err(|e| EngineError::Decode(format!("{SOURCE_NAME}: {e}")))?;

    if !parsed.success {
        return Err(EngineError::upstream(SOURCE_NAME, "unsuccessful response"));
    }

    Ok(parsed.data.stocks)
}

#[derive(Clone)]
pub struct YieldFetcher {
    source: Arc<dyn YieldSource>,
    cache: MarketCache,
    call_timeout: Duration,
    ttl: Duration,
}

impl YieldFetcher {
    pub fn new(source: Arc<dyn YieldSource>, cache: MarketCache, settings: &Settings) -> Self {
        Self {
            source,
            cache,
            call_timeout: settings.http_timeout,
            ttl: settings.stock_cache_ttl,
        }
    }

    pub async fn get_yield_table(&self) -> Result<Vec<DividendStock>, EngineError> {
        if let Some(table) = self.cache.get::<Vec<DividendStock>>(YIELDS_KEY).await {
            return Ok(table);
        }

        let table = match tokio::time::timeout(self.call_timeout, self.source.fetch_yields()).await
        {
            Ok(res) => res?,
            Err(_) => return Err(EngineError::Timeout(SOURCE_NAME.to_string())),
        };

        debug!(count = table.len(), "fetched dividend yield table");
        self.cache.set(YIELDS_KEY, &table, self.ttl).await;
        Ok(table)
    }

    pub async fn get_yield(&self, symbol: &str) -> Result<f64, EngineError> {
        let table = self.get_yield_table().await?;
        lookup_yield(&table, symbol)
    }

    /// Stocks yielding at least `min_yield`.
    pub async fn high_yield_stocks(&self, min_yield: f64) -> Result<Vec<DividendStock>, EngineError> {
        let table = self.get_yield_table().await?;
        Ok(table
            .into_iter()
            .filter(|s| s.dividend_yield >= min_yield)
            .collect())
    }
}

pub fn lookup_yield(table: &[DividendStock], symbol: &str) -> Result<f64, EngineError> {
    let row = table
        .iter()
        .find(|s| s.symbol.eq_ignore_ascii_case(symbol.trim()))
        .ok_or_else(|| EngineError::NotFound(symbol.to_uppercase()))?;

    if !row.dividend_yield.is_finite() {
        warn!(symbol = %row.symbol, "non-finite dividend yield in table");
        return Err(EngineError::Decode(format!("yield for {}", row.symbol)));
    }

    Ok(row.dividend_yield)
}
