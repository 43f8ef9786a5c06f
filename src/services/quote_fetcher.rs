use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    error::EngineError,
    models::{quote::change_percent, Equity, LiveStock, Quote, StockDetails},
    services::{
        gse::QuoteSource,
        market_cache::{details_key, live_key, MarketCache, ALL_STOCKS_KEY},
        mock_data,
    },
};

/// Cache first, then primary source, then mirror, then static data.
///
/// Holds no mutable state of its own; concurrent callers only meet in
/// the cache.
#[derive(Clone)]
pub struct QuoteFetcher {
    primary: Arc<dyn QuoteSource>,
    secondary: Arc<dyn QuoteSource>,
    cache: MarketCache,
    call_timeout: Duration,
    ttl: Duration,
    fallback_ttl: Duration,
}

impl QuoteFetcher {
    pub fn new(
        primary: Arc<dyn QuoteSource>,
        secondary: Arc<dyn QuoteSource>,
        cache: MarketCache,
        settings: &Settings,
    ) -> Self {
        Self {
            primary,
            secondary,
            cache,
            call_timeout: settings.http_timeout,
            ttl: settings.stock_cache_ttl,
            fallback_ttl: settings.fallback_cache_ttl,
        }
    }

    pub fn cache(&self) -> &MarketCache {
        &self.cache
    }

    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, EngineError> {
        let sym = symbol.trim().to_uppercase();
        let key = live_key(&sym);

        if let Some(q) = self.cache.get::<Quote>(&key).await {
            return Ok(q);
        }

        let now = Utc::now().timestamp();
        match self.fetch_live(&sym).await {
            Ok(live) => {
                let mut quote = Quote::from_live(&live, now);
                quote.symbol = sym.clone();
                self.cache.set(&key, &quote, self.ttl).await;
                Ok(quote)
            }
            Err(e) => {
                warn!(symbol = %sym, error = %e, "upstream unavailable, using fallback data");
                let quote = mock_data::mock_quote_for(&sym, now)
                    .ok_or_else(|| EngineError::NotFound(sym.clone()))?;
                // short TTL so a real fetch is retried soon
                self.cache.set(&key, &quote, self.fallback_ttl).await;
                Ok(quote)
            }
        }
    }

    pub async fn get_all_quotes(&self) -> Result<Vec<Quote>, EngineError> {
        if let Some(all) = self.cache.get::<Vec<Quote>>(ALL_STOCKS_KEY).await {
            return Ok(all);
        }

        let now = Utc::now().timestamp();
        match self.fetch_live_all().await {
            Ok(list) => {
                let quotes: Vec<Quote> = list.iter().map(|l| Quote::from_live(l, now)).collect();
                self.cache.set(ALL_STOCKS_KEY, &quotes, self.ttl).await;
                Ok(quotes)
            }
            Err(e) => {
                warn!(error = %e, "upstream unavailable, using fallback stock list");
                let quotes = mock_data::mock_quotes(now);
                self.cache.set(ALL_STOCKS_KEY, &quotes, self.fallback_ttl).await;
                Ok(quotes)
            }
        }
    }

    pub async fn get_stock_details(&self, symbol: &str) -> Result<StockDetails, EngineError> {
        let sym = symbol.trim().to_uppercase();
        let key = details_key(&sym);

        if let Some(d) = self.cache.get::<StockDetails>(&key).await {
            return Ok(d);
        }

        let now = Utc::now().timestamp();
        let equity = match self.fetch_equity(&sym).await {
            Ok(eq) => eq,
            Err(e) => {
                warn!(symbol = %sym, error = %e, "upstream unavailable, using fallback details");
                let details = mock_data::mock_details_for(&sym, now)
                    .ok_or_else(|| EngineError::NotFound(sym.clone()))?;
                self.cache.set(&key, &details, self.fallback_ttl).await;
                return Ok(details);
            }
        };

        // live price is nicer than the equity snapshot, but optional
        let live = match self.fetch_live(&sym).await {
            Ok(l) => Some(l),
            Err(e) => {
                debug!(symbol = %sym, error = %e, "no live data for details");
                None
            }
        };

        let details = merge_details(&sym, equity, live.as_ref(), now);
        self.cache.set(&key, &details, self.ttl).await;
        Ok(details)
    }

    /// Pre-loads the stock list and the given symbols.
    pub async fn warmup(&self, symbols: &[String]) {
        info!(count = symbols.len(), "starting cache warmup");

        if let Err(e) = self.get_all_quotes().await {
            warn!(error = %e, "failed to warm up stock list");
        }

        for sym in symbols {
            if let Err(e) = self.get_quote(sym).await {
                warn!(symbol = %sym, error = %e, "failed to warm up quote");
            }
            if let Err(e) = self.get_stock_details(sym).await {
                debug!(symbol = %sym, error = %e, "failed to warm up details");
            }
        }

        info!("cache warmup completed");
    }

    async fn bounded<T>(
        &self,
        source: &str,
        what: &str,
        call: impl Future<Output = Result<T, EngineError>>,
    ) -> Result<T, EngineError> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(res) => res,
            Err(_) => Err(EngineError::Timeout(format!("{source} {what}"))),
        }
    }

    async fn fetch_live(&self, sym: &str) -> Result<LiveStock, EngineError> {
        let what = format!("live/{sym}");
        match self
            .bounded(self.primary.name(), &what, self.primary.live(sym))
            .await
        {
            Ok(v) => return Ok(v),
            Err(e) => debug!(source = self.primary.name(), error = %e, "primary failed, trying mirror"),
        }
        self.bounded(self.secondary.name(), &what, self.secondary.live(sym))
            .await
    }

    async fn fetch_live_all(&self) -> Result<Vec<LiveStock>, EngineError> {
        match self
            .bounded(self.primary.name(), "live", self.primary.live_all())
            .await
        {
            Ok(v) => return Ok(v),
            Err(e) => debug!(source = self.primary.name(), error = %e, "primary failed, trying mirror"),
        }
        self.bounded(self.secondary.name(), "live", self.secondary.live_all())
            .await
    }

    async fn fetch_equity(&self, sym: &str) -> Result<Equity, EngineError> {
        let what = format!("equities/{sym}");
        match self
            .bounded(self.primary.name(), &what, self.primary.equity(sym))
            .await
        {
            Ok(v) => return Ok(v),
            Err(e) => debug!(source = self.primary.name(), error = %e, "primary failed, trying mirror"),
        }
        self.bounded(self.secondary.name(), &what, self.secondary.equity(sym))
            .await
    }
}

fn merge_details(sym: &str, equity: Equity, live: Option<&LiveStock>, now: i64) -> StockDetails {
    let (price, change, volume) = match live {
        Some(l) => (l.price, l.change, l.volume),
        None => (equity.price, 0.0, 0),
    };

    StockDetails {
        quote: Quote {
            symbol: sym.to_string(),
            name: equity.company.name.clone(),
            current_price: price,
            previous_close: price - change,
            change,
            change_percent: change_percent(price, change),
            volume,
            last_updated: now,
        },
        market_cap: equity.capital,
        shares: equity.shares,
        sector: equity.company.sector.clone(),
        industry: equity.company.industry.clone(),
        dps: equity.dps,
        eps: equity.eps,
        company: equity.company,
    }
}
