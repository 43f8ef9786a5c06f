use serde::{Deserialize, Serialize};

/// `/live` payload from the exchange API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveStock {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub volume: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Company {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub facsimile: Option<String>,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub telephone: String,
    #[serde(default)]
    pub website: String,
}

/// `/equities/{symbol}` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equity {
    #[serde(default)]
    pub capital: f64,
    #[serde(default)]
    pub company: Company,
    #[serde(default)]
    pub dps: Option<f64>,
    #[serde(default)]
    pub eps: Option<f64>,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub shares: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: i64,
    pub last_updated: i64,
}

impl Quote {
    pub fn from_live(live: &LiveStock, now: i64) -> Self {
        let previous_close = live.price - live.change;
        Self {
            symbol: live.name.to_uppercase(),
            name: live.name.clone(),
            current_price: live.price,
            previous_close,
            change: live.change,
            change_percent: change_percent(live.price, live.change),
            volume: live.volume,
            last_updated: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockDetails {
    pub quote: Quote,
    pub market_cap: f64,
    pub shares: i64,
    pub sector: String,
    pub industry: String,
    pub dps: Option<f64>,
    pub eps: Option<f64>,
    pub company: Company,
}

/// One row of the dividend-yield table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendStock {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub dividend_yield: f64,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub sector: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendYieldData {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub stocks: Vec<DividendStock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendYieldResponse {
    pub success: bool,
    pub data: DividendYieldData,
}

pub fn change_percent(price: f64, change: f64) -> f64 {
    if price <= 0.0 {
        return 0.0;
    }
    let previous_close = price - change;
    if previous_close > 0.0 {
        change / previous_close * 100.0
    } else {
        0.0
    }
}
