use std::fmt;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PriceThreshold,
    #[serde(rename = "dividend_announcement")]
    DividendAnnouncement,
    #[serde(rename = "ipo_alert")]
    Ipo,
    HighDividendYield,
    DividendYieldChange,
    TargetDividendYield,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceThreshold => "price_threshold",
            Self::DividendAnnouncement => "dividend_announcement",
            Self::Ipo => "ipo_alert",
            Self::HighDividendYield => "high_dividend_yield",
            Self::DividendYieldChange => "dividend_yield_change",
            Self::TargetDividendYield => "target_dividend_yield",
        }
    }

    /// One-shot kinds go to `triggered` when they fire and are never
    /// evaluated again. Yield-change alerts re-arm on a new baseline.
    pub fn is_one_shot(&self) -> bool {
        !matches!(self, Self::DividendYieldChange)
    }

    pub const YIELD_KINDS: [AlertKind; 3] = [
        Self::HighDividendYield,
        Self::TargetDividendYield,
        Self::DividendYieldChange,
    ];
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Triggered,
    Paused,
    Deleted,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Triggered => "triggered",
            Self::Paused => "paused",
            Self::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,

    // empty symbol = any instrument (announcement kinds only)
    #[serde(default)]
    pub stock_symbol: String,
    #[serde(default)]
    pub stock_name: String,

    #[serde(rename = "alert_type")]
    pub kind: AlertKind,
    pub status: AlertStatus,

    // user parameters
    #[serde(default)]
    pub threshold_price: Option<f64>,
    #[serde(default)]
    pub threshold_yield: Option<f64>,
    #[serde(default)]
    pub target_yield: Option<f64>,
    #[serde(default)]
    pub yield_change_threshold: Option<f64>,

    // tracked by the engine
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub current_yield: Option<f64>,
    #[serde(default)]
    pub last_yield: Option<f64>,

    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub triggered_at: Option<i64>,
}

impl Alert {
    pub fn new(user_id: ObjectId, symbol: &str, kind: AlertKind) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: ObjectId::new(),
            user_id,
            stock_symbol: symbol.to_uppercase(),
            stock_name: String::new(),
            kind,
            status: AlertStatus::Active,
            threshold_price: None,
            threshold_yield: None,
            target_yield: None,
            yield_change_threshold: None,
            current_price: None,
            current_yield: None,
            last_yield: None,
            created_at: now,
            updated_at: now,
            triggered_at: None,
        }
    }

    /// Snapshot of the engine-owned fields.
    pub fn tracked(&self) -> TrackedValues {
        TrackedValues {
            current_price: self.current_price,
            current_yield: self.current_yield,
            last_yield: self.last_yield,
        }
    }

    pub fn apply_tracked(&mut self, tracked: TrackedValues) {
        self.current_price = tracked.current_price;
        self.current_yield = tracked.current_yield;
        self.last_yield = tracked.last_yield;
    }

    /// Announcement alerts with no symbol follow every instrument.
    pub fn matches_symbol(&self, symbol: &str) -> bool {
        let own = self.stock_symbol.trim();
        own.is_empty() || own.eq_ignore_ascii_case(symbol.trim())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackedValues {
    pub current_price: Option<f64>,
    pub current_yield: Option<f64>,
    pub last_yield: Option<f64>,
}
