use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{Alert, DividendAnnouncement, IpoAnnouncement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividendPhase {
    Announced,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpoPhase {
    Announced,
    Listed,
}

/// What happened, with the data the mailer needs to describe it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AlertEvent {
    PriceThreshold {
        price: f64,
        threshold: f64,
    },
    HighDividendYield {
        current_yield: f64,
        threshold: f64,
    },
    TargetDividendYield {
        current_yield: f64,
        target: f64,
    },
    DividendYieldChange {
        previous_yield: f64,
        current_yield: f64,
        threshold: f64,
    },
    Dividend {
        phase: DividendPhase,
        dividend: DividendAnnouncement,
    },
    Ipo {
        phase: IpoPhase,
        ipo: IpoAnnouncement,
    },
}

impl AlertEvent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PriceThreshold { .. } => "price_threshold",
            Self::HighDividendYield { .. } => "high_dividend_yield",
            Self::TargetDividendYield { .. } => "target_dividend_yield",
            Self::DividendYieldChange { .. } => "dividend_yield_change",
            Self::Dividend { phase: DividendPhase::Announced, .. } => "dividend_announced",
            Self::Dividend { phase: DividendPhase::Paid, .. } => "dividend_paid",
            Self::Ipo { phase: IpoPhase::Announced, .. } => "ipo_announced",
            Self::Ipo { phase: IpoPhase::Listed, .. } => "ipo_listed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub recipient_user_id: ObjectId,
    pub recipient_email: String,
    pub recipient_name: String,
    pub alert: Alert,
    pub event: AlertEvent,
    pub created_at: i64,
}
