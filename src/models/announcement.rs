use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividendStatus {
    Announced,
    Paid,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpoStatus {
    Announced,
    Listed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendAnnouncement {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub stock_symbol: String,
    pub stock_name: String,
    // "interim" | "final" | "special"
    pub dividend_type: String,
    pub amount: f64,
    pub currency: String,
    pub ex_date: i64,
    pub payment_date: i64,
    pub status: DividendStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDividendRequest {
    pub stock_symbol: String,
    pub stock_name: String,
    pub dividend_type: String,
    pub amount: f64,
    pub currency: String,
    pub ex_date: i64,
    pub payment_date: i64,
}

impl DividendAnnouncement {
    pub fn from_request(req: CreateDividendRequest, now: i64) -> Self {
        Self {
            id: ObjectId::new(),
            stock_symbol: req.stock_symbol.trim().to_uppercase(),
            stock_name: req.stock_name,
            dividend_type: req.dividend_type,
            amount: req.amount,
            currency: req.currency,
            ex_date: req.ex_date,
            payment_date: req.payment_date,
            status: DividendStatus::Announced,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpoAnnouncement {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub company_name: String,
    pub symbol: String,
    pub sector: String,
    pub offer_price: f64,
    pub listing_date: i64,
    pub status: IpoStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIpoRequest {
    pub company_name: String,
    pub symbol: String,
    pub sector: String,
    pub offer_price: f64,
    pub listing_date: i64,
}

impl IpoAnnouncement {
    pub fn from_request(req: CreateIpoRequest, now: i64) -> Self {
        Self {
            id: ObjectId::new(),
            company_name: req.company_name,
            symbol: req.symbol.trim().to_uppercase(),
            sector: req.sector,
            offer_price: req.offer_price,
            listing_date: req.listing_date,
            status: IpoStatus::Announced,
            created_at: now,
            updated_at: now,
        }
    }
}
