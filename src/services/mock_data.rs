//! Static last-known data served when both upstream paths are down.

use crate::models::{quote::Company, Quote, StockDetails};

pub fn mock_quotes(now: i64) -> Vec<Quote> {
    vec![
        mock_quote("ACCESS", "Access Bank Ghana Plc", 16.37, 16.37, 0, now),
        mock_quote("GCB", "GCB Bank Limited", 4.20, 4.15, 67_000, now),
        mock_quote("MTN", "MTN Ghana", 0.82, 0.80, 125_000, now),
    ]
}

pub fn mock_quote_for(symbol: &str, now: i64) -> Option<Quote> {
    mock_quotes(now)
        .into_iter()
        .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
}

pub fn mock_details_for(symbol: &str, now: i64) -> Option<StockDetails> {
    if !symbol.eq_ignore_ascii_case("MTN") {
        return None;
    }

    let quote = mock_quote_for("MTN", now)?;
    Some(StockDetails {
        quote,
        market_cap: 1_500_000_000.0,
        shares: 1_829_268_293,
        sector: "Telecommunications".to_string(),
        industry: "Mobile Networks".to_string(),
        dps: Some(0.05),
        eps: Some(0.12),
        company: Company {
            address: "Accra, Ghana".to_string(),
            directors: vec!["Selorm Adadevoh".to_string(), "Ebenezer Asante".to_string()],
            email: "info@mtn.com.gh".to_string(),
            facsimile: None,
            industry: "Mobile Networks".to_string(),
            name: "MTN Ghana".to_string(),
            sector: "Telecommunications".to_string(),
            telephone: "+233-244-300-000".to_string(),
            website: "https://www.mtn.com.gh".to_string(),
        },
    })
}

fn mock_quote(symbol: &str, name: &str, price: f64, prev: f64, volume: i64, now: i64) -> Quote {
    let change = price - prev;
    Quote {
        symbol: symbol.to_string(),
        name: name.to_string(),
        current_price: price,
        previous_close: prev,
        change,
        change_percent: if prev > 0.0 { change / prev * 100.0 } else { 0.0 },
        volume,
        last_updated: now,
    }
}
