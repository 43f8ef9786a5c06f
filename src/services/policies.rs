//! Fire/no-fire rules for the tick-evaluated alert kinds.
//!
//! Everything here is pure: the monitor supplies the observed value and
//! persists whatever comes back.

use crate::{
    error::EngineError,
    models::{Alert, AlertEvent, AlertKind, TrackedValues},
};

// yields are quoted to two decimals; absorbs subtraction noise in deltas
const YIELD_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Tracked values to persist, fired or not.
    pub tracked: TrackedValues,
    pub should_fire: bool,
    pub event: Option<AlertEvent>,
}

impl Evaluation {
    fn quiet(tracked: TrackedValues) -> Self {
        Self {
            tracked,
            should_fire: false,
            event: None,
        }
    }

    fn fired(tracked: TrackedValues, event: AlertEvent) -> Self {
        Self {
            tracked,
            should_fire: true,
            event: Some(event),
        }
    }
}

/// Evaluates `alert` against a freshly observed price or yield.
pub fn evaluate(alert: &Alert, observed: f64) -> Result<Evaluation, EngineError> {
    if !observed.is_finite() {
        return Err(EngineError::Decode(format!(
            "non-finite observation for {}",
            alert.stock_symbol
        )));
    }

    match alert.kind {
        AlertKind::PriceThreshold => price_threshold(alert, observed),
        AlertKind::HighDividendYield => high_yield(alert, observed),
        AlertKind::TargetDividendYield => target_yield(alert, observed),
        AlertKind::DividendYieldChange => yield_change(alert, observed),
        AlertKind::DividendAnnouncement | AlertKind::Ipo => {
            Err(EngineError::UnsupportedKind(alert.kind.to_string()))
        }
    }
}

fn required(alert: &Alert, value: Option<f64>, field: &str) -> Result<f64, EngineError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(EngineError::InvalidAlert {
            id: alert.id.to_hex(),
            reason: format!("{field} is required for {} alerts", alert.kind),
        }),
    }
}

fn price_threshold(alert: &Alert, price: f64) -> Result<Evaluation, EngineError> {
    let threshold = required(alert, alert.threshold_price, "threshold_price")?;

    let tracked = TrackedValues {
        current_price: Some(price),
        ..alert.tracked()
    };

    if price >= threshold {
        Ok(Evaluation::fired(
            tracked,
            AlertEvent::PriceThreshold { price, threshold },
        ))
    } else {
        Ok(Evaluation::quiet(tracked))
    }
}

fn high_yield(alert: &Alert, current_yield: f64) -> Result<Evaluation, EngineError> {
    let threshold = required(alert, alert.threshold_yield, "threshold_yield")?;

    let tracked = TrackedValues {
        current_yield: Some(current_yield),
        ..alert.tracked()
    };

    if current_yield >= threshold {
        Ok(Evaluation::fired(
            tracked,
            AlertEvent::HighDividendYield {
                current_yield,
                threshold,
            },
        ))
    } else {
        Ok(Evaluation::quiet(tracked))
    }
}

fn target_yield(alert: &Alert, current_yield: f64) -> Result<Evaluation, EngineError> {
    let target = required(alert, alert.target_yield, "target_yield")?;

    let tracked = TrackedValues {
        current_yield: Some(current_yield),
        ..alert.tracked()
    };

    if current_yield >= target {
        Ok(Evaluation::fired(
            tracked,
            AlertEvent::TargetDividendYield {
                current_yield,
                target,
            },
        ))
    } else {
        Ok(Evaluation::quiet(tracked))
    }
}

/// Measures drift from `last_yield`, which only moves on the first
/// observation and whenever the alert fires.
fn yield_change(alert: &Alert, current_yield: f64) -> Result<Evaluation, EngineError> {
    let threshold = required(alert, alert.yield_change_threshold, "yield_change_threshold")?;

    let Some(previous_yield) = alert.last_yield else {
        // first observation only sets the baseline
        return Ok(Evaluation::quiet(TrackedValues {
            current_yield: Some(current_yield),
            last_yield: Some(current_yield),
            ..alert.tracked()
        }));
    };

    let delta = (current_yield - previous_yield).abs();
    if delta + YIELD_EPSILON >= threshold {
        Ok(Evaluation::fired(
            TrackedValues {
                current_yield: Some(current_yield),
                last_yield: Some(current_yield),
                ..alert.tracked()
            },
            AlertEvent::DividendYieldChange {
                previous_yield,
                current_yield,
                threshold,
            },
        ))
    } else {
        Ok(Evaluation::quiet(TrackedValues {
            current_yield: Some(current_yield),
            ..alert.tracked()
        }))
    }
}
