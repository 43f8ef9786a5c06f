use std::{collections::HashMap, fmt, time::Duration};

use chrono::Utc;
use futures_util::{stream, StreamExt};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    error::EngineError,
    models::{Alert, AlertEvent, AlertKind},
    services::{announcements, dividend_yields::lookup_yield, notifier::NotifyOutcome, policies},
    AppState,
};

const MIN_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertFamily {
    Price,
    Yield,
    Dividend,
    Ipo,
}

impl AlertFamily {
    pub const ALL: [AlertFamily; 4] = [Self::Price, Self::Yield, Self::Dividend, Self::Ipo];

    pub fn period(&self, state: &AppState) -> Duration {
        let s = &state.settings;
        match self {
            Self::Price => s.price_check_interval,
            Self::Yield => s.yield_check_interval,
            Self::Dividend => s.dividend_sweep_interval,
            Self::Ipo => s.ipo_sweep_interval,
        }
    }
}

impl fmt::Display for AlertFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Price => "price",
            Self::Yield => "yield",
            Self::Dividend => "dividend",
            Self::Ipo => "ipo",
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub evaluated: usize,
    /// Alerts whose condition held (or that an announcement reached).
    pub fired: usize,
    /// Fired alerts whose notification was actually handed off.
    pub notified: usize,
    pub skipped: usize,
}

impl TickReport {
    fn add(mut self, other: TickReport) -> Self {
        self.evaluated += other.evaluated;
        self.fired += other.fired;
        self.notified += other.notified;
        self.skipped += other.skipped;
        self
    }

    fn skipped(n: usize) -> Self {
        Self {
            skipped: n,
            ..Self::default()
        }
    }
}

/// Spawns one monitor per alert family. Flip `shutdown` to `true` (or
/// drop the sender) to stop them; a tick in progress runs to completion.
pub fn spawn_monitors(state: AppState, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
    AlertFamily::ALL
        .iter()
        .map(|&family| spawn_monitor(state.clone(), family, shutdown.clone()))
        .collect()
}

pub fn spawn_monitor(
    state: AppState,
    family: AlertFamily,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let mut period = family.period(&state);
    if period < MIN_PERIOD {
        warn!(%family, period_ms = period.as_millis() as u64, "monitor period too short, clamping");
        period = MIN_PERIOD;
    }

    tokio::spawn(async move {
        let mut interval = time::interval(period);
        // a slow tick pushes the next one back instead of bunching them up
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(%family, period_secs = period.as_secs(), "alert monitor started");

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match run_tick(&state, family).await {
                Ok(report) => debug!(
                    %family,
                    evaluated = report.evaluated,
                    fired = report.fired,
                    notified = report.notified,
                    skipped = report.skipped,
                    "tick finished"
                ),
                Err(e) if e.is_transient() => {
                    warn!(%family, error = %e, "tick failed, retrying next interval")
                }
                Err(e) => error!(%family, error = %e, "tick error"),
            }
        }

        info!(%family, "alert monitor stopped");
    })
}

pub async fn run_tick(state: &AppState, family: AlertFamily) -> Result<TickReport, EngineError> {
    match family {
        AlertFamily::Price => run_price_tick(state).await,
        AlertFamily::Yield => run_yield_tick(state).await,
        AlertFamily::Dividend => {
            announcements::sweep_dividends(state, Utc::now().timestamp()).await
        }
        AlertFamily::Ipo => announcements::sweep_ipos(state, Utc::now().timestamp()).await,
    }
}

pub async fn run_price_tick(state: &AppState) -> Result<TickReport, EngineError> {
    let alerts = state
        .alerts
        .list_active_by_kind(AlertKind::PriceThreshold)
        .await?;

    // one quote request per symbol per tick
    let mut by_symbol: HashMap<String, Vec<Alert>> = HashMap::new();
    for a in alerts {
        by_symbol
            .entry(a.stock_symbol.to_uppercase())
            .or_default()
            .push(a);
    }

    if by_symbol.is_empty() {
        return Ok(TickReport::default());
    }

    let limit = state.settings.max_concurrent_evaluations;
    let reports: Vec<TickReport> = stream::iter(by_symbol)
        .map(|(sym, group)| {
            let state = state.clone();
            async move { price_group(&state, sym, group).await }
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    Ok(reports.into_iter().fold(TickReport::default(), TickReport::add))
}

async fn price_group(state: &AppState, sym: String, group: Vec<Alert>) -> TickReport {
    let quote = match state.quotes.get_quote(&sym).await {
        Ok(q) => q,
        Err(e) => {
            warn!(symbol = %sym, error = %e, alerts = group.len(), "no quote, skipping symbol this tick");
            return TickReport::skipped(group.len());
        }
    };

    let price = quote.current_price;
    if !price.is_finite() || price <= 0.0 {
        warn!(symbol = %sym, price, "unusable price, skipping symbol this tick");
        return TickReport::skipped(group.len());
    }

    let mut report = TickReport::default();
    for alert in group {
        report = report.add(evaluate_alert(state, alert, price).await);
    }
    report
}

pub async fn run_yield_tick(state: &AppState) -> Result<TickReport, EngineError> {
    let mut alerts: Vec<Alert> = Vec::new();
    for kind in AlertKind::YIELD_KINDS {
        match state.alerts.list_active_by_kind(kind).await {
            Ok(mut items) => alerts.append(&mut items),
            Err(e) => warn!(%kind, error = %e, "failed to list alerts"),
        }
    }

    if alerts.is_empty() {
        return Ok(TickReport::default());
    }

    let table = state.yields.get_yield_table().await?;

    let limit = state.settings.max_concurrent_evaluations;
    let reports: Vec<TickReport> = stream::iter(alerts)
        .map(|alert| {
            let state = state.clone();
            let observed = lookup_yield(&table, &alert.stock_symbol);
            async move {
                match observed {
                    Ok(y) => evaluate_alert(&state, alert, y).await,
                    Err(e) => {
                        warn!(alert_id = %alert.id, symbol = %alert.stock_symbol, error = %e, "no yield, skipping alert");
                        TickReport::skipped(1)
                    }
                }
            }
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    Ok(reports.into_iter().fold(TickReport::default(), TickReport::add))
}

/// Runs the policy, persists tracked values, and fires if needed.
pub async fn evaluate_alert(state: &AppState, mut alert: Alert, observed: f64) -> TickReport {
    let evaluation = match policies::evaluate(&alert, observed) {
        Ok(ev) => ev,
        Err(e) if e.is_transient() => {
            debug!(alert_id = %alert.id, error = %e, "bad observation, skipping alert this tick");
            return TickReport::skipped(1);
        }
        Err(e) => {
            warn!(alert_id = %alert.id, kind = %alert.kind, error = %e, "cannot evaluate alert, skipping");
            return TickReport::skipped(1);
        }
    };

    alert.apply_tracked(evaluation.tracked);
    if let Err(e) = state.alerts.update_tracked_fields(&alert).await {
        // nothing changed in the store, so the next tick retries from scratch
        warn!(alert_id = %alert.id, error = %e, "failed to persist tracked values, skipping");
        return TickReport::skipped(1);
    }

    let (fired, notified) = match evaluation.event {
        Some(event) if evaluation.should_fire => {
            info!(
                alert_id = %alert.id,
                symbol = %alert.stock_symbol,
                kind = %alert.kind,
                observed,
                "alert fired"
            );
            let sent = fire(state, &alert, event, alert.kind.is_one_shot()).await;
            (1, usize::from(sent))
        }
        _ => (0, 0),
    };

    TickReport {
        evaluated: 1,
        fired,
        notified,
        skipped: 0,
    }
}

/// One notification attempt, then (optionally) the triggered transition.
/// The transition does not depend on the send succeeding. Returns true
/// when the notification was handed to the sender.
pub(crate) async fn fire(
    state: &AppState,
    alert: &Alert,
    event: AlertEvent,
    mark_triggered: bool,
) -> bool {
    let sent = match state.notifier.notify(alert, event).await {
        Ok(outcome) => outcome == NotifyOutcome::Sent,
        Err(e) => {
            warn!(alert_id = %alert.id, user_id = %alert.user_id, error = %e, "could not notify alert owner");
            false
        }
    };

    if mark_triggered {
        match state.alerts.mark_triggered(alert.id).await {
            Ok(true) => {}
            Ok(false) => debug!(alert_id = %alert.id, "alert was no longer active"),
            Err(e) => warn!(alert_id = %alert.id, error = %e, "failed to mark alert triggered"),
        }
    }

    sent
}
