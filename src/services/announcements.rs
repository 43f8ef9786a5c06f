//! Dividend and IPO announcements.
//!
//! Alerts of these kinds have no threshold. They fire in waves tied to
//! the announcement's own lifecycle: once when the record is created
//! (`announced`, one-shot for the alert) and once more when its payment
//! or listing date passes (`paid` / `listed`). The second wave also
//! reaches alerts the first wave already triggered.

use chrono::Utc;
use futures_util::{stream, StreamExt};
use tracing::{error, info, warn};

use crate::{
    error::EngineError,
    models::{
        Alert, AlertEvent, AlertKind, CreateDividendRequest, CreateIpoRequest,
        DividendAnnouncement, DividendPhase, DividendStatus, IpoAnnouncement, IpoPhase, IpoStatus,
    },
    services::alert_monitor::{fire, TickReport},
    AppState,
};

pub async fn create_dividend(
    state: &AppState,
    req: CreateDividendRequest,
) -> Result<DividendAnnouncement, EngineError> {
    let dividend = DividendAnnouncement::from_request(req, Utc::now().timestamp());
    state.announcements.create_dividend(&dividend).await?;

    info!(
        dividend_id = %dividend.id,
        symbol = %dividend.stock_symbol,
        amount = dividend.amount,
        "dividend announced"
    );

    let report = dividend_wave(state, &dividend, DividendPhase::Announced).await;
    info!(dividend_id = %dividend.id, reached = report.fired, notified = report.notified, "dividend announcement wave done");

    Ok(dividend)
}

pub async fn create_ipo(
    state: &AppState,
    req: CreateIpoRequest,
) -> Result<IpoAnnouncement, EngineError> {
    let ipo = IpoAnnouncement::from_request(req, Utc::now().timestamp());
    state.announcements.create_ipo(&ipo).await?;

    info!(ipo_id = %ipo.id, symbol = %ipo.symbol, company = %ipo.company_name, "ipo announced");

    let report = ipo_wave(state, &ipo, IpoPhase::Announced).await;
    info!(ipo_id = %ipo.id, reached = report.fired, notified = report.notified, "ipo announcement wave done");

    Ok(ipo)
}

/// Moves dividends whose payment date has passed to `paid` and notifies.
pub async fn sweep_dividends(state: &AppState, now: i64) -> Result<TickReport, EngineError> {
    let upcoming = state.announcements.list_upcoming_dividends().await?;
    let mut report = TickReport::default();

    for mut dividend in upcoming {
        if dividend.status != DividendStatus::Announced || dividend.payment_date > now {
            continue;
        }
        report.evaluated += 1;

        if let Err(e) = state
            .announcements
            .update_dividend_status(dividend.id, DividendStatus::Paid)
            .await
        {
            warn!(dividend_id = %dividend.id, symbol = %dividend.stock_symbol, error = %e, "failed to mark dividend paid");
            report.skipped += 1;
            continue;
        }
        dividend.status = DividendStatus::Paid;

        info!(dividend_id = %dividend.id, symbol = %dividend.stock_symbol, "dividend paid");
        let wave = dividend_wave(state, &dividend, DividendPhase::Paid).await;
        report.fired += wave.fired;
        report.notified += wave.notified;
        report.skipped += wave.skipped;
    }

    Ok(report)
}

/// Moves IPOs whose listing date has passed to `listed` and notifies.
pub async fn sweep_ipos(state: &AppState, now: i64) -> Result<TickReport, EngineError> {
    let upcoming = state.announcements.list_upcoming_ipos().await?;
    let mut report = TickReport::default();

    for mut ipo in upcoming {
        if ipo.status != IpoStatus::Announced || ipo.listing_date > now {
            continue;
        }
        report.evaluated += 1;

        if let Err(e) = state
            .announcements
            .update_ipo_status(ipo.id, IpoStatus::Listed)
            .await
        {
            warn!(ipo_id = %ipo.id, symbol = %ipo.symbol, error = %e, "failed to mark ipo listed");
            report.skipped += 1;
            continue;
        }
        ipo.status = IpoStatus::Listed;

        info!(ipo_id = %ipo.id, symbol = %ipo.symbol, "ipo listed");
        let wave = ipo_wave(state, &ipo, IpoPhase::Listed).await;
        report.fired += wave.fired;
        report.notified += wave.notified;
        report.skipped += wave.skipped;
    }

    Ok(report)
}

async fn dividend_wave(
    state: &AppState,
    dividend: &DividendAnnouncement,
    phase: DividendPhase,
) -> TickReport {
    let first_wave = phase == DividendPhase::Announced;
    let event = AlertEvent::Dividend {
        phase,
        dividend: dividend.clone(),
    };
    notify_wave(
        state,
        AlertKind::DividendAnnouncement,
        &dividend.stock_symbol,
        event,
        first_wave,
    )
    .await
}

async fn ipo_wave(state: &AppState, ipo: &IpoAnnouncement, phase: IpoPhase) -> TickReport {
    let first_wave = phase == IpoPhase::Announced;
    let event = AlertEvent::Ipo {
        phase,
        ipo: ipo.clone(),
    };
    notify_wave(state, AlertKind::Ipo, &ipo.symbol, event, first_wave).await
}

async fn notify_wave(
    state: &AppState,
    kind: AlertKind,
    symbol: &str,
    event: AlertEvent,
    first_wave: bool,
) -> TickReport {
    let listed = if first_wave {
        state.alerts.list_active_by_kind(kind).await
    } else {
        state.alerts.list_notifiable_by_kind(kind).await
    };

    let alerts: Vec<Alert> = match listed {
        Ok(items) => items
            .into_iter()
            .filter(|a| a.matches_symbol(symbol))
            .collect(),
        Err(e) => {
            error!(%kind, error = %e, "failed to load alerts for announcement");
            return TickReport::default();
        }
    };

    let count = alerts.len();
    let limit = state.settings.max_concurrent_evaluations;

    let sent: Vec<bool> = stream::iter(alerts)
        .map(|alert| {
            let state = state.clone();
            let event = event.clone();
            async move { fire(&state, &alert, event, first_wave).await }
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    TickReport {
        evaluated: count,
        fired: count,
        notified: sent.into_iter().filter(|s| *s).count(),
        skipped: 0,
    }
}
