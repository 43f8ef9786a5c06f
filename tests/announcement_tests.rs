mod common;

use chrono::Utc;
use common::{Harness, HarnessBuilder, RecordingSender};
use sharesalert::{
    models::{
        AlertEvent, AlertKind, AlertStatus, CreateDividendRequest, CreateIpoRequest,
        DividendPhase, DividendStatus, IpoPhase, IpoStatus,
    },
    services::{
        alert_monitor::{run_tick, AlertFamily},
        announcements::{create_dividend, create_ipo, sweep_dividends, sweep_ipos},
    },
};

const DAY: i64 = 86_400;

fn dividend_request(symbol: &str, payment_date: i64) -> CreateDividendRequest {
    CreateDividendRequest {
        stock_symbol: symbol.to_string(),
        stock_name: format!("{symbol} Plc"),
        dividend_type: "final".to_string(),
        amount: 0.25,
        currency: "GHS".to_string(),
        ex_date: payment_date - 7 * DAY,
        payment_date,
    }
}

fn ipo_request(symbol: &str, listing_date: i64) -> CreateIpoRequest {
    CreateIpoRequest {
        company_name: "Asante Gold Corporation".to_string(),
        symbol: symbol.to_string(),
        sector: "Mining".to_string(),
        offer_price: 6.50,
        listing_date,
    }
}

#[tokio::test]
async fn announcing_a_dividend_notifies_matching_alerts() {
    let h = Harness::new().await;
    let on_symbol = h.add_alert("GCB", AlertKind::DividendAnnouncement, |_| {}).await;
    let any_symbol = h.add_alert("", AlertKind::DividendAnnouncement, |_| {}).await;
    let other = h.add_alert("MTN", AlertKind::DividendAnnouncement, |_| {}).await;

    let dividend = create_dividend(&h.state, dividend_request("gcb", Utc::now().timestamp() + 30 * DAY))
        .await
        .unwrap();
    assert_eq!(dividend.stock_symbol, "GCB");
    assert_eq!(dividend.status, DividendStatus::Announced);
    assert!(h.announcements.dividend(dividend.id).await.is_some());

    assert_eq!(h.sender.attempts_for(on_symbol.id), 1);
    assert_eq!(h.sender.attempts_for(any_symbol.id), 1);
    assert_eq!(h.sender.attempts_for(other.id), 0);

    assert_eq!(h.alerts.get(on_symbol.id).await.unwrap().status, AlertStatus::Triggered);
    assert_eq!(h.alerts.get(any_symbol.id).await.unwrap().status, AlertStatus::Triggered);
    assert_eq!(h.alerts.get(other.id).await.unwrap().status, AlertStatus::Active);

    assert!(matches!(
        h.sender.sent()[0].event,
        AlertEvent::Dividend { phase: DividendPhase::Announced, .. }
    ));
}

#[tokio::test]
async fn payment_sweep_reaches_already_triggered_alerts() {
    let h = Harness::new().await;
    let subscribed = h.add_alert("GCB", AlertKind::DividendAnnouncement, |_| {}).await;
    let paused = h.add_alert("GCB", AlertKind::DividendAnnouncement, |_| {}).await;

    let now = Utc::now().timestamp();
    let dividend = create_dividend(&h.state, dividend_request("GCB", now + DAY))
        .await
        .unwrap();
    h.alerts.set_status(paused.id, AlertStatus::Paused).await;

    // not due yet
    let report = sweep_dividends(&h.state, now).await.unwrap();
    assert_eq!(report.evaluated, 0);

    let report = sweep_dividends(&h.state, now + 2 * DAY).await.unwrap();
    assert_eq!(report.evaluated, 1);
    assert_eq!(report.fired, 1);

    let stored = h.announcements.dividend(dividend.id).await.unwrap();
    assert_eq!(stored.status, DividendStatus::Paid);

    assert_eq!(h.sender.attempts_for(subscribed.id), 2);
    // paused after the first wave, so only that one
    assert_eq!(h.sender.attempts_for(paused.id), 1);

    let last = h.sender.sent().pop().unwrap();
    assert!(matches!(
        last.event,
        AlertEvent::Dividend { phase: DividendPhase::Paid, .. }
    ));

    // paid dividends are not swept again
    let report = sweep_dividends(&h.state, now + 3 * DAY).await.unwrap();
    assert_eq!(report.evaluated, 0);
    assert_eq!(h.sender.attempts_for(subscribed.id), 2);
}

#[tokio::test]
async fn cancelled_dividend_is_never_swept() {
    let h = Harness::new().await;
    let alert = h.add_alert("", AlertKind::DividendAnnouncement, |_| {}).await;

    let dividend = create_dividend(&h.state, dividend_request("SCB", Utc::now().timestamp() - DAY))
        .await
        .unwrap();
    h.state
        .announcements
        .update_dividend_status(dividend.id, DividendStatus::Cancelled)
        .await
        .unwrap();

    let report = run_tick(&h.state, AlertFamily::Dividend).await.unwrap();
    assert_eq!(report.evaluated, 0);
    assert_eq!(h.sender.attempts_for(alert.id), 1);
    assert_eq!(
        h.announcements.dividend(dividend.id).await.unwrap().status,
        DividendStatus::Cancelled
    );
}

#[tokio::test]
async fn dividend_alerts_ignore_other_kinds_of_announcement() {
    let h = Harness::new().await;
    let ipo_alert = h.add_alert("", AlertKind::Ipo, |_| {}).await;
    let price_alert = h
        .add_alert("GCB", AlertKind::PriceThreshold, |a| {
            a.threshold_price = Some(1.0);
        })
        .await;

    create_dividend(&h.state, dividend_request("GCB", Utc::now().timestamp() + DAY))
        .await
        .unwrap();

    assert_eq!(h.sender.attempts(), 0);
    assert_eq!(h.alerts.get(ipo_alert.id).await.unwrap().status, AlertStatus::Active);
    assert_eq!(h.alerts.get(price_alert.id).await.unwrap().status, AlertStatus::Active);
}

#[tokio::test]
async fn ipo_is_announced_then_listed() {
    let h = Harness::new().await;
    let alert = h.add_alert("", AlertKind::Ipo, |_| {}).await;
    let elsewhere = h.add_alert("MTN", AlertKind::Ipo, |_| {}).await;

    let now = Utc::now().timestamp();
    let ipo = create_ipo(&h.state, ipo_request("asg", now + 10 * DAY))
        .await
        .unwrap();
    assert_eq!(ipo.symbol, "ASG");
    assert_eq!(ipo.status, IpoStatus::Announced);

    assert_eq!(h.sender.attempts_for(alert.id), 1);
    assert_eq!(h.sender.attempts_for(elsewhere.id), 0);
    assert_eq!(h.alerts.get(alert.id).await.unwrap().status, AlertStatus::Triggered);

    let report = sweep_ipos(&h.state, now + 10 * DAY).await.unwrap();
    assert_eq!(report.fired, 1);
    assert_eq!(h.announcements.ipo(ipo.id).await.unwrap().status, IpoStatus::Listed);
    assert_eq!(h.sender.attempts_for(alert.id), 2);

    let last = h.sender.sent().pop().unwrap();
    assert!(matches!(
        last.event,
        AlertEvent::Ipo { phase: IpoPhase::Listed, ref ipo } if ipo.symbol == "ASG"
    ));
}

#[tokio::test]
async fn announcement_with_no_subscribers_is_still_recorded() {
    let h = Harness::new().await;

    let ipo = create_ipo(&h.state, ipo_request("NEW", Utc::now().timestamp() - DAY))
        .await
        .unwrap();
    assert_eq!(h.sender.attempts(), 0);

    let report = run_tick(&h.state, AlertFamily::Ipo).await.unwrap();
    assert_eq!(report.evaluated, 1);
    assert_eq!(report.fired, 0);
    assert_eq!(h.announcements.ipo(ipo.id).await.unwrap().status, IpoStatus::Listed);
}

#[tokio::test]
async fn wave_counts_only_delivered_notifications() {
    let h = HarnessBuilder::new()
        .sender(RecordingSender::failing())
        .build()
        .await;
    let alert = h.add_alert("GCB", AlertKind::DividendAnnouncement, |_| {}).await;

    let now = Utc::now().timestamp();
    create_dividend(&h.state, dividend_request("GCB", now - DAY))
        .await
        .unwrap();

    let report = sweep_dividends(&h.state, now).await.unwrap();
    assert_eq!(report.evaluated, 1);
    assert_eq!(report.fired, 1);
    assert_eq!(report.notified, 0);
    assert_eq!(h.sender.attempts_for(alert.id), 2);
}

#[tokio::test]
async fn wave_does_not_count_owners_who_opted_out() {
    let h = Harness::new().await;
    h.disable_notifications().await;
    h.add_alert("", AlertKind::Ipo, |_| {}).await;

    let now = Utc::now().timestamp();
    create_ipo(&h.state, ipo_request("ASG", now - DAY)).await.unwrap();

    let report = sweep_ipos(&h.state, now).await.unwrap();
    assert_eq!(report.fired, 1);
    assert_eq!(report.notified, 0);
    assert_eq!(h.sender.attempts(), 0);
}
