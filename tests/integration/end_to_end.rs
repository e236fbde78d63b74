//! End-to-end runs over a mock site and over real HTTP via mockito.

use chrono::{Duration, TimeZone, Utc};
use mockito::{Server, ServerGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

use lotto_dk::config::{EntryConfig, EntryOptions};
use lotto_dk::engine::coordinator::{PollCoordinator, PollSettings};
use lotto_dk::engine::registry::IntegrationRegistry;
use lotto_dk::scrape::fetcher::HttpFetcher;
use lotto_dk::sensors::SensorSet;
use lotto_dk::types::{LotteryKind, LottoError, Subscriptions};

use crate::mock_site::{jackpot_page, MockSite};

fn coordinator(site: &MockSite, subs: Subscriptions) -> PollCoordinator {
    PollCoordinator::new(Arc::new(site.clone()), subs, PollSettings::default()).unwrap()
}

async fn serve_all(server: &mut ServerGuard, amounts: [(LotteryKind, u64); 3]) -> HttpFetcher {
    let mut urls = HashMap::new();
    for (kind, amount) in amounts {
        let path = format!("/{}", kind.unique_id());
        server
            .mock("GET", path.as_str())
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(jackpot_page(amount))
            .create_async()
            .await;
        urls.insert(kind, format!("{}{path}", server.url()));
    }
    HttpFetcher::with_urls(&urls).unwrap()
}

#[tokio::test]
async fn test_http_pipeline_to_sensors() {
    let mut server = Server::new_async().await;
    let fetcher = serve_all(
        &mut server,
        [
            (LotteryKind::EuroJackpot, 517_000_000),
            (LotteryKind::Lotto, 12_300_000),
            (LotteryKind::VikingLotto, 61_000_000),
        ],
    )
    .await;

    let coord = PollCoordinator::new(Arc::new(fetcher), Subscriptions::all(), PollSettings::default()).unwrap();
    let report = coord.run_cycle().await;
    assert!(report.scraped);
    assert_eq!(report.updated.len(), 3);
    assert!(report.failed.is_empty());

    let sensors = SensorSet::from_snapshot("home", &coord.snapshot().await);
    assert_eq!(sensors.jackpot("euro_jackpot").unwrap().state, 517);
    assert_eq!(sensors.jackpot("lotto").unwrap().attributes.price_pool, 12_300_000);
    assert_eq!(sensors.jackpot("viking_lotto").unwrap().state, 61);
    assert_eq!(sensors.scroll.state, "Lotto: 12 mio");
}

#[tokio::test]
async fn test_http_error_leaves_that_lottery_empty() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/lotto")
        .with_status(500)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/euro_jackpot")
        .with_status(200)
        .with_body(jackpot_page(90_000_000))
        .create_async()
        .await;

    let urls = HashMap::from([
        (LotteryKind::EuroJackpot, format!("{}/euro_jackpot", server.url())),
        (LotteryKind::Lotto, format!("{}/lotto", server.url())),
    ]);
    let fetcher = HttpFetcher::with_urls(&urls).unwrap();
    let subs = Subscriptions::only(&[LotteryKind::EuroJackpot, LotteryKind::Lotto]);
    let coord = PollCoordinator::new(Arc::new(fetcher), subs, PollSettings::default()).unwrap();

    let report = coord.run_cycle().await;
    assert_eq!(report.updated, vec![LotteryKind::EuroJackpot]);
    assert_eq!(report.failed, vec![LotteryKind::Lotto]);

    let sensors = SensorSet::from_snapshot("home", &coord.snapshot().await);
    assert_eq!(sensors.jackpot("lotto").unwrap().state, 0);
    assert_eq!(sensors.jackpot("euro_jackpot").unwrap().state, 90);
    assert!(sensors.jackpot("viking_lotto").is_none());
    ok.assert_async().await;
}

#[tokio::test]
async fn test_scrapes_once_per_interval() {
    let site = MockSite::new(100_000_000, 10_000_000, 40_000_000);
    let coord = coordinator(&site, Subscriptions::all());
    let t0 = Utc.with_ymd_and_hms(2026, 3, 6, 18, 0, 0).unwrap();

    assert!(coord.run_cycle_at(t0).await.scraped);
    assert_eq!(site.hits().len(), 3);

    site.set_amount(LotteryKind::Lotto, 15_000_000);
    for minutes in [1, 30, 59] {
        let report = coord.run_cycle_at(t0 + Duration::minutes(minutes)).await;
        assert!(!report.scraped);
    }
    assert_eq!(site.hits().len(), 3);
    assert_eq!(coord.snapshot().await.cache.lotto, 10_000_000);

    let report = coord.run_cycle_at(t0 + Duration::minutes(60)).await;
    assert!(report.scraped);
    assert_eq!(site.hits().len(), 6);
    assert_eq!(coord.snapshot().await.cache.lotto, 15_000_000);
}

#[tokio::test]
async fn test_outage_keeps_last_known_value() {
    let site = MockSite::new(100_000_000, 10_000_000, 40_000_000);
    let coord = coordinator(&site, Subscriptions::all());
    let t0 = Utc.with_ymd_and_hms(2026, 3, 6, 18, 0, 0).unwrap();
    coord.run_cycle_at(t0).await;

    site.break_page(LotteryKind::VikingLotto);
    site.set_amount(LotteryKind::EuroJackpot, 110_000_000);
    let report = coord.run_cycle_at(t0 + Duration::hours(1)).await;
    assert_eq!(report.failed, vec![LotteryKind::VikingLotto]);

    let snap = coord.snapshot().await;
    assert_eq!(snap.cache.viking_lotto, 40_000_000);
    assert_eq!(snap.cache.euro_jackpot, 110_000_000);

    site.repair(LotteryKind::VikingLotto);
    site.set_amount(LotteryKind::VikingLotto, 42_000_000);
    let report = coord.run_cycle_at(t0 + Duration::hours(2)).await;
    assert!(report.failed.is_empty());
    assert_eq!(coord.snapshot().await.cache.viking_lotto, 42_000_000);
}

#[tokio::test]
async fn test_scroll_rotates_over_subscribed_only() {
    let site = MockSite::new(100_000_000, 10_000_000, 40_000_000);
    let coord = coordinator(&site, Subscriptions::only(&[LotteryKind::EuroJackpot, LotteryKind::VikingLotto]));

    let mut shown = Vec::new();
    for _ in 0..4 {
        shown.push(coord.run_cycle().await.display);
    }
    assert_eq!(
        shown,
        vec![
            "Viking lotto: 40 mio",
            "Euro jackpot: 100 mio",
            "Viking lotto: 40 mio",
            "Euro jackpot: 100 mio",
        ]
    );
    assert!(!site.hits().contains(&LotteryKind::Lotto));
}

#[tokio::test]
async fn test_registry_entries_share_nothing() {
    let site = MockSite::new(100_000_000, 10_000_000, 40_000_000);
    let registry = IntegrationRegistry::new(Arc::new(site.clone()), PollSettings::default(), None);

    let home = EntryConfig { id: Some("home".into()), title: None, options: EntryOptions::default() };
    let cabin = EntryConfig {
        id: Some("cabin".into()),
        title: Some("Cabin".into()),
        options: EntryOptions { euro_jackpot: false, viking_lotto: false, ..EntryOptions::default() },
    };
    assert_ok!(registry.setup_entry(&home).await);
    assert_ok!(registry.setup_entry(&cabin).await);

    let cabin_sensors = {
        let inst = registry.get("cabin").await.unwrap();
        SensorSet::from_snapshot(&inst.id, &inst.coordinator().snapshot().await)
    };
    assert_eq!(cabin_sensors.jackpots.len(), 1);
    assert_eq!(cabin_sensors.scroll.state, "Lotto: 10 mio");

    let empty = EntryOptions { euro_jackpot: false, lotto: false, viking_lotto: false, ..EntryOptions::default() };
    let err = assert_err!(registry.update_options("cabin", empty).await);
    assert!(matches!(err, LottoError::MissingSelection));

    assert_ok!(registry.unload_entry("cabin").await);
    assert!(registry.get("cabin").await.is_err());
    assert!(registry.get("home").await.is_ok());

    registry.shutdown().await;
    assert!(registry.list().await.is_empty());
}
