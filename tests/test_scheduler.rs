//! Scrape scheduler tests: one scrape at a time, full then incremental, events.

mod common;

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::{cooptimus_xml, param, FakeFetcher};
use coop_games::config;
use coop_games::frontend::EventBus;
use coop_games::scheduler::{scrape_into, SchedulerOptions, ScrapeScheduler};
use coop_games::scraper::Scraper;
use coop_games::{Catalog, CoopGamesError};
use serde_json::{json, Value};

fn one_game_fetcher() -> FakeFetcher {
    FakeFetcher::new(|url, params| {
        if url == config::COOPTIMUS_GAMES_URL {
            return Ok(cooptimus_xml(&[("Portal 2", "620", "2", "", "2")]));
        }
        if url == config::STEAM_APP_DETAILS_URL {
            if param(params, "cc").is_some() {
                return Ok(
                    r#"{"620": {"success": true, "data": {"price_overview": {"initial": 1999, "final": 999}}}}"#
                        .to_string(),
                );
            }
            return Ok(r#"{"620": {"success": true, "data": {
                "header_image": "h.jpg", "short_description": "Portals",
                "release_date": {"coming_soon": false, "date": "18 Apr, 2011"}}}}"#
                .to_string());
        }
        if url.starts_with(config::STEAM_REVIEWS_URL) {
            return Ok(r#"{"query_summary": {"total_reviews": 10, "total_positive": 9}}"#.to_string());
        }
        Ok(r#"{"tags": {"Puzzle": 1}}"#.to_string())
    })
}

fn scraper(fetcher: impl coop_games::scraper::HttpFetch + 'static) -> Scraper {
    Scraper::new(Box::new(fetcher), vec!["SE".to_string()])
        .steam_delay(Duration::ZERO)
        .years(2020, 2020)
}

fn fast_options() -> SchedulerOptions {
    SchedulerOptions {
        interval_hours: 12.0,
        tick: Duration::from_millis(10),
        error_backoff: Duration::from_millis(10),
    }
}

fn scheduler_with(catalog: Catalog, fetcher: FakeFetcher, bus: EventBus) -> ScrapeScheduler {
    ScrapeScheduler::new(
        Arc::new(Mutex::new(catalog)),
        scraper(fetcher),
        fast_options(),
        bus,
    )
    .unwrap()
}

/// Collect every payload published for `event`.
fn record(bus: &EventBus, event: &str) -> Arc<Mutex<Vec<Value>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe(event, move |v| sink.lock().unwrap().push(v.clone()));
    seen
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[test]
fn idle_status() {
    let scheduler = scheduler_with(common::setup_catalog(), one_game_fetcher(), EventBus::new());
    let status = scheduler.status();

    assert!(!status.scraping_in_progress);
    assert_eq!(status.scraping_state, "None");
    assert_eq!(status.scrape_interval_hours, 12.0);
    assert!(status.last_scrape_hours_ago < 0.01);
    // Populated catalogue: the first scrape waits for the interval
    assert!(!scheduler.is_due());
}

#[test]
fn empty_catalog_is_due_immediately() {
    let scheduler = scheduler_with(common::empty_catalog(), one_game_fetcher(), EventBus::new());
    assert!(scheduler.is_due());
}

// ---------------------------------------------------------------------------
// Scraping
// ---------------------------------------------------------------------------

#[test]
fn scrape_now_stores_games_and_prices() {
    let catalog = Arc::new(Mutex::new(common::empty_catalog()));
    let scheduler = ScrapeScheduler::new(
        Arc::clone(&catalog),
        scraper(one_game_fetcher()),
        fast_options(),
        EventBus::new(),
    )
    .unwrap();

    let outcome = scheduler.scrape_now().unwrap();
    assert_eq!(outcome.new_games, 1);
    assert_eq!(outcome.total_games, 1);
    assert!(!scheduler.is_due());
    assert!(!scheduler.is_scraping());

    let catalog = catalog.lock().unwrap();
    let game = catalog.games().get("620", "SE").unwrap().unwrap();
    assert_eq!(game.title, "Portal 2");
    assert_eq!(game.number_of_reviews, 10);
    assert_eq!(game.price.unwrap().r#final, 999);
}

#[test]
fn first_scrape_is_full_then_incremental() {
    let bus = EventBus::new();
    let started = record(&bus, "scrape:started");
    let finished = record(&bus, "scrape:finished");

    let fetcher = Arc::new(one_game_fetcher());
    let scheduler = ScrapeScheduler::new(
        Arc::new(Mutex::new(common::empty_catalog())),
        scraper(Arc::clone(&fetcher)),
        fast_options(),
        bus,
    )
    .unwrap();

    scheduler.scrape_now().unwrap();
    let after_full = fetcher.requests_to(config::COOPTIMUS_GAMES_URL).len();
    assert_eq!(after_full, 1);

    let second = scheduler.scrape_now().unwrap();
    assert_eq!(second.new_games, 0);
    assert_eq!(
        fetcher.requests_to(config::COOPTIMUS_GAMES_URL).len() - after_full,
        12
    );

    assert_eq!(
        *started.lock().unwrap(),
        vec![json!({ "full": true }), json!({ "full": false })]
    );
    assert_eq!(
        finished.lock().unwrap()[1],
        json!({ "total_games": 1, "new_games": 0 })
    );
}

#[test]
fn failed_scrape_publishes_and_releases() {
    let bus = EventBus::new();
    let failed = record(&bus, "scrape:failed");
    let fetcher = FakeFetcher::new(|url, _| {
        Err(CoopGamesError::RetriesExhausted {
            url: url.to_string(),
            attempts: 15,
        })
    });
    let scheduler = scheduler_with(common::empty_catalog(), fetcher, bus);

    assert!(scheduler.scrape_now().is_err());
    assert!(!scheduler.is_scraping());
    assert_eq!(scheduler.status().scraping_state, "None");
    assert_eq!(failed.lock().unwrap().len(), 1);
    // Still due: nothing was scraped
    assert!(scheduler.is_due());
}

#[test]
fn only_one_scrape_at_a_time() {
    let (release, gate) = mpsc::channel::<()>();
    let gate = Mutex::new(gate);
    let fetcher = FakeFetcher::new(move |url, _| {
        if url == config::COOPTIMUS_GAMES_URL {
            let _ = gate.lock().unwrap().recv_timeout(Duration::from_secs(10));
        }
        Ok(cooptimus_xml(&[]))
    });
    let scheduler = scheduler_with(common::empty_catalog(), fetcher, EventBus::new());

    scheduler.manual_scrape().unwrap();
    assert!(scheduler.is_scraping());
    assert!(scheduler.status().scraping_in_progress);
    assert!(matches!(
        scheduler.manual_scrape(),
        Err(CoopGamesError::AlreadyRunning)
    ));
    assert!(matches!(
        scheduler.scrape_now(),
        Err(CoopGamesError::AlreadyRunning)
    ));
    assert!(!scheduler.is_due());

    release.send(()).unwrap();
    assert!(wait_until(Duration::from_secs(10), || !scheduler.is_scraping()));
    scheduler.manual_scrape().unwrap();
}

#[test]
fn continuous_loop_scrapes_an_empty_catalog_right_away() {
    let bus = EventBus::new();
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    bus.subscribe("scrape:finished", move |v| {
        let _ = tx.lock().unwrap().send(v.clone());
    });

    let scheduler = scheduler_with(common::empty_catalog(), one_game_fetcher(), bus);
    scheduler.start_continuous().unwrap();
    // A second start is a no-op while the loop runs
    scheduler.start_continuous().unwrap();

    let finished = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(finished["total_games"], 1);
    scheduler.stop();

    assert!(!scheduler.is_due());
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn stop_interrupts_a_waiting_loop() {
    let fetcher = Arc::new(one_game_fetcher());
    let scheduler = ScrapeScheduler::new(
        Arc::new(Mutex::new(common::setup_catalog())),
        scraper(Arc::clone(&fetcher)),
        SchedulerOptions {
            interval_hours: 12.0,
            tick: Duration::from_secs(60),
            error_backoff: Duration::from_secs(60),
        },
        EventBus::new(),
    )
    .unwrap();
    assert!(!scheduler.is_continuous_running());

    scheduler.start_continuous().unwrap();
    assert!(scheduler.is_continuous_running());

    let stopped_at = Instant::now();
    scheduler.stop();
    assert!(wait_until(Duration::from_secs(2), || !scheduler.is_continuous_running()));
    assert!(stopped_at.elapsed() < Duration::from_secs(2));
    // Populated catalogue: nothing was due, nothing was fetched
    assert!(fetcher.requests_to(config::COOPTIMUS_GAMES_URL).is_empty());

    // The loop can be started again after a stop
    scheduler.start_continuous().unwrap();
    assert!(scheduler.is_continuous_running());
    scheduler.stop();
    assert!(wait_until(Duration::from_secs(2), || !scheduler.is_continuous_running()));
}

#[test]
fn scrape_into_keeps_existing_games() {
    let catalog = Mutex::new(common::setup_catalog());
    let scraper = scraper(one_game_fetcher());

    let outcome = scrape_into(&catalog, &scraper, false).unwrap();
    assert_eq!(outcome.new_games, 1);
    assert_eq!(outcome.total_games, 7);

    // Every stored game was priced again; the fake only knows 620
    let data = catalog.lock().unwrap().games().country_data().unwrap();
    assert!(data["100"].delisted.contains("SE"));
    assert!(data["100"].prices.is_empty());
}
