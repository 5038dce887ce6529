//! HTTP API tests, driving the router in-process with `tower::ServiceExt`.

#![cfg(feature = "server")]

mod common;

use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::{cooptimus_xml, FakeFetcher};
use coop_games::config;
use coop_games::frontend::{EventBus, ShellVariant};
use coop_games::scheduler::{SchedulerOptions, ScrapeScheduler};
use coop_games::scraper::Scraper;
use coop_games::server::{self, AppState};
use coop_games::{AsyncCatalog, Catalog, CoopGamesError};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const INDEX: &str = r#"<!DOCTYPE html><html><body><div id="app"></div></body></html>"#;

struct TestApp {
    router: Router,
    scheduler: ScrapeScheduler,
    _dir: TempDir,
}

fn quiet_fetcher() -> FakeFetcher {
    FakeFetcher::new(|url, _| {
        if url == config::COOPTIMUS_GAMES_URL {
            Ok(cooptimus_xml(&[]))
        } else {
            Ok("{}".to_string())
        }
    })
}

fn test_app(catalog: Catalog, fetcher: FakeFetcher, allow_manual_scrape: bool) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    std::fs::create_dir_all(&assets).unwrap();
    std::fs::write(assets.join("index.js"), "console.log('hi');").unwrap();
    std::fs::write(dir.path().join("index.html"), INDEX).unwrap();
    std::fs::write(dir.path().join("logo.svg"), "<svg></svg>").unwrap();

    let shared = Arc::new(Mutex::new(catalog));
    let scraper = Scraper::new(Box::new(fetcher), vec!["SE".to_string()])
        .steam_delay(Duration::ZERO)
        .years(2020, 2020);
    let scheduler = ScrapeScheduler::new(
        Arc::clone(&shared),
        scraper,
        SchedulerOptions::default(),
        EventBus::new(),
    )
    .unwrap();

    let shell = server::load_shell(
        &dir.path().join("index.html"),
        ShellVariant::Plugins,
        EventBus::new(),
    )
    .unwrap();

    let state = Arc::new(AppState {
        catalog: AsyncCatalog::from_shared(shared),
        scheduler: scheduler.clone(),
        allow_manual_scrape,
        shell,
        logo_file: dir.path().join("logo.svg"),
    });
    let origins: Vec<String> = config::DEFAULT_ALLOWED_ORIGINS
        .iter()
        .map(|o| o.to_string())
        .collect();

    TestApp {
        router: server::router(state, &assets, &origins),
        scheduler,
        _dir: dir,
    }
}

fn default_app() -> TestApp {
    test_app(common::setup_catalog(), quiet_fetcher(), true)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, _, body) = send(router, request).await;
    (status, body)
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(router, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn ids(body: &Value) -> Vec<&str> {
    body["games"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["steam_id"].as_str().unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// /games
// ---------------------------------------------------------------------------

#[tokio::test]
async fn games_with_defaults() {
    let app = default_app();
    let (status, body) = get_json(&app.router, "/games").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["300", "100", "400", "200"]);
    assert_eq!(body["total_games"], 4);
    assert_eq!(body["pagination"]["current_page"], 1);
    assert_eq!(body["pagination"]["total_pages"], 1);
    assert_eq!(body["scraping_in_progress"], false);
    assert!(body["last_scrape_hours_ago"].is_number());

    let portal = &body["games"][1];
    assert_eq!(portal["price"]["initial"], 10000);
    assert_eq!(portal["price"]["final"], 2500);
    assert_eq!(portal["release_date"], "2011-04-18");
}

#[tokio::test]
async fn games_with_filters() {
    let app = default_app();

    let (_, body) = get_json(&app.router, "/games?player_type=lan&country_code=se").await;
    assert_eq!(ids(&body), vec!["600"]);

    let (_, body) = get_json(&app.router, "/games?tags=Puzzle&free_games=false").await;
    assert_eq!(ids(&body), vec!["100"]);

    let (_, body) = get_json(&app.router, "/games?country_code=US&sale_weight=0&price_weight=0").await;
    assert!(ids(&body).contains(&"500"));
}

#[tokio::test]
async fn unknown_player_type_uses_online_players() {
    let app = default_app();
    let (status, body) = get_json(&app.router, "/games?player_type=split-screen").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["300", "100", "400", "200"]);
}

#[tokio::test]
async fn games_past_the_end_keep_the_total() {
    let app = default_app();
    let (status, body) = get_json(&app.router, "/games?next_index=20").await;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&body).is_empty());
    assert_eq!(body["total_games"], 4);
}

#[tokio::test]
async fn games_rejects_bad_parameters() {
    let app = default_app();
    let cases = [
        ("/games?min_supported_players=0", "Player counts must be greater than 0"),
        ("/games?next_index=-1", "Next index number must be greater or equal to 0"),
        ("/games?release_date_from=2020/01/01", "Invalid date format for release_date_from"),
        ("/games?country_code=SWE", "2-letter ISO code"),
        ("/games?free_games=maybe", "Failed to deserialize query string"),
    ];
    for (uri, message) in cases {
        let (status, body) = get_json(&app.router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        let error = body["error"].as_str().unwrap();
        assert!(error.contains(message), "{}: {}", uri, error);
    }
}

// ---------------------------------------------------------------------------
// /countries, /logo
// ---------------------------------------------------------------------------

#[tokio::test]
async fn countries_list() {
    let app = default_app();
    let (status, body) = get_json(&app.router, "/countries").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["code"], "SE");
    assert_eq!(body[1]["currency"], "USD");
}

#[tokio::test]
async fn logo_is_served_as_svg() {
    let app = default_app();
    let request = Request::builder().uri("/logo").body(Body::empty()).unwrap();
    let (status, headers, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/svg+xml");
    assert_eq!(body, b"<svg></svg>");
}

// ---------------------------------------------------------------------------
// /scrape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scrape_status_when_idle() {
    let app = default_app();
    let (status, body) = get_json(&app.router, "/scrape/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scraping_in_progress"], false);
    assert_eq!(body["scraping_state"], "None");
    assert_eq!(body["scrape_interval_hours"], 12.0);
}

#[tokio::test]
async fn scrape_start_conflicts_while_running() {
    let (release, gate) = mpsc::channel::<()>();
    let gate = Mutex::new(gate);
    let fetcher = FakeFetcher::new(move |url, _| {
        if url == config::COOPTIMUS_GAMES_URL {
            let _ = gate.lock().unwrap().recv_timeout(Duration::from_secs(10));
            return Ok(cooptimus_xml(&[]));
        }
        Ok("{}".to_string())
    });
    let app = test_app(common::setup_catalog(), fetcher, true);

    let post = || {
        Request::builder()
            .method(Method::POST)
            .uri("/scrape/start")
            .body(Body::empty())
            .unwrap()
    };

    let (status, _, body) = send(&app.router, post()).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], "Scraping started");
    assert_eq!(body["scraping_in_progress"], true);

    let (_, status_body) = get_json(&app.router, "/scrape/status").await;
    assert_eq!(status_body["scraping_in_progress"], true);

    let (status, _, body) = send(&app.router, post()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], CoopGamesError::AlreadyRunning.to_string());

    release.send(()).unwrap();
}

#[tokio::test]
async fn scrape_start_is_not_routed_when_disabled() {
    let app = test_app(common::setup_catalog(), quiet_fetcher(), false);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/scrape/start")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!app.scheduler.is_scraping());
}

// ---------------------------------------------------------------------------
// Shell and assets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn index_and_client_routes_serve_the_mounted_shell() {
    let app = default_app();
    for uri in ["/", "/browse/couch", "/about"] {
        let (status, body) = get(&app.router, uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        let html = String::from_utf8(body).unwrap();
        assert!(html.contains(r#"<div id="app"><div data-root="root-component""#));
    }
}

#[tokio::test]
async fn unknown_api_paths_are_not_found() {
    let app = default_app();
    for uri in ["/games/620", "/scrape/nothing", "/assets/missing.js"] {
        let (status, _) = get(&app.router, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn assets_are_served() {
    let app = default_app();
    let (status, body) = get(&app.router, "/assets/index.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"console.log('hi');");
}

#[tokio::test]
async fn cors_allows_only_listed_origins() {
    let app = default_app();

    let allowed = Request::builder()
        .uri("/countries")
        .header(header::ORIGIN, "http://localhost:80")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&app.router, allowed).await;
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:80"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

    let other = Request::builder()
        .uri("/countries")
        .header(header::ORIGIN, "https://elsewhere.example")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&app.router, other).await;
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

// ---------------------------------------------------------------------------
// load_shell
// ---------------------------------------------------------------------------

#[test]
fn load_shell_requires_a_mount_point() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.html");
    std::fs::write(&path, "<html><body><main></main></body></html>").unwrap();

    for variant in [ShellVariant::Plugins, ShellVariant::Template] {
        let err = server::load_shell(&path, variant, EventBus::new()).unwrap_err();
        assert!(matches!(err, CoopGamesError::MountPointMissing(_)));
    }
}

#[test]
fn load_shell_fails_for_missing_file() {
    let err = server::load_shell(Path::new("/nonexistent/index.html"), ShellVariant::Plugins, EventBus::new())
        .unwrap_err();
    assert!(matches!(err, CoopGamesError::Io(_)));
}

#[test]
fn api_paths_are_recognised() {
    use coop_games::server::routes::assets::is_api_path;
    assert!(is_api_path("/games"));
    assert!(is_api_path("/scrape/start"));
    assert!(!is_api_path("/"));
    assert!(!is_api_path("/browse"));
}
