//! Shared test fixtures for the coop-games integration tests.
//!
//! Provides `setup_catalog()` which creates an in-memory DuckDB catalogue
//! populated with a handful of sample games, prices and delistings, and
//! `FakeFetcher`, an `HttpFetch` answering from a closure instead of the
//! network.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::NaiveDate;
use coop_games::models::{Country, Game, GameCountryData, Price};
use coop_games::scraper::HttpFetch;
use coop_games::{Catalog, Result};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn sample_countries() -> Vec<Country> {
    vec![
        Country {
            code: "SE".into(),
            name: "Sweden".into(),
            currency: "SEK".into(),
        },
        Country {
            code: "US".into(),
            name: "United States".into(),
            currency: "USD".into(),
        },
    ]
}

fn game(
    steam_id: &str,
    title: &str,
    rating: f64,
    reviews: u64,
    release: Option<NaiveDate>,
    players: (u32, u32, u32),
    tags: &[&str],
) -> Game {
    let mut g = Game::new(steam_id, title);
    g.steam_rating = rating;
    g.number_of_reviews = reviews;
    g.is_released = release.is_some();
    g.release_date = release;
    g.couch_players = players.0;
    g.lan_players = players.1;
    g.online_players = players.2;
    g.tags = tags.iter().map(|t| t.to_string()).collect();
    g.cooptimus_url = format!("https://www.co-optimus.com/game/{}", steam_id);
    g.header_image = format!("https://cdn.example/{}/header.jpg", steam_id);
    g.short_description = format!("{} description", title);
    g
}

/// Six games:
///
/// | id  | title          | rating | reviews | released   | couch/lan/online | SE price     | US price   |
/// |-----|----------------|--------|---------|------------|------------------|--------------|------------|
/// | 100 | Portal 2       | 0.98   | 300000  | 2011-04-18 | 2/0/2            | 10000 → 2500 | 999        |
/// | 200 | It Takes Two   | 0.95   | 150000  | 2021-03-26 | 2/0/2            | 39900        | -          |
/// | 300 | Free Co-op     | 0.80   | 5000    | 2019-01-01 | 0/0/4            | -            | -          |
/// | 400 | Upcoming Game  | 0.00   | 0       | unreleased | 0/0/8            | -            | -          |
/// | 500 | Delisted Game  | 0.90   | 1000    | 2015-06-01 | 0/0/2            | delisted     | 1999       |
/// | 600 | Old Classic    | 0.85   | 800     | 1999-05-05 | 0/16/0           | 4900         | -          |
pub fn sample_games() -> Vec<Game> {
    vec![
        game("100", "Portal 2", 0.98, 300_000, Some(date(2011, 4, 18)), (2, 0, 2), &["Puzzle", "Co-op"]),
        game("200", "It Takes Two", 0.95, 150_000, Some(date(2021, 3, 26)), (2, 0, 2), &["Co-op", "Adventure"]),
        game("300", "Free Co-op", 0.80, 5_000, Some(date(2019, 1, 1)), (0, 0, 4), &["Free to Play", "Co-op"]),
        game("400", "Upcoming Game", 0.0, 0, None, (0, 0, 8), &["Co-op"]),
        game("500", "Delisted Game", 0.90, 1_000, Some(date(2015, 6, 1)), (0, 0, 2), &["Shooter"]),
        game("600", "Old Classic", 0.85, 800, Some(date(1999, 5, 5)), (0, 16, 0), &["Shooter", "Classic"]),
    ]
}

pub fn sample_country_data() -> BTreeMap<String, GameCountryData> {
    let mut data: BTreeMap<String, GameCountryData> = BTreeMap::new();
    data.entry("100".into()).or_default().add_price("SE", Price::new(10000, 2500));
    data.entry("100".into()).or_default().add_price("US", Price::new(999, 999));
    data.entry("200".into()).or_default().add_price("SE", Price::new(39900, 39900));
    data.entry("500".into()).or_default().delist("SE");
    data.entry("500".into()).or_default().add_price("US", Price::new(1999, 1999));
    data.entry("600".into()).or_default().add_price("SE", Price::new(4900, 4900));
    data
}

/// An in-memory catalogue holding the sample games and country data.
pub fn setup_catalog() -> Catalog {
    let catalog = Catalog::builder()
        .in_memory()
        .countries(sample_countries())
        .build()
        .unwrap();
    catalog.games().save_games(&sample_games()).unwrap();
    catalog
        .games()
        .save_country_data(&sample_country_data())
        .unwrap();
    catalog
}

/// An empty in-memory catalogue.
pub fn empty_catalog() -> Catalog {
    Catalog::builder()
        .in_memory()
        .countries(sample_countries())
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// FakeFetcher
// ---------------------------------------------------------------------------

type Handler = dyn Fn(&str, &[(&str, String)]) -> Result<String> + Send + Sync;

/// An `HttpFetch` that answers every request with `handler` and records
/// the requested URLs with their query parameters.
pub struct FakeFetcher {
    handler: Box<Handler>,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeFetcher {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &[(&str, String)]) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl HttpFetch for FakeFetcher {
    fn get(&self, url: &str, params: &[(&str, String)]) -> Result<String> {
        self.requests.lock().unwrap().push((
            url.to_string(),
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ));
        (self.handler)(url, params)
    }
}

/// Look up a query parameter by name.
pub fn param<'a>(params: &'a [(&str, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.as_str())
}

/// A Co-Optimus search response with one `<game>` per entry
/// `(title, steam id, local, lan, online)`.
pub fn cooptimus_xml(entries: &[(&str, &str, &str, &str, &str)]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<games>\n");
    for (title, steam, local, lan, online) in entries {
        xml.push_str(&format!(
            "  <game>\n    <title>{title}</title>\n    <steam>{steam}</steam>\n    \
             <local>{local}</local>\n    <lan>{lan}</lan>\n    <online>{online}</online>\n    \
             <url>https://www.co-optimus.com/game/{steam}</url>\n  </game>\n"
        ));
    }
    xml.push_str("</games>\n");
    xml
}

impl FakeFetcher {
    /// Every recorded request, oldest first.
    pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded requests whose URL starts with `prefix`.
    pub fn requests_to(&self, prefix: &str) -> Vec<Vec<(String, String)>> {
        self.requests()
            .into_iter()
            .filter(|(url, _)| url.starts_with(prefix))
            .map(|(_, params)| params)
            .collect()
    }
}
