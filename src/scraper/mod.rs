//! Co-Optimus and Steam scraper.
//!
//! A scrape runs in two phases. [`Scraper::scrape_games`] finds co-op games on
//! Co-Optimus and enriches each one with Steam store details, review totals
//! and SteamSpy tags. [`Scraper::scrape_prices`] then collects per-country
//! prices and delistings in batches. All requests go through an
//! [`HttpFetch`], so a scrape can be replayed against canned responses.

pub mod cooptimus;
pub mod http;
pub mod steam;

pub use cooptimus::parse_games as parse_cooptimus_games;
pub use http::{HttpFetch, ReqwestFetcher};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::Datelike;

use crate::config;
use crate::error::Result;
use crate::models::{dedup_by_steam_id, steam_store_url, Game, GameCountryData};

// ---------------------------------------------------------------------------
// ScrapeProgress
// ---------------------------------------------------------------------------

/// Shared, human-readable description of what the scraper is doing.
///
/// Clones share the same state, so the scheduler and the HTTP layer can read
/// what the scraping thread writes.
#[derive(Debug, Clone)]
pub struct ScrapeProgress {
    state: Arc<Mutex<String>>,
}

pub const IDLE_STATE: &str = "None";

impl Default for ScrapeProgress {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(IDLE_STATE.to_string())),
        }
    }
}

impl ScrapeProgress {
    pub fn set(&self, state: impl Into<String>) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *guard = state.into();
    }

    pub fn get(&self) -> String {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn reset(&self) {
        self.set(IDLE_STATE);
    }
}

// ---------------------------------------------------------------------------
// Scraper
// ---------------------------------------------------------------------------

pub struct Scraper {
    fetcher: Box<dyn HttpFetch>,
    country_codes: Vec<String>,
    steam_delay: Duration,
    start_year: i32,
    end_year: i32,
    progress: ScrapeProgress,
}

impl Scraper {
    /// Create a scraper collecting prices for `country_codes`.
    ///
    /// Scrapes span [`config::SCRAPING_START_YEAR`] to the current year.
    pub fn new(fetcher: Box<dyn HttpFetch>, country_codes: Vec<String>) -> Self {
        Self {
            fetcher,
            country_codes,
            steam_delay: config::DEFAULT_STEAM_DELAY,
            start_year: config::SCRAPING_START_YEAR,
            end_year: chrono::Local::now().year(),
            progress: ScrapeProgress::default(),
        }
    }

    /// Set the pause between consecutive Steam requests.
    pub fn steam_delay(mut self, delay: Duration) -> Self {
        self.steam_delay = delay;
        self
    }

    /// Restrict scrapes to release years `start..=end`.
    pub fn years(mut self, start: i32, end: i32) -> Self {
        self.start_year = start;
        self.end_year = end;
        self
    }

    /// A handle on this scraper's progress state.
    pub fn progress(&self) -> ScrapeProgress {
        self.progress.clone()
    }

    pub fn country_codes(&self) -> &[String] {
        &self.country_codes
    }

    // -- Games -------------------------------------------------------------

    /// Find co-op games and enrich them from Steam.
    ///
    /// A full scrape covers every release year; otherwise only the current
    /// year is fetched. Games Steam no longer knows are left out.
    pub fn scrape_games(&self, full: bool) -> Result<Vec<Game>> {
        self.progress.set("Finding games");
        let games = self.fetch_cooptimus_games(full)?;
        let games = apply_steam_id_fixups(dedup_by_steam_id(games));
        // Remapping can make two entries point at the same app
        let games = dedup_by_steam_id(games);

        let total = games.len();
        let mut enriched = Vec::with_capacity(total);
        for (i, mut game) in games.into_iter().enumerate() {
            self.progress
                .set(format!("Getting Steam data ({}/{})", i + 1, total));
            if self.enrich(&mut game)? {
                enriched.push(game);
            }
            self.pause();
        }

        log::info!("Scraped {} of {} games from Steam", enriched.len(), total);
        Ok(enriched)
    }

    /// Fetch the raw Co-Optimus game list.
    pub fn fetch_cooptimus_games(&self, full: bool) -> Result<Vec<Game>> {
        let mut games = Vec::new();
        if full {
            for year in self.start_year..=self.end_year {
                games.extend(self.fetch_year(year)?);
            }
        } else {
            games.extend(self.fetch_year_by_month(self.end_year)?);
        }
        log::info!("Found {} games", games.len());
        Ok(games)
    }

    fn fetch_year(&self, year: i32) -> Result<Vec<Game>> {
        let entries = self.search_cooptimus(year, None)?;
        log::info!("Year: {}, games found: {}", year, entries.len());

        let capped = entries.len() >= config::COOPTIMUS_PAGE_CAP;
        let mut games: Vec<Game> = entries
            .into_iter()
            .filter_map(cooptimus::CooptimusEntry::into_game)
            .collect();
        if capped {
            log::info!("Year {} hit the result cap, scraping by month", year);
            games.extend(self.fetch_year_by_month(year)?);
        }
        Ok(games)
    }

    fn fetch_year_by_month(&self, year: i32) -> Result<Vec<Game>> {
        let mut games = Vec::new();
        for month in 1..=12 {
            let entries = self.search_cooptimus(year, Some(month))?;
            log::debug!(
                "Year: {}, month: {}, games found: {}",
                year,
                month,
                entries.len()
            );
            games.extend(
                entries
                    .into_iter()
                    .filter_map(cooptimus::CooptimusEntry::into_game),
            );
        }
        Ok(games)
    }

    fn search_cooptimus(
        &self,
        year: i32,
        month: Option<u32>,
    ) -> Result<Vec<cooptimus::CooptimusEntry>> {
        let body = self.fetcher.get(
            config::COOPTIMUS_GAMES_URL,
            &cooptimus::search_params(year, month),
        )?;
        cooptimus::parse_entries(&body)
    }

    /// Fill in store details, reviews and tags. Returns `false` when Steam has
    /// no data for the game.
    pub fn enrich(&self, game: &mut Game) -> Result<bool> {
        let body = self.fetcher.get(
            config::STEAM_APP_DETAILS_URL,
            &[("appids", game.steam_id.clone())],
        )?;
        let details = match steam::parse_app_details(&body, &game.steam_id) {
            Ok(Some(details)) => details,
            Ok(None) => {
                log::info!("{} ({}), no data found", game.title, game.steam_id);
                return Ok(false);
            }
            Err(e) => {
                log::warn!("{} ({}), unreadable details: {}", game.title, game.steam_id, e);
                return Ok(false);
            }
        };
        game.header_image = details.header_image;
        game.short_description = details.short_description;
        game.is_released = details.release_date.is_some();
        game.release_date = details.release_date;

        let reviews_url = format!("{}/{}", config::STEAM_REVIEWS_URL, game.steam_id);
        let body = self.fetcher.get(&reviews_url, &steam::reviews_params())?;
        match steam::parse_reviews(&body) {
            Ok(reviews) => {
                game.number_of_reviews = reviews.number_of_reviews;
                game.steam_rating = reviews.steam_rating;
            }
            Err(e) => log::warn!("{} ({}), unreadable reviews: {}", game.title, game.steam_id, e),
        }

        let body = self.fetcher.get(
            config::STEAMSPY_URL,
            &[
                ("request", "appdetails".to_string()),
                ("appid", game.steam_id.clone()),
            ],
        )?;
        game.tags = steam::parse_steamspy_tags(&body);

        Ok(true)
    }

    // -- Prices ------------------------------------------------------------

    /// Collect prices and delistings for `steam_ids` in every configured country.
    pub fn scrape_prices(&self, steam_ids: &[String]) -> Result<BTreeMap<String, GameCountryData>> {
        let mut out = BTreeMap::new();
        log::info!("Fetching prices for {} games", steam_ids.len());

        for (n, batch) in steam_ids.chunks(config::PRICE_BATCH_SIZE).enumerate() {
            let done = n * config::PRICE_BATCH_SIZE;
            self.progress
                .set(format!("Getting prices ({}/{})", done, steam_ids.len()));

            for country in &self.country_codes {
                let body = self.fetcher.get(
                    config::STEAM_APP_DETAILS_URL,
                    &steam::price_params(batch, country),
                )?;
                steam::merge_price_batch(&body, batch, country, &mut out)?;
                self.pause();
            }
        }

        Ok(out)
    }

    fn pause(&self) {
        if !self.steam_delay.is_zero() {
            thread::sleep(self.steam_delay);
        }
    }
}

/// Remap known-bad Steam ids and drop ignored ones.
pub fn apply_steam_id_fixups(games: Vec<Game>) -> Vec<Game> {
    let fixups = config::steam_id_fixups();
    let ignored = config::ignored_steam_ids();

    games
        .into_iter()
        .filter_map(|mut game| {
            if let Some(fixed) = fixups.get(game.steam_id.as_str()) {
                game.steam_id = fixed.to_string();
                game.steam_url = steam_store_url(&game.steam_id);
            }
            if ignored.contains(game.steam_id.as_str()) {
                None
            } else {
                Some(game)
            }
        })
        .collect()
}
