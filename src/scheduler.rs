//! Background scraping lifecycle.
//!
//! [`ScrapeScheduler`] runs scrapes on worker threads, either continuously on
//! an interval or on demand, and never more than one at a time. The catalogue
//! is locked only while results are written, not while the network is
//! scraped. Lifecycle events (`scrape:started`, `scrape:finished`,
//! `scrape:failed`) are published on the scheduler's [`EventBus`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::json;

use crate::config;
use crate::error::{CoopGamesError, Result};
use crate::frontend::EventBus;
use crate::scraper::{ScrapeProgress, Scraper};
use crate::Catalog;

/// Snapshot of the scheduler, as reported by `/scrape/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeStatus {
    pub scraping_in_progress: bool,
    pub scraping_state: String,
    pub last_scrape_hours_ago: f64,
    pub scrape_interval_hours: f64,
}

/// Result of one completed scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrapeOutcome {
    pub total_games: u64,
    pub new_games: usize,
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Hours between scrapes of the continuous loop.
    pub interval_hours: f64,
    /// How often the continuous loop checks whether a scrape is due.
    pub tick: Duration,
    /// Pause after a failed scrape.
    pub error_backoff: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            interval_hours: config::DEFAULT_SCRAPE_INTERVAL_HOURS,
            tick: config::SCHEDULER_TICK,
            error_backoff: config::SCHEDULER_ERROR_BACKOFF,
        }
    }
}

struct Inner {
    catalog: Arc<Mutex<Catalog>>,
    scraper: Scraper,
    progress: ScrapeProgress,
    options: SchedulerOptions,
    bus: EventBus,
    in_progress: AtomicBool,
    /// Set when the catalogue was empty at startup; cleared by the first scrape.
    initial_scrape_pending: AtomicBool,
    has_done_full_scrape: AtomicBool,
    last_scrape: Mutex<Instant>,
    /// Set by `stop`; `wake` interrupts the loop's pauses.
    stop: Mutex<bool>,
    wake: Condvar,
    continuous: Mutex<Option<JoinHandle<()>>>,
}

/// Clears the in-progress flag and the progress state when a scrape ends,
/// however it ends.
struct RunGuard {
    inner: Arc<Inner>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.inner.progress.reset();
        self.inner.in_progress.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Clone)]
pub struct ScrapeScheduler {
    inner: Arc<Inner>,
}

impl ScrapeScheduler {
    /// Create a scheduler writing scrape results into `catalog`.
    ///
    /// If the catalogue holds no games yet, the continuous loop scrapes on its
    /// first tick instead of waiting a full interval.
    pub fn new(
        catalog: Arc<Mutex<Catalog>>,
        scraper: Scraper,
        options: SchedulerOptions,
        bus: EventBus,
    ) -> Result<Self> {
        let empty = lock(&catalog).is_empty()?;
        let progress = scraper.progress();
        Ok(Self {
            inner: Arc::new(Inner {
                catalog,
                scraper,
                progress,
                options,
                bus,
                in_progress: AtomicBool::new(false),
                initial_scrape_pending: AtomicBool::new(empty),
                has_done_full_scrape: AtomicBool::new(false),
                last_scrape: Mutex::new(Instant::now()),
                stop: Mutex::new(false),
                wake: Condvar::new(),
                continuous: Mutex::new(None),
            }),
        })
    }

    pub fn status(&self) -> ScrapeStatus {
        ScrapeStatus {
            scraping_in_progress: self.is_scraping(),
            scraping_state: self.inner.progress.get(),
            last_scrape_hours_ago: self.last_scrape_hours_ago(),
            scrape_interval_hours: self.inner.options.interval_hours,
        }
    }

    pub fn is_scraping(&self) -> bool {
        self.inner.in_progress.load(Ordering::SeqCst)
    }

    pub fn last_scrape_hours_ago(&self) -> f64 {
        lock(&self.inner.last_scrape).elapsed().as_secs_f64() / 3600.0
    }

    /// Whether the continuous loop would start a scrape now.
    pub fn is_due(&self) -> bool {
        !self.is_scraping()
            && (self.inner.initial_scrape_pending.load(Ordering::SeqCst)
                || self.last_scrape_hours_ago() >= self.inner.options.interval_hours)
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    // -- Running scrapes ---------------------------------------------------

    /// Scrape on the calling thread and wait for the result.
    pub fn scrape_now(&self) -> Result<ScrapeOutcome> {
        let guard = self.claim()?;
        run(&guard.inner)
    }

    /// Start a scrape on a worker thread.
    ///
    /// Fails with `AlreadyRunning` while another scrape is in progress.
    pub fn manual_scrape(&self) -> Result<()> {
        let guard = self.claim()?;
        log::info!("Manual scraping triggered");
        thread::Builder::new()
            .name("manual-scrape".to_string())
            .spawn(move || {
                if let Err(e) = run(&guard.inner) {
                    log::error!("Manual scrape failed: {}", e);
                }
            })?;
        Ok(())
    }

    /// Start the continuous scraping loop unless it is already running.
    pub fn start_continuous(&self) -> Result<()> {
        let mut handle = lock(&self.inner.continuous);
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return Ok(());
        }
        *lock(&self.inner.stop) = false;

        log::info!(
            "Starting continuous scraping (every {} hours)",
            self.inner.options.interval_hours
        );
        let scheduler = self.clone();
        *handle = Some(
            thread::Builder::new()
                .name("continuous-scrape".to_string())
                .spawn(move || scheduler.continuous_loop())?,
        );
        Ok(())
    }

    /// Ask the continuous loop to exit.
    ///
    /// A waiting loop wakes at once; a scrape already running is finished first.
    pub fn stop(&self) {
        *lock(&self.inner.stop) = true;
        self.inner.wake.notify_all();
    }

    /// Whether the continuous loop thread is alive.
    pub fn is_continuous_running(&self) -> bool {
        lock(&self.inner.continuous)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Wait up to `timeout` or until `stop` is called. Returns true when stopped.
    fn pause(&self, timeout: Duration) -> bool {
        let stopped = lock(&self.inner.stop);
        let (stopped, _) = self
            .inner
            .wake
            .wait_timeout_while(stopped, timeout, |stopped| !*stopped)
            .unwrap_or_else(|e| e.into_inner());
        *stopped
    }

    fn continuous_loop(&self) {
        while !*lock(&self.inner.stop) {
            let wait = if self.is_due() {
                match self.scrape_now() {
                    Ok(_) | Err(CoopGamesError::AlreadyRunning) => self.inner.options.tick,
                    Err(e) => {
                        log::error!("Error in continuous scraping: {}", e);
                        self.inner.options.error_backoff
                    }
                }
            } else {
                self.inner.options.tick
            };
            if self.pause(wait) {
                break;
            }
        }
        log::info!("Continuous scraping stopped");
    }

    fn claim(&self) -> Result<RunGuard> {
        self.inner
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| CoopGamesError::AlreadyRunning)?;
        Ok(RunGuard {
            inner: Arc::clone(&self.inner),
        })
    }
}

fn run(inner: &Inner) -> Result<ScrapeOutcome> {
    let full = !inner.has_done_full_scrape.load(Ordering::SeqCst);
    log::info!(
        "=== Starting {} scrape ===",
        if full { "full" } else { "incremental" }
    );
    inner.bus.publish("scrape:started", json!({ "full": full }));

    match scrape_into(&inner.catalog, &inner.scraper, full) {
        Ok(outcome) => {
            *lock(&inner.last_scrape) = Instant::now();
            inner.has_done_full_scrape.store(true, Ordering::SeqCst);
            inner.initial_scrape_pending.store(false, Ordering::SeqCst);
            log::info!(
                "=== Scraping completed. Found {} new games. New total is {} ===",
                outcome.new_games,
                outcome.total_games
            );
            inner.bus.publish(
                "scrape:finished",
                json!({ "total_games": outcome.total_games, "new_games": outcome.new_games }),
            );
            Ok(outcome)
        }
        Err(e) => {
            inner
                .bus
                .publish("scrape:failed", json!({ "error": e.to_string() }));
            Err(e)
        }
    }
}

/// Scrape games into `catalog`, then prices for every stored game.
///
/// The catalogue is locked only while writing.
pub fn scrape_into(catalog: &Mutex<Catalog>, scraper: &Scraper, full: bool) -> Result<ScrapeOutcome> {
    let games = scraper.scrape_games(full)?;

    let (new_games, total_games, steam_ids) = {
        let catalog = lock(catalog);
        let new_games = catalog.games().save_games(&games)?;
        (
            new_games,
            catalog.games().count()?,
            catalog.games().all_steam_ids()?,
        )
    };

    let country_data = scraper.scrape_prices(&steam_ids)?;
    lock(catalog).games().save_country_data(&country_data)?;

    Ok(ScrapeOutcome {
        total_games,
        new_games,
    })
}
