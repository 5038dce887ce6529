//! Find cheap and good co-op PC games.
//!
//! Co-op games are scraped from Co-Optimus, enriched from the Steam store and
//! SteamSpy, stored in an embedded DuckDB database and queried with a
//! weighted score over rating, price, discount and review count.
//!
//! # Quick start
//!
//! ```no_run
//! use coop_games::models::{Filters, Scoring};
//! use coop_games::Catalog;
//!
//! let catalog = Catalog::builder()
//!     .database("games.duckdb")
//!     .countries_file("countries.json")
//!     .build()
//!     .unwrap();
//!
//! let page = catalog
//!     .games()
//!     .search(&Filters::default(), &Scoring::default(), 0, 10)
//!     .unwrap();
//! println!("{} matching games", page.total_games);
//! ```

#[cfg(feature = "async")]
pub mod async_client;
pub mod config;
pub mod connection;
pub mod error;
pub mod frontend;
pub mod models;
pub mod queries;
pub mod scheduler;
pub mod scraper;
#[cfg(feature = "server")]
pub mod server;
pub mod sql_builder;
pub mod storage;

#[cfg(feature = "async")]
pub use async_client::AsyncCatalog;
pub use connection::Connection;
pub use error::{CoopGamesError, Result};
pub use sql_builder::SqlBuilder;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use models::Country;

// ---------------------------------------------------------------------------
// CatalogBuilder
// ---------------------------------------------------------------------------

/// Builder for a [`Catalog`].
///
/// Use [`Catalog::builder()`] to obtain one, chain configuration methods, and
/// call [`build()`](CatalogBuilder::build).
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    database: Option<PathBuf>,
    in_memory: bool,
    countries_file: Option<PathBuf>,
    countries: Option<Vec<Country>>,
}

impl CatalogBuilder {
    /// Set the DuckDB database file.
    ///
    /// If not set, `games.duckdb` in the platform data directory is used
    /// (e.g. `~/.local/share/coop-games` on Linux).
    pub fn database<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.database = Some(path.as_ref().to_path_buf());
        self
    }

    /// Keep the catalogue in memory instead of a database file.
    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    /// Load countries from a `[{"code", "name", "currency"}]` JSON file.
    pub fn countries_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.countries_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Use an explicit country list. Takes precedence over `countries_file`.
    pub fn countries(mut self, countries: Vec<Country>) -> Self {
        self.countries = Some(countries);
        self
    }

    /// Open the database, apply pending migrations and load the countries.
    pub fn build(self) -> Result<Catalog> {
        let conn = if self.in_memory {
            Connection::open_in_memory()?
        } else {
            let path = self.database.unwrap_or_else(config::default_database_path);
            log::info!("Opening database {}", path.display());
            Connection::open(path)?
        };
        let version = conn.migrate()?;
        log::debug!("Database schema at version {}", version);

        let countries = match (self.countries, self.countries_file) {
            (Some(countries), _) => countries,
            (None, Some(path)) => queries::load_countries(path)?,
            (None, None) => Vec::new(),
        };

        Ok(Catalog { conn, countries })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The co-op game catalogue: the DuckDB store plus the country list.
///
/// Query interfaces are lightweight wrappers borrowing from the catalogue.
pub struct Catalog {
    conn: Connection,
    countries: Vec<Country>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Access the game query interface.
    pub fn games(&self) -> queries::GameQuery<'_> {
        queries::GameQuery::new(&self.conn)
    }

    /// Access the country list.
    pub fn countries(&self) -> queries::CountryQuery<'_> {
        queries::CountryQuery::new(&self.countries)
    }

    /// Whether no game has been stored yet.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.games().count()? == 0)
    }

    /// Execute a raw SQL query against the catalogue.
    ///
    /// `params` are bound to the `?` placeholders in order.
    pub fn sql(
        &self,
        query: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        self.conn.execute(query, params)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let games = self.games().count().unwrap_or(0);
        write!(
            f,
            "Catalog(games={}, countries=[{}])",
            games,
            self.countries().codes().join(", ")
        )
    }
}
