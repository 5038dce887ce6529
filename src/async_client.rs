//! Async wrapper around [`Catalog`] for use in async runtimes (Tokio, etc.).
//!
//! Runs all catalogue operations on the blocking thread pool via
//! [`tokio::task::spawn_blocking`], keeping the async event loop free.
//! The same `Arc<Mutex<Catalog>>` can be shared with the scrape scheduler,
//! which writes on its own threads.
//!
//! # Example
//!
//! ```no_run
//! use coop_games::models::{Filters, Scoring};
//! use coop_games::{AsyncCatalog, Catalog};
//!
//! #[tokio::main]
//! async fn main() {
//!     let catalog = AsyncCatalog::open(Catalog::builder().in_memory()).await.unwrap();
//!
//!     let page = catalog
//!         .search(Filters::default(), Scoring::default(), 0, 10)
//!         .await
//!         .unwrap();
//!     println!("{} games", page.total_games);
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{CoopGamesError, Result};
use crate::models::{Country, Filters, Game, GamePage, Scoring};
use crate::{Catalog, CatalogBuilder};

/// Async wrapper around a shared [`Catalog`].
///
/// Cloning is cheap; clones share the same catalogue.
#[derive(Clone)]
pub struct AsyncCatalog {
    inner: Arc<Mutex<Catalog>>,
}

impl AsyncCatalog {
    /// Build a catalogue on the blocking thread pool.
    pub async fn open(builder: CatalogBuilder) -> Result<Self> {
        tokio::task::spawn_blocking(move || builder.build().map(Self::new))
            .await
            .map_err(|e| CoopGamesError::InvalidArgument(format!("Task join error: {e}")))?
    }

    pub fn new(catalog: Catalog) -> Self {
        Self::from_shared(Arc::new(Mutex::new(catalog)))
    }

    /// Wrap a catalogue that is also used elsewhere.
    pub fn from_shared(inner: Arc<Mutex<Catalog>>) -> Self {
        Self { inner }
    }

    pub fn shared(&self) -> Arc<Mutex<Catalog>> {
        Arc::clone(&self.inner)
    }

    /// Run a sync catalogue operation on the blocking thread pool.
    ///
    /// The closure receives a `&Catalog` and should return a `Result<T>`.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Catalog) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let catalog = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let guard = catalog
                .lock()
                .map_err(|_| CoopGamesError::InvalidArgument("Catalog lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| CoopGamesError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// One page of scored games; see [`GameQuery::search`](crate::queries::GameQuery::search).
    pub async fn search(
        &self,
        filters: Filters,
        scoring: Scoring,
        next_index: usize,
        page_size: usize,
    ) -> Result<GamePage> {
        self.run(move |c| c.games().search(&filters, &scoring, next_index, page_size))
            .await
    }

    pub async fn get_game(&self, steam_id: &str, country_code: &str) -> Result<Option<Game>> {
        let steam_id = steam_id.to_string();
        let country_code = country_code.to_string();
        self.run(move |c| c.games().get(&steam_id, &country_code))
            .await
    }

    pub async fn countries(&self) -> Result<Vec<Country>> {
        self.run(|c| Ok(c.countries().list().to_vec())).await
    }

    /// Execute a raw SQL query asynchronously.
    pub async fn sql(
        &self,
        query: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let query = query.to_string();
        let params = params.to_vec();
        self.run(move |c| c.sql(&query, &params)).await
    }
}
