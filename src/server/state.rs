use std::path::PathBuf;

use crate::scheduler::ScrapeScheduler;
use crate::AsyncCatalog;

/// Shared application state available to all route handlers via Axum's
/// `State` extractor.
pub struct AppState {
    /// The catalogue, shared with the scrape scheduler.
    pub catalog: AsyncCatalog,

    pub scheduler: ScrapeScheduler,

    /// Whether `POST /scrape/start` is routed.
    pub allow_manual_scrape: bool,

    /// The host page with the root component mounted, served for `/` and
    /// every front-end route.
    pub shell: String,

    pub logo_file: PathBuf,
}
