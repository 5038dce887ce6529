use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::scheduler::ScrapeStatus;
use crate::server::error::AppError;
use crate::server::state::AppState;

/// GET /scrape/status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<ScrapeStatus> {
    Json(state.scheduler.status())
}

/// POST /scrape/start
///
/// Starts a scrape in the background; 409 while one is running.
pub async fn start(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    state.scheduler.manual_scrape()?;
    Ok(Json(json!({
        "message": "Scraping started",
        "scraping_in_progress": true
    })))
}
