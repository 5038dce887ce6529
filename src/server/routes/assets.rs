use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, Uri};
use axum::response::{Html, IntoResponse, Response};

use crate::server::error::AppError;
use crate::server::state::AppState;

/// Path prefixes owned by the API; unknown paths under them are not
/// front-end routes.
pub const API_PREFIXES: &[&str] = &["games", "countries", "logo", "scrape", "assets"];

/// GET /
///
/// The host page with the root component mounted.
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.shell.clone())
}

/// Any other path: the front-end shell, so client-side routes resolve.
pub async fn spa_fallback(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Result<Html<String>, AppError> {
    if is_api_path(uri.path()) {
        return Err(AppError::not_found("Not found"));
    }
    Ok(Html(state.shell.clone()))
}

pub fn is_api_path(path: &str) -> bool {
    let path = path.trim_start_matches('/');
    API_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// GET /logo
pub async fn logo(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let bytes = tokio::fs::read(&state.logo_file).await.map_err(|e| {
        log::warn!("Unable to read {}: {}", state.logo_file.display(), e);
        AppError::not_found("Logo not found")
    })?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], bytes).into_response())
}
