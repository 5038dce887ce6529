//! HTTP API and front-end shell.
//!
//! An axum [`Router`] over shared [`AppState`]: the scored game query, the
//! scrape controls, the country list, and the mounted front-end shell with
//! its static assets.

pub mod error;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::AppState;

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

use crate::error::Result;
use crate::frontend::{self, EventBus, HostPage, ShellVariant};

/// Read the host page and mount the front end into it.
///
/// Fails when the page has no mount point, which must stop startup.
pub fn load_shell(index_html: &Path, variant: ShellVariant, bus: EventBus) -> Result<String> {
    let html = fs::read_to_string(index_html)?;
    let mut page = HostPage::parse(html);
    frontend::bootstrap(variant, &mut page, bus)?;
    Ok(page.render())
}

/// CORS policy allowing GET and POST from `origins`, with credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build the application router.
pub fn router(state: Arc<AppState>, assets_dir: &Path, allowed_origins: &[String]) -> Router {
    let mut app = Router::new()
        .route("/", get(routes::assets::index))
        .route("/games", get(routes::games::list_games))
        .route("/countries", get(routes::games::list_countries))
        .route("/logo", get(routes::assets::logo))
        .route("/scrape/status", get(routes::scrape::status));
    if state.allow_manual_scrape {
        app = app.route("/scrape/start", post(routes::scrape::start));
    }

    app.nest_service("/assets", ServeDir::new(assets_dir))
        .fallback(routes::assets::spa_fallback)
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// Serve `app` on `addr` until the process is stopped.
pub async fn serve(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
