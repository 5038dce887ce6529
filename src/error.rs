#[derive(Debug, thiserror::Error)]
pub enum CoopGamesError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Migration {version:03} failed: {message}")]
    Migration { version: u32, message: String },

    #[error("Request to {url} failed after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },

    #[error("Scraping is already in progress")]
    AlreadyRunning,

    #[error("Mount point '{0}' not found in host page")]
    MountPointMissing(String),

    #[error("Application is already mounted at '{0}'")]
    AlreadyMounted(String),
}

pub type Result<T> = std::result::Result<T, CoopGamesError>;
