use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

pub const COOPTIMUS_GAMES_URL: &str = "https://api.co-optimus.com/games.php";
pub const STEAM_APP_DETAILS_URL: &str = "https://store.steampowered.com/api/appdetails";
pub const STEAM_REVIEWS_URL: &str = "https://store.steampowered.com/appreviews";
pub const STEAM_STORE_APP_URL: &str = "https://store.steampowered.com/app";
pub const STEAMSPY_URL: &str = "https://steamspy.com/api.php";

/// First release year present in the Co-Optimus PC catalogue.
pub const SCRAPING_START_YEAR: i32 = 1988;
/// Co-Optimus returns at most this many games per search.
pub const COOPTIMUS_PAGE_CAP: usize = 40;
/// Number of app ids sent in one Steam price request.
pub const PRICE_BATCH_SIZE: usize = 200;
/// Review count treated as "very many reviews" when scoring.
pub const HIGH_NUMBER_OF_REVIEWS: f64 = 100_000.0;

pub const DEFAULT_COUNTRY_CODE: &str = "SE";
pub const DEFAULT_RELEASE_DATE_FROM: &str = "1988-08-20";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_SCRAPE_INTERVAL_HOURS: f64 = 12.0;
pub const DEFAULT_STEAM_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_REQUEST_RETRIES: u32 = 15;
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// How often the continuous scraping loop wakes up.
pub const SCHEDULER_TICK: Duration = Duration::from_secs(600);
/// Pause after a failed scrape before the loop resumes.
pub const SCHEDULER_ERROR_BACKOFF: Duration = Duration::from_secs(300);

/// Selector of the element the front-end root component is mounted into.
pub const MOUNT_SELECTOR: &str = "#app";

/// Origins allowed by the HTTP API's CORS policy.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://coopgames.anwilc.com",
    "http://coopgames.anwilc.com",
    "http://localhost:80",
    "http://127.0.0.1:80",
];

/// Co-Optimus entries whose Steam id points at the wrong app.
pub fn steam_id_fixups() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("8110", "8100"),
        ("12799", "12790"),
        ("10199", "1962660"),
        ("12819", "12810"),
        ("48129", "965320"),
        ("22700", "225640"),
        ("8989", "8980"),
        ("12219", "12210"),
        ("1259", "1250"),
        ("206940", "321800"),
        ("42749", "42700"),
        ("271290", "705040"),
        ("212180", "1263550"),
        ("22359", "22350"),
        ("362003", "3240220"),
        ("41010", "41014"),
        ("32690", "32770"),
        ("21019", "21010"),
        ("35709", "35700"),
        ("11202", "11200"),
        ("204140", "209360"),
    ])
}

/// Steam ids that never resolve to a purchasable co-op game.
pub fn ignored_steam_ids() -> HashSet<&'static str> {
    HashSet::from([
        "38209", "23100", "33420", "235760", "240380", "10530", "20590", "463680", "206950",
        "9930", "1501980", "32700", "21649", "1368440", "9990",
    ])
}

pub fn default_data_dir() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("coop-games")
    } else {
        PathBuf::from(".coop-games")
    }
}

pub fn default_database_path() -> PathBuf {
    default_data_dir().join("games.duckdb")
}
