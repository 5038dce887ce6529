//! Co-Optimus game search API (XML).

use serde::Deserialize;

use crate::error::Result;
use crate::models::Game;

#[derive(Debug, Deserialize)]
struct GameList {
    #[serde(rename = "game", default)]
    games: Vec<CooptimusEntry>,
}

/// One `<game>` element of a Co-Optimus search response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CooptimusEntry {
    pub title: Option<String>,
    pub steam: Option<String>,
    pub local: Option<String>,
    pub lan: Option<String>,
    pub online: Option<String>,
    pub url: Option<String>,
}

impl CooptimusEntry {
    /// Convert to a [`Game`] with the Co-Optimus fields filled in.
    ///
    /// Entries without a Steam id are skipped (`None`), as are entries whose
    /// player counts are not numbers.
    pub fn into_game(self) -> Option<Game> {
        let steam_id = self.steam.as_deref().map(str::trim).unwrap_or("");
        if steam_id.is_empty() {
            return None;
        }
        let title = self.title.as_deref().map(str::trim).unwrap_or("");

        let players = (
            player_count(self.local.as_deref()),
            player_count(self.lan.as_deref()),
            player_count(self.online.as_deref()),
        );
        let (couch, lan, online) = match players {
            (Some(couch), Some(lan), Some(online)) => (couch, lan, online),
            _ => {
                log::warn!("Failed to parse game entry '{}': bad player count", title);
                return None;
            }
        };

        let mut game = Game::new(steam_id, title);
        game.couch_players = couch;
        game.lan_players = lan;
        game.online_players = online;
        game.cooptimus_url = self.url.unwrap_or_default().trim().to_string();
        Some(game)
    }
}

/// Empty counts mean the mode is not supported.
fn player_count(value: Option<&str>) -> Option<u32> {
    match value.map(str::trim) {
        None | Some("") => Some(0),
        Some(v) => v.parse().ok(),
    }
}

/// Parse a search response into its raw entries.
pub fn parse_entries(xml: &str) -> Result<Vec<CooptimusEntry>> {
    let list: GameList = quick_xml::de::from_str(xml)?;
    Ok(list.games)
}

/// Parse a search response into games, skipping entries without a Steam id.
pub fn parse_games(xml: &str) -> Result<Vec<Game>> {
    Ok(parse_entries(xml)?
        .into_iter()
        .filter_map(CooptimusEntry::into_game)
        .collect())
}

/// Query parameters for a PC game search by release year and optional month.
pub fn search_params(year: i32, month: Option<u32>) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("search", "true".to_string()),
        ("systemName", "pc".to_string()),
        ("releaseyear", year.to_string()),
    ];
    if let Some(m) = month {
        params.push(("releasemonth", m.to_string()));
    }
    params
}
