//! Legacy `games.json` import and export.
//!
//! The flat file holds an array of games, each carrying its prices for every
//! country (`"prices": {"SE": {"initial": .., "final": ..}}`), a numeric
//! steam id and a `"20 Aug, 2019"` style release date.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Game, GameCountryData, Price};
use crate::scraper::steam::parse_release_date;
use crate::Catalog;

const LEGACY_DATE_FORMAT: &str = "%d %b, %Y";

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SteamId {
    Number(u64),
    Text(String),
}

impl SteamId {
    fn into_string(self) -> String {
        match self {
            SteamId::Number(n) => n.to_string(),
            SteamId::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LegacyGameIn {
    title: String,
    steam_id: SteamId,
    #[serde(default)]
    prices: BTreeMap<String, Price>,
    #[serde(default)]
    delisted: BTreeMap<String, bool>,
    #[serde(default)]
    steam_rating: f64,
    #[serde(default)]
    number_of_reviews: u64,
    #[serde(default = "default_true")]
    is_released: bool,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    couch_players: u32,
    #[serde(default)]
    lan_players: u32,
    #[serde(default)]
    online_players: u32,
    #[serde(default)]
    cooptimus_url: Option<String>,
    #[serde(default)]
    steam_url: Option<String>,
    #[serde(default)]
    header_image: Option<String>,
    #[serde(default)]
    short_description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct LegacyGameOut<'a> {
    title: &'a str,
    steam_id: serde_json::Value,
    score: f64,
    prices: BTreeMap<&'a str, Price>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    delisted: BTreeMap<&'a str, bool>,
    steam_rating: f64,
    number_of_reviews: u64,
    is_released: bool,
    release_date: Option<String>,
    couch_players: u32,
    lan_players: u32,
    online_players: u32,
    cooptimus_url: &'a str,
    steam_url: &'a str,
    header_image: &'a str,
    short_description: &'a str,
    tags: &'a [String],
}

/// Games and their per-country data read from a legacy file.
#[derive(Debug, Default)]
pub struct LegacyGames {
    pub games: Vec<Game>,
    pub country_data: BTreeMap<String, GameCountryData>,
}

/// Read a legacy games file. A missing file yields no games.
pub fn load_games<P: AsRef<Path>>(path: P) -> Result<LegacyGames> {
    let path = path.as_ref();
    if !path.exists() {
        log::warn!("{} not found. Starting with empty games list.", path.display());
        return Ok(LegacyGames::default());
    }

    let contents = fs::read_to_string(path)?;
    let entries: Vec<LegacyGameIn> = serde_json::from_str(&contents)?;

    let mut out = LegacyGames::default();
    for entry in entries {
        let steam_id = entry.steam_id.into_string();
        let mut game = Game::new(steam_id.clone(), entry.title);
        game.steam_rating = entry.steam_rating;
        game.number_of_reviews = entry.number_of_reviews;
        game.release_date = if entry.is_released {
            entry.release_date.as_deref().and_then(parse_release_date)
        } else {
            None
        };
        game.is_released = entry.is_released;
        game.couch_players = entry.couch_players;
        game.lan_players = entry.lan_players;
        game.online_players = entry.online_players;
        game.cooptimus_url = entry.cooptimus_url.unwrap_or_default();
        if let Some(url) = entry.steam_url.filter(|u| !u.is_empty()) {
            game.steam_url = url;
        }
        game.header_image = entry.header_image.unwrap_or_default();
        game.short_description = entry.short_description.unwrap_or_default();
        game.tags = entry.tags;

        let data = out.country_data.entry(steam_id).or_default();
        for (country, price) in entry.prices {
            data.add_price(&country, price);
        }
        for (country, delisted) in entry.delisted {
            if delisted {
                data.delist(&country);
            }
        }

        out.games.push(game);
    }

    log::info!("Loaded {} games from {}", out.games.len(), path.display());
    Ok(out)
}

/// Write games and their per-country data as a legacy games file.
///
/// The file is written next to `path` first and then renamed into place.
pub fn save_games<P: AsRef<Path>>(
    path: P,
    games: &[Game],
    country_data: &BTreeMap<String, GameCountryData>,
) -> Result<()> {
    let path = path.as_ref();
    let empty = GameCountryData::default();

    let entries: Vec<LegacyGameOut<'_>> = games
        .iter()
        .map(|game| {
            let data = country_data.get(&game.steam_id).unwrap_or(&empty);
            let steam_id = game
                .steam_id
                .parse::<u64>()
                .map(serde_json::Value::from)
                .unwrap_or_else(|_| serde_json::Value::from(game.steam_id.as_str()));
            LegacyGameOut {
                title: &game.title,
                steam_id,
                score: game.score,
                prices: data.prices.iter().map(|(c, p)| (c.as_str(), *p)).collect(),
                delisted: data.delisted.iter().map(|c| (c.as_str(), true)).collect(),
                steam_rating: game.steam_rating,
                number_of_reviews: game.number_of_reviews,
                is_released: game.is_released,
                release_date: game
                    .release_date
                    .map(|d| d.format(LEGACY_DATE_FORMAT).to_string()),
                couch_players: game.couch_players,
                lan_players: game.lan_players,
                online_players: game.online_players,
                cooptimus_url: &game.cooptimus_url,
                steam_url: &game.steam_url,
                header_image: &game.header_image,
                short_description: &game.short_description,
                tags: &game.tags,
            }
        })
        .collect();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(&entries)?)?;
    fs::rename(&tmp, path)?;

    log::info!("Saved {} games to {}", games.len(), path.display());
    Ok(())
}

/// Import a legacy file into `catalog`. Returns how many games were new.
pub fn import_into<P: AsRef<Path>>(catalog: &Catalog, path: P) -> Result<usize> {
    let legacy = load_games(path)?;
    let new_games = catalog.games().save_games(&legacy.games)?;
    catalog.games().save_country_data(&legacy.country_data)?;
    Ok(new_games)
}

/// Export every stored game of `catalog` to a legacy file. Returns the count.
pub fn export_from<P: AsRef<Path>>(catalog: &Catalog, path: P) -> Result<usize> {
    let games = catalog.games().all()?;
    let country_data = catalog.games().country_data()?;
    save_games(path, &games, &country_data)?;
    Ok(games.len())
}
