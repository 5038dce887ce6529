use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::price::Price;
use crate::config;
use crate::error::{CoopGamesError, Result};

// ---------------------------------------------------------------------------
// Game: A co-op game as exchanged with the front end
// ---------------------------------------------------------------------------

/// A co-op PC game, identified by its Steam app id.
///
/// `price` is the price in the country the game was queried for; `None`
/// means no pricing data is available there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub steam_id: String,
    pub title: String,
    #[serde(default)]
    pub header_image: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub steam_url: String,
    #[serde(default)]
    pub cooptimus_url: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub steam_rating: f64,
    #[serde(default)]
    pub number_of_reviews: u64,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default = "default_is_released")]
    pub is_released: bool,
    #[serde(default)]
    pub couch_players: u32,
    #[serde(default)]
    pub lan_players: u32,
    #[serde(default)]
    pub online_players: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_is_released() -> bool {
    true
}

impl Game {
    /// Create a game with the given id and title and empty metadata.
    pub fn new(steam_id: impl Into<String>, title: impl Into<String>) -> Self {
        let steam_id = steam_id.into();
        Self {
            steam_url: steam_store_url(&steam_id),
            steam_id,
            title: title.into(),
            header_image: String::new(),
            short_description: String::new(),
            cooptimus_url: String::new(),
            score: 0.0,
            price: None,
            steam_rating: 0.0,
            number_of_reviews: 0,
            release_date: None,
            is_released: true,
            couch_players: 0,
            lan_players: 0,
            online_players: 0,
            tags: Vec::new(),
        }
    }

    /// Check the structural invariants of a single game.
    pub fn validate(&self) -> Result<()> {
        if self.steam_id.trim().is_empty() {
            return Err(CoopGamesError::InvalidArgument(format!(
                "game '{}' has an empty steam_id",
                self.title
            )));
        }
        Ok(())
    }
}

/// Store page URL for a Steam app id.
pub fn steam_store_url(steam_id: &str) -> String {
    format!("{}/{}", config::STEAM_STORE_APP_URL, steam_id)
}

/// Check that every game is valid and no steam_id appears twice.
pub fn ensure_unique_steam_ids(games: &[Game]) -> Result<()> {
    let mut seen = HashSet::with_capacity(games.len());
    for game in games {
        game.validate()?;
        if !seen.insert(game.steam_id.as_str()) {
            return Err(CoopGamesError::InvalidArgument(format!(
                "duplicate steam_id {}",
                game.steam_id
            )));
        }
    }
    Ok(())
}

/// Drop games whose steam_id was already seen, keeping the first occurrence.
pub fn dedup_by_steam_id(games: Vec<Game>) -> Vec<Game> {
    let mut seen = HashSet::with_capacity(games.len());
    games
        .into_iter()
        .filter(|g| seen.insert(g.steam_id.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// GamePage: One page of a scored game query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamePage {
    pub games: Vec<Game>,
    pub total_games: u64,
    pub pagination: super::Pagination,
}
