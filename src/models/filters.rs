use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config;
use crate::error::{CoopGamesError, Result};

// ---------------------------------------------------------------------------
// PlayerType: Which kind of co-op the player range applies to
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerType {
    Couch,
    Lan,
    #[default]
    Online,
}

impl PlayerType {
    /// The `game` column holding the supported player count for this type.
    pub fn column(&self) -> &'static str {
        match self {
            PlayerType::Couch => "couch_players",
            PlayerType::Lan => "lan_players",
            PlayerType::Online => "online_players",
        }
    }

    /// Read a request parameter; anything other than couch or lan means online.
    pub fn from_param(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for PlayerType {
    type Err = CoopGamesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "couch" => Ok(PlayerType::Couch),
            "lan" => Ok(PlayerType::Lan),
            "online" => Ok(PlayerType::Online),
            other => Err(CoopGamesError::InvalidArgument(format!(
                "Invalid player_type '{}'. Expected couch, lan or online",
                other
            ))),
        }
    }
}

impl fmt::Display for PlayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayerType::Couch => "couch",
            PlayerType::Lan => "lan",
            PlayerType::Online => "online",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Filters: Game query filters
// ---------------------------------------------------------------------------

/// Which games a query returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    pub country_code: String,
    pub min_supported_players: u32,
    pub max_supported_players: u32,
    pub player_type: PlayerType,
    pub free_games: bool,
    pub unreleased_games: bool,
    pub release_date_from: Option<NaiveDate>,
    pub release_date_to: Option<NaiveDate>,
    pub min_reviews: u64,
    pub tags: Vec<String>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            country_code: config::DEFAULT_COUNTRY_CODE.to_string(),
            min_supported_players: 1,
            max_supported_players: 100,
            player_type: PlayerType::Online,
            free_games: true,
            unreleased_games: true,
            release_date_from: parse_date(config::DEFAULT_RELEASE_DATE_FROM, "release_date_from")
                .ok(),
            release_date_to: Some(chrono::Local::now().date_naive()),
            min_reviews: 0,
            tags: Vec::new(),
        }
    }
}

impl Filters {
    pub fn validate(&self) -> Result<()> {
        if self.min_supported_players < 1 || self.max_supported_players < 1 {
            return Err(CoopGamesError::InvalidArgument(
                "Player counts must be greater than 0".into(),
            ));
        }
        if self.min_supported_players > self.max_supported_players {
            return Err(CoopGamesError::InvalidArgument(
                "min_supported_players cannot be greater than max_supported_players".into(),
            ));
        }
        if let (Some(from), Some(to)) = (self.release_date_from, self.release_date_to) {
            if from > to {
                return Err(CoopGamesError::InvalidArgument(
                    "release_date_from cannot be later than release_date_to".into(),
                ));
            }
        }
        validate_country_code(&self.country_code)?;
        Ok(())
    }
}

/// Parse a `YYYY-MM-DD` date, naming the offending parameter on failure.
pub fn parse_date(value: &str, param_name: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        CoopGamesError::InvalidArgument(format!(
            "Invalid date format for {}. Expected format: YYYY-MM-DD",
            param_name
        ))
    })
}

/// Split a pipe-separated tag list into trimmed, lowercased, non-empty tags.
pub fn parse_tags(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn validate_country_code(code: &str) -> Result<()> {
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoopGamesError::InvalidArgument(
            "Invalid country code. Must be a 2-letter ISO code.".into(),
        ));
    }
    Ok(())
}
