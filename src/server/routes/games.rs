use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::models::{parse_date, parse_tags, Filters, Game, Pagination, PlayerType, Scoring};
use crate::server::error::AppError;
use crate::server::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct GamesParams {
    pub min_supported_players: Option<i64>,
    pub max_supported_players: Option<i64>,
    pub player_type: Option<String>,
    pub free_games: Option<bool>,
    pub unreleased_games: Option<bool>,
    pub release_date_from: Option<String>,
    pub release_date_to: Option<String>,
    pub min_reviews: Option<u64>,
    pub tags: Option<String>,
    pub rating_weight: Option<f64>,
    pub price_weight: Option<f64>,
    pub sale_weight: Option<f64>,
    pub number_of_reviews_weight: Option<f64>,
    pub high_price: Option<f64>,
    pub next_index: Option<i64>,
    pub country_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GamesResponse {
    pub games: Vec<Game>,
    pub total_games: u64,
    pub pagination: Pagination,
    pub scraping_in_progress: bool,
    pub last_scrape_hours_ago: f64,
}

impl GamesParams {
    /// Turn the query string into validated filters, scoring and offset.
    pub fn into_query(self) -> Result<(Filters, Scoring, usize), AppError> {
        let defaults = Filters::default();

        let release_date_from = match &self.release_date_from {
            Some(s) => Some(parse_date(s, "release_date_from")?),
            None => defaults.release_date_from,
        };
        let release_date_to = match &self.release_date_to {
            Some(s) => Some(parse_date(s, "release_date_to")?),
            None => defaults.release_date_to,
        };

        let min_players = self
            .min_supported_players
            .unwrap_or(i64::from(defaults.min_supported_players));
        let max_players = self
            .max_supported_players
            .unwrap_or(i64::from(defaults.max_supported_players));
        if min_players < 1 || max_players < 1 {
            return Err(AppError::bad_request("Player counts must be greater than 0"));
        }

        let next_index = self.next_index.unwrap_or(0);
        if next_index < 0 {
            return Err(AppError::bad_request(
                "Next index number must be greater or equal to 0",
            ));
        }

        let player_type = self
            .player_type
            .as_deref()
            .map_or(defaults.player_type, PlayerType::from_param);

        let filters = Filters {
            country_code: self
                .country_code
                .unwrap_or(defaults.country_code)
                .to_uppercase(),
            min_supported_players: u32::try_from(min_players).unwrap_or(u32::MAX),
            max_supported_players: u32::try_from(max_players).unwrap_or(u32::MAX),
            player_type,
            free_games: self.free_games.unwrap_or(defaults.free_games),
            unreleased_games: self.unreleased_games.unwrap_or(defaults.unreleased_games),
            release_date_from,
            release_date_to,
            min_reviews: self.min_reviews.unwrap_or(defaults.min_reviews),
            tags: self.tags.as_deref().map(parse_tags).unwrap_or_default(),
        };
        filters.validate()?;

        let default_scoring = Scoring::default();
        let scoring = Scoring {
            rating: self.rating_weight.unwrap_or(default_scoring.rating),
            price: self.price_weight.unwrap_or(default_scoring.price),
            sale: self.sale_weight.unwrap_or(default_scoring.sale),
            number_of_reviews: self
                .number_of_reviews_weight
                .unwrap_or(default_scoring.number_of_reviews),
            high_price: self.high_price.unwrap_or(default_scoring.high_price),
        };
        scoring.validate()?;

        Ok((filters, scoring, next_index as usize))
    }
}

/// GET /games?player_type=couch&tags=puzzle|platformer&next_index=10
///
/// One page of games matching the filters, best score first.
pub async fn list_games(
    State(state): State<Arc<AppState>>,
    params: Result<Query<GamesParams>, QueryRejection>,
) -> Result<Json<GamesResponse>, AppError> {
    let Query(params) = params?;
    let (filters, scoring, next_index) = params.into_query()?;

    let page = state
        .catalog
        .search(filters, scoring, next_index, config::DEFAULT_PAGE_SIZE)
        .await?;
    let status = state.scheduler.status();

    Ok(Json(GamesResponse {
        games: page.games,
        total_games: page.total_games,
        pagination: page.pagination,
        scraping_in_progress: status.scraping_in_progress,
        last_scrape_hours_ago: status.last_scrape_hours_ago,
    }))
}

/// GET /countries
pub async fn list_countries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<crate::models::Country>>, AppError> {
    Ok(Json(state.catalog.countries().await?))
}
