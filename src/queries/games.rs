//! Game queries against the DuckDB catalogue: scored search, lookups and writes.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::config;
use crate::connection::Connection;
use crate::error::Result;
use crate::models::{
    dedup_by_steam_id, Filters, Game, GameCountryData, GamePage, Pagination, Price, Scoring,
};
use crate::sql_builder::SqlBuilder;

// ---------------------------------------------------------------------------
// GameRow: Flat row shape shared by all game SELECTs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GameRow {
    steam_id: String,
    title: String,
    steam_rating: f64,
    number_of_reviews: u64,
    release_date: Option<String>,
    is_released: bool,
    couch_players: u32,
    lan_players: u32,
    online_players: u32,
    cooptimus_url: String,
    steam_url: String,
    header_image: String,
    short_description: String,
    tags: String,
    #[serde(default)]
    initial_price: Option<i64>,
    #[serde(default)]
    final_price: Option<i64>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    total_count: Option<u64>,
}

impl GameRow {
    fn into_game(self) -> Game {
        let price = match (self.initial_price, self.final_price) {
            (Some(initial), Some(r#final)) => Some(Price::new(initial, r#final)),
            _ => None,
        };
        let release_date = self
            .release_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        let tags = serde_json::from_str(&self.tags).unwrap_or_else(|e| {
            log::warn!("Unreadable tags for {}: {}", self.steam_id, e);
            Vec::new()
        });

        Game {
            steam_id: self.steam_id,
            title: self.title,
            header_image: self.header_image,
            short_description: self.short_description,
            steam_url: self.steam_url,
            cooptimus_url: self.cooptimus_url,
            score: self.score.unwrap_or(0.0),
            price,
            steam_rating: self.steam_rating,
            number_of_reviews: self.number_of_reviews,
            release_date,
            is_released: self.is_released,
            couch_players: self.couch_players,
            lan_players: self.lan_players,
            online_players: self.online_players,
            tags,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    steam_id: String,
    country_code: String,
    initial_price: i64,
    final_price: i64,
}

const GAME_COLUMNS: &[&str] = &[
    "g.steam_id",
    "g.title",
    "g.steam_rating",
    "g.number_of_reviews",
    "g.release_date",
    "g.is_released",
    "g.couch_players",
    "g.lan_players",
    "g.online_players",
    "g.cooptimus_url",
    "g.steam_url",
    "g.header_image",
    "g.short_description",
    "g.tags",
    "gp.initial_price",
    "gp.final_price",
];

/// SQL expression computing [`Scoring::score`] over `game g` joined with `game_price gp`.
///
/// Weights are interpolated rather than bound; callers validate them as finite first.
pub fn score_expression(scoring: &Scoring) -> String {
    format!(
        "CAST(\
         (g.steam_rating * g.steam_rating) * {rating} \
         - (CAST(COALESCE(gp.final_price, 0) AS DOUBLE) / 100.0 / {high_price}) * {price} \
         + CASE WHEN COALESCE(gp.initial_price, 0) > 0 \
                THEN (1.0 - CAST(gp.final_price AS DOUBLE) / gp.initial_price) * {sale} \
                ELSE 0 END \
         + (LN(g.number_of_reviews + 1) / LN({high_reviews})) * {reviews} \
         AS DOUBLE)",
        rating = sql_float(scoring.rating),
        high_price = sql_float(scoring.high_price),
        price = sql_float(scoring.price),
        sale = sql_float(scoring.sale),
        high_reviews = sql_float(config::HIGH_NUMBER_OF_REVIEWS),
        reviews = sql_float(scoring.number_of_reviews),
    )
}

fn sql_float(value: f64) -> String {
    format!("({:?})", value)
}

// ---------------------------------------------------------------------------
// GameQuery
// ---------------------------------------------------------------------------

/// Query interface for co-op games stored in the `game` table.
pub struct GameQuery<'a> {
    conn: &'a Connection,
}

impl<'a> GameQuery<'a> {
    /// Create a new `GameQuery` bound to the given connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // -- Search ------------------------------------------------------------

    /// Return one page of games matching `filters`, best score first.
    ///
    /// `next_index` is the offset of the first game in the page. The returned
    /// `total_games` counts every match, not just the page.
    pub fn search(
        &self,
        filters: &Filters,
        scoring: &Scoring,
        next_index: usize,
        page_size: usize,
    ) -> Result<GamePage> {
        filters.validate()?;
        scoring.validate()?;

        let score = format!("{} AS score", score_expression(scoring));
        let mut columns: Vec<&str> = GAME_COLUMNS.to_vec();
        columns.push(&score);
        columns.push("COUNT(*) OVER () AS total_count");

        let mut qb = filtered_games(filters);
        qb.select(&columns)
            .order_by(&["score DESC", "g.steam_id ASC"])
            .limit(page_size)
            .offset(next_index);

        let (sql, params) = qb.build();
        let rows: Vec<GameRow> = self.conn.execute_into(&sql, &params)?;

        let total_games = match rows.first() {
            Some(row) => row.total_count.unwrap_or(0),
            // Past the last page the window count is unavailable
            None if next_index > 0 => self.count_matching(filters)?,
            None => 0,
        };

        let games: Vec<Game> = rows.into_iter().map(GameRow::into_game).collect();
        let pagination = Pagination::from_window(next_index as u64, page_size as u64, total_games);

        Ok(GamePage {
            games,
            total_games,
            pagination,
        })
    }

    /// Count the games matching `filters`.
    pub fn count_matching(&self, filters: &Filters) -> Result<u64> {
        let mut qb = filtered_games(filters);
        qb.select(&["COUNT(*) AS n"]);
        let (sql, params) = qb.build();
        Ok(self
            .conn
            .execute_scalar(&sql, &params)?
            .and_then(|v| v.as_u64())
            .unwrap_or(0))
    }

    // -- Lookups -----------------------------------------------------------

    /// Get a single game with its price in `country_code`.
    pub fn get(&self, steam_id: &str, country_code: &str) -> Result<Option<Game>> {
        let country = country_code.to_uppercase();
        let (sql, params) = SqlBuilder::new("game g")
            .select(GAME_COLUMNS)
            .join(
                "LEFT JOIN game_price gp ON gp.steam_id = g.steam_id AND gp.country_code = ?",
                &[&country],
            )
            .where_eq("g.steam_id", steam_id)
            .limit(1)
            .build();

        let rows: Vec<GameRow> = self.conn.execute_into(&sql, &params)?;
        Ok(rows.into_iter().next().map(GameRow::into_game))
    }

    /// Total number of stored games.
    pub fn count(&self) -> Result<u64> {
        Ok(self
            .conn
            .execute_scalar("SELECT COUNT(*) FROM game", &[])?
            .and_then(|v| v.as_u64())
            .unwrap_or(0))
    }

    /// Every stored steam id, ascending.
    pub fn all_steam_ids(&self) -> Result<Vec<String>> {
        let rows = self
            .conn
            .execute("SELECT steam_id FROM game ORDER BY steam_id", &[])?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.get("steam_id").and_then(|v| v.as_str()).map(String::from))
            .collect())
    }

    /// Every stored game without price data, ordered by steam id.
    pub fn all(&self) -> Result<Vec<Game>> {
        let (sql, params) = SqlBuilder::new("game g")
            .select(&GAME_COLUMNS[..GAME_COLUMNS.len() - 2])
            .order_by(&["g.steam_id ASC"])
            .build();
        let rows: Vec<GameRow> = self.conn.execute_into(&sql, &params)?;
        Ok(rows.into_iter().map(GameRow::into_game).collect())
    }

    /// Stored prices and delistings, keyed by steam id.
    pub fn country_data(&self) -> Result<BTreeMap<String, GameCountryData>> {
        let mut out: BTreeMap<String, GameCountryData> = BTreeMap::new();

        let prices: Vec<PriceRow> = self.conn.execute_into(
            "SELECT steam_id, country_code, initial_price, final_price FROM game_price \
             ORDER BY steam_id, country_code",
            &[],
        )?;
        for row in prices {
            out.entry(row.steam_id)
                .or_default()
                .add_price(&row.country_code, Price::new(row.initial_price, row.final_price));
        }

        let delisted = self.conn.execute(
            "SELECT steam_id, country_code FROM game_delisted ORDER BY steam_id, country_code",
            &[],
        )?;
        for row in delisted {
            let (Some(steam_id), Some(country)) = (
                row.get("steam_id").and_then(|v| v.as_str()),
                row.get("country_code").and_then(|v| v.as_str()),
            ) else {
                continue;
            };
            out.entry(steam_id.to_string()).or_default().delist(country);
        }

        Ok(out)
    }

    // -- Writes ------------------------------------------------------------

    /// Insert or update games by steam id. Returns how many were new.
    ///
    /// Duplicate steam ids in `games` are collapsed to their first occurrence.
    pub fn save_games(&self, games: &[Game]) -> Result<usize> {
        let games = dedup_by_steam_id(games.to_vec());
        for game in &games {
            game.validate()?;
        }

        let existing: HashSet<String> = self.all_steam_ids()?.into_iter().collect();

        self.conn.transaction(|conn| {
            let mut new_games = 0;
            for game in &games {
                if !existing.contains(&game.steam_id) {
                    new_games += 1;
                }
                upsert_game(conn, game)?;
                log::debug!("Imported {} ({})", game.title, game.steam_id);
            }
            Ok(new_games)
        })
    }

    /// Replace stored prices and delistings for every game in `countries_data`.
    pub fn save_country_data(&self, countries_data: &BTreeMap<String, GameCountryData>) -> Result<()> {
        self.conn.transaction(|conn| {
            for (steam_id, data) in countries_data {
                conn.execute_typed("DELETE FROM game_price WHERE steam_id = ?", &[steam_id])?;
                for (country_code, price) in &data.prices {
                    conn.execute_typed(
                        "INSERT INTO game_price (steam_id, country_code, initial_price, final_price) \
                         VALUES (?, ?, ?, ?)",
                        &[steam_id, country_code, &price.initial, &price.r#final],
                    )?;
                }

                conn.execute_typed("DELETE FROM game_delisted WHERE steam_id = ?", &[steam_id])?;
                for country_code in &data.delisted {
                    conn.execute_typed(
                        "INSERT INTO game_delisted (steam_id, country_code) VALUES (?, ?)",
                        &[steam_id, country_code],
                    )?;
                }
            }
            Ok(())
        })?;

        log::info!("Saved country data for {} games", countries_data.len());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Base query over `game g` with the country price joined and `filters` applied.
fn filtered_games(filters: &Filters) -> SqlBuilder {
    let country = filters.country_code.to_uppercase();
    let min_players = filters.min_supported_players.to_string();
    let max_players = filters.max_supported_players.to_string();

    let mut qb = SqlBuilder::new("game g");
    qb.join(
        "LEFT JOIN game_price gp ON gp.steam_id = g.steam_id AND gp.country_code = ?",
        &[&country],
    );
    qb.where_clause(
        "g.steam_id NOT IN (SELECT steam_id FROM game_delisted WHERE country_code = ?)",
        &[&country],
    );
    qb.where_between(
        &format!("g.{}", filters.player_type.column()),
        &min_players,
        &max_players,
    );

    if !filters.free_games {
        qb.where_clause("COALESCE(gp.final_price, 0) > 0", &[]);
    }

    if !filters.unreleased_games {
        qb.where_clause("g.is_released", &[]);
    }

    if filters.min_reviews > 0 {
        qb.where_gte("g.number_of_reviews", &filters.min_reviews.to_string());
    }

    for tag in &filters.tags {
        qb.where_like("g.tags", &format!("%\"{}\"%", tag.to_lowercase()));
    }

    // Unreleased games have no date; the range only narrows dated games
    if let Some(from) = filters.release_date_from {
        qb.where_clause(
            "(g.release_date IS NULL OR g.release_date >= ?)",
            &[&from.format("%Y-%m-%d").to_string()],
        );
    }
    if let Some(to) = filters.release_date_to {
        qb.where_clause(
            "(g.release_date IS NULL OR g.release_date <= ?)",
            &[&to.format("%Y-%m-%d").to_string()],
        );
    }

    qb
}

fn upsert_game(conn: &Connection, game: &Game) -> Result<usize> {
    let release_date = game.release_date.map(|d| d.format("%Y-%m-%d").to_string());
    let tags = serde_json::to_string(&game.tags)?;
    let number_of_reviews = game.number_of_reviews as i64;
    let couch_players = i64::from(game.couch_players);
    let lan_players = i64::from(game.lan_players);
    let online_players = i64::from(game.online_players);

    conn.execute_typed(
        "INSERT INTO game (\
            steam_id, title, steam_rating, number_of_reviews, release_date, is_released, \
            couch_players, lan_players, online_players, cooptimus_url, steam_url, \
            header_image, short_description, tags, updated_at\
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP) \
         ON CONFLICT (steam_id) DO UPDATE SET \
            title = excluded.title, \
            steam_rating = excluded.steam_rating, \
            number_of_reviews = excluded.number_of_reviews, \
            release_date = excluded.release_date, \
            is_released = excluded.is_released, \
            couch_players = excluded.couch_players, \
            lan_players = excluded.lan_players, \
            online_players = excluded.online_players, \
            cooptimus_url = excluded.cooptimus_url, \
            steam_url = excluded.steam_url, \
            header_image = excluded.header_image, \
            short_description = excluded.short_description, \
            tags = excluded.tags, \
            updated_at = CURRENT_TIMESTAMP",
        &[
            &game.steam_id,
            &game.title,
            &game.steam_rating,
            &number_of_reviews,
            &release_date,
            &game.is_released,
            &couch_players,
            &lan_players,
            &online_players,
            &game.cooptimus_url,
            &game.steam_url,
            &game.header_image,
            &game.short_description,
            &tags,
        ],
    )
}
