use serde::{Deserialize, Serialize};

use super::game::Game;
use super::price::Price;
use crate::config;
use crate::error::{CoopGamesError, Result};

/// Weights used to rank games.
///
/// `high_price` is what counts as an expensive game, in major currency units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scoring {
    pub rating: f64,
    pub price: f64,
    pub sale: f64,
    pub number_of_reviews: f64,
    pub high_price: f64,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            rating: 0.7,
            price: 0.3,
            sale: 0.0,
            number_of_reviews: 0.0,
            high_price: 20.0,
        }
    }
}

impl Scoring {
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("rating_weight", self.rating),
            ("price_weight", self.price),
            ("sale_weight", self.sale),
            ("number_of_reviews_weight", self.number_of_reviews),
            ("high_price", self.high_price),
        ];
        for (name, value) in weights {
            if !value.is_finite() {
                return Err(CoopGamesError::InvalidArgument(format!(
                    "{} must be a finite number",
                    name
                )));
            }
        }
        if self.high_price <= 0.0 {
            return Err(CoopGamesError::InvalidArgument(
                "high_price must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Score a game. Higher is better.
    ///
    /// Must stay in line with the SQL ranking in
    /// [`GameQuery::search`](crate::queries::GameQuery::search).
    pub fn score(&self, game: &Game) -> f64 {
        let price = game.price.unwrap_or(Price::new(0, 0));
        let rating_score = game.steam_rating * game.steam_rating * self.rating;
        let price_score = -(price.r#final as f64 / 100.0 / self.high_price) * self.price;
        let sale_score = price.discount() * self.sale;
        let reviews_score = ((game.number_of_reviews as f64 + 1.0).ln()
            / config::HIGH_NUMBER_OF_REVIEWS.ln())
            * self.number_of_reviews;
        rating_score + price_score + sale_score + reviews_score
    }
}
