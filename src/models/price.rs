use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Price: Steam price in one country, in minor currency units
// ---------------------------------------------------------------------------

/// Steam price for one country, in minor currency units (e.g. öre, cents).
///
/// Both fields are always present together; a game without pricing data has
/// no `Price` at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub initial: i64,
    pub r#final: i64,
}

impl Price {
    pub fn new(initial: i64, r#final: i64) -> Self {
        Self { initial, r#final }
    }

    /// Whether the game currently costs nothing in this country.
    pub fn is_free(&self) -> bool {
        self.r#final <= 0
    }

    /// Fraction of the initial price currently discounted, in `[0, 1]` for
    /// ordinary sales. Zero when there is no initial price.
    pub fn discount(&self) -> f64 {
        if self.initial > 0 {
            1.0 - self.r#final as f64 / self.initial as f64
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// GameCountryData: Per-country prices and delistings for one game
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameCountryData {
    /// Price per country code.
    pub prices: BTreeMap<String, Price>,
    /// Country codes the game is not sold in.
    pub delisted: BTreeSet<String>,
}

impl GameCountryData {
    pub fn add_price(&mut self, country_code: &str, price: Price) {
        self.prices.insert(country_code.to_string(), price);
    }

    pub fn delist(&mut self, country_code: &str) {
        self.delisted.insert(country_code.to_string());
    }
}
