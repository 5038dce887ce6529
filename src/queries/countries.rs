//! Country queries backed by the countries JSON file.
//!
//! These queries do not touch DuckDB; the list is loaded once when the
//! catalogue is built.

use std::fs;
use std::path::Path;

use crate::error::{CoopGamesError, Result};
use crate::models::Country;

/// Load a `[{"code", "name", "currency"}]` file.
///
/// A missing file yields an empty list; the scraper then collects no prices.
pub fn load_countries<P: AsRef<Path>>(path: P) -> Result<Vec<Country>> {
    let path = path.as_ref();
    if !path.exists() {
        log::warn!("{} not found. Starting with no countries.", path.display());
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path)?;
    let countries: Vec<Country> = serde_json::from_str(&contents)?;
    for country in &countries {
        crate::models::validate_country_code(&country.code).map_err(|_| {
            CoopGamesError::InvalidArgument(format!(
                "{}: invalid country code '{}'",
                path.display(),
                country.code
            ))
        })?;
    }
    log::info!("Loaded {} countries from {}", countries.len(), path.display());
    Ok(countries)
}

// ---------------------------------------------------------------------------
// CountryQuery
// ---------------------------------------------------------------------------

/// Query interface over the loaded country list.
pub struct CountryQuery<'a> {
    countries: &'a [Country],
}

impl<'a> CountryQuery<'a> {
    pub fn new(countries: &'a [Country]) -> Self {
        Self { countries }
    }

    /// All countries, in file order.
    pub fn list(&self) -> &'a [Country] {
        self.countries
    }

    /// Look up a country by code (case-insensitive).
    pub fn get(&self, code: &str) -> Option<&'a Country> {
        self.countries
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
    }

    /// Country codes, in file order.
    pub fn codes(&self) -> Vec<String> {
        self.countries.iter().map(|c| c.code.clone()).collect()
    }
}
