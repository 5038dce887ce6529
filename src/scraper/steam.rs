//! Steam store, Steam reviews and SteamSpy response parsing.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::models::{GameCountryData, Price};

// ---------------------------------------------------------------------------
// App details
// ---------------------------------------------------------------------------

/// Store metadata for one app.
#[derive(Debug, Clone, PartialEq)]
pub struct AppDetails {
    pub header_image: String,
    pub short_description: String,
    /// `None` when the game is not released yet (or its date is unreadable).
    pub release_date: Option<NaiveDate>,
}

/// Parse an `appdetails` response for a single app.
///
/// Returns `None` when Steam reports no data for the app, which means it has
/// been removed from the store.
pub fn parse_app_details(body: &str, steam_id: &str) -> Result<Option<AppDetails>> {
    let response: Value = serde_json::from_str(body)?;
    let entry = match response.get(steam_id) {
        Some(entry) if entry.get("success").and_then(Value::as_bool) == Some(true) => entry,
        _ => return Ok(None),
    };
    let data = match entry.get("data") {
        Some(data) if data.is_object() => data,
        _ => return Ok(None),
    };

    let text = |key: &str| {
        data.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let release = data.get("release_date");
    let coming_soon = release
        .and_then(|r| r.get("coming_soon"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let release_date = if coming_soon {
        None
    } else {
        release
            .and_then(|r| r.get("date"))
            .and_then(Value::as_str)
            .and_then(parse_release_date)
    };

    Ok(Some(AppDetails {
        header_image: text("header_image"),
        short_description: text("short_description"),
        release_date,
    }))
}

/// Parse a store release date such as `"20 Aug, 2019"` or `"Aug 20, 2019"`.
pub fn parse_release_date(value: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &["%d %b, %Y", "%b %d, %Y", "%d %B, %Y", "%B %d, %Y"];
    let value = value.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ReviewsResponse {
    #[serde(default)]
    query_summary: QuerySummary,
}

#[derive(Debug, Default, Deserialize)]
struct QuerySummary {
    #[serde(default)]
    total_reviews: u64,
    #[serde(default)]
    total_positive: u64,
}

/// Review totals for one app.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewSummary {
    pub number_of_reviews: u64,
    /// Share of positive reviews in `[0, 1]`, zero without reviews.
    pub steam_rating: f64,
}

pub fn parse_reviews(body: &str) -> Result<ReviewSummary> {
    let response: ReviewsResponse = serde_json::from_str(body)?;
    let summary = response.query_summary;
    let steam_rating = if summary.total_reviews == 0 {
        0.0
    } else {
        summary.total_positive as f64 / summary.total_reviews as f64
    };
    Ok(ReviewSummary {
        number_of_reviews: summary.total_reviews,
        steam_rating,
    })
}

pub fn reviews_params() -> Vec<(&'static str, String)> {
    vec![
        ("json", "1".to_string()),
        ("num_per_page", "1".to_string()),
        ("language", "all".to_string()),
        ("purchase_type", "all".to_string()),
    ]
}

// ---------------------------------------------------------------------------
// SteamSpy tags
// ---------------------------------------------------------------------------

/// Tag names from a SteamSpy `appdetails` response, most voted first.
///
/// SteamSpy answers `"tags": []` for apps without tags; anything that is not
/// an object yields no tags.
pub fn parse_steamspy_tags(body: &str) -> Vec<String> {
    let response: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Unreadable SteamSpy response: {}", e);
            return Vec::new();
        }
    };
    match response.get("tags") {
        Some(Value::Object(tags)) => tags.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PriceOverview {
    initial: i64,
    #[serde(rename = "final")]
    final_price: i64,
}

/// Merge one country's batched `price_overview` response into `out`.
///
/// An app Steam reports as unsuccessful is delisted in that country. A
/// successful app without `price_overview` (Steam sends `"data": []`) is
/// listed without a price.
pub fn merge_price_batch(
    body: &str,
    steam_ids: &[String],
    country_code: &str,
    out: &mut BTreeMap<String, GameCountryData>,
) -> Result<()> {
    let response: Value = serde_json::from_str(body)?;

    for steam_id in steam_ids {
        let data = out.entry(steam_id.clone()).or_default();
        let entry = response.get(steam_id.as_str());

        let success = entry
            .and_then(|e| e.get("success"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !success {
            data.delist(country_code);
            continue;
        }

        let overview = entry
            .and_then(|e| e.get("data"))
            .and_then(|d| d.get("price_overview"));
        if let Some(overview) = overview {
            match PriceOverview::deserialize(overview) {
                Ok(p) => data.add_price(country_code, Price::new(p.initial, p.final_price)),
                Err(e) => log::warn!(
                    "Unreadable price for {} in {}: {}",
                    steam_id,
                    country_code,
                    e
                ),
            }
        }
    }

    Ok(())
}

pub fn price_params(steam_ids: &[String], country_code: &str) -> Vec<(&'static str, String)> {
    vec![
        ("appids", steam_ids.join(",")),
        ("cc", country_code.to_string()),
        ("filters", "price_overview".to_string()),
    ]
}
