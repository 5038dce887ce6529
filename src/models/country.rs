use serde::{Deserialize, Serialize};

/// A country prices are scraped for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// ISO 3166-1 alpha-2 code, also used as Steam's `cc` parameter.
    pub code: String,
    pub name: String,
    /// ISO 4217 currency code.
    pub currency: String,
}
