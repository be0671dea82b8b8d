use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One page of the `Usage/Records.json` listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageSnapshot {
    #[serde(default)]
    pub first_page_uri: Option<String>,
    #[serde(default)]
    pub previous_page_uri: Option<String>,
    /// Ignored; only the first page is ever fetched.
    #[serde(default)]
    pub next_page_uri: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub page_size: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub end: u64,
    #[serde(default)]
    pub usage_records: Vec<UsageRecord>,
}

/// Usage of one billing category over the current period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageRecord {
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    /// Number of billable events (e.g. calls placed)
    #[serde(default, deserialize_with = "decimal_string")]
    pub count: f64,
    #[serde(default)]
    pub count_unit: Option<String>,
    /// Usage in the category's own unit (e.g. minutes)
    #[serde(default, deserialize_with = "decimal_string")]
    pub usage: f64,
    #[serde(default)]
    pub usage_unit: Option<String>,
    #[serde(default, deserialize_with = "decimal_string")]
    pub price: f64,
    #[serde(default)]
    pub price_unit: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Decimal {
    Number(f64),
    Text(String),
}

/// The API sends quantities as strings ("42.0"); accept bare numbers too.
/// Null and empty strings decode as zero.
fn decimal_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Decimal>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(Decimal::Number(n)) => Ok(n),
        Some(Decimal::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0.0);
            }
            trimmed.parse::<f64>().map_err(|e| {
                serde::de::Error::custom(format!("invalid decimal '{}': {}", trimmed, e))
            })
        }
    }
}
