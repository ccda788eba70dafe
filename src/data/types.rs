use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Upstream auction house an adapter targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Copart,
    Iaai,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Copart, Source::Iaai];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Copart => "copart",
            Source::Iaai => "iaai",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNoUnknown {
    Yes,
    No,
    Unknown,
}

impl YesNoUnknown {
    /// Loose coercion from the strings sources actually emit
    /// ("Yes", "RUN & DRIVE", "true", "N", ...).
    pub fn from_text(s: &str) -> Self {
        let s = s.trim().to_lowercase();
        if s.is_empty() {
            return YesNoUnknown::Unknown;
        }
        if s.starts_with('y') || s == "true" || s.contains("run") {
            YesNoUnknown::Yes
        } else if s.starts_with('n') || s == "false" {
            YesNoUnknown::No
        } else {
            YesNoUnknown::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Upcoming,
    Live,
    Ended,
}

impl SaleStatus {
    pub fn from_text(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "live" | "auction in progress" => SaleStatus::Live,
            "ended" | "sold" | "sale closed" => SaleStatus::Ended,
            _ => SaleStatus::Upcoming,
        }
    }
}

/// One normalized auction-vehicle record from a single source.
/// Immutable once produced; `deal_score` / `is_good_deal` / `deal_reason`
/// are set by the deal scorer, never by source adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    // Identity
    pub id: String,
    pub source: Source,
    pub lot: String,

    // Vehicle descriptors
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: String,
    pub color: String,
    pub transmission: String,
    pub fuel_type: String,

    // Condition
    pub damage_type: String,
    pub secondary_damage: Option<String>,
    pub driveable_certification: YesNoUnknown,
    pub keys_present: YesNoUnknown,
    pub odometer: u32,

    // Commercial
    pub current_bid: f64,
    pub estimated_value: f64,
    pub auction_date: DateTime<Utc>,
    pub sale_status: SaleStatus,
    pub buy_now_price: Option<f64>,

    // Media / link
    pub image_url: String,
    pub link: String,

    // Derived by the deal scorer
    pub deal_score: u32,
    pub is_good_deal: bool,
    pub deal_reason: String,
}

/// Inbound query for an aggregate fetch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQuery {
    pub make: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
}

impl ListingQuery {
    pub fn new(make: impl Into<String>, model: Option<String>) -> Self {
        Self {
            make: make.into(),
            model,
            force_refresh: false,
        }
    }
}

/// Where an aggregate result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultOrigin {
    Cache,
    Scraped,
    Simulated,
    CacheFallback,
}

/// The outbound aggregate: scored listings plus provenance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub listings: Vec<Listing>,
    #[serde(rename = "source")]
    pub origin: ResultOrigin,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_no_unknown_coercion() {
        assert_eq!(YesNoUnknown::from_text("Yes"), YesNoUnknown::Yes);
        assert_eq!(YesNoUnknown::from_text("RUN & DRIVE"), YesNoUnknown::Yes);
        assert_eq!(YesNoUnknown::from_text("no"), YesNoUnknown::No);
        assert_eq!(YesNoUnknown::from_text("N"), YesNoUnknown::No);
        assert_eq!(YesNoUnknown::from_text(""), YesNoUnknown::Unknown);
        assert_eq!(YesNoUnknown::from_text("maybe"), YesNoUnknown::Unknown);
    }

    #[test]
    fn test_sale_status_coercion() {
        assert_eq!(SaleStatus::from_text("Live"), SaleStatus::Live);
        assert_eq!(SaleStatus::from_text("Sold"), SaleStatus::Ended);
        assert_eq!(SaleStatus::from_text("whatever"), SaleStatus::Upcoming);
    }

    #[test]
    fn test_origin_serialization() {
        assert_eq!(
            serde_json::to_string(&ResultOrigin::CacheFallback).unwrap(),
            "\"cache-fallback\""
        );
        assert_eq!(
            serde_json::to_string(&ResultOrigin::Scraped).unwrap(),
            "\"scraped\""
        );
    }
}
