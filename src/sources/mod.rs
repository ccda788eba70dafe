pub mod api;
pub mod scrape;
pub mod synthetic;

use serde::Deserialize;
use std::time::Duration;

/// One pre-normalization listing as an adapter extracted it. Every field is
/// optional; the normalizer fills whatever a source left out.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawListing {
    pub lot: Option<String>,
    pub title: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub vin: Option<String>,
    pub color: Option<String>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    pub damage_type: Option<String>,
    pub secondary_damage: Option<String>,
    pub driveable: Option<String>,
    pub keys: Option<String>,
    pub odometer: Option<String>,
    pub current_bid: Option<String>,
    pub estimated_value: Option<String>,
    pub auction_date: Option<String>,
    pub sale_status: Option<String>,
    pub buy_now_price: Option<String>,
    pub image_url: Option<String>,
    pub link: Option<String>,
}

/// Why one adapter strategy attempt failed. Failure here only advances the
/// fallback chain; it never reaches the aggregate caller.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("http status {0}")]
    Status(reqwest::StatusCode),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("bad url: {0}")]
    Url(String),

    #[error("response missing expected path {0}")]
    MissingPath(&'static str),

    #[error("no usable listings extracted")]
    NoListings,

    #[error("strategy disabled by config")]
    Disabled,

    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),
}

/// Fixed vehicle vocabulary: (display name, url slug). Shared by the model
/// keyword matcher, the synthetic generator, and the placeholder images.
pub const MODELS: [(&str, &str); 4] = [
    ("Model 3", "model-3"),
    ("Model Y", "model-y"),
    ("Model S", "model-s"),
    ("Model X", "model-x"),
];

pub const DAMAGE_TYPES: [&str; 8] = [
    "Front End",
    "Rear End",
    "Side",
    "Minor Dents",
    "Minor Scratches",
    "Undercarriage",
    "Water/Flood",
    "Hail",
];

pub const COLORS: [&str; 7] = [
    "White", "Black", "Blue", "Red", "Silver", "Gray", "Green",
];

/// Standard imputation when a source provides only a current bid.
pub fn impute_estimated_value(current_bid: f64) -> f64 {
    (current_bid * 1.5).round()
}
