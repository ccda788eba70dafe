use chrono::{DateTime, Utc};
use regex::Regex;
use crate::data::types::{Listing, SaleStatus, Source, YesNoUnknown};
use crate::sources::{self, RawListing};

/// Map one raw per-source listing into the canonical shape.
///
/// Total by contract: never fails, and every required field comes out
/// populated. Anything the source omitted gets a neutral default (`0`, `""`,
/// `"Unknown"`, or the current timestamp) because the deal scorer and the
/// consuming UI assume full field presence. Per-source field-NAME mapping
/// happens in the adapters' DTO conversions; this layer owns coercion and
/// derivation.
pub fn normalize(raw: &RawListing, source: Source) -> Listing {
    let lot = raw
        .lot
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_string();

    let title = raw.title.as_deref().unwrap_or("");

    let model = raw
        .model
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| model_from_text(title).map(str::to_string))
        .unwrap_or_else(|| "Unknown".to_string());

    let make = raw
        .make
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        // The model vocabulary is single-make; a matched model implies it.
        .or_else(|| model_from_text(title).map(|_| "Tesla".to_string()))
        .unwrap_or_else(|| "Unknown".to_string());

    let year = raw
        .year
        .filter(|y| *y > 0)
        .or_else(|| year_from_text(title))
        .unwrap_or(0);

    let current_bid = raw
        .current_bid
        .as_deref()
        .and_then(parse_money)
        .unwrap_or(0.0);

    let estimated_value = raw
        .estimated_value
        .as_deref()
        .and_then(parse_money)
        .filter(|v| *v > 0.0)
        .unwrap_or_else(|| sources::impute_estimated_value(current_bid));

    let secondary_damage = raw
        .secondary_damage
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"))
        .map(str::to_string);

    let image_url = raw
        .image_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| placeholder_image(&model).to_string());

    Listing {
        id: format!("{}-{}", source.as_str(), lot),
        source,
        lot,
        make,
        model,
        year,
        vin: raw
            .vin
            .as_deref()
            .map(str::trim)
            .filter(|v| v.len() == 17)
            .unwrap_or("")
            .to_string(),
        color: text_or_unknown(raw.color.as_deref()),
        transmission: text_or_unknown(raw.transmission.as_deref()),
        fuel_type: text_or_unknown(raw.fuel_type.as_deref()),
        damage_type: text_or_unknown(raw.damage_type.as_deref()),
        secondary_damage,
        driveable_certification: raw
            .driveable
            .as_deref()
            .map(YesNoUnknown::from_text)
            .unwrap_or(YesNoUnknown::Unknown),
        keys_present: raw
            .keys
            .as_deref()
            .map(YesNoUnknown::from_text)
            .unwrap_or(YesNoUnknown::Unknown),
        odometer: raw.odometer.as_deref().and_then(parse_count).unwrap_or(0),
        current_bid,
        estimated_value,
        auction_date: raw
            .auction_date
            .as_deref()
            .and_then(parse_date)
            .unwrap_or_else(Utc::now),
        sale_status: raw
            .sale_status
            .as_deref()
            .map(SaleStatus::from_text)
            .unwrap_or(SaleStatus::Upcoming),
        buy_now_price: raw
            .buy_now_price
            .as_deref()
            .and_then(parse_money)
            .filter(|p| *p > 0.0),
        image_url,
        link: raw
            .link
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .to_string(),
        deal_score: 0,
        is_good_deal: false,
        deal_reason: String::new(),
    }
}

fn text_or_unknown(s: Option<&str>) -> String {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

/// Parse an integer count out of noisy source text ("42,315 mi" -> 42315).
/// Thousands separators are stripped before parsing.
pub fn parse_count(s: &str) -> Option<u32> {
    let cleaned: String = s
        .replace(',', "")
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    cleaned.parse().ok()
}

/// Parse a money amount out of noisy source text ("$8,250.00" -> 8250.0).
pub fn parse_money(s: &str) -> Option<f64> {
    let cleaned: String = s
        .replace(',', "")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().ok().filter(|v: &f64| v.is_finite() && *v >= 0.0)
}

/// Pull a 4-digit model year out of free text ("2021 Tesla Model 3 LR AWD").
pub fn year_from_text(s: &str) -> Option<i32> {
    let re = Regex::new(r"\b(19|20)\d{2}\b").ok()?;
    re.find(s).and_then(|m| m.as_str().parse().ok())
}

/// Match a model name by exact case-insensitive substring against the fixed
/// vocabulary. First match in table order wins.
pub fn model_from_text(s: &str) -> Option<&'static str> {
    let lower = s.to_lowercase();
    sources::MODELS
        .iter()
        .find(|(name, _)| lower.contains(&name.to_lowercase()))
        .map(|(name, _)| *name)
}

/// Placeholder photo for listings where no image was extracted.
pub fn placeholder_image(model: &str) -> &'static str {
    match sources::MODELS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(model))
    {
        Some((_, "model-3")) => "/images/placeholders/model-3.jpg",
        Some((_, "model-y")) => "/images/placeholders/model-y.jpg",
        Some((_, "model-s")) => "/images/placeholders/model-s.jpg",
        Some((_, "model-x")) => "/images/placeholders/model-x.jpg",
        _ => "/images/placeholders/vehicle.jpg",
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            // Some sources send epoch millis as a bare number
            s.trim().parse::<i64>().ok().and_then(|ms| {
                DateTime::from_timestamp_millis(ms)
            })
        })
}
