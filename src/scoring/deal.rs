use chrono::{Datelike, Utc};
use crate::data::types::{Listing, YesNoUnknown};

/// Minimum score for a listing to be flagged a good deal.
pub const GOOD_DEAL_THRESHOLD: u32 = 4;
/// Score at which the label upgrades to exceptional.
pub const EXCEPTIONAL_THRESHOLD: u32 = 6;

/// Bid-to-value ratio at or under which the price criterion fires.
pub const PRICE_RATIO_CUTOFF: f64 = 0.75;
/// Expected miles accumulated per year of vehicle age.
pub const MILES_PER_YEAR: f64 = 12_000.0;
/// Odometer must be under this fraction of expected mileage to count as low.
pub const LOW_MILEAGE_FACTOR: f64 = 0.8;

pub const MINOR_DAMAGE_TYPES: [&str; 2] = ["Minor Dents", "Minor Scratches"];

/// Score every listing against the current calendar year.
pub fn score(listings: Vec<Listing>) -> Vec<Listing> {
    score_at_year(listings, Utc::now().year())
}

/// Pure scoring pass: four independent additive criteria, then a hard final
/// threshold. Criterion order only affects the reason string, never the
/// score. A listing that fires only the price criterion (score 3) ends up
/// NOT flagged good — the final threshold overrides the provisional flag.
pub fn score_at_year(listings: Vec<Listing>, eval_year: i32) -> Vec<Listing> {
    listings
        .into_iter()
        .map(|l| score_listing(l, eval_year))
        .collect()
}

fn score_listing(mut listing: Listing, eval_year: i32) -> Listing {
    let mut score: u32 = 0;
    let mut reasons: Vec<&str> = Vec::new();

    // 1. Price-to-value ratio. Denominator floored at 1 so a zero estimated
    //    value cannot divide by zero.
    let ratio = listing.current_bid / listing.estimated_value.max(1.0);
    if ratio <= PRICE_RATIO_CUTOFF {
        score += 3;
        reasons.push("Price significantly below market value");
    }

    // 2. Mileage for age. Age is deliberately not clamped at zero: a future
    //    model year yields a negative expected mileage, and the criterion
    //    simply cannot fire for such listings.
    let age_years = eval_year - listing.year;
    let expected_mileage = age_years as f64 * MILES_PER_YEAR;
    if (listing.odometer as f64) < expected_mileage * LOW_MILEAGE_FACTOR {
        score += 2;
        reasons.push("Low mileage for age");
    }

    // 3. Damage severity.
    if MINOR_DAMAGE_TYPES.contains(&listing.damage_type.as_str())
        && listing.secondary_damage.is_none()
    {
        score += 2;
        reasons.push("Minor damage only");
    }

    // 4. Operability.
    if listing.keys_present == YesNoUnknown::Yes
        && listing.driveable_certification == YesNoUnknown::Yes
    {
        score += 1;
        reasons.push("Driveable with keys");
    }

    listing.deal_score = score;
    listing.is_good_deal = score >= GOOD_DEAL_THRESHOLD;
    listing.deal_reason = if score >= EXCEPTIONAL_THRESHOLD {
        format!("EXCEPTIONAL DEAL: {}", reasons.join(" + "))
    } else if score >= GOOD_DEAL_THRESHOLD {
        format!("GOOD DEAL: {}", reasons.join(" + "))
    } else {
        String::new()
    };

    listing
}
