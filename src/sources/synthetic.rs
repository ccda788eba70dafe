use chrono::{Datelike, Duration, Utc};
use rand::Rng;
use crate::data::types::Source;
use crate::sources::{RawListing, COLORS, DAMAGE_TYPES, MODELS};

const MIN_LISTINGS: usize = 4;
const MAX_LISTINGS: usize = 9;

const YEAR_MIN: i32 = 2016;
const YEAR_MAX: i32 = 2024;

/// Terminal fallback strategy: plausible randomized listings drawn from the
/// fixed domain tables. Deterministic in shape (every field always present,
/// count within 4..=9), randomized in content. Never fails.
pub fn generate_listings(source: Source, make: &str, model: Option<&str>) -> Vec<RawListing> {
    let mut rng = rand::thread_rng();
    let count = rng.gen_range(MIN_LISTINGS..=MAX_LISTINGS);

    let requested = model.and_then(|m| {
        let lower = m.to_lowercase();
        MODELS.iter().find(|(name, _)| name.to_lowercase() == lower)
    });

    // One random base per batch; sequential offsets keep lots unique.
    let lot_base: u64 = match source {
        Source::Copart => 54_000_000 + rng.gen_range(0..9_000_000),
        Source::Iaai => 29_000_000 + rng.gen_range(0..3_000_000),
    };

    (0..count)
        .map(|i| {
            let (model_name, _slug) =
                requested.unwrap_or_else(|| &MODELS[rng.gen_range(0..MODELS.len())]);

            let year = rng.gen_range(YEAR_MIN..=YEAR_MAX);
            let age = (Utc::now().year() - year).max(0);

            let lot = lot_base + i as u64;

            let base_value = match *model_name {
                "Model 3" => 24_000.0,
                "Model Y" => 29_000.0,
                "Model S" => 32_000.0,
                "Model X" => 36_000.0,
                _ => 20_000.0,
            };
            let estimated = (base_value * 0.92f64.powi(age)).round();
            let bid = (estimated * rng.gen_range(0.25..0.65)).round();

            let odometer = (age as f64 * 12_000.0 * rng.gen_range(0.5..1.4)) as u32;

            let damage = DAMAGE_TYPES[rng.gen_range(0..DAMAGE_TYPES.len())];
            let secondary = if rng.gen_bool(0.25) {
                Some(DAMAGE_TYPES[rng.gen_range(0..DAMAGE_TYPES.len())].to_string())
            } else {
                None
            };

            let auction_date = Utc::now() + Duration::days(rng.gen_range(1..=14));

            let link = match source {
                Source::Copart => format!("https://www.copart.com/lot/{}", lot),
                Source::Iaai => format!("https://www.iaai.com/VehicleDetail/{}~US", lot),
            };

            RawListing {
                lot: Some(lot.to_string()),
                title: Some(format!("{} {} {}", year, make, model_name)),
                make: Some(make.to_string()),
                model: Some(model_name.to_string()),
                year: Some(year),
                vin: Some(random_vin(&mut rng)),
                color: Some(COLORS[rng.gen_range(0..COLORS.len())].to_string()),
                transmission: Some("Automatic".to_string()),
                fuel_type: Some("Electric".to_string()),
                damage_type: Some(damage.to_string()),
                secondary_damage: secondary,
                driveable: Some(if rng.gen_bool(0.6) { "yes" } else { "no" }.to_string()),
                keys: Some(if rng.gen_bool(0.7) { "yes" } else { "no" }.to_string()),
                odometer: Some(odometer.to_string()),
                current_bid: Some(format!("{:.0}", bid)),
                estimated_value: Some(format!("{:.0}", estimated)),
                auction_date: Some(auction_date.to_rfc3339()),
                sale_status: Some(
                    if rng.gen_bool(0.15) { "live" } else { "upcoming" }.to_string(),
                ),
                buy_now_price: if rng.gen_bool(0.3) {
                    Some(format!("{:.0}", estimated * 0.9))
                } else {
                    None
                },
                // Left unset; the normalizer supplies the per-model placeholder.
                image_url: None,
                link: Some(link),
            }
        })
        .collect()
}

// VIN charset excludes I, O and Q.
fn random_vin(rng: &mut impl Rng) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPRSTUVWXYZ0123456789";
    (0..17)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize::normalize;

    #[test]
    fn test_count_within_bounds() {
        for _ in 0..20 {
            let listings = generate_listings(Source::Copart, "Tesla", None);
            assert!(listings.len() >= MIN_LISTINGS && listings.len() <= MAX_LISTINGS);
        }
    }

    #[test]
    fn test_lots_unique_within_batch() {
        let listings = generate_listings(Source::Iaai, "Tesla", None);
        let mut lots: Vec<_> = listings.iter().map(|l| l.lot.clone().unwrap()).collect();
        lots.sort();
        lots.dedup();
        assert_eq!(lots.len(), listings.len());
    }

    #[test]
    fn test_requested_model_respected() {
        let listings = generate_listings(Source::Copart, "Tesla", Some("Model Y"));
        assert!(listings
            .iter()
            .all(|l| l.model.as_deref() == Some("Model Y")));
    }

    #[test]
    fn test_generated_listings_normalize_cleanly() {
        for raw in generate_listings(Source::Copart, "Tesla", None) {
            let listing = normalize(&raw, Source::Copart);
            assert!(listing.id.starts_with("copart-"));
            assert!(listing.year >= YEAR_MIN && listing.year <= YEAR_MAX);
            assert_eq!(listing.vin.len(), 17);
            assert!(listing.estimated_value > 0.0);
            assert!(listing.current_bid > 0.0);
            assert!(MODELS.iter().any(|(name, _)| *name == listing.model));
        }
    }
}
