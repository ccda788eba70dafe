use serde::{Deserialize, Serialize};

/// Repair severity tiers used by the cost table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
}

/// Resale values at the reference year, by (model, trim). Values drift by a
/// fixed yearly factor either side of the reference.
const REFERENCE_YEAR: i32 = 2022;
const YEARLY_VALUE_FACTOR: f64 = 0.93;
const VALUE_FLOOR_FRACTION: f64 = 0.30;
const DEFAULT_BASE_VALUE: f64 = 20_000.0;

const BASE_VALUES: [(&str, &str, f64); 12] = [
    ("Model 3", "Standard Range", 24_000.0),
    ("Model 3", "Long Range", 28_000.0),
    ("Model 3", "Performance", 31_000.0),
    ("Model Y", "Standard Range", 28_000.0),
    ("Model Y", "Long Range", 32_000.0),
    ("Model Y", "Performance", 36_000.0),
    ("Model S", "Standard Range", 34_000.0),
    ("Model S", "Long Range", 40_000.0),
    ("Model S", "Plaid", 55_000.0),
    ("Model X", "Standard Range", 42_000.0),
    ("Model X", "Long Range", 48_000.0),
    ("Model X", "Plaid", 62_000.0),
];

/// Fixed repair-cost table: (damage type, [minor, moderate, severe]).
const REPAIR_COSTS: [(&str, [f64; 3]); 8] = [
    ("Front End", [1_500.0, 4_000.0, 8_000.0]),
    ("Rear End", [1_200.0, 3_500.0, 7_000.0]),
    ("Side", [1_300.0, 3_800.0, 7_500.0]),
    ("Minor Dents", [400.0, 900.0, 1_800.0]),
    ("Minor Scratches", [300.0, 700.0, 1_500.0]),
    ("Undercarriage", [2_000.0, 5_000.0, 10_000.0]),
    ("Water/Flood", [3_000.0, 8_000.0, 15_000.0]),
    ("Hail", [800.0, 2_000.0, 4_500.0]),
];

const UNKNOWN_DAMAGE_COSTS: [f64; 3] = [1_000.0, 3_000.0, 6_000.0];

pub const BATTERY_REPLACEMENT_COST: f64 = 13_000.0;
pub const MOTOR_REPLACEMENT_COST: f64 = 6_500.0;

/// Resale value from the fixed table, indexed by (model, year, trim).
/// Unknown models or trims fall back to a flat default so the estimator
/// stays total.
pub fn base_resale_value(model: &str, year: i32, trim: &str) -> f64 {
    let base = BASE_VALUES
        .iter()
        .find(|(m, t, _)| m.eq_ignore_ascii_case(model) && t.eq_ignore_ascii_case(trim))
        .or_else(|| {
            BASE_VALUES
                .iter()
                .find(|(m, _, _)| m.eq_ignore_ascii_case(model))
        })
        .map(|(_, _, v)| *v)
        .unwrap_or(DEFAULT_BASE_VALUE);

    let years_off = year - REFERENCE_YEAR;
    let adjusted = base * YEARLY_VALUE_FACTOR.powi(-years_off);
    adjusted.max(base * VALUE_FLOOR_FRACTION)
}

/// Repair cost from the fixed table, indexed by (damage type, severity).
/// No damage means no repair; unrecognized damage uses the flat default.
pub fn repair_cost(damage_type: &str, severity: Severity) -> f64 {
    let trimmed = damage_type.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return 0.0;
    }

    let tiers = REPAIR_COSTS
        .iter()
        .find(|(d, _)| d.eq_ignore_ascii_case(damage_type))
        .map(|(_, tiers)| *tiers)
        .unwrap_or(UNKNOWN_DAMAGE_COSTS);

    match severity {
        Severity::Minor => tiers[0],
        Severity::Moderate => tiers[1],
        Severity::Severe => tiers[2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_value_exact_match() {
        assert_eq!(base_resale_value("Model 3", 2022, "Long Range"), 28_000.0);
    }

    #[test]
    fn test_base_value_older_year_worth_less() {
        let at_ref = base_resale_value("Model 3", 2022, "Long Range");
        let older = base_resale_value("Model 3", 2019, "Long Range");
        let newer = base_resale_value("Model 3", 2023, "Long Range");
        assert!(older < at_ref);
        assert!(newer > at_ref);
    }

    #[test]
    fn test_base_value_floor() {
        // Very old year cannot fall below the floor fraction.
        let ancient = base_resale_value("Model S", 1990, "Plaid");
        assert_eq!(ancient, 55_000.0 * VALUE_FLOOR_FRACTION);
    }

    #[test]
    fn test_unknown_trim_falls_back_to_model() {
        let v = base_resale_value("Model Y", 2022, "Mystery Trim");
        assert_eq!(v, 28_000.0); // first Model Y row
    }

    #[test]
    fn test_unknown_model_uses_default() {
        assert_eq!(base_resale_value("Cybertruck", 2022, "AWD"), DEFAULT_BASE_VALUE);
    }

    #[test]
    fn test_repair_cost_lookup() {
        assert_eq!(repair_cost("Front End", Severity::Moderate), 4_000.0);
        assert_eq!(repair_cost("Minor Dents", Severity::Minor), 400.0);
        assert_eq!(repair_cost("Unknown", Severity::Severe), 6_000.0);
        // Case-insensitive
        assert_eq!(repair_cost("front end", Severity::Minor), 1_500.0);
        // No damage, no repair
        assert_eq!(repair_cost("None", Severity::Severe), 0.0);
        assert_eq!(repair_cost("", Severity::Minor), 0.0);
    }
}
