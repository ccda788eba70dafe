use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use crate::data::types::Listing;
use crate::roi::tables::{self, Severity};

/// Suggested auction buyer fee: 10% of the purchase price. A suggestion
/// only — the scenario carries whatever value the caller settled on.
pub const BUYER_FEE_RATE: f64 = 0.10;
/// Expected miles per year for the resale mileage adjustment. Note this is
/// 10k, not the 12k the deal scorer uses; the two models are independent.
const RESALE_MILES_PER_YEAR: f64 = 10_000.0;
const EXCESS_MILEAGE_RATE: f64 = 0.20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInputs {
    pub model: String,
    pub year: i32,
    pub trim: String,
    pub odometer: u32,
    pub purchase_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageInputs {
    pub damage_type: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementInputs {
    pub battery: bool,
    pub motor: bool,
    pub parts_cost: f64,
    pub labor_cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeInputs {
    pub auction_fee: f64,
    pub transport: f64,
    pub storage_daily_rate: f64,
    pub storage_days: u32,
    pub other: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleInputs {
    pub list_price: f64,
    pub commission: f64,
    pub sales_tax_rate: f64,
}

/// A complete set of cost/revenue assumptions for one purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiScenario {
    pub vehicle: VehicleInputs,
    pub damage: DamageInputs,
    #[serde(default)]
    pub replacements: ReplacementInputs,
    #[serde(default)]
    pub fees: FeeInputs,
    #[serde(default)]
    pub sale: SaleInputs,
}

/// Derived return metrics; no identity, recomputed on every input change.
/// `profit_margin` and `roi` share one formula and denominator — kept
/// identical deliberately, matching the behavior this replaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiResult {
    pub total_investment: f64,
    pub estimated_profit: f64,
    pub profit_margin: f64,
    pub roi: f64,
}

/// Qualitative banding of the profit margin for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoiBand {
    Excellent,
    Good,
    Marginal,
    NotRecommended,
}

impl RoiBand {
    pub fn from_margin(margin: f64) -> Self {
        if margin >= 20.0 {
            RoiBand::Excellent
        } else if margin >= 10.0 {
            RoiBand::Good
        } else if margin >= 0.0 {
            RoiBand::Marginal
        } else {
            RoiBand::NotRecommended
        }
    }
}

pub fn suggested_buyer_fee(purchase_price: f64) -> f64 {
    purchase_price * BUYER_FEE_RATE
}

/// Table resale value with the excess-mileage deduction applied.
pub fn suggested_list_price(vehicle: &VehicleInputs) -> f64 {
    suggested_list_price_at(vehicle, Utc::now().year())
}

pub fn suggested_list_price_at(vehicle: &VehicleInputs, eval_year: i32) -> f64 {
    let base = tables::base_resale_value(&vehicle.model, vehicle.year, &vehicle.trim);
    let age_years = (eval_year - vehicle.year).max(0);
    let expected_mileage = age_years as f64 * RESALE_MILES_PER_YEAR;
    let excess = (vehicle.odometer as f64 - expected_mileage).max(0.0);
    (base - excess * EXCESS_MILEAGE_RATE).max(0.0)
}

/// Pure estimate over a scenario. Synchronous, no failure mode; callers
/// re-run it whenever any input changes.
pub fn estimate(scenario: &RoiScenario) -> RoiResult {
    let mut repairs = tables::repair_cost(&scenario.damage.damage_type, scenario.damage.severity);
    if scenario.replacements.battery {
        repairs += tables::BATTERY_REPLACEMENT_COST;
    }
    if scenario.replacements.motor {
        repairs += tables::MOTOR_REPLACEMENT_COST;
    }
    repairs += scenario.replacements.parts_cost + scenario.replacements.labor_cost;

    let storage = scenario.fees.storage_daily_rate * scenario.fees.storage_days as f64;

    let total_investment = scenario.vehicle.purchase_price
        + repairs
        + scenario.fees.auction_fee
        + scenario.fees.transport
        + storage
        + scenario.fees.other;

    let sales_tax = scenario.sale.sales_tax_rate * scenario.sale.list_price;
    let estimated_profit =
        scenario.sale.list_price - total_investment - scenario.sale.commission - sales_tax;

    // Defined as 0 when there is no investment, never NaN or infinity.
    let profit_margin = if total_investment == 0.0 {
        0.0
    } else {
        estimated_profit / total_investment * 100.0
    };

    RoiResult {
        total_investment,
        estimated_profit,
        profit_margin,
        roi: profit_margin,
    }
}

impl RoiScenario {
    /// Seed a scenario from a scored listing: purchase at the current bid,
    /// moderate severity for the listed damage, suggested fee and list
    /// price filled in as editable defaults.
    pub fn from_listing(listing: &Listing) -> Self {
        let vehicle = VehicleInputs {
            model: listing.model.clone(),
            year: listing.year,
            trim: "Standard Range".to_string(),
            odometer: listing.odometer,
            purchase_price: listing.current_bid,
        };
        let list_price = suggested_list_price(&vehicle);

        Self {
            damage: DamageInputs {
                damage_type: listing.damage_type.clone(),
                severity: Severity::Moderate,
            },
            replacements: ReplacementInputs::default(),
            fees: FeeInputs {
                auction_fee: suggested_buyer_fee(vehicle.purchase_price),
                transport: 0.0,
                storage_daily_rate: 0.0,
                storage_days: 0,
                other: 0.0,
            },
            sale: SaleInputs {
                list_price,
                commission: 0.0,
                sales_tax_rate: 0.0,
            },
            vehicle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> RoiScenario {
        RoiScenario {
            vehicle: VehicleInputs {
                model: "Model 3".to_string(),
                year: 2022,
                trim: "Long Range".to_string(),
                odometer: 30_000,
                purchase_price: 12_000.0,
            },
            damage: DamageInputs {
                damage_type: "Front End".to_string(),
                severity: Severity::Moderate,
            },
            replacements: ReplacementInputs::default(),
            fees: FeeInputs {
                auction_fee: 1_200.0,
                transport: 500.0,
                storage_daily_rate: 30.0,
                storage_days: 10,
                other: 300.0,
            },
            sale: SaleInputs {
                list_price: 25_000.0,
                commission: 500.0,
                sales_tax_rate: 0.06,
            },
        }
    }

    #[test]
    fn test_estimate_worked_example() {
        let result = estimate(&scenario());

        // repairs: Front End moderate = 4000
        // storage: 30 * 10 = 300
        // total: 12000 + 4000 + 1200 + 500 + 300 + 300 = 18300
        assert_eq!(result.total_investment, 18_300.0);

        // tax: 0.06 * 25000 = 1500
        // profit: 25000 - 18300 - 500 - 1500 = 4700
        assert_eq!(result.estimated_profit, 4_700.0);

        let expected_margin = 4_700.0 / 18_300.0 * 100.0;
        assert!((result.profit_margin - expected_margin).abs() < 1e-9);
        assert_eq!(result.profit_margin, result.roi);
    }

    #[test]
    fn test_replacement_line_items_sum_in() {
        let mut s = scenario();
        s.replacements.battery = true;
        s.replacements.motor = true;
        s.replacements.parts_cost = 250.0;
        s.replacements.labor_cost = 600.0;

        let with = estimate(&s);
        let without = estimate(&scenario());
        assert_eq!(
            with.total_investment - without.total_investment,
            tables::BATTERY_REPLACEMENT_COST + tables::MOTOR_REPLACEMENT_COST + 850.0
        );
    }

    #[test]
    fn test_zero_investment_yields_zero_metrics() {
        let s = RoiScenario {
            vehicle: VehicleInputs {
                model: "Model 3".to_string(),
                year: 2022,
                trim: "Long Range".to_string(),
                odometer: 0,
                purchase_price: 0.0,
            },
            damage: DamageInputs {
                damage_type: "None".to_string(),
                severity: Severity::Minor,
            },
            replacements: ReplacementInputs::default(),
            fees: FeeInputs::default(),
            sale: SaleInputs {
                list_price: 5_000.0,
                ..Default::default()
            },
        };

        let result = estimate(&s);
        assert_eq!(result.total_investment, 0.0);
        assert_eq!(result.profit_margin, 0.0);
        assert_eq!(result.roi, 0.0);
        assert!(result.profit_margin.is_finite());
    }

    #[test]
    fn test_margin_banding() {
        assert_eq!(RoiBand::from_margin(25.0), RoiBand::Excellent);
        assert_eq!(RoiBand::from_margin(20.0), RoiBand::Excellent);
        assert_eq!(RoiBand::from_margin(15.0), RoiBand::Good);
        assert_eq!(RoiBand::from_margin(10.0), RoiBand::Good);
        assert_eq!(RoiBand::from_margin(5.0), RoiBand::Marginal);
        assert_eq!(RoiBand::from_margin(0.0), RoiBand::Marginal);
        assert_eq!(RoiBand::from_margin(-3.0), RoiBand::NotRecommended);
    }

    #[test]
    fn test_suggested_buyer_fee() {
        assert_eq!(suggested_buyer_fee(12_000.0), 1_200.0);
        assert_eq!(suggested_buyer_fee(0.0), 0.0);
    }

    #[test]
    fn test_mileage_adjustment_only_for_excess() {
        let under = VehicleInputs {
            model: "Model 3".to_string(),
            year: 2020,
            trim: "Long Range".to_string(),
            odometer: 10_000, // well under 4 years * 10k
            purchase_price: 0.0,
        };
        let over = VehicleInputs {
            odometer: 60_000, // 20k over expected at eval year 2024
            ..under.clone()
        };

        let base = suggested_list_price_at(&under, 2024);
        let adjusted = suggested_list_price_at(&over, 2024);
        assert_eq!(base - adjusted, 20_000.0 * 0.20);
    }
}
