//! Restoration cost estimator.
//!
//! A fixed pricing heuristic: a per-square-foot base rate for the damage
//! type, scaled by severity, urgency and property type, plus surcharges for
//! affected building systems. The published estimate is a ±20% band around
//! the resulting total, rounded to whole dollars.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::assessment::DamageAssessment;
use crate::models::{DamageType, PropertyType, Severity, Urgency};

/// Square footage assumed when the assessment does not carry one.
pub const DEFAULT_SQUARE_FOOTAGE: i64 = 1_000;
/// Largest area accepted for pricing. Fits the `property_size` column.
pub const MAX_SQUARE_FOOTAGE: i64 = 10_000_000;
/// Largest estimate bound accepted on a stored lead, in dollars.
pub const MAX_ESTIMATE_DOLLARS: i64 = 10_000_000_000;
pub const DEFAULT_DAMAGE_TYPE: DamageType = DamageType::Water;
pub const DEFAULT_SEVERITY: Severity = Severity::Moderate;
pub const DEFAULT_URGENCY: Urgency = Urgency::Urgent;
pub const DEFAULT_PROPERTY_TYPE: PropertyType = PropertyType::Office;

const RANGE_LOW_FACTOR: f64 = 0.80;
const RANGE_HIGH_FACTOR: f64 = 1.20;

const HVAC_SURCHARGE: f64 = 10_000.0;
const ELECTRICAL_SURCHARGE: f64 = 5_000.0;
const CONTENTS_SURCHARGE_PER_SQ_FT: f64 = 2.0;

/// Low/high bounds in whole dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CostRange {
    pub low: i64,
    pub high: i64,
}

impl CostRange {
    /// Midpoint rounded half away from zero, used as the CRM opportunity
    /// value. Exact for the whole `i64` range.
    pub fn midpoint(&self) -> i64 {
        let sum = i128::from(self.low) + i128::from(self.high);
        ((sum + sum.signum()) / 2) as i64
    }

    /// `0 <= low <= high <= MAX_ESTIMATE_DOLLARS`.
    pub fn is_valid(&self) -> bool {
        0 <= self.low && self.low <= self.high && self.high <= MAX_ESTIMATE_DOLLARS
    }
}

/// Factors that went into an estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub base_cost_per_sq_ft: f64,
    pub square_footage: i64,
    pub severity_multiplier: f64,
    pub urgency_factor: f64,
    pub property_modifier: f64,
}

/// Result of [`calculate_restoration_cost`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub low: i64,
    pub high: i64,
    /// Area cost after multipliers, before surcharges.
    pub base_cost: i64,
    /// Sum of affected-system surcharges.
    pub complexity: i64,
    pub breakdown: CostBreakdown,
}

impl CostEstimate {
    pub fn range(&self) -> CostRange {
        CostRange {
            low: self.low,
            high: self.high,
        }
    }
}

/// Base rate per square foot for a damage type and optional sub-category.
///
/// Sub-category keys are matched case-insensitively; anything unknown falls
/// back to the type's default rate.
pub fn base_cost_per_sq_ft(damage_type: DamageType, subcategory: Option<&str>) -> f64 {
    let sub = subcategory.map(|s| s.trim().to_ascii_lowercase());
    let sub = sub.as_deref();

    match damage_type {
        DamageType::Water => match sub {
            Some("category1") => 3.75,
            Some("category2") => 4.50,
            Some("category3") => 7.00,
            _ => 5.00,
        },
        DamageType::Fire => match sub {
            Some("classb") => 12.00,
            Some("classc") => 13.00,
            Some("classd") => 14.00,
            _ => 10.00,
        },
        DamageType::Mold => match sub {
            Some("standard") => 15.00,
            Some("blackmold") => 20.00,
            _ => 17.50,
        },
        DamageType::Storm => match sub {
            Some("roof") => 10.00,
            _ => 7.00,
        },
        // Industrial jobs are priced per piece of equipment on site; the
        // generic area rate stands in for them here.
        DamageType::Industrial => 10.00,
        DamageType::Environmental => match sub {
            Some("asbestos") => 12.50,
            Some("hazmat") => 25.00,
            _ => 20.00,
        },
    }
}

pub fn severity_multiplier(severity: Severity) -> f64 {
    match severity {
        Severity::Minor => 1.0,
        Severity::Moderate => 1.5,
        Severity::Severe => 2.0,
        Severity::Catastrophic => 3.0,
    }
}

pub fn urgency_factor(urgency: Urgency) -> f64 {
    match urgency {
        Urgency::Emergency => 1.20,
        Urgency::Urgent => 1.10,
        Urgency::Scheduled => 1.00,
        Urgency::Assessment => 0.90,
    }
}

pub fn property_modifier(property_type: PropertyType) -> f64 {
    match property_type {
        PropertyType::Office => 1.00,
        PropertyType::Warehouse => 0.90,
        PropertyType::Manufacturing => 1.15,
        PropertyType::Retail => 1.05,
        PropertyType::Healthcare => 1.25,
        PropertyType::Educational => 1.10,
        PropertyType::MultiFamily => 1.05,
        PropertyType::Restaurant => 1.10,
        PropertyType::Other => 1.00,
    }
}

/// True when any affected area matches one of `labels` (case-insensitive).
fn has_affected(areas: &[String], labels: &[&str]) -> bool {
    areas.iter().any(|area| {
        let area = area.trim();
        labels.iter().any(|label| area.eq_ignore_ascii_case(label))
    })
}

/// Surcharges for building systems involved in the damage.
fn complexity_add_on(areas: &[String], square_footage: i64) -> f64 {
    let mut add_on = 0.0;

    if has_affected(areas, &["hvac", "HVAC system"]) {
        add_on += HVAC_SURCHARGE;
    }
    if has_affected(areas, &["electrical", "Electrical systems"]) {
        add_on += ELECTRICAL_SURCHARGE;
    }
    if has_affected(areas, &["contents", "Contents/inventory"]) {
        add_on += square_footage as f64 * CONTENTS_SURCHARGE_PER_SQ_FT;
    }

    add_on
}

/// Prices an assessment.
///
/// Missing inputs fall back to the `DEFAULT_*` constants. Square footage is
/// taken as given: a zero or negative value yields a zero or negative
/// estimate, so callers must guard against it.
pub fn calculate_restoration_cost(assessment: &DamageAssessment) -> CostEstimate {
    let damage_type = assessment.damage_type.unwrap_or(DEFAULT_DAMAGE_TYPE);
    let base_rate = base_cost_per_sq_ft(damage_type, assessment.damage_subcategory.as_deref());

    let square_footage = assessment.square_footage.unwrap_or(DEFAULT_SQUARE_FOOTAGE);
    let severity = severity_multiplier(assessment.severity.unwrap_or(DEFAULT_SEVERITY));
    let urgency = urgency_factor(assessment.urgency.unwrap_or(DEFAULT_URGENCY));
    let property = property_modifier(assessment.property_type.unwrap_or(DEFAULT_PROPERTY_TYPE));

    let base_total = base_rate * square_footage as f64 * severity * urgency * property;
    let complexity = complexity_add_on(&assessment.affected_areas, square_footage);
    let total = base_total + complexity;

    CostEstimate {
        low: (total * RANGE_LOW_FACTOR).round() as i64,
        high: (total * RANGE_HIGH_FACTOR).round() as i64,
        base_cost: base_total.round() as i64,
        complexity: complexity.round() as i64,
        breakdown: CostBreakdown {
            base_cost_per_sq_ft: base_rate,
            square_footage,
            severity_multiplier: severity,
            urgency_factor: urgency,
            property_modifier: property,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(
        damage_type: DamageType,
        severity: Severity,
        urgency: Urgency,
        property_type: PropertyType,
        square_footage: i64,
    ) -> DamageAssessment {
        DamageAssessment {
            damage_type: Some(damage_type),
            severity: Some(severity),
            urgency: Some(urgency),
            property_type: Some(property_type),
            square_footage: Some(square_footage),
            ..Default::default()
        }
    }

    #[test]
    fn test_water_moderate_urgent_office() {
        let a = assessment(
            DamageType::Water,
            Severity::Moderate,
            Urgency::Urgent,
            PropertyType::Office,
            3_000,
        );
        let estimate = calculate_restoration_cost(&a);

        assert_eq!(estimate.base_cost, 24_750);
        assert_eq!(estimate.complexity, 0);
        assert_eq!(estimate.low, 19_800);
        assert_eq!(estimate.high, 29_700);
        assert_eq!(estimate.breakdown.base_cost_per_sq_ft, 5.0);
        assert_eq!(estimate.breakdown.severity_multiplier, 1.5);
        assert_eq!(estimate.breakdown.urgency_factor, 1.10);
        assert_eq!(estimate.breakdown.property_modifier, 1.0);
    }

    #[test]
    fn test_defaults_for_empty_assessment() {
        let estimate = calculate_restoration_cost(&DamageAssessment::default());

        // water 5.00 × 1000 × 1.5 × 1.10 × 1.00
        assert_eq!(estimate.breakdown.square_footage, DEFAULT_SQUARE_FOOTAGE);
        assert_eq!(estimate.base_cost, 8_250);
        assert_eq!(estimate.low, 6_600);
        assert_eq!(estimate.high, 9_900);
    }

    #[test]
    fn test_subcategory_rates_and_fallback() {
        assert_eq!(base_cost_per_sq_ft(DamageType::Water, Some("category3")), 7.00);
        assert_eq!(base_cost_per_sq_ft(DamageType::Fire, Some("classC")), 13.00);
        assert_eq!(base_cost_per_sq_ft(DamageType::Mold, Some("blackMold")), 20.00);
        assert_eq!(base_cost_per_sq_ft(DamageType::Mold, Some("unknown")), 17.50);
        assert_eq!(base_cost_per_sq_ft(DamageType::Storm, None), 7.00);
        assert_eq!(base_cost_per_sq_ft(DamageType::Industrial, Some("largeEquipment")), 10.00);
        assert_eq!(base_cost_per_sq_ft(DamageType::Environmental, Some("hazmat")), 25.00);
    }

    #[test]
    fn test_affected_system_surcharges() {
        let mut a = assessment(
            DamageType::Water,
            Severity::Minor,
            Urgency::Scheduled,
            PropertyType::Office,
            2_000,
        );
        a.affected_areas = vec![
            "HVAC system".to_string(),
            "electrical".to_string(),
            "Contents/inventory".to_string(),
        ];
        let estimate = calculate_restoration_cost(&a);

        // 10,000 + 5,000 + 2 × 2,000
        assert_eq!(estimate.complexity, 19_000);
        assert_eq!(estimate.base_cost, 10_000);
        assert_eq!(estimate.low, 23_200);
        assert_eq!(estimate.high, 34_800);
    }

    #[test]
    fn test_surcharge_labels_are_case_insensitive() {
        let mut a = DamageAssessment::default();
        a.affected_areas = vec!["Hvac".to_string(), "roof".to_string()];
        assert_eq!(calculate_restoration_cost(&a).complexity, 10_000);
    }

    #[test]
    fn test_property_modifier_table_bounds() {
        for property in [
            PropertyType::Office,
            PropertyType::Warehouse,
            PropertyType::Manufacturing,
            PropertyType::Retail,
            PropertyType::Healthcare,
            PropertyType::Educational,
            PropertyType::MultiFamily,
            PropertyType::Restaurant,
            PropertyType::Other,
        ] {
            let m = property_modifier(property);
            assert!((0.90..=1.25).contains(&m), "{} out of range", property);
        }
    }

    #[test]
    fn test_midpoint() {
        let range = CostRange {
            low: 19_800,
            high: 29_700,
        };
        assert_eq!(range.midpoint(), 24_750);
        assert_eq!(CostRange { low: 1, high: 2 }.midpoint(), 2);
    }

    #[test]
    fn test_midpoint_of_extreme_range_does_not_overflow() {
        let range = CostRange {
            low: 9_000_000_000_000_000_000,
            high: 9_000_000_000_000_000_000,
        };
        assert_eq!(range.midpoint(), 9_000_000_000_000_000_000);

        let range = CostRange {
            low: i64::MAX,
            high: i64::MAX,
        };
        assert_eq!(range.midpoint(), i64::MAX);
    }

    #[test]
    fn test_range_validity() {
        assert!(CostRange { low: 0, high: 0 }.is_valid());
        assert!(CostRange { low: 19_800, high: 29_700 }.is_valid());
        assert!(!CostRange { low: 50_000, high: 100 }.is_valid());
        assert!(!CostRange { low: -1, high: 100 }.is_valid());
        assert!(!CostRange {
            low: 0,
            high: MAX_ESTIMATE_DOLLARS + 1
        }
        .is_valid());
    }
}
