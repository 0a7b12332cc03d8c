//! Lead scoring scorecard.
//!
//! Start at 50, add points from six independent table lookups, cap at 100.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::assessment::DamageAssessment;
use crate::models::{DamageType, LeadTier, PropertyType, Severity, Urgency};

const BASE_SCORE: u32 = 50;
const MAX_SCORE: u32 = 100;

/// Score and the tier it falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LeadScore {
    pub score: u8,
    pub tier: LeadTier,
}

fn urgency_points(urgency: Option<Urgency>) -> u32 {
    match urgency {
        Some(Urgency::Emergency) => 30,
        Some(Urgency::Urgent) => 20,
        Some(Urgency::Scheduled) | None => 10,
        Some(Urgency::Assessment) => 5,
    }
}

fn size_points(square_footage: Option<i64>) -> u32 {
    match square_footage.unwrap_or(0) {
        sq_ft if sq_ft > 20_000 => 20,
        sq_ft if sq_ft > 10_000 => 15,
        sq_ft if sq_ft > 5_000 => 10,
        _ => 5,
    }
}

fn severity_points(severity: Option<Severity>) -> u32 {
    match severity {
        Some(Severity::Catastrophic) => 15,
        Some(Severity::Severe) => 12,
        Some(Severity::Moderate) | None => 8,
        Some(Severity::Minor) => 4,
    }
}

fn damage_points(damage_type: Option<DamageType>) -> u32 {
    match damage_type {
        Some(DamageType::Fire | DamageType::Environmental | DamageType::Industrial) => 10,
        _ => 5,
    }
}

fn property_points(property_type: Option<PropertyType>) -> u32 {
    match property_type {
        Some(PropertyType::Manufacturing | PropertyType::Healthcare | PropertyType::Warehouse) => {
            10
        }
        _ => 5,
    }
}

fn estimate_points(estimate_high: Option<i64>) -> u32 {
    match estimate_high.unwrap_or(0) {
        value if value > 100_000 => 15,
        value if value > 50_000 => 12,
        value if value > 25_000 => 8,
        _ => 4,
    }
}

/// Scores an assessment, using `estimate_high` as the estimated job value.
///
/// Falls back to the assessment's own stored estimate when `estimate_high`
/// is `None`.
pub fn calculate_lead_score(assessment: &DamageAssessment, estimate_high: Option<i64>) -> u8 {
    let estimate_high = estimate_high.or(assessment.estimated_cost.map(|c| c.high));

    let total = BASE_SCORE
        + urgency_points(assessment.urgency)
        + size_points(assessment.square_footage)
        + severity_points(assessment.severity)
        + damage_points(assessment.damage_type)
        + property_points(assessment.property_type)
        + estimate_points(estimate_high);

    total.min(MAX_SCORE) as u8
}

/// Score plus tier in one call.
pub fn score_lead(assessment: &DamageAssessment, estimate_high: Option<i64>) -> LeadScore {
    let score = calculate_lead_score(assessment, estimate_high);
    LeadScore {
        score,
        tier: LeadTier::from_score(score),
    }
}
