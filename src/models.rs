use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::errors::AppError;
use crate::estimator::{CostRange, MAX_SQUARE_FOOTAGE};

// ============ Domain Enums ============

/// Kind of damage the property suffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    Water,
    Fire,
    Mold,
    Storm,
    Industrial,
    Environmental,
}

impl DamageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DamageType::Water => "water",
            DamageType::Fire => "fire",
            DamageType::Mold => "mold",
            DamageType::Storm => "storm",
            DamageType::Industrial => "industrial",
            DamageType::Environmental => "environmental",
        }
    }
}

/// How bad the damage is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
    Catastrophic,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
            Severity::Catastrophic => "catastrophic",
        }
    }
}

/// How soon the customer needs a crew on site.
///
/// The contact form still submits the older `standard` / `non-urgent`
/// labels, which map onto `Scheduled` / `Assessment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Emergency,
    Urgent,
    #[serde(alias = "standard")]
    Scheduled,
    #[serde(alias = "non-urgent")]
    Assessment,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Emergency => "emergency",
            Urgency::Urgent => "urgent",
            Urgency::Scheduled => "scheduled",
            Urgency::Assessment => "assessment",
        }
    }
}

/// Commercial property category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    Office,
    Warehouse,
    Manufacturing,
    Retail,
    Healthcare,
    Educational,
    MultiFamily,
    Restaurant,
    Other,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Office => "office",
            PropertyType::Warehouse => "warehouse",
            PropertyType::Manufacturing => "manufacturing",
            PropertyType::Retail => "retail",
            PropertyType::Healthcare => "healthcare",
            PropertyType::Educational => "educational",
            PropertyType::MultiFamily => "multi-family",
            PropertyType::Restaurant => "restaurant",
            PropertyType::Other => "other",
        }
    }
}

/// One of the three jurisdictions the business serves.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ServiceArea {
    #[serde(alias = "md")]
    MD,
    #[serde(alias = "dc")]
    DC,
    #[serde(alias = "va")]
    VA,
}

impl ServiceArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceArea::MD => "MD",
            ServiceArea::DC => "DC",
            ServiceArea::VA => "VA",
        }
    }

    /// 24/7 dispatch line for the area.
    pub fn phone_number(&self) -> &'static str {
        match self {
            ServiceArea::MD => "301-900-5171",
            ServiceArea::DC => "202-796-7422",
            ServiceArea::VA => "703-844-4204",
        }
    }
}

/// Fallback text shown whenever a submission cannot be completed.
pub const FALLBACK_CONTACT_NUMBERS: &str = "MD 301-900-5171, DC 202-796-7422, VA 703-844-4204";

/// Priority bucket derived from the lead score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeadTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl LeadTier {
    /// Fixed thresholds: 90 platinum, 70 gold, 50 silver, bronze below.
    pub fn from_score(score: u8) -> Self {
        if score >= 90 {
            LeadTier::Platinum
        } else if score >= 70 {
            LeadTier::Gold
        } else if score >= 50 {
            LeadTier::Silver
        } else {
            LeadTier::Bronze
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadTier::Bronze => "bronze",
            LeadTier::Silver => "silver",
            LeadTier::Gold => "gold",
            LeadTier::Platinum => "platinum",
        }
    }

    /// Gold and platinum leads skip the triage queue.
    pub fn is_priority(&self) -> bool {
        matches!(self, LeadTier::Gold | LeadTier::Platinum)
    }
}

/// State of the CRM linkage stored on a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    /// Contact exists in the CRM, opportunity does not.
    Partial,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Partial => "partial",
            SyncStatus::Failed => "failed",
        }
    }
}

macro_rules! impl_label_traits {
    ($($ty:ident => $kind:literal),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl FromStr for $ty {
                type Err = AppError;

                fn from_str(raw: &str) -> Result<Self, Self::Err> {
                    parse_label(raw).ok_or_else(|| {
                        AppError::BadRequest(format!("Unknown {}: '{}'", $kind, raw))
                    })
                }
            }
        )*
    };
}

impl_label_traits!(
    DamageType => "damage type",
    Severity => "severity",
    Urgency => "urgency",
    PropertyType => "property type",
    ServiceArea => "service area",
    LeadTier => "lead tier",
    SyncStatus => "sync status",
);

/// Parses a wire label, tolerating surrounding whitespace and case.
fn parse_label<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    let trimmed = raw.trim();
    serde_json::from_value(serde_json::Value::String(trimmed.to_string()))
        .or_else(|_| serde_json::from_value(serde_json::Value::String(trimmed.to_lowercase())))
        .ok()
}

// ============ Database Models ============

/// A captured lead as stored in the `leads` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Lead {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub business_name: String,
    pub contact_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub property_address: String,
    pub property_type: Option<String>,
    pub property_size: Option<i32>,
    /// Damage labels as submitted; the form also offers `large-loss`.
    pub damage_type: Vec<String>,
    pub damage_description: Option<String>,
    pub urgency_level: Option<String>,
    pub service_area: Option<String>,
    pub zip_code: Option<String>,
    pub insurance_carrier: Option<String>,
    pub policy_number: Option<String>,
    pub lead_source: Option<String>,
    pub status: String,
    pub lead_score: Option<i32>,
    pub lead_tier: Option<String>,
    pub estimated_cost_low: Option<i64>,
    pub estimated_cost_high: Option<i64>,
    pub crm_contact_id: Option<String>,
    pub crm_opportunity_id: Option<String>,
    pub crm_sync_status: String,
    pub crm_sync_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A customer testimonial shown on the marketing pages.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Testimonial {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub location: String,
    pub service_type: String,
    pub property_type: Option<String>,
    pub quote: String,
    pub rating: i16,
    pub display_order: i32,
    pub active: bool,
}

// ============ API Request/Response Models ============

/// Lead payload accepted by `POST /api/leads`.
///
/// Required text fields default to empty so that a missing field is reported
/// as a validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewLead {
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub property_address: String,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub property_size: Option<i32>,
    #[serde(default)]
    pub damage_type: Vec<String>,
    #[serde(default)]
    pub damage_description: Option<String>,
    #[serde(default)]
    pub urgency_level: Option<Urgency>,
    #[serde(default)]
    pub service_area: Option<ServiceArea>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub insurance_carrier: Option<String>,
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default)]
    pub lead_source: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub lead_score: Option<i32>,
    #[serde(default)]
    pub lead_tier: Option<LeadTier>,
    #[serde(default)]
    pub estimated_cost_low: Option<i64>,
    #[serde(default)]
    pub estimated_cost_high: Option<i64>,
}

impl NewLead {
    /// Business name, contact name, phone and property address must be non-blank.
    pub fn has_required_fields(&self) -> bool {
        [
            &self.business_name,
            &self.contact_name,
            &self.phone,
            &self.property_address,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }

    /// Rejects figures that cannot be priced or stored: a property size
    /// outside `1..=MAX_SQUARE_FOOTAGE`, or an estimate that is one-sided,
    /// negative, inverted or above `MAX_ESTIMATE_DOLLARS`.
    pub fn validate_figures(&self) -> Result<(), AppError> {
        if let Some(size) = self.property_size {
            if size <= 0 || i64::from(size) > MAX_SQUARE_FOOTAGE {
                return Err(AppError::BadRequest(format!(
                    "property_size must be between 1 and {}",
                    MAX_SQUARE_FOOTAGE
                )));
            }
        }

        match (self.estimated_cost_low, self.estimated_cost_high) {
            (None, None) => Ok(()),
            (Some(low), Some(high)) if (CostRange { low, high }).is_valid() => Ok(()),
            (Some(_), Some(_)) => Err(AppError::BadRequest(
                "Estimated cost range is invalid".to_string(),
            )),
            _ => Err(AppError::BadRequest(
                "estimated_cost_low and estimated_cost_high must be sent together".to_string(),
            )),
        }
    }

    /// Clamps a submitted score to `0..=100` and derives the tier from it.
    /// A submitted tier is never trusted.
    pub fn settle_score(&mut self) {
        match self.lead_score {
            Some(raw) => {
                let score = raw.clamp(0, 100);
                self.lead_score = Some(score);
                self.lead_tier = Some(LeadTier::from_score(score as u8));
            }
            None => self.lead_tier = None,
        }
    }
}

/// Response for a stored lead.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeadSubmissionResponse {
    pub success: bool,
    pub data: Lead,
}

/// Pagination for `GET /api/testimonials`.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TestimonialQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl TestimonialQuery {
    pub const DEFAULT_PER_PAGE: u32 = 6;
    pub const MAX_PER_PAGE: u32 = 50;

    /// Returns `(limit, offset)` with both values clamped to sane bounds.
    pub fn limit_offset(&self) -> (i64, i64) {
        let per_page = self
            .per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE);
        let page = self.page.unwrap_or(1).max(1);
        (
            i64::from(per_page),
            i64::from(page - 1) * i64::from(per_page),
        )
    }
}
