//! Conversational damage assessment.
//!
//! The chat widget collects facts one at a time. The whole record travels
//! with every request as a plain value; the server never keeps it. Each
//! [`AssessmentAction`] mutates it and returns the confirmation text the
//! assistant relays to the customer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::estimator::{
    calculate_restoration_cost, CostEstimate, CostRange, MAX_SQUARE_FOOTAGE,
};
use crate::models::{
    DamageType, LeadTier, NewLead, PropertyType, ServiceArea, Severity, Urgency,
};
use crate::scoring::{score_lead, LeadScore};

/// Source tag stored on leads captured by the chat.
pub const CHAT_LEAD_SOURCE: &str = "ai_damage_assessment_chat";
const DEFAULT_BUSINESS_NAME: &str = "Commercial Property";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactInfo {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub business_name: String,
}

/// Everything collected so far in one assessment conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DamageAssessment {
    pub damage_type: Option<DamageType>,
    /// Finer pricing bucket, e.g. `category3` water or `blackMold`.
    pub damage_subcategory: Option<String>,
    pub severity: Option<Severity>,
    pub urgency: Option<Urgency>,
    pub property_type: Option<PropertyType>,
    pub square_footage: Option<i64>,
    pub affected_areas: Vec<String>,
    pub contact_info: ContactInfo,
    pub property_address: String,
    pub service_area: Option<ServiceArea>,
    pub estimated_cost: Option<CostRange>,
    pub conversation_step: u32,
}

impl Default for DamageAssessment {
    fn default() -> Self {
        Self {
            damage_type: None,
            damage_subcategory: None,
            severity: None,
            urgency: None,
            property_type: None,
            square_footage: None,
            affected_areas: Vec::new(),
            contact_info: ContactInfo::default(),
            property_address: String::new(),
            service_area: None,
            estimated_cost: None,
            conversation_step: 1,
        }
    }
}

/// Partial update; only `Some` fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssessmentUpdate {
    pub damage_type: Option<DamageType>,
    pub damage_subcategory: Option<String>,
    pub severity: Option<Severity>,
    pub urgency: Option<Urgency>,
    pub property_type: Option<PropertyType>,
    pub square_footage: Option<i64>,
    pub affected_areas: Option<Vec<String>>,
    pub contact_info: Option<ContactInfo>,
    pub property_address: Option<String>,
    pub service_area: Option<ServiceArea>,
    pub estimated_cost: Option<CostRange>,
}

/// One step of the conversation, named after the assistant's tool calls.
///
/// Parameters arrive as free text from the language model, so enum values
/// are parsed here and rejected when unknown.
#[derive(Debug, Clone, Deserialize)]
#[serde(
    tag = "name",
    content = "parameters",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum AssessmentAction {
    SetDamageType {
        damage_type: String,
        #[serde(default)]
        subcategory: Option<String>,
    },
    SetUrgency {
        urgency: String,
    },
    SetDamageSeverity {
        severity: String,
    },
    SetPropertyDetails {
        property_type: String,
        square_footage: i64,
    },
    SetAffectedAreas {
        affected_areas: Vec<String>,
    },
    CalculateCostEstimate,
    SetContactInfo {
        name: String,
        phone: String,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        business_name: Option<String>,
    },
    SetPropertyAddress {
        address: String,
        service_area: String,
    },
    UrgentHandoff,
}

/// A completed assessment turned into a lead ready for storage.
#[derive(Debug, Clone)]
pub struct AssessmentSubmission {
    pub lead: NewLead,
    pub estimate: CostEstimate,
    pub score: LeadScore,
}

impl DamageAssessment {
    pub fn update(&mut self, update: AssessmentUpdate) {
        if let Some(v) = update.damage_type {
            self.damage_type = Some(v);
        }
        if let Some(v) = update.damage_subcategory {
            self.damage_subcategory = Some(v);
        }
        if let Some(v) = update.severity {
            self.severity = Some(v);
        }
        if let Some(v) = update.urgency {
            self.urgency = Some(v);
        }
        if let Some(v) = update.property_type {
            self.property_type = Some(v);
        }
        if let Some(v) = update.square_footage {
            self.square_footage = Some(v);
        }
        if let Some(v) = update.affected_areas {
            self.affected_areas = v;
        }
        if let Some(v) = update.contact_info {
            self.contact_info = v;
        }
        if let Some(v) = update.property_address {
            self.property_address = v;
        }
        if let Some(v) = update.service_area {
            self.service_area = Some(v);
        }
        if let Some(v) = update.estimated_cost {
            self.estimated_cost = Some(v);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn next_step(&mut self) {
        self.conversation_step += 1;
    }

    /// Contact name, phone, address and service area are all recorded.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.contact_info.name.trim().is_empty() {
            missing.push("contact name");
        }
        if self.contact_info.phone.trim().is_empty() {
            missing.push("phone");
        }
        if self.property_address.trim().is_empty() {
            missing.push("property address");
        }
        if self.service_area.is_none() {
            missing.push("service area");
        }
        missing
    }

    fn ensure_valid_square_footage(&self) -> Result<(), AppError> {
        match self.square_footage {
            Some(sq_ft) => check_square_footage(sq_ft),
            None => Ok(()),
        }
    }

    /// Estimate for the current facts. Rejects square footage outside
    /// `1..=MAX_SQUARE_FOOTAGE`.
    pub fn estimate(&self) -> Result<CostEstimate, AppError> {
        self.ensure_valid_square_footage()?;
        Ok(calculate_restoration_cost(self))
    }

    /// Applies one conversation action and returns the confirmation message.
    pub fn apply(&mut self, action: AssessmentAction) -> Result<String, AppError> {
        let message = match action {
            AssessmentAction::SetDamageType {
                damage_type,
                subcategory,
            } => {
                let parsed: DamageType = damage_type.parse()?;
                self.damage_type = Some(parsed);
                self.damage_subcategory = subcategory.filter(|s| !s.trim().is_empty());
                self.next_step();
                format!(
                    "Damage type recorded: {}. Moving to urgency assessment.",
                    parsed
                )
            }
            AssessmentAction::SetUrgency { urgency } => {
                let parsed: Urgency = urgency.parse()?;
                self.urgency = Some(parsed);
                self.next_step();
                format!(
                    "Urgency level recorded: {}. Now assessing damage severity.",
                    parsed
                )
            }
            AssessmentAction::SetDamageSeverity { severity } => {
                let parsed: Severity = severity.parse()?;
                self.severity = Some(parsed);
                self.next_step();
                format!(
                    "Severity recorded: {}. Now need property information.",
                    parsed
                )
            }
            AssessmentAction::SetPropertyDetails {
                property_type,
                square_footage,
            } => {
                let parsed: PropertyType = property_type.parse()?;
                check_square_footage(square_footage)?;
                self.property_type = Some(parsed);
                self.square_footage = Some(square_footage);
                self.next_step();
                format!(
                    "Property recorded: {}, {} sq ft. Ready to calculate cost estimate.",
                    parsed, square_footage
                )
            }
            AssessmentAction::SetAffectedAreas { affected_areas } => {
                self.affected_areas = affected_areas
                    .into_iter()
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect();
                format!(
                    "Affected areas recorded: {}",
                    self.affected_areas.join(", ")
                )
            }
            AssessmentAction::CalculateCostEstimate => {
                let estimate = self.estimate()?;
                self.estimated_cost = Some(estimate.range());
                self.next_step();
                format!(
                    "Cost estimate calculated: {} - {}. Based on {} {} damage for {} sq ft {}.",
                    format_usd(estimate.low),
                    format_usd(estimate.high),
                    label_or_unknown(self.severity.map(|s| s.as_str())),
                    label_or_unknown(self.damage_type.map(|d| d.as_str())),
                    estimate.breakdown.square_footage,
                    label_or_unknown(self.property_type.map(|p| p.as_str())),
                )
            }
            AssessmentAction::SetContactInfo {
                name,
                phone,
                email,
                business_name,
            } => {
                if name.trim().is_empty() || phone.trim().is_empty() {
                    return Err(AppError::BadRequest(
                        "Contact name and phone are required".to_string(),
                    ));
                }
                self.contact_info = ContactInfo {
                    name: name.trim().to_string(),
                    phone: phone.trim().to_string(),
                    email: email.unwrap_or_default(),
                    business_name: business_name.unwrap_or_default(),
                };
                self.next_step();
                format!(
                    "Contact information recorded for {}. Now need property address.",
                    self.contact_info.name
                )
            }
            AssessmentAction::SetPropertyAddress {
                address,
                service_area,
            } => {
                let parsed: ServiceArea = service_area.parse()?;
                self.property_address = address.trim().to_string();
                self.service_area = Some(parsed);
                self.next_step();
                format!(
                    "Property address recorded: {} in {}. Ready to submit assessment.",
                    self.property_address, parsed
                )
            }
            AssessmentAction::UrgentHandoff => emergency_handoff_message(self.service_area),
        };

        Ok(message)
    }

    /// Builds the lead for a completed assessment.
    ///
    /// The estimate is always recomputed from the recorded facts; an
    /// `estimated_cost` sent back by the client is not stored.
    pub fn to_submission(&self) -> Result<AssessmentSubmission, AppError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Assessment is incomplete, missing: {}",
                missing.join(", ")
            )));
        }

        let estimate = self.estimate()?;
        let range = estimate.range();
        let score = score_lead(self, Some(range.high));

        let description = format!(
            "AI Assessment: {} {} damage. Estimated: {}-{}. Affected areas: {}",
            label_or_unknown(self.severity.map(|s| s.as_str())),
            label_or_unknown(self.damage_type.map(|d| d.as_str())),
            format_usd(range.low),
            format_usd(range.high),
            self.affected_areas.join(", ")
        );

        let business_name = if self.contact_info.business_name.trim().is_empty() {
            DEFAULT_BUSINESS_NAME.to_string()
        } else {
            self.contact_info.business_name.trim().to_string()
        };

        let email = Some(self.contact_info.email.trim().to_string()).filter(|e| !e.is_empty());

        let lead = NewLead {
            business_name,
            contact_name: self.contact_info.name.trim().to_string(),
            phone: self.contact_info.phone.trim().to_string(),
            email,
            property_address: self.property_address.trim().to_string(),
            property_type: self.property_type,
            property_size: self
                .square_footage
                .and_then(|sq_ft| i32::try_from(sq_ft).ok()),
            damage_type: vec![label_or_unknown(self.damage_type.map(|d| d.as_str())).to_string()],
            damage_description: Some(description),
            urgency_level: self.urgency,
            service_area: self.service_area,
            lead_source: Some(CHAT_LEAD_SOURCE.to_string()),
            status: Some(initial_status(score.tier).to_string()),
            lead_score: Some(i32::from(score.score)),
            lead_tier: Some(score.tier),
            estimated_cost_low: Some(range.low),
            estimated_cost_high: Some(range.high),
            ..Default::default()
        };

        Ok(AssessmentSubmission {
            lead,
            estimate,
            score,
        })
    }

    /// Best-effort assessment for a lead that came in through the form.
    ///
    /// Takes the first damage label that names a known type; `large-loss`
    /// and other free labels are skipped.
    pub fn from_lead(lead: &NewLead) -> Self {
        Self {
            damage_type: lead
                .damage_type
                .iter()
                .find_map(|label| label.parse::<DamageType>().ok()),
            urgency: lead.urgency_level,
            property_type: lead.property_type,
            square_footage: lead.property_size.map(i64::from),
            service_area: lead.service_area,
            property_address: lead.property_address.clone(),
            contact_info: ContactInfo {
                name: lead.contact_name.clone(),
                phone: lead.phone.clone(),
                email: lead.email.clone().unwrap_or_default(),
                business_name: lead.business_name.clone(),
            },
            ..Default::default()
        }
    }
}

fn check_square_footage(sq_ft: i64) -> Result<(), AppError> {
    if sq_ft <= 0 {
        return Err(AppError::BadRequest(
            "Square footage must be a positive number".to_string(),
        ));
    }
    if sq_ft > MAX_SQUARE_FOOTAGE {
        return Err(AppError::BadRequest(format!(
            "Square footage must not exceed {}",
            MAX_SQUARE_FOOTAGE
        )));
    }
    Ok(())
}

/// Lifecycle status for a freshly captured lead.
pub fn initial_status(tier: LeadTier) -> &'static str {
    if tier.is_priority() {
        "new"
    } else {
        "pending"
    }
}

/// Text for the emergency handoff; defaults to the MD line.
pub fn emergency_handoff_message(area: Option<ServiceArea>) -> String {
    let area = area.unwrap_or(ServiceArea::MD);
    format!(
        "This is an EMERGENCY situation. Please call us immediately at {}. We're available 24/7 and will dispatch a team right away.",
        area.phone_number()
    )
}

fn label_or_unknown(label: Option<&'static str>) -> &'static str {
    label.unwrap_or("unknown")
}

/// `$24,750` style formatting for whole-dollar amounts.
pub fn format_usd(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}
