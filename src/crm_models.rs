use serde::{Deserialize, Serialize};

use crate::assessment::CHAT_LEAD_SOURCE;
use crate::estimator::CostRange;
use crate::models::Lead;

/// Contact payload for `POST /contacts/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    pub location_id: String,
    #[serde(flatten)]
    pub contact: ContactDraft,
}

/// Contact fields derived from a lead, before the location is attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDraft {
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub source: String,
    /// The API version in use ignores custom fields, so tier, urgency,
    /// damage and size travel as tags.
    pub tags: Vec<String>,
}

/// Opportunity payload for `POST /opportunities/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOpportunityRequest {
    pub location_id: String,
    pub pipeline_id: String,
    pub pipeline_stage_id: String,
    #[serde(flatten)]
    pub opportunity: OpportunityDraft,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityDraft {
    pub contact_id: String,
    pub name: String,
    pub monetary_value: i64,
    pub status: OpportunityStatus,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStatus {
    Open,
    Won,
    Lost,
    Abandoned,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmContact {
    pub id: String,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactEnvelope {
    pub contact: CrmContact,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmOpportunity {
    pub id: String,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub pipeline_id: Option<String>,
    #[serde(default)]
    pub pipeline_stage_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub monetary_value: Option<f64>,
    #[serde(default)]
    pub status: Option<OpportunityStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpportunityEnvelope {
    pub opportunity: CrmOpportunity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineStage {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub stages: Vec<PipelineStage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelinesResponse {
    #[serde(default)]
    pub pipelines: Vec<Pipeline>,
}

impl PipelineStage {
    /// Environment variable name for this stage, e.g. `GHL_STAGE_NEW_CLIENT`.
    pub fn env_var_name(&self) -> String {
        let name: String = self
            .name
            .to_uppercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("GHL_STAGE_{}", name)
    }
}

const CHAT_SOURCE_LABEL: &str = "AI Damage Assessment Chat";
const FORM_SOURCE_LABEL: &str = "Website Contact Form";

/// Human-readable source label for the CRM, by where the lead came from.
pub fn source_label(lead: &Lead) -> &'static str {
    match lead.lead_source.as_deref() {
        Some(CHAT_LEAD_SOURCE) => CHAT_SOURCE_LABEL,
        _ => FORM_SOURCE_LABEL,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Splits `"street, city, ST 12345"` into its parts.
///
/// Missing parts come back empty; the state falls back to `fallback_state`.
fn split_address(address: &str, fallback_state: Option<&str>) -> (String, String, String, String) {
    let parts: Vec<&str> = address.split(',').map(str::trim).collect();
    let address1 = parts.first().copied().unwrap_or_default().to_string();
    let city = parts.get(1).copied().unwrap_or_default().to_string();
    let state_zip: Vec<&str> = parts
        .get(2)
        .copied()
        .unwrap_or_default()
        .split_whitespace()
        .collect();

    let state = state_zip
        .first()
        .copied()
        .or(fallback_state)
        .unwrap_or_default()
        .to_string();
    let postal_code = state_zip.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();

    (address1, city, state, postal_code)
}

/// Contact fields for a stored lead.
pub fn contact_draft_from_lead(lead: &Lead) -> ContactDraft {
    let mut names = lead.contact_name.split_whitespace();
    let first_name = names.next().unwrap_or("Unknown").to_string();
    let last_name = Some(names.collect::<Vec<_>>().join(" ")).filter(|n| !n.is_empty());

    let (address1, city, state, postal_code) =
        split_address(&lead.property_address, lead.service_area.as_deref());

    let mut tags = vec![
        format!(
            "{}-lead",
            non_empty(lead.lead_tier.as_deref()).unwrap_or("bronze")
        ),
        non_empty(lead.urgency_level.as_deref())
            .unwrap_or("assessment")
            .to_string(),
    ];
    tags.extend(
        lead.damage_type
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
    );
    tags.push(
        non_empty(lead.service_area.as_deref())
            .unwrap_or("unknown-area")
            .to_string(),
    );
    tags.push(format!(
        "property:{}",
        non_empty(lead.property_type.as_deref()).unwrap_or("unknown")
    ));
    tags.push(format!(
        "size:{}k",
        lead.property_size.unwrap_or(0).max(0) / 1000
    ));

    ContactDraft {
        first_name,
        last_name,
        email: non_empty(lead.email.as_deref()).map(str::to_string),
        phone: lead.phone.clone(),
        company_name: non_empty(Some(lead.business_name.as_str())).map(str::to_string),
        address1,
        city,
        state,
        postal_code,
        country: "US".to_string(),
        source: source_label(lead).to_string(),
        tags,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Opportunity fields for a stored lead linked to `contact_id`.
///
/// The monetary value is the estimate midpoint, or zero when the lead has
/// no estimate.
pub fn opportunity_draft_from_lead(lead: &Lead, contact_id: &str) -> OpportunityDraft {
    let damage = lead
        .damage_type
        .first()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .unwrap_or("damage");
    let business = non_empty(Some(lead.business_name.as_str()))
        .or_else(|| non_empty(Some(lead.contact_name.as_str())))
        .unwrap_or("Commercial Property");

    let monetary_value = match (lead.estimated_cost_low, lead.estimated_cost_high) {
        (Some(low), Some(high)) if low > 0 && high > 0 => CostRange { low, high }.midpoint(),
        _ => 0,
    };

    OpportunityDraft {
        contact_id: contact_id.to_string(),
        name: format!("{} Restoration - {}", capitalize(damage), business),
        monetary_value,
        status: OpportunityStatus::Open,
        source: source_label(lead).to_string(),
    }
}
