use crate::assessment::{emergency_handoff_message, AssessmentAction, DamageAssessment};
use crate::config::Config;
use crate::db_storage::LeadStore;
use crate::errors::AppError;
use crate::estimator::CostEstimate;
use crate::models::*;
use crate::scoring::{score_lead, LeadScore};
use crate::sync_queue::SyncQueue;
use crate::validation::{is_valid_email, validate_us_phone};
use axum::{
    extract::{FromRequest, Path, Query, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Lead and testimonial persistence.
    pub store: Arc<dyn LeadStore>,
    /// Application configuration.
    pub config: Config,
    /// Hands stored leads to the background CRM sync worker.
    pub sync_queue: SyncQueue,
    /// Testimonial pages keyed by `(limit, offset)`.
    pub testimonials_cache: Cache<(i64, i64), Vec<Testimonial>>,
    /// Recently stored leads keyed by phone and address, so a double
    /// submission returns the first record instead of a second row.
    pub recent_leads_cache: Cache<String, Lead>,
}

impl AppState {
    pub fn new(store: Arc<dyn LeadStore>, config: Config, sync_queue: SyncQueue) -> Self {
        Self {
            store,
            config,
            sync_queue,
            testimonials_cache: Cache::builder()
                .time_to_live(Duration::from_secs(300))
                .max_capacity(100)
                .build(),
            recent_leads_cache: Cache::builder()
                .time_to_live(Duration::from_secs(300))
                .max_capacity(10_000)
                .build(),
        }
    }
}

// ============ Request/Response bodies ============

/// JSON body extractor whose rejections carry the `{success: false, error}`
/// envelope instead of axum's plain-text body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub estimate: CostEstimate,
    pub lead_score: LeadScore,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssessmentActionRequest {
    #[serde(default)]
    pub assessment: DamageAssessment,
    /// `{"name": "setDamageType", "parameters": {...}}`
    #[schema(value_type = Object)]
    pub action: AssessmentAction,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssessmentActionResponse {
    pub assessment: DamageAssessment,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssessmentSubmitResponse {
    pub success: bool,
    pub message: String,
    pub lead: Option<Lead>,
    /// Reset after a successful submission, unchanged otherwise.
    pub assessment: DamageAssessment,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmergencyContactQuery {
    /// `MD`, `DC` or `VA`; defaults to `MD`.
    pub service_area: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmergencyContactResponse {
    pub service_area: ServiceArea,
    pub phone_number: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TestimonialsResponse {
    pub success: bool,
    pub data: Vec<Testimonial>,
}

/// Which CRM settings are present. Secrets are never echoed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CrmStatusResponse {
    pub configured: bool,
    #[serde(rename = "GHL_API_KEY")]
    pub api_key: String,
    #[serde(rename = "GHL_LOCATION_ID")]
    pub location_id: String,
    #[serde(rename = "GHL_PIPELINE_ID")]
    pub pipeline_id: String,
    #[serde(rename = "GHL_STAGE_NEW_CLIENT")]
    pub stage_new_client: String,
    #[serde(rename = "GHL_API_BASE_URL")]
    pub base_url: String,
    #[serde(rename = "GHL_API_VERSION")]
    pub api_version: String,
}

fn failure(status: StatusCode, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({ "success": false, "error": message })))
}

// ============ Lead intake ============

/// Replaces a valid phone with its E.164 form and drops an unusable email.
fn normalize_contact_fields(lead: &mut NewLead) {
    let (valid, normalized) = validate_us_phone(&lead.phone);
    if valid {
        lead.phone = normalized;
    } else {
        tracing::warn!(
            "⚠️  Keeping phone as typed ({}): {}",
            normalized,
            lead.phone
        );
    }

    lead.email = lead
        .email
        .take()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .filter(|e| is_valid_email(e));
}

/// Prices and scores a form lead that arrived without a score.
///
/// A validated estimate sent with the lead is kept; otherwise both bounds
/// come from the computed estimate.
fn attach_score(lead: &mut NewLead) {
    let assessment = DamageAssessment::from_lead(lead);
    match assessment.estimate() {
        Ok(estimate) => {
            if lead.estimated_cost_low.is_none() || lead.estimated_cost_high.is_none() {
                lead.estimated_cost_low = Some(estimate.low);
                lead.estimated_cost_high = Some(estimate.high);
            }
            let score = score_lead(&assessment, lead.estimated_cost_high);
            lead.lead_score = Some(i32::from(score.score));
            lead.lead_tier = Some(score.tier);
            tracing::debug!(
                "Lead scored {} ({}), estimate {:?}-{:?}",
                score.score,
                score.tier,
                lead.estimated_cost_low,
                lead.estimated_cost_high
            );
        }
        Err(e) => tracing::warn!("⚠️  Could not score lead: {}", e),
    }
}

fn duplicate_key(lead: &NewLead) -> String {
    format!(
        "{}|{}",
        lead.phone.trim(),
        lead.property_address.trim().to_lowercase()
    )
}

/// Normalizes, scores, stores and schedules the CRM sync for one lead.
///
/// Returns as soon as the lead is stored; the CRM is never awaited here.
async fn capture_lead(state: &AppState, mut lead: NewLead) -> Result<Lead, AppError> {
    normalize_contact_fields(&mut lead);
    lead.settle_score();
    if lead.lead_score.is_none() {
        attach_score(&mut lead);
    }

    let key = duplicate_key(&lead);
    if let Some(existing) = state.recent_leads_cache.get(&key).await {
        tracing::info!(
            "⚠️  Duplicate submission within window, returning lead {}",
            existing.id
        );
        return Ok(existing);
    }

    let stored = state.store.insert_lead(&lead).await?;
    state.recent_leads_cache.insert(key, stored.clone()).await;
    state.sync_queue.enqueue(stored.clone());

    Ok(stored)
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "system"
)]
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "restoration-leads",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/leads
///
/// Stores a lead from the contact form and schedules its CRM sync.
#[utoipa::path(
    post,
    path = "/api/leads",
    request_body = NewLead,
    responses(
        (status = 200, description = "Lead stored", body = LeadSubmissionResponse),
        (status = 400, description = "Missing required fields or invalid figures"),
        (status = 500, description = "Failed to save lead")
    ),
    tag = "leads"
)]
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<NewLead>,
) -> Result<Json<LeadSubmissionResponse>, (StatusCode, Json<serde_json::Value>)> {
    tracing::info!("POST /api/leads - business: {}", payload.business_name);

    if !payload.has_required_fields() {
        tracing::warn!("Lead rejected: missing required fields");
        return Err(failure(StatusCode::BAD_REQUEST, "Missing required fields"));
    }

    if let Err(e) = payload.validate_figures() {
        tracing::warn!("Lead rejected: {}", e);
        let message = match e {
            AppError::BadRequest(msg) => msg,
            other => other.to_string(),
        };
        return Err(failure(StatusCode::BAD_REQUEST, &message));
    }

    match capture_lead(&state, payload).await {
        Ok(lead) => Ok(Json(LeadSubmissionResponse {
            success: true,
            data: lead,
        })),
        Err(e) => {
            tracing::error!("Failed to submit lead: {}", e);
            Err(failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!(
                    "Failed to save lead. Please call us directly at: {}",
                    FALLBACK_CONTACT_NUMBERS
                ),
            ))
        }
    }
}

/// GET /api/leads/:id
#[utoipa::path(
    get,
    path = "/api/leads/{id}",
    params(("id" = Uuid, Path, description = "Lead id")),
    responses(
        (status = 200, description = "Stored lead with CRM sync fields", body = Lead),
        (status = 404, description = "No such lead")
    ),
    tag = "leads"
)]
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Lead>, AppError> {
    tracing::info!("GET /api/leads/{}", id);

    let lead = state
        .store
        .get_lead(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lead with id {} not found", id)))?;

    Ok(Json(lead))
}

// ============ Assessment ============

/// POST /api/estimate
///
/// Prices and scores an assessment without storing anything.
#[utoipa::path(
    post,
    path = "/api/estimate",
    request_body = DamageAssessment,
    responses(
        (status = 200, description = "Estimate and score", body = EstimateResponse),
        (status = 400, description = "Invalid assessment")
    ),
    tag = "assessment"
)]
pub async fn estimate(
    ApiJson(assessment): ApiJson<DamageAssessment>,
) -> Result<Json<EstimateResponse>, AppError> {
    let estimate = assessment.estimate()?;
    let lead_score = score_lead(&assessment, Some(estimate.high));

    tracing::debug!(
        "Estimate {}-{} scored {} ({})",
        estimate.low,
        estimate.high,
        lead_score.score,
        lead_score.tier
    );

    Ok(Json(EstimateResponse {
        estimate,
        lead_score,
    }))
}

/// POST /api/assessment/actions
///
/// Applies one conversation action to the assessment the client sent and
/// returns the updated assessment with the assistant's confirmation.
#[utoipa::path(
    post,
    path = "/api/assessment/actions",
    request_body = AssessmentActionRequest,
    responses(
        (status = 200, description = "Action applied", body = AssessmentActionResponse),
        (status = 400, description = "Unknown value or invalid action")
    ),
    tag = "assessment"
)]
pub async fn assessment_action(
    ApiJson(request): ApiJson<AssessmentActionRequest>,
) -> Result<Json<AssessmentActionResponse>, AppError> {
    let mut assessment = request.assessment;
    let message = assessment.apply(request.action)?;

    Ok(Json(AssessmentActionResponse {
        assessment,
        message,
    }))
}

/// POST /api/assessment/submit
///
/// Turns a completed assessment into a stored lead.
#[utoipa::path(
    post,
    path = "/api/assessment/submit",
    request_body = DamageAssessment,
    responses(
        (status = 200, description = "Lead stored", body = AssessmentSubmitResponse),
        (status = 400, description = "Assessment incomplete"),
        (status = 500, description = "Lead could not be stored", body = AssessmentSubmitResponse)
    ),
    tag = "assessment"
)]
pub async fn submit_assessment(
    State(state): State<Arc<AppState>>,
    ApiJson(assessment): ApiJson<DamageAssessment>,
) -> Result<(StatusCode, Json<AssessmentSubmitResponse>), AppError> {
    let submission = assessment.to_submission()?;
    let contact = assessment.contact_info.clone();

    match capture_lead(&state, submission.lead).await {
        Ok(lead) => {
            let message = format!(
                "Assessment submitted successfully! Lead ID: {}. Priority: {}. Our team will contact {} at {} shortly.",
                lead.id,
                submission.score.tier.as_str().to_uppercase(),
                contact.name,
                contact.phone
            );
            tracing::info!("✓ Assessment stored as lead {}", lead.id);

            let mut reset = assessment;
            reset.reset();
            Ok((
                StatusCode::OK,
                Json(AssessmentSubmitResponse {
                    success: true,
                    message,
                    lead: Some(lead),
                    assessment: reset,
                }),
            ))
        }
        Err(e) => {
            tracing::error!("Error submitting assessment: {}", e);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AssessmentSubmitResponse {
                    success: false,
                    message: format!(
                        "Error submitting assessment. Please call us directly at: {}",
                        FALLBACK_CONTACT_NUMBERS
                    ),
                    lead: None,
                    assessment,
                }),
            ))
        }
    }
}

/// GET /api/emergency-contact
#[utoipa::path(
    get,
    path = "/api/emergency-contact",
    params(EmergencyContactQuery),
    responses(
        (status = 200, description = "Emergency line", body = EmergencyContactResponse),
        (status = 400, description = "Unknown service area")
    ),
    tag = "assessment"
)]
pub async fn emergency_contact(
    Query(params): Query<EmergencyContactQuery>,
) -> Result<Json<EmergencyContactResponse>, AppError> {
    let service_area = match params.service_area.as_deref().map(str::trim) {
        None | Some("") => ServiceArea::MD,
        Some(raw) => ServiceArea::from_str(raw)?,
    };

    tracing::warn!("🚨 Emergency handoff requested for {}", service_area);

    Ok(Json(EmergencyContactResponse {
        service_area,
        phone_number: service_area.phone_number().to_string(),
        message: emergency_handoff_message(Some(service_area)),
    }))
}

// ============ Testimonials ============

/// GET /api/testimonials
///
/// Active testimonials in display order. A storage failure yields an empty
/// list with `success: false` so the page still renders.
#[utoipa::path(
    get,
    path = "/api/testimonials",
    params(TestimonialQuery),
    responses((status = 200, description = "Testimonials page", body = TestimonialsResponse)),
    tag = "content"
)]
pub async fn list_testimonials(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TestimonialQuery>,
) -> Json<TestimonialsResponse> {
    let (limit, offset) = params.limit_offset();

    if let Some(cached) = state.testimonials_cache.get(&(limit, offset)).await {
        tracing::debug!("✓ Testimonials cache hit ({}, {})", limit, offset);
        return Json(TestimonialsResponse {
            success: true,
            data: cached,
        });
    }

    match state.store.list_testimonials(limit, offset).await {
        Ok(testimonials) => {
            state
                .testimonials_cache
                .insert((limit, offset), testimonials.clone())
                .await;
            Json(TestimonialsResponse {
                success: true,
                data: testimonials,
            })
        }
        Err(e) => {
            tracing::error!("Error fetching testimonials: {}", e);
            Json(TestimonialsResponse {
                success: false,
                data: Vec::new(),
            })
        }
    }
}

// ============ CRM ============

fn presence(value: &Option<String>, show: bool) -> String {
    match value {
        Some(v) if show => format!("✅ Set ({})", v),
        Some(v) => format!("✅ Set (length: {})", v.len()),
        None => "❌ Not set".to_string(),
    }
}

/// GET /api/crm/status
///
/// Reports which CRM settings are present. Makes no network call.
#[utoipa::path(
    get,
    path = "/api/crm/status",
    responses((status = 200, description = "CRM settings summary", body = CrmStatusResponse)),
    tag = "system"
)]
pub async fn crm_status(State(state): State<Arc<AppState>>) -> Json<CrmStatusResponse> {
    let crm = &state.config.crm;

    Json(CrmStatusResponse {
        configured: crm.api_key.is_some()
            && crm.location_id.is_some()
            && crm.pipeline_id.is_some()
            && crm.stage_id.is_some(),
        api_key: presence(&crm.api_key, false),
        location_id: presence(&crm.location_id, true),
        pipeline_id: presence(&crm.pipeline_id, true),
        stage_new_client: presence(&crm.stage_id, true),
        base_url: crm.base_url.clone(),
        api_version: crm.api_version.clone(),
    })
}
