use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::assessment::{ContactInfo, DamageAssessment};
use crate::estimator::{CostBreakdown, CostEstimate, CostRange};
use crate::handlers::{self, AppState};
use crate::models::{
    DamageType, Lead, LeadSubmissionResponse, LeadTier, NewLead, PropertyType, ServiceArea,
    Severity, SyncStatus, Testimonial, Urgency,
};
use crate::scoring::LeadScore;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::submit_lead,
        handlers::get_lead,
        handlers::estimate,
        handlers::assessment_action,
        handlers::submit_assessment,
        handlers::emergency_contact,
        handlers::list_testimonials,
        handlers::crm_status
    ),
    components(schemas(
        Lead,
        NewLead,
        LeadSubmissionResponse,
        Testimonial,
        DamageType,
        Severity,
        Urgency,
        PropertyType,
        ServiceArea,
        LeadTier,
        SyncStatus,
        ContactInfo,
        DamageAssessment,
        CostRange,
        CostBreakdown,
        CostEstimate,
        LeadScore,
        handlers::EstimateResponse,
        handlers::AssessmentActionRequest,
        handlers::AssessmentActionResponse,
        handlers::AssessmentSubmitResponse,
        handlers::EmergencyContactResponse,
        handlers::TestimonialsResponse,
        handlers::CrmStatusResponse
    )),
    tags(
        (name = "leads", description = "Lead intake and lookup"),
        (name = "assessment", description = "Damage assessment conversation and pricing"),
        (name = "content", description = "Marketing page content"),
        (name = "system", description = "Health and configuration")
    ),
    info(title = "Restoration Leads API")
)]
pub struct ApiDoc;

/// API routes with their state applied. Rate limiting and the other
/// transport layers are added by the binary.
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/leads", post(handlers::submit_lead))
        .route("/api/leads/:id", get(handlers::get_lead))
        .route("/api/estimate", post(handlers::estimate))
        .route("/api/assessment/actions", post(handlers::assessment_action))
        .route("/api/assessment/submit", post(handlers::submit_assessment))
        .route("/api/emergency-contact", get(handlers::emergency_contact))
        .route("/api/testimonials", get(handlers::list_testimonials))
        .route("/api/crm/status", get(handlers::crm_status))
        .with_state(state)
}

/// Swagger UI at `/docs` over the generated document.
pub fn docs_routes() -> Router {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
