use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::config::CrmConfig;
use crate::crm_models::{
    ContactDraft, ContactEnvelope, CreateContactRequest, CreateOpportunityRequest, CrmContact,
    CrmOpportunity, OpportunityDraft, OpportunityEnvelope, Pipeline, PipelinesResponse,
};
use crate::errors::AppError;

/// Structured failure from a CRM call. Every CRM failure, including
/// transport errors and missing settings, is reported as one of these.
#[derive(Debug, Clone, PartialEq)]
pub struct CrmError {
    pub message: String,
    /// HTTP status from the CRM, or 500 for local failures.
    pub status_code: u16,
    pub details: Option<Value>,
}

impl CrmError {
    pub fn new(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code,
            details: None,
        }
    }

    fn local(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::INTERNAL_SERVER_ERROR.as_u16())
    }
}

impl fmt::Display for CrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status {})", self.message, self.status_code)
    }
}

impl std::error::Error for CrmError {}

pub type CrmResult<T> = Result<T, CrmError>;

/// Attempt bound and backoff base for CRM calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after the zero-based `attempt`: base, 2×base, 4×base, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Client for the LeadConnector CRM API.
///
/// Authenticates with a bearer token and the `Version` header. Every
/// non-success response and every transport failure is retried with
/// exponential backoff up to the policy's attempt bound. Missing settings and
/// unreadable success bodies are returned at once.
#[derive(Clone)]
pub struct CrmClient {
    client: reqwest::Client,
    config: CrmConfig,
    retry: RetryPolicy,
}

impl CrmClient {
    pub fn new(config: CrmConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create CRM client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &CrmConfig {
        &self.config
    }

    fn location_id(&self) -> CrmResult<&str> {
        self.config
            .location_id
            .as_deref()
            .ok_or_else(|| CrmError::local("CRM location id not configured"))
    }

    /// Sends one authenticated JSON request, retrying as described on the type.
    async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> CrmResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| CrmError::local("CRM API key not configured"))?;

        let url = format!("{}{}", self.config.base_url, endpoint);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..max_attempts {
            let mut builder = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(api_key)
                .header("Version", &self.config.api_version)
                .header("Accept", "application/json")
                .query(query);
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let retryable = match builder.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        CrmError::new(
                            "Max retries exceeded: rate limited by CRM API",
                            status.as_u16(),
                        )
                    } else {
                        let text = response.text().await.unwrap_or_default();

                        if status.is_success() {
                            return serde_json::from_str::<T>(&text).map_err(|e| {
                                CrmError::new(
                                    format!("Failed to parse CRM response: {}", e),
                                    StatusCode::BAD_GATEWAY.as_u16(),
                                )
                            });
                        }

                        error_from_body(status, &text)
                    }
                }
                Err(e) => CrmError {
                    message: format!("CRM request failed: {}", e),
                    status_code: e
                        .status()
                        .map(|s| s.as_u16())
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR.as_u16()),
                    details: None,
                },
            };

            if attempt + 1 < max_attempts {
                let delay = self.retry.delay_for(attempt);
                tracing::warn!(
                    "CRM {} {} failed ({}). Retrying in {}ms (attempt {}/{})",
                    method,
                    endpoint,
                    retryable,
                    delay.as_millis(),
                    attempt + 1,
                    max_attempts
                );
                tokio::time::sleep(delay).await;
            }
            last_error = Some(retryable);
        }

        let last_error = last_error.unwrap_or_else(|| CrmError::local("Max retries exceeded"));

        tracing::error!(
            "CRM {} {} gave up after {} attempts: {}",
            method,
            endpoint,
            max_attempts,
            last_error
        );
        Err(last_error)
    }

    /// Creates a contact in the configured location.
    pub async fn create_contact(&self, contact: &ContactDraft) -> CrmResult<CrmContact> {
        let payload = CreateContactRequest {
            location_id: self.location_id()?.to_string(),
            contact: contact.clone(),
        };

        tracing::info!(
            "Creating CRM contact: {} {}",
            contact.first_name,
            contact.last_name.as_deref().unwrap_or_default()
        );

        let envelope: ContactEnvelope = self
            .request(Method::POST, "/contacts/", &[], Some(&payload))
            .await?;

        tracing::info!("✓ CRM contact created: {}", envelope.contact.id);
        Ok(envelope.contact)
    }

    /// Creates an open opportunity in the configured pipeline, at the
    /// configured starting stage.
    pub async fn create_opportunity(
        &self,
        opportunity: &OpportunityDraft,
    ) -> CrmResult<CrmOpportunity> {
        let (Some(pipeline_id), Some(stage_id)) = (
            self.config.pipeline_id.as_deref(),
            self.config.stage_id.as_deref(),
        ) else {
            return Err(CrmError::local(
                "Pipeline configuration missing. Set GHL_PIPELINE_ID and GHL_STAGE_NEW_CLIENT",
            ));
        };

        let payload = CreateOpportunityRequest {
            location_id: self.location_id()?.to_string(),
            pipeline_id: pipeline_id.to_string(),
            pipeline_stage_id: stage_id.to_string(),
            opportunity: opportunity.clone(),
        };

        tracing::info!(
            "Creating CRM opportunity '{}' for contact {} (value {})",
            opportunity.name,
            opportunity.contact_id,
            opportunity.monetary_value
        );

        let envelope: OpportunityEnvelope = self
            .request(Method::POST, "/opportunities/", &[], Some(&payload))
            .await?;

        tracing::info!("✓ CRM opportunity created: {}", envelope.opportunity.id);
        Ok(envelope.opportunity)
    }

    /// Lists pipelines and their stages for the configured location.
    pub async fn list_pipelines(&self) -> CrmResult<Vec<Pipeline>> {
        let location_id = self.location_id()?;
        let response: PipelinesResponse = self
            .request(
                Method::GET,
                "/opportunities/pipelines",
                &[("locationId", location_id)],
                None::<&()>,
            )
            .await?;
        Ok(response.pipelines)
    }

    /// Fetches at most one contact to confirm the key can read contacts.
    pub async fn check_contacts_access(&self) -> CrmResult<()> {
        let location_id = self.location_id()?;
        let _: Value = self
            .request(
                Method::GET,
                "/contacts/",
                &[("locationId", location_id), ("limit", "1")],
                None::<&()>,
            )
            .await?;
        Ok(())
    }
}

/// Error value for a non-success response, using the body's `message` when
/// it has one.
fn error_from_body(status: StatusCode, text: &str) -> CrmError {
    let details: Option<Value> = serde_json::from_str(text).ok();
    let message = details
        .as_ref()
        .and_then(|d| d.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "CRM API error: {}",
                status.canonical_reason().unwrap_or("Unknown error")
            )
        });

    CrmError {
        message,
        status_code: status.as_u16(),
        details,
    }
}
