use async_trait::async_trait;
use failsafe::futures::CircuitBreaker;
use sqlx::PgPool;
use std::future::Future;
use uuid::Uuid;

use crate::circuit_breaker::{create_db_circuit_breaker, DbCircuitBreaker};
use crate::crm_sync::SyncOutcome;
use crate::errors::{AppError, ResultExt};
use crate::models::{Lead, NewLead, SyncStatus, Testimonial};

/// Persistence for leads and testimonials.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Inserts a lead and returns the stored row, id and timestamps included.
    async fn insert_lead(&self, lead: &NewLead) -> Result<Lead, AppError>;

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError>;

    /// Writes the CRM linkage for a lead. Ids already stored are kept when
    /// the outcome carries none.
    async fn record_sync_outcome(&self, id: Uuid, outcome: &SyncOutcome) -> Result<(), AppError>;

    /// Active testimonials in display order.
    async fn list_testimonials(&self, limit: i64, offset: i64)
        -> Result<Vec<Testimonial>, AppError>;
}

/// Postgres-backed [`LeadStore`]. Every query goes through a shared circuit
/// breaker so a failing database is answered fast instead of piling up
/// connections.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    breaker: DbCircuitBreaker,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            breaker: create_db_circuit_breaker(),
        }
    }

    async fn guarded<T, F>(&self, query: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match self.breaker.call(query).await {
            Ok(value) => Ok(value),
            Err(failsafe::Error::Inner(e)) => Err(AppError::DatabaseError(e)),
            Err(failsafe::Error::Rejected) => {
                tracing::warn!("⚠️  Database circuit breaker open, rejecting query");
                Err(AppError::InternalError(
                    "Database temporarily unavailable".to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl LeadStore for PgStore {
    async fn insert_lead(&self, lead: &NewLead) -> Result<Lead, AppError> {
        let query = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (
                business_name, contact_name, phone, email, property_address,
                property_type, property_size, damage_type, damage_description,
                urgency_level, service_area, zip_code, insurance_carrier,
                policy_number, lead_source, status, lead_score, lead_tier,
                estimated_cost_low, estimated_cost_high, crm_sync_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21)
            RETURNING *
            "#,
        )
        .bind(lead.business_name.trim())
        .bind(lead.contact_name.trim())
        .bind(lead.phone.trim())
        .bind(lead.email.as_deref())
        .bind(lead.property_address.trim())
        .bind(lead.property_type.map(|p| p.as_str()))
        .bind(lead.property_size)
        .bind(&lead.damage_type)
        .bind(lead.damage_description.as_deref())
        .bind(lead.urgency_level.map(|u| u.as_str()))
        .bind(lead.service_area.map(|a| a.as_str()))
        .bind(lead.zip_code.as_deref())
        .bind(lead.insurance_carrier.as_deref())
        .bind(lead.policy_number.as_deref())
        .bind(lead.lead_source.as_deref())
        .bind(lead.status.as_deref().unwrap_or("pending"))
        .bind(lead.lead_score)
        .bind(lead.lead_tier.map(|t| t.as_str()))
        .bind(lead.estimated_cost_low)
        .bind(lead.estimated_cost_high)
        .bind(SyncStatus::Pending.as_str())
        .fetch_one(&self.pool);

        let stored = self.guarded(query).await.context("inserting lead")?;
        tracing::info!("✓ Lead stored: {} ({})", stored.id, stored.business_name);
        Ok(stored)
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let query = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool);
        self.guarded(query)
            .await
            .with_context(|| format!("loading lead {}", id))
    }

    async fn record_sync_outcome(&self, id: Uuid, outcome: &SyncOutcome) -> Result<(), AppError> {
        let error = outcome.error_message();
        let query = sqlx::query(
            r#"
            UPDATE leads
            SET crm_contact_id = COALESCE($2, crm_contact_id),
                crm_opportunity_id = COALESCE($3, crm_opportunity_id),
                crm_sync_status = $4,
                crm_sync_error = $5,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(outcome.contact_id())
        .bind(outcome.opportunity_id())
        .bind(outcome.sync_status().as_str())
        .bind(error.as_deref())
        .execute(&self.pool);

        let result = self
            .guarded(query)
            .await
            .with_context(|| format!("recording CRM sync for lead {}", id))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Lead {} not found", id)));
        }

        tracing::debug!(
            "Lead {} CRM sync status → {}",
            id,
            outcome.sync_status().as_str()
        );
        Ok(())
    }

    async fn list_testimonials(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Testimonial>, AppError> {
        let query = sqlx::query_as::<_, Testimonial>(
            r#"
            SELECT * FROM testimonials
            WHERE active = true
            ORDER BY display_order ASC, created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool);
        self.guarded(query).await.context("listing testimonials")
    }
}
