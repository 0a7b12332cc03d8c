//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use restoration_leads::config::{Config, CrmConfig};
use restoration_leads::crm_sync::SyncOutcome;
use restoration_leads::db_storage::LeadStore;
use restoration_leads::errors::AppError;
use restoration_leads::models::{Lead, NewLead, SyncStatus, Testimonial};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

pub fn crm_config(base_url: &str) -> CrmConfig {
    CrmConfig::with_credentials(base_url, "test-key", "loc-1", "pipe-1", "stage-new")
}

pub fn test_config(base_url: &str) -> Config {
    Config {
        database_url: "postgresql://test".to_string(),
        port: 8080,
        crm: crm_config(base_url),
    }
}

pub fn sample_lead() -> Lead {
    Lead {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        business_name: "Acme Storage".to_string(),
        contact_name: "Dana Reyes".to_string(),
        phone: "+13019005171".to_string(),
        email: Some("ops@acme-storage.com".to_string()),
        property_address: "1 Main St, Rockville, MD 20850".to_string(),
        property_type: Some("warehouse".to_string()),
        property_size: Some(12_000),
        damage_type: vec!["water".to_string()],
        damage_description: None,
        urgency_level: Some("emergency".to_string()),
        service_area: Some("MD".to_string()),
        zip_code: Some("20850".to_string()),
        insurance_carrier: None,
        policy_number: None,
        lead_source: None,
        status: "pending".to_string(),
        lead_score: Some(95),
        lead_tier: Some("platinum".to_string()),
        estimated_cost_low: Some(40_000),
        estimated_cost_high: Some(60_000),
        crm_contact_id: None,
        crm_opportunity_id: None,
        crm_sync_status: "pending".to_string(),
        crm_sync_error: None,
        updated_at: None,
    }
}

/// In-memory `LeadStore` that records every sync outcome.
#[derive(Default)]
pub struct MemoryStore {
    pub leads: Mutex<HashMap<Uuid, Lead>>,
    pub testimonials: Vec<Testimonial>,
    pub outcomes: Mutex<Vec<(Uuid, SyncOutcome)>>,
    pub fail_writes: bool,
    /// When set, the next `record_sync_outcome` call panics.
    pub panic_next_record: AtomicBool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn panicking_once() -> Self {
        Self {
            panic_next_record: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn has_panicked(&self) -> bool {
        !self.panic_next_record.load(Ordering::SeqCst)
    }

    pub fn with_testimonials(count: usize) -> Self {
        let testimonials = (0..count)
            .map(|i| Testimonial {
                id: Uuid::new_v4(),
                created_at: Utc::now(),
                customer_name: format!("Customer {}", i),
                location: "Rockville, MD".to_string(),
                service_type: "water".to_string(),
                property_type: None,
                quote: "Fast and professional.".to_string(),
                rating: 5,
                display_order: i as i32,
                active: true,
            })
            .collect();
        Self {
            testimonials,
            ..Default::default()
        }
    }

    pub fn lead_count(&self) -> usize {
        self.leads.lock().unwrap().len()
    }

    pub fn lead(&self, id: Uuid) -> Option<Lead> {
        self.leads.lock().unwrap().get(&id).cloned()
    }

    pub fn outcome_ids(&self) -> Vec<Uuid> {
        self.outcomes.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }

    pub fn outcome_count(&self) -> usize {
        self.outcomes.lock().unwrap().len()
    }

    /// Polls until `count` outcomes were recorded or two seconds pass.
    pub async fn wait_for_outcomes(&self, count: usize) -> bool {
        for _ in 0..200 {
            if self.outcome_count() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn insert_lead(&self, new: &NewLead) -> Result<Lead, AppError> {
        if self.fail_writes {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }

        let lead = Lead {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            business_name: new.business_name.clone(),
            contact_name: new.contact_name.clone(),
            phone: new.phone.clone(),
            email: new.email.clone(),
            property_address: new.property_address.clone(),
            property_type: new.property_type.map(|p| p.as_str().to_string()),
            property_size: new.property_size,
            damage_type: new.damage_type.clone(),
            damage_description: new.damage_description.clone(),
            urgency_level: new.urgency_level.map(|u| u.as_str().to_string()),
            service_area: new.service_area.map(|a| a.as_str().to_string()),
            zip_code: new.zip_code.clone(),
            insurance_carrier: new.insurance_carrier.clone(),
            policy_number: new.policy_number.clone(),
            lead_source: new.lead_source.clone(),
            status: new.status.clone().unwrap_or_else(|| "pending".to_string()),
            lead_score: new.lead_score,
            lead_tier: new.lead_tier.map(|t| t.as_str().to_string()),
            estimated_cost_low: new.estimated_cost_low,
            estimated_cost_high: new.estimated_cost_high,
            crm_contact_id: None,
            crm_opportunity_id: None,
            crm_sync_status: SyncStatus::Pending.as_str().to_string(),
            crm_sync_error: None,
            updated_at: None,
        };
        self.leads.lock().unwrap().insert(lead.id, lead.clone());
        Ok(lead)
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        Ok(self.lead(id))
    }

    async fn record_sync_outcome(&self, id: Uuid, outcome: &SyncOutcome) -> Result<(), AppError> {
        if self.panic_next_record.swap(false, Ordering::SeqCst) {
            panic!("store blew up recording lead {}", id);
        }
        {
            let mut leads = self.leads.lock().unwrap();
            if let Some(lead) = leads.get_mut(&id) {
                if let Some(contact_id) = outcome.contact_id() {
                    lead.crm_contact_id = Some(contact_id.to_string());
                }
                if let Some(opportunity_id) = outcome.opportunity_id() {
                    lead.crm_opportunity_id = Some(opportunity_id.to_string());
                }
                lead.crm_sync_status = outcome.sync_status().as_str().to_string();
                lead.crm_sync_error = outcome.error_message();
            }
        }
        self.outcomes.lock().unwrap().push((id, outcome.clone()));
        Ok(())
    }

    async fn list_testimonials(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Testimonial>, AppError> {
        Ok(self
            .testimonials
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
