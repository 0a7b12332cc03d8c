use crate::crm_client::{CrmClient, CrmError};
use crate::crm_models::{contact_draft_from_lead, opportunity_draft_from_lead};
use crate::models::{Lead, SyncStatus};

/// Result of pushing one lead into the CRM.
///
/// A contact is always created before its opportunity, so a failed contact
/// means nothing was created, while a failed opportunity leaves a contact
/// behind whose id must be kept.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Synced {
        contact_id: String,
        opportunity_id: String,
    },
    ContactFailed {
        error: CrmError,
    },
    OpportunityFailed {
        contact_id: String,
        error: CrmError,
    },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Synced { .. })
    }

    pub fn sync_status(&self) -> SyncStatus {
        match self {
            SyncOutcome::Synced { .. } => SyncStatus::Synced,
            SyncOutcome::ContactFailed { .. } => SyncStatus::Failed,
            SyncOutcome::OpportunityFailed { .. } => SyncStatus::Partial,
        }
    }

    pub fn contact_id(&self) -> Option<&str> {
        match self {
            SyncOutcome::Synced { contact_id, .. }
            | SyncOutcome::OpportunityFailed { contact_id, .. } => Some(contact_id),
            SyncOutcome::ContactFailed { .. } => None,
        }
    }

    pub fn opportunity_id(&self) -> Option<&str> {
        match self {
            SyncOutcome::Synced { opportunity_id, .. } => Some(opportunity_id),
            _ => None,
        }
    }

    /// Human-readable failure, stored on the lead as `crm_sync_error`.
    pub fn error_message(&self) -> Option<String> {
        match self {
            SyncOutcome::Synced { .. } => None,
            SyncOutcome::ContactFailed { error } => {
                Some(format!("Failed to create contact: {}", error.message))
            }
            SyncOutcome::OpportunityFailed { error, .. } => Some(format!(
                "Contact created but opportunity failed: {}",
                error.message
            )),
        }
    }
}

/// Creates the contact, then the opportunity linked to it.
///
/// Never creates an opportunity when the contact step failed. Failures are
/// returned as values; nothing here panics or propagates.
pub async fn sync_lead(crm: &CrmClient, lead: &Lead) -> SyncOutcome {
    tracing::info!(lead_id = %lead.id, "🔄 Syncing lead to CRM: {}", lead.business_name);

    let contact = match crm.create_contact(&contact_draft_from_lead(lead)).await {
        Ok(contact) => contact,
        Err(error) => {
            tracing::error!(lead_id = %lead.id, "❌ CRM contact creation failed: {}", error);
            return SyncOutcome::ContactFailed { error };
        }
    };

    let draft = opportunity_draft_from_lead(lead, &contact.id);
    match crm.create_opportunity(&draft).await {
        Ok(opportunity) => {
            tracing::info!(
                lead_id = %lead.id,
                "✓ Lead synced to CRM (contact {}, opportunity {})",
                contact.id,
                opportunity.id
            );
            SyncOutcome::Synced {
                contact_id: contact.id,
                opportunity_id: opportunity.id,
            }
        }
        Err(error) => {
            tracing::warn!(
                lead_id = %lead.id,
                "⚠️  CRM contact {} created but opportunity failed: {}",
                contact.id,
                error
            );
            SyncOutcome::OpportunityFailed {
                contact_id: contact.id,
                error,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let synced = SyncOutcome::Synced {
            contact_id: "c1".into(),
            opportunity_id: "o1".into(),
        };
        assert!(synced.is_success());
        assert_eq!(synced.sync_status(), SyncStatus::Synced);
        assert_eq!(synced.contact_id(), Some("c1"));
        assert_eq!(synced.opportunity_id(), Some("o1"));
        assert_eq!(synced.error_message(), None);

        let partial = SyncOutcome::OpportunityFailed {
            contact_id: "c2".into(),
            error: CrmError::new("stage not found", 422),
        };
        assert_eq!(partial.sync_status(), SyncStatus::Partial);
        assert_eq!(partial.contact_id(), Some("c2"));
        assert_eq!(partial.opportunity_id(), None);
        assert_eq!(
            partial.error_message().as_deref(),
            Some("Contact created but opportunity failed: stage not found")
        );

        let failed = SyncOutcome::ContactFailed {
            error: CrmError::new("CRM API key not configured", 500),
        };
        assert!(!failed.is_success());
        assert_eq!(failed.sync_status(), SyncStatus::Failed);
        assert_eq!(failed.contact_id(), None);
        assert_eq!(
            failed.error_message().as_deref(),
            Some("Failed to create contact: CRM API key not configured")
        );
    }
}
