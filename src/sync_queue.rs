use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use uuid::Uuid;

use crate::crm_client::CrmClient;
use crate::crm_sync::sync_lead;
use crate::db_storage::LeadStore;
use crate::models::Lead;

/// Upper bound on CRM syncs running at the same time.
pub const MAX_CONCURRENT_SYNCS: usize = 8;

/// A stored lead waiting to be pushed into the CRM.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub lead: Lead,
}

/// Handle for scheduling CRM syncs off the request path.
///
/// Enqueueing never blocks and never fails the caller. The worker exits once
/// every handle is dropped and the jobs in flight have finished.
#[derive(Clone)]
pub struct SyncQueue {
    tx: mpsc::UnboundedSender<SyncJob>,
}

impl SyncQueue {
    pub fn enqueue(&self, lead: Lead) {
        let lead_id = lead.id;
        if let Err(e) = self.tx.send(SyncJob { lead }) {
            tracing::error!("❌ Could not schedule CRM sync for lead {}: {}", lead_id, e);
        } else {
            tracing::debug!("CRM sync scheduled for lead {}", lead_id);
        }
    }
}

/// Starts the background worker. Each queued lead is synced in its own task,
/// at most `MAX_CONCURRENT_SYNCS` at a time, and its outcome is written back
/// to the store.
pub fn spawn_sync_worker(
    crm: Arc<CrmClient>,
    store: Arc<dyn LeadStore>,
) -> (SyncQueue, JoinHandle<()>) {
    spawn_sync_worker_with_limit(crm, store, MAX_CONCURRENT_SYNCS)
}

/// [`spawn_sync_worker`] with an explicit concurrency bound (minimum 1).
pub fn spawn_sync_worker_with_limit(
    crm: Arc<CrmClient>,
    store: Arc<dyn LeadStore>,
    max_in_flight: usize,
) -> (SyncQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<SyncJob>();
    let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));

    let handle = tokio::spawn(async move {
        tracing::info!("CRM sync worker started");
        let mut in_flight: JoinSet<Uuid> = JoinSet::new();

        loop {
            tokio::select! {
                job = rx.recv() => {
                    let Some(job) = job else { break };
                    let Ok(permit) = permits.clone().acquire_owned().await else { break };
                    let crm = crm.clone();
                    let store = store.clone();
                    in_flight.spawn(async move {
                        let _permit = permit;
                        process_job(&crm, store.as_ref(), job).await
                    });
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_joined(joined);
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            log_joined(joined);
        }

        tracing::info!("CRM sync worker stopped");
    });

    (SyncQueue { tx }, handle)
}

async fn process_job(crm: &CrmClient, store: &dyn LeadStore, job: SyncJob) -> Uuid {
    let lead_id = job.lead.id;
    let outcome = sync_lead(crm, &job.lead).await;

    match store.record_sync_outcome(lead_id, &outcome).await {
        Ok(()) if outcome.is_success() => {
            tracing::info!("✅ Lead {} synced to CRM successfully", lead_id)
        }
        Ok(()) => tracing::error!(
            "❌ Failed to sync lead {} to CRM: {}",
            lead_id,
            outcome.error_message().unwrap_or_default()
        ),
        Err(e) => tracing::error!(
            "❌ Could not record CRM sync outcome for lead {}: {}",
            lead_id,
            e
        ),
    }

    lead_id
}

fn log_joined(joined: Result<Uuid, JoinError>) {
    match joined {
        Ok(lead_id) => tracing::debug!("CRM sync task for lead {} finished", lead_id),
        Err(e) if e.is_panic() => tracing::error!("❌ CRM sync task panicked: {}", e),
        Err(e) => tracing::warn!("⚠️  CRM sync task cancelled: {}", e),
    }
}
