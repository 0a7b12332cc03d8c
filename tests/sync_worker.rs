/// Background CRM sync worker tests against a mocked LeadConnector API
mod common;

use common::{crm_config, sample_lead, MemoryStore};
use restoration_leads::crm_client::{CrmClient, RetryPolicy};
use restoration_leads::db_storage::LeadStore;
use restoration_leads::models::Lead;
use restoration_leads::sync_queue::{spawn_sync_worker, spawn_sync_worker_with_limit};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> Arc<CrmClient> {
    Arc::new(
        CrmClient::new(crm_config(&server.uri()))
            .unwrap()
            .with_retry_policy(RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
            }),
    )
}

async fn mount_opportunity_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/opportunities/"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "opportunity": { "id": "opp-1" } })),
        )
        .mount(server)
        .await;
}

async fn mount_contact_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/contacts/"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "contact": { "id": "contact-1" } })),
        )
        .mount(server)
        .await;
}

fn lead_named(contact_name: &str) -> Lead {
    Lead {
        id: Uuid::new_v4(),
        contact_name: contact_name.to_string(),
        ..sample_lead()
    }
}

#[tokio::test]
async fn test_slow_lead_does_not_hold_up_the_next_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/contacts/"))
        .and(body_partial_json(json!({ "firstName": "Slow" })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "contact": { "id": "contact-slow" } }))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;
    mount_contact_ok(&server).await;
    mount_opportunity_ok(&server).await;

    let store = Arc::new(MemoryStore::default());
    let dyn_store: Arc<dyn LeadStore> = store.clone();
    let (queue, _worker) = spawn_sync_worker(client(&server), dyn_store);

    let slow = lead_named("Slow Lane");
    let fast = lead_named("Dana Reyes");
    queue.enqueue(slow.clone());
    queue.enqueue(fast.clone());

    assert!(store.wait_for_outcomes(1).await);
    assert_eq!(store.outcome_ids()[0], fast.id);

    assert!(store.wait_for_outcomes(2).await);
    assert_eq!(store.outcome_ids()[1], slow.id);
}

#[tokio::test]
async fn test_worker_survives_a_panicking_job() {
    let server = MockServer::start().await;
    mount_contact_ok(&server).await;
    mount_opportunity_ok(&server).await;

    let store = Arc::new(MemoryStore::panicking_once());
    let dyn_store: Arc<dyn LeadStore> = store.clone();
    let (queue, worker) = spawn_sync_worker_with_limit(client(&server), dyn_store, 1);

    queue.enqueue(lead_named("First Lead"));
    for _ in 0..200 {
        if store.has_panicked() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(store.has_panicked());

    let next = lead_named("Second Lead");
    queue.enqueue(next.clone());

    assert!(store.wait_for_outcomes(1).await, "worker stopped after a panic");
    assert_eq!(store.outcome_ids(), vec![next.id]);

    drop(queue);
    tokio::time::timeout(Duration::from_secs(2), worker)
        .await
        .expect("worker did not drain")
        .expect("worker task failed");
}

#[tokio::test]
async fn test_huge_estimate_syncs_with_exact_midpoint() {
    let server = MockServer::start().await;
    mount_contact_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/opportunities/"))
        .and(body_partial_json(json!({
            "monetaryValue": 9_000_000_000_000_000_000i64
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "opportunity": { "id": "opp-big" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::default());
    let dyn_store: Arc<dyn LeadStore> = store.clone();
    let (queue, _worker) = spawn_sync_worker(client(&server), dyn_store);

    let big = Lead {
        estimated_cost_low: Some(9_000_000_000_000_000_000),
        estimated_cost_high: Some(9_000_000_000_000_000_000),
        ..lead_named("Big Job")
    };
    let normal = lead_named("Dana Reyes");
    queue.enqueue(big.clone());
    assert!(store.wait_for_outcomes(1).await);
    queue.enqueue(normal.clone());
    assert!(store.wait_for_outcomes(2).await, "worker stopped after a large lead");

    let outcomes = store.outcomes.lock().unwrap().clone();
    let (_, big_outcome) = outcomes.iter().find(|(id, _)| *id == big.id).unwrap();
    assert_eq!(big_outcome.opportunity_id(), Some("opp-big"));
}
