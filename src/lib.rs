//! Restoration Leads API Library
//!
//! Backend for a commercial restoration marketing site: cost estimates,
//! lead scoring, lead intake and storage, and CRM synchronization.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Pricing, scoring and the assessment conversation.
//! - `integrations`: CRM client and sync.
//! - `assessment`: Conversational damage assessment state.
//! - `circuit_breaker`: Circuit breaker for database calls.
//! - `config`: Configuration management.
//! - `crm_client`: LeadConnector CRM client with retry.
//! - `crm_models`: CRM payloads and lead mappings.
//! - `crm_sync`: Contact then opportunity sync for one lead.
//! - `db`: Database connection and migrations.
//! - `db_storage`: Lead and testimonial storage.
//! - `errors`: Error handling types.
//! - `estimator`: Restoration cost estimator.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `routes`: Router and OpenAPI document.
//! - `scoring`: Lead scoring.
//! - `sync_queue`: Background CRM sync worker.
//! - `validation`: Phone and email validation.

pub mod api;
pub mod core;
pub mod integrations;

pub mod assessment;
pub mod circuit_breaker;
pub mod config;
pub mod crm_client;
pub mod crm_models;
pub mod crm_sync;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod estimator;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod scoring;
pub mod sync_queue;
pub mod validation;
