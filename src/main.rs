use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use restoration_leads::config::Config;
use restoration_leads::crm_client::CrmClient;
use restoration_leads::db::Database;
use restoration_leads::db_storage::{LeadStore, PgStore};
use restoration_leads::handlers::{self, AppState};
use restoration_leads::routes;
use restoration_leads::sync_queue::spawn_sync_worker;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database pool and migrations,
/// the CRM client and its sync worker, then serves HTTP until Ctrl-C. Queued
/// CRM syncs are given a grace period to finish on shutdown.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restoration_leads=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = Database::new(&config.database_url).await?;
    db.migrate().await?;
    tracing::info!("Database connection pool established");

    let store: Arc<dyn LeadStore> = Arc::new(PgStore::new(db.pool.clone()));

    let crm = Arc::new(CrmClient::new(config.crm.clone())?);
    tracing::info!("✓ CRM client initialized: {}", config.crm.base_url);

    let (sync_queue, sync_worker) = spawn_sync_worker(crm, store.clone());

    let app_state = Arc::new(AppState::new(store, config.clone(), sync_queue));

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = routes::api_routes(app_state).layer(
        ServiceBuilder::new()
            .layer(RequestBodyLimitLayer::new(1024 * 1024))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check and docs bypass rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(routes::docs_routes())
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router owned the last queue handles; the worker drains and exits.
    match tokio::time::timeout(Duration::from_secs(30), sync_worker).await {
        Ok(Ok(())) => tracing::info!("CRM sync worker drained"),
        Ok(Err(e)) => tracing::error!("CRM sync worker panicked: {}", e),
        Err(_) => tracing::warn!("⚠️  CRM sync worker still busy after 30s, exiting"),
    }

    Ok(())
}
