//! Utility to verify CRM credentials and print pipeline settings.
//!
//! Lists the pipelines visible to the configured location, suggests the
//! `GHL_PIPELINE_ID` / `GHL_STAGE_*` lines for `.env`, then checks that the
//! key can read contacts.

use dotenvy::dotenv;
use restoration_leads::config::CrmConfig;
use restoration_leads::crm_client::{CrmClient, RetryPolicy};

/// Main entry point for the CRM connection checker.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let config = CrmConfig::from_env()?;

    println!("\n🔍 Testing CRM connection...\n");
    println!("Configuration:");
    println!("  Base URL: {}", config.base_url);
    println!(
        "  Location ID: {}",
        config.location_id.as_deref().unwrap_or("NOT SET")
    );
    println!(
        "  API Key: {}\n",
        config
            .api_key
            .as_ref()
            .map(|k| format!("set (length: {})", k.len()))
            .unwrap_or_else(|| "NOT SET".to_string())
    );

    if config.api_key.is_none() || config.location_id.is_none() {
        anyhow::bail!("Missing GHL_API_KEY or GHL_LOCATION_ID");
    }

    let client = CrmClient::new(config)?.with_retry_policy(RetryPolicy {
        max_attempts: 1,
        ..RetryPolicy::default()
    });

    println!("📋 Fetching pipelines...");
    let pipelines = match client.list_pipelines().await {
        Ok(pipelines) => pipelines,
        Err(e) => {
            if e.status_code == 401 {
                println!("\n💡 Authentication failed. Check the API key and location ID.");
            }
            anyhow::bail!("Pipelines request failed: {}", e);
        }
    };
    println!("✅ Connected\n");

    if pipelines.is_empty() {
        println!("⚠️  No pipelines found in this location. Create one in the CRM first.\n");
    } else {
        println!("Found {} pipeline(s):\n", pipelines.len());
        for (index, pipeline) in pipelines.iter().enumerate() {
            println!("Pipeline {}: {}", index + 1, pipeline.name);
            println!("  ID: {}", pipeline.id);
            println!("  Stages:");
            for (stage_index, stage) in pipeline.stages.iter().enumerate() {
                println!("    {}. {} (ID: {})", stage_index + 1, stage.name, stage.id);
            }
            println!();
        }

        if let Some(first) = pipelines.first() {
            println!("📝 Add these to your .env:\n");
            println!("GHL_PIPELINE_ID={}", first.id);
            if !first.stages.is_empty() {
                println!("\n# Pipeline stages");
                for stage in &first.stages {
                    println!("{}={}", stage.env_var_name(), stage.id);
                }
            }
            println!();
        }
    }

    println!("🔍 Testing contact API access...");
    match client.check_contacts_access().await {
        Ok(()) => println!("✅ Contact API access verified\n"),
        Err(e) => println!(
            "⚠️  Contact API returned {}. The key may have limited permissions\n",
            e
        ),
    }

    Ok(())
}
