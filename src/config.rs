use serde::Deserialize;

pub const DEFAULT_CRM_BASE_URL: &str = "https://services.leadconnectorhq.com";
pub const DEFAULT_CRM_API_VERSION: &str = "2021-07-28";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub crm: CrmConfig,
}

/// CRM (LeadConnector) settings.
///
/// Everything except the base URL and API version is optional at startup:
/// the service still takes leads without a CRM, and each CRM call refuses to
/// run with a descriptive error while its settings are missing.
#[derive(Debug, Clone, Deserialize)]
pub struct CrmConfig {
    pub api_key: Option<String>,
    pub location_id: Option<String>,
    pub pipeline_id: Option<String>,
    /// Stage every new opportunity starts in.
    pub stage_id: Option<String>,
    pub base_url: String,
    pub api_version: String,
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

impl CrmConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = optional_env("GHL_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_CRM_BASE_URL.to_string());
        let parsed = url::Url::parse(&base_url)
            .map_err(|e| anyhow::anyhow!("GHL_API_BASE_URL is not a valid URL: {}", e))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("GHL_API_BASE_URL must start with http:// or https://");
        }

        let config = Self {
            api_key: optional_env("GHL_API_KEY"),
            location_id: optional_env("GHL_LOCATION_ID"),
            pipeline_id: optional_env("GHL_PIPELINE_ID"),
            stage_id: optional_env("GHL_STAGE_NEW_CLIENT"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: optional_env("GHL_API_VERSION")
                .unwrap_or_else(|| DEFAULT_CRM_API_VERSION.to_string()),
        };

        for (name, value) in [
            ("GHL_API_KEY", &config.api_key),
            ("GHL_LOCATION_ID", &config.location_id),
            ("GHL_PIPELINE_ID", &config.pipeline_id),
            ("GHL_STAGE_NEW_CLIENT", &config.stage_id),
        ] {
            if value.is_none() {
                tracing::warn!("⚠️  {} not found in environment variables", name);
            }
        }

        Ok(config)
    }

    /// Settings pointing at `base_url` with every credential present.
    /// Handy for tests and tooling.
    pub fn with_credentials(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        location_id: impl Into<String>,
        pipeline_id: impl Into<String>,
        stage_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: Some(api_key.into()),
            location_id: Some(location_id.into()),
            pipeline_id: Some(pipeline_id.into()),
            stage_id: Some(stage_id.into()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: DEFAULT_CRM_API_VERSION.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DATABASE_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            crm: CrmConfig::from_env()?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("CRM Base URL: {}", config.crm.base_url);
        tracing::debug!("CRM API version: {}", config.crm.api_version);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_credentials_trims_trailing_slash() {
        let crm = CrmConfig::with_credentials("http://localhost:9999/", "k", "loc", "pipe", "stage");
        assert_eq!(crm.base_url, "http://localhost:9999");
        assert_eq!(crm.api_version, DEFAULT_CRM_API_VERSION);
        assert_eq!(crm.stage_id.as_deref(), Some("stage"));
    }
}
