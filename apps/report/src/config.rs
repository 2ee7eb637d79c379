use anyhow::{Context, Result};

const DEFAULT_IMAGE_BUCKET: &str = "gis-colourized-png-data";
const DEFAULT_BOUNDARY_BUCKET: &str = "boundary-plot";
const DEFAULT_REGION: &str = "us-west-2";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bucket holding the colourized index PNGs; generated reports are written here too.
    pub image_bucket: String,
    /// Bucket holding per-farm boundary GeoJSON documents.
    pub boundary_bucket: String,
    /// Optional custom endpoint (MinIO / localstack). AWS default when unset.
    pub s3_endpoint: Option<String>,
    pub aws_region: String,
    /// Static credentials, used only when both halves are present.
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    /// Temporal statistics endpoint (`GET ?farmID=..&index=..`).
    pub stats_api_url: String,
    /// Lifetime of the presigned download link, in seconds.
    pub report_link_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            image_bucket: env_or("IMAGE_BUCKET", DEFAULT_IMAGE_BUCKET),
            boundary_bucket: env_or("BOUNDARY_BUCKET", DEFAULT_BOUNDARY_BUCKET),
            s3_endpoint: optional_env("S3_ENDPOINT"),
            aws_region: env_or("AWS_REGION", DEFAULT_REGION),
            aws_access_key_id: optional_env("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: optional_env("AWS_SECRET_ACCESS_KEY"),
            stats_api_url: require_env("STATS_API_URL")?,
            report_link_ttl_secs: std::env::var("REPORT_LINK_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse::<u64>()
                .context("REPORT_LINK_TTL_SECS must be a whole number of seconds")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    pub fn report_link_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.report_link_ttl_secs)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}
