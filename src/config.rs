//! Configuration types for leadflow

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Environment variable holding the remote scraping API key
pub const API_KEY_ENV: &str = "OUTSCRAPER_API_KEY";

/// Lead file storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Root directory holding one folder per campaign (default: "app/data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Remote scraping API configuration
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct ScraperConfig {
    /// Base URL of the scraping API (default: "https://api.outscraper.cloud")
    #[serde(default = "default_scraper_base_url")]
    pub base_url: String,

    /// API key sent as `X-API-KEY` on every request
    #[serde(default)]
    pub api_key: Option<String>,

    /// Timeout applied to every remote request, including file downloads (default: 120 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Result language requested from the scraping service (default: "en")
    #[serde(default = "default_language")]
    pub language: String,

    /// Per-query organization cap forwarded with each job (default: 500)
    #[serde(default = "default_organizations_per_query_limit")]
    pub organizations_per_query_limit: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_scraper_base_url(),
            api_key: None,
            request_timeout: default_request_timeout(),
            language: default_language(),
            organizations_per_query_limit: default_organizations_per_query_limit(),
        }
    }
}

impl std::fmt::Debug for ScraperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("language", &self.language)
            .field(
                "organizations_per_query_limit",
                &self.organizations_per_query_limit,
            )
            .finish()
    }
}

/// Optional tracking marker appended to outgoing bodies
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct TrackingConfig {
    /// Base URL of the open-tracking endpoint. When set, the marker is an
    /// invisible pixel pointing at `{pixel_base_url}/api/campaigns/{id}/track`;
    /// otherwise the marker is empty.
    #[serde(default)]
    pub pixel_base_url: Option<String>,
}

/// Batch dispatch configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DispatchConfig {
    /// Lower bound of the random pause between consecutive sends (default: 30 seconds)
    #[serde(default = "default_min_delay", with = "duration_serde")]
    pub min_delay: Duration,

    /// Upper bound of the random pause between consecutive sends (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Daily quota used when a campaign does not carry one (default: 50)
    #[serde(default = "default_daily_quota")]
    pub default_daily_quota: usize,

    /// Column holding the business name (default: "name")
    #[serde(default = "default_name_column")]
    pub name_column: String,

    /// Column holding the primary email address (default: "email_1")
    #[serde(default = "default_email_column")]
    pub email_column: String,

    /// Tracking marker settings
    #[serde(default)]
    pub tracking: TrackingConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
            default_daily_quota: default_daily_quota(),
            name_column: default_name_column(),
            email_column: default_email_column(),
            tracking: TrackingConfig::default(),
        }
    }
}

/// Task status map configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct TaskConfig {
    /// How long terminal task entries are kept (None = kept for the process lifetime)
    #[serde(default, with = "optional_duration_serde")]
    pub retention: Option<Duration>,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:3002)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Optional API key for authentication
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// Main configuration for the leadflow service
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Lead file storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote scraping API
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Batch dispatch behavior
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Task status map
    #[serde(default)]
    pub tasks: TaskConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Build a configuration from defaults overridden by environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// Recognized variables: `OUTSCRAPER_API_KEY`, `OUTSCRAPER_BASE_URL`,
    /// `LEADFLOW_DATA_DIR`, `LEADFLOW_BIND_ADDRESS`, `LEADFLOW_API_KEY`,
    /// `LEADFLOW_MIN_DELAY_SECS`, `LEADFLOW_MAX_DELAY_SECS`,
    /// `LEADFLOW_TASK_RETENTION_SECS`, `LEADFLOW_TRACKING_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            tracing::warn!(error = %e, "Failed to load .env file");
        }

        let mut config = Config::default();

        if let Some(key) = env_var(API_KEY_ENV) {
            config.scraper.api_key = Some(key);
        }
        if let Some(url) = env_var("OUTSCRAPER_BASE_URL") {
            config.scraper.base_url = url;
        }
        if let Some(dir) = env_var("LEADFLOW_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = env_var("LEADFLOW_BIND_ADDRESS") {
            config.server.api.bind_address = addr.parse().map_err(|e| {
                Error::config(
                    "LEADFLOW_BIND_ADDRESS",
                    format!("invalid socket address '{addr}': {e}"),
                )
            })?;
        }
        if let Some(key) = env_var("LEADFLOW_API_KEY") {
            config.server.api.api_key = Some(key);
        }
        if let Some(secs) = env_secs("LEADFLOW_MIN_DELAY_SECS")? {
            config.dispatch.min_delay = secs;
        }
        if let Some(secs) = env_secs("LEADFLOW_MAX_DELAY_SECS")? {
            config.dispatch.max_delay = secs;
        }
        if let Some(secs) = env_secs("LEADFLOW_TASK_RETENTION_SECS")? {
            config.tasks.retention = Some(secs);
        }
        if let Some(url) = env_var("LEADFLOW_TRACKING_BASE_URL") {
            config.dispatch.tracking.pixel_base_url = Some(url);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check settings that cannot be expressed through types alone
    pub fn validate(&self) -> Result<()> {
        if self
            .scraper
            .api_key
            .as_deref()
            .map_or(true, |k| k.trim().is_empty())
        {
            return Err(Error::config(
                API_KEY_ENV,
                "OUTSCRAPER_API_KEY not found in environment variables",
            ));
        }
        if self.dispatch.min_delay > self.dispatch.max_delay {
            return Err(Error::config(
                "dispatch.min_delay",
                format!(
                    "min_delay ({:?}) must not exceed max_delay ({:?})",
                    self.dispatch.min_delay, self.dispatch.max_delay
                ),
            ));
        }
        if self.dispatch.default_daily_quota == 0 {
            return Err(Error::config(
                "dispatch.default_daily_quota",
                "default_daily_quota must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Mail relay settings supplied with each send request
#[derive(Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SmtpConfig {
    /// Relay hostname
    pub smtp_server: String,

    /// Relay port (465 = implicit TLS, anything else = STARTTLS)
    pub smtp_port: u16,

    /// Account address, also used as the sender
    pub email_address: String,

    /// Account password
    pub email_password: String,
}

impl SmtpConfig {
    /// Reject settings that cannot possibly authenticate
    pub fn validate(&self) -> Result<()> {
        if self.smtp_server.trim().is_empty() {
            return Err(Error::config("smtpServer", "SMTP server is required"));
        }
        if self.smtp_port == 0 {
            return Err(Error::config("smtpPort", "SMTP port must be non-zero"));
        }
        if self.email_address.trim().is_empty() {
            return Err(Error::config("emailAddress", "sender address is required"));
        }
        if self.email_password.is_empty() {
            return Err(Error::config("emailPassword", "SMTP password is required"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("email_address", &self.email_address)
            .field("email_password", &"<redacted>")
            .finish()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_secs(name: &str) -> Result<Option<Duration>> {
    env_var(name)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| Error::config(name, format!("expected whole seconds, got '{raw}': {e}")))
        })
        .transpose()
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("app/data")
}

fn default_scraper_base_url() -> String {
    "https://api.outscraper.cloud".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_language() -> String {
    "en".to_string()
}

fn default_organizations_per_query_limit() -> u32 {
    500
}

fn default_min_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_daily_quota() -> usize {
    50
}

fn default_name_column() -> String {
    "name".to_string()
}

fn default_email_column() -> String {
    "email_1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3002))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
