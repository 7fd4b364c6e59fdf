use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub email: EmailSettings,
    pub invites: InviteSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Page size used by list endpoints when the caller sends no `limit`.
    pub default_page_limit: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
    /// Upper bound for a transaction commit; exceeding it aborts the unit.
    pub max_commit_time_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub issuer: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EmailProvider {
    /// Writes outbound mail to the log instead of delivering it.
    Log,
    /// Posts to a Resend-compatible HTTP API.
    Http,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailSettings {
    pub provider: EmailProvider,
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
    pub frontend_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InviteSettings {
    pub ttl_secs: u64,
    pub janitor_interval_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("HIVE"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("app.default_page_limit", 10)?
            .set_default("database.url", "mongodb://localhost:27017/?replicaSet=rs0")?
            .set_default("database.name", "hive")?
            .set_default("database.max_commit_time_ms", 5000)?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.access_token_ttl_secs", 900)?
            .set_default("jwt.refresh_token_ttl_secs", 604800)?
            .set_default("jwt.issuer", "hive")?
            .set_default("email.provider", "log")?
            .set_default("email.api_url", "https://api.resend.com/emails")?
            .set_default("email.from", "Hive <no-reply@hive.local>")?
            .set_default("email.frontend_url", "http://localhost:5173")?
            .set_default("invites.ttl_secs", 24 * 60 * 60)?
            .set_default("invites.janitor_interval_secs", 3600)?
            .build()?;

        config.try_deserialize()
    }
}
