use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued bearer tokens.
    pub token_ttl_days: i64,
    /// Lifetime of password reset tokens.
    pub reset_token_ttl_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailerConfig {
    pub from_address: String,
    /// Public base URL used to build links in outgoing messages.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub mailer: MailerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 4000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://challengegov.db?mode=rwc")?
            .set_default("auth.token_ttl_days", 7)?
            .set_default("auth.reset_token_ttl_minutes", 60)?
            .set_default("mailer.from_address", "team@challenge.gov")?
            .set_default("mailer.base_url", "http://localhost:4000")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., CHALLENGEGOV__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("CHALLENGEGOV").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
