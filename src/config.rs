// src/config.rs
//
// Layering: built-in defaults → config/settings.{toml,yaml,json} (optional) →
// HMS__SECTION__KEY environment variables → PORT / DATABASE_URL / LOG_FORMAT shorthands.

use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub identity: IdentityConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

/// Optional identity provider used to provision tenant admin logins.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
    pub filter: String,
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("database.max_connections", 10)?
        .set_default("database.run_migrations", true)?
        .set_default("store.backend", "postgres")?
        .set_default("identity.timeout_secs", 10)?
        .set_default("log.format", "pretty")?
        .set_default("log.filter", "info,hms_api=debug,tower_http=info")
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port = std::env::var("PORT").ok();
        let database_url = std::env::var("DATABASE_URL").ok();
        let log_format = std::env::var("LOG_FORMAT").ok().map(|f| f.to_lowercase());

        defaults()?
            .add_source(File::with_name("config/settings").required(false))
            .add_source(Environment::with_prefix("HMS").separator("__").try_parsing(true))
            .set_override_option("server.port", port)?
            .set_override_option("database.url", database_url)?
            .set_override_option("log.format", log_format)?
            .build()?
            .try_deserialize()
    }

    /// Defaults overlaid with an inline TOML document.
    pub fn from_toml(doc: &str) -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::from_str(doc, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_every_section() {
        let s = Settings::from_toml("").unwrap();
        assert_eq!(s.server.port, 8080);
        assert_eq!(s.store.backend, StoreBackend::Postgres);
        assert_eq!(s.log.format, LogFormat::Pretty);
        assert!(s.database.url.is_none());
        assert!(s.identity.base_url.is_none());
        assert_eq!(s.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn toml_overrides_defaults() {
        let s = Settings::from_toml(
            r#"
            [server]
            port = 9090

            [store]
            backend = "memory"

            [identity]
            base_url = "http://idp.local"
            token = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(s.server.port, 9090);
        assert_eq!(s.store.backend, StoreBackend::Memory);
        assert_eq!(s.identity.base_url.as_deref(), Some("http://idp.local"));
        assert_eq!(s.identity.timeout_secs, 10);
    }
}
