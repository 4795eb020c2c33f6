//! Application settings.
//!
//! Read from an optional `settings.toml` in the working directory, then
//! overridden by `COINSHOP_*` environment variables where `__` separates
//! nested keys (`COINSHOP_SERVER__PORT=8080`).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: String,
    pub port: u16,
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
    /// Any URL sea-orm accepts, e.g. `postgres://...`.
    Url(String),
}

#[derive(Debug, Deserialize)]
pub struct DatabasePool {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Ledger {
    pub starting_balance: i64,
    pub unit_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub database: Database,
    pub database_pool: DatabasePool,
    pub ledger: Ledger,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(
                    Environment::with_prefix("COINSHOP")
                        .prefix_separator("_")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .set_default("app.level", "info")?
            .set_default("server.bind", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database", "memory")?
            .set_default("database_pool.max_connections", 10)?
            .set_default("database_pool.acquire_timeout_secs", 5)?
            .set_default("database_pool.idle_timeout_secs", 300)?
            .set_default("ledger.starting_balance", 1000)?
            .set_default("ledger.unit_timeout_secs", 3)?
            .build()?
            .try_deserialize()
    }

    #[cfg(test)]
    fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Self::from_builder(Config::builder().add_source(File::from_str(raw, config::FileFormat::Toml)))
    }
}
