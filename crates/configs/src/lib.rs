//! # configs
//!
//! Layered runtime settings. Sources, lowest precedence first:
//!
//! 1. compiled defaults,
//! 2. an optional `config/helpdesk.toml`,
//! 3. `HELPDESK__SECTION__KEY` environment variables (after `.env` is loaded).

use std::collections::HashMap;
use std::path::PathBuf;

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "config/helpdesk";
pub const ENV_PREFIX: &str = "HELPDESK";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub backend: DatabaseBackend,
    #[serde(default, deserialize_with = "secret_url")]
    pub url: Option<SecretString>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Directory attachments are written under.
    pub root: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

fn secret_url<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|url| !url.is_empty()).map(SecretString::from))
}

impl Settings {
    /// Loads `.env`, then every layer from the process environment.
    pub fn load() -> Result<Self, SettingsError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(SettingsError::Invalid(format!(".env: {err}"))),
        }
        Self::build(Some(DEFAULT_CONFIG_FILE), None)
    }

    /// Builds settings from an optional file (extension inferred) and an
    /// explicit environment map, bypassing the process environment.
    pub fn from_sources(
        file: Option<&str>,
        env: HashMap<String, String>,
    ) -> Result<Self, SettingsError> {
        Self::build(file, Some(env))
    }

    fn build(file: Option<&str>, env: Option<HashMap<String, String>>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8118)?
            .set_default("database.backend", "memory")?
            .set_default("database.max_connections", 10)?
            .set_default("media.root", "./data/attachments")?
            .set_default("log.level", "info")?
            .set_default("log.format", "pretty")?;

        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true);
        let environment = match env {
            Some(map) => environment.source(Some(map)),
            None => environment,
        };

        let settings: Settings = builder.add_source(environment).build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.database.backend == DatabaseBackend::Postgres && self.database.url.is_none() {
            return Err(SettingsError::Invalid(
                "database.url is required for the postgres backend".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(SettingsError::Invalid("database.max_connections must be positive".into()));
        }
        Ok(())
    }
}
