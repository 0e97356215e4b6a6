//! Runtime settings.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file (`labprep.toml`, or whatever `LABPREP_CONFIG` points at), then
//! environment variables such as `LABPREP__SERVER__PORT=8080`.

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::{LabprepError, Result};
use crate::persist::PersistenceMode;
use crate::selection::DEFAULT_MAX_PRACTICES;

pub const DEFAULT_CONFIG_FILE: &str = "labprep.toml";
pub const CONFIG_PATH_VARIABLE: &str = "LABPREP_CONFIG";
pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub selection: SelectionSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed browser origin; any origin when absent.
    #[serde(default)]
    pub cors_origin: Option<String>,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseSettings {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelectionSettings {
    pub max_practices: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogSettings {
    pub level: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            cors_origin: None,
            request_timeout_ms: 10_000,
        }
    }
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl DatabaseSettings {
    pub fn mode(&self) -> PersistenceMode {
        if self.path == IN_MEMORY_DATABASE {
            PersistenceMode::InMemory
        } else {
            PersistenceMode::File(self.path.clone())
        }
    }
}

impl Settings {
    /// Loads from the file named by `LABPREP_CONFIG`, falling back to
    /// `labprep.toml` in the working directory, plus the environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VARIABLE).ok();
        Self::load_from(path.as_deref().map(Path::new), true)
    }

    /// Loads from an explicit file, optionally layering the environment on top.
    /// A missing default file is fine, a missing explicit one is not.
    pub fn load_from(path: Option<&Path>, with_environment: bool) -> Result<Self> {
        let defaults = ServerSettings::default();
        let mut builder = Config::builder()
            .set_default("server.host", defaults.host)?
            .set_default("server.port", i64::from(defaults.port))?
            .set_default("server.request_timeout_ms", defaults.request_timeout_ms)?
            .set_default("database.path", "indicaciones.db")?
            .set_default("selection.max_practices", DEFAULT_MAX_PRACTICES as u64)?
            .set_default("log.level", "info")?;
        builder = match path {
            Some(path) => builder.add_source(File::from(path).format(FileFormat::Toml)),
            None => builder.add_source(
                File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
            ),
        };
        if with_environment {
            builder = builder.add_source(
                Environment::with_prefix("LABPREP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.selection.max_practices == 0 {
            return Err(LabprepError::Config(
                "selection.max_practices must be at least 1".into(),
            ));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(LabprepError::Config(
                "server.request_timeout_ms must be positive".into(),
            ));
        }
        if self.database.path.trim().is_empty() {
            return Err(LabprepError::Config("database.path must not be empty".into()));
        }
        Ok(())
    }
}
