//! Configuration management for the commander.
//!
//! The application config is a TOML file with three sections: `[server]`
//! (connection parameters of the dedicated game server), `[catalog]` (where the
//! mission catalog is persisted) and `[logging]`. Only the validated
//! [`ServerSettings`] view is handed to the connection layer.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SETTINGS_DIR: &str = ".minic";
const CATALOG_FILE: &str = "missions.json";
const CONFIG_FILE: &str = "minic.toml";

/// Host/port pair of a server link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Telemetry link parameters; the host falls back to the console host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_telemetry_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub console: Endpoint,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Server event log consumed by the log watcher
    pub event_log: PathBuf,
    /// Server `Missions` directory
    pub missions_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Validated server connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub console: Endpoint,
    pub telemetry: Endpoint,
    pub event_log: PathBuf,
    pub missions_dir: PathBuf,
}

fn default_telemetry_port() -> u16 {
    10000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `$HOME/.minic/missions.json`, or a relative path when `HOME` is unset.
pub fn default_catalog_path() -> PathBuf {
    settings_root().join(CATALOG_FILE)
}

/// `$HOME/.minic/minic.toml`, where the CLI looks when no config is given.
pub fn default_config_path() -> PathBuf {
    settings_root().join(CONFIG_FILE)
}

fn settings_root() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(SETTINGS_DIR)
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        Err(_) => path.to_path_buf(),
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_telemetry_port(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let mut config: AppConfig = toml::from_str(content)?;
        config.catalog.path = expand_home(&config.catalog.path);
        Ok(config)
    }

    /// Applies `MINIC_*` environment overrides on top of the file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("MINIC_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.logging.level = level;
            }
        }

        if let Ok(path) = std::env::var("MINIC_CATALOG") {
            if !path.trim().is_empty() {
                self.catalog.path = expand_home(Path::new(&path));
            }
        }

        let Some(server) = self.server.as_mut() else {
            return self;
        };

        if let Ok(host) = std::env::var("MINIC_CONSOLE_HOST") {
            if !host.trim().is_empty() {
                server.console.host = host;
            }
        }

        if let Ok(port) = std::env::var("MINIC_CONSOLE_PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                server.console.port = parsed;
            }
        }

        if let Ok(port) = std::env::var("MINIC_TELEMETRY_PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                server.telemetry.port = parsed;
            }
        }

        if let Ok(path) = std::env::var("MINIC_EVENT_LOG") {
            if !path.trim().is_empty() {
                server.event_log = PathBuf::from(path);
            }
        }

        self
    }

    /// Validates the whole config, including the server section when present.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(server) = &self.server {
            server.settings()?;
        }

        if self.catalog.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "catalog.path cannot be empty".to_string(),
            ));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !matches!(
            level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error" | "off"
        ) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of: trace, debug, info, warn, error, off (got {})",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Typed server settings, or `ServerSettingsMissing` when the section is absent.
    pub fn server_settings(&self) -> ConfigResult<ServerSettings> {
        self.server
            .as_ref()
            .ok_or(ConfigError::ServerSettingsMissing)?
            .settings()
    }
}

impl ServerConfig {
    pub fn settings(&self) -> ConfigResult<ServerSettings> {
        if self.console.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.console.host cannot be empty".to_string(),
            ));
        }
        if self.console.port == 0 {
            return Err(ConfigError::Validation(
                "server.console.port must be greater than 0".to_string(),
            ));
        }
        if self.telemetry.port == 0 {
            return Err(ConfigError::Validation(
                "server.telemetry.port must be greater than 0".to_string(),
            ));
        }
        if self.event_log.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "server.event_log cannot be empty".to_string(),
            ));
        }
        if self.missions_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "server.missions_dir cannot be empty".to_string(),
            ));
        }

        let telemetry_host = self
            .telemetry
            .host
            .clone()
            .filter(|host| !host.trim().is_empty())
            .unwrap_or_else(|| self.console.host.clone());

        Ok(ServerSettings {
            console: self.console.clone(),
            telemetry: Endpoint {
                host: telemetry_host,
                port: self.telemetry.port,
            },
            event_log: self.event_log.clone(),
            missions_dir: self.missions_dir.clone(),
        })
    }
}
