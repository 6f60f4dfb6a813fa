use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpScheme {
    #[default]
    Http,
    Https,
}

impl HttpScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpScheme::Http => "http",
            HttpScheme::Https => "https",
        }
    }
}

/// Transaction mode for the session. `Autocommit` makes every statement
/// durable on its own and turns commit/rollback into no-ops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    #[default]
    Autocommit,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn sql(&self) -> Option<&'static str> {
        match self {
            IsolationLevel::Autocommit => None,
            IsolationLevel::ReadUncommitted => Some("READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => Some("READ COMMITTED"),
            IsolationLevel::RepeatableRead => Some("REPEATABLE READ"),
            IsolationLevel::Serializable => Some("SERIALIZABLE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub catalog: String,
    pub schema: String,
    pub password: Option<String>,
    pub http_scheme: HttpScheme,
    pub source: String,
    pub isolation_level: IsolationLevel,
    pub request_timeout_secs: Option<u64>,
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            user: "trino".to_string(),
            catalog: "iceberg".to_string(),
            schema: "default".to_string(),
            password: None,
            http_scheme: HttpScheme::Http,
            source: "csv-to-iceberg".to_string(),
            isolation_level: IsolationLevel::Autocommit,
            request_timeout_secs: None,
        }
    }
}

impl ConnectionParameters {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.http_scheme.as_str(), self.host, self.port)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    trino: Option<ConnectionParameters>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(LoadError::UnsupportedConfigFormat(format!(".{ext}"))),
        }
    }
}

pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<ConnectionParameters> {
    let document: Option<ConfigDocument> = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(contents).context("Parsing YAML config")?,
        ConfigFormat::Json => serde_json::from_str(contents).context("Parsing JSON config")?,
    };
    Ok(document.and_then(|doc| doc.trino).unwrap_or_default())
}

/// Reads connection settings from the `trino` section of a YAML or JSON file.
pub fn load_config(path: &Path) -> Result<ConnectionParameters> {
    if !path.is_file() {
        return Err(LoadError::ConfigNotFound(path.to_path_buf()).into());
    }
    let format = ConfigFormat::from_path(path)?;
    let contents =
        fs::read_to_string(path).with_context(|| format!("Reading config file {path:?}"))?;
    parse_config(&contents, format).with_context(|| format!("Loading config from {path:?}"))
}
