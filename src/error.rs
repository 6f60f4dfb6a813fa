use std::path::PathBuf;

use thiserror::Error;

/// Failures a caller can act on. Everything else travels as a plain
/// `anyhow::Error` with context attached along the way.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("Unsupported config file format: {0}. Use .yaml, .yml, or .json")]
    UnsupportedConfigFormat(String),
    #[error("Invalid table identifier '{0}': expected 'table' or 'schema.table'")]
    InvalidTableIdentifier(String),
    #[error("Table {0} not found or has no columns")]
    TableNotFound(String),
    #[error("Trino query failed ({name}): {message}")]
    TrinoQueryFailed { name: String, message: String },
    #[error("Trino returned HTTP {status}: {body}")]
    TrinoHttp { status: u16, body: String },
}
