//! Domain-specific error types for attrsql-core
//!
//! # Error Categories
//!
//! - **TableError**: CSV decoding and grid edits on the requirement table
//! - **TranslationError**: a single failed LLM call for one row
//! - **GenerationError**: the generation trigger as a whole (e.g. nothing to do)
//! - **ConfigError**: provider and credential resolution
//!
//! # Examples
//!
//! ```rust
//! use attrsql::errors::TranslationError;
//!
//! let err = TranslationError::Service("connection refused".to_string());
//! assert_eq!(err.to_string(), "connection refused");
//! ```

use thiserror::Error;

/// Requirement table errors
#[derive(Error, Debug)]
pub enum TableError {
    /// Malformed CSV input (ragged rows, invalid UTF-8, ...)
    #[error("Invalid CSV: {0}")]
    Parse(#[from] csv::Error),

    /// Uploaded content had no header line
    #[error("Invalid CSV: missing header row")]
    MissingHeader,

    /// The same column name appeared twice in the header
    #[error("Invalid CSV: duplicate column '{0}'")]
    DuplicateColumn(String),

    /// A data row with more cells than the header
    #[error("Invalid CSV: line {line} has {found} fields, but the header has {expected}")]
    TooManyFields {
        line: u64,
        found: usize,
        expected: usize,
    },

    /// Row index outside the current table
    #[error("Row {index} out of range (table has {len} rows)")]
    RowOutOfRange { index: usize, len: usize },

    /// Column names must be non-empty
    #[error("Column name cannot be empty")]
    EmptyColumnName,

    /// Serialized output was not valid UTF-8
    #[error("Export failed: {0}")]
    Export(String),
}

/// Failure of one completion request.
///
/// The display form is the bare message; [`crate::translator::render_outcome`]
/// adds the sentinel prefix used in the `SQLOutput` column.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// Transport, authentication, rate limit or malformed response
    #[error("{0}")]
    Service(String),

    /// Request did not finish within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The model answered with nothing but whitespace
    #[error("model returned an empty response")]
    EmptyResponse,
}

impl TranslationError {
    pub fn service(err: impl std::fmt::Display) -> Self {
        TranslationError::Service(err.to_string())
    }
}

/// Errors that stop a generation run before any row is translated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Please provide some input data.")]
    EmptyTable,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("Missing API key for {provider}. Set {env_var} environment variable.")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("Failed to read secrets file {path}: {source}")]
    SecretsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse secrets file {path}: {source}")]
    SecretsParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

pub type TableResult<T> = Result<T, TableError>;
