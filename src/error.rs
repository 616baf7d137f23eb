//! Error types for the loader.
//!
//! Errors are split by where they surface:
//! - [`ConfigError`] and [`SchemaError`] are fatal and reported before any worker starts.
//! - [`ParseFailure`] is local to one input line; it is logged, sunk and counted.
//! - [`WriteError`] is the outcome of one asynchronous write, observed during a drain.
//! - [`LoadError`] is what a run as a whole can fail with.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result alias for run-level operations.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Failure of a whole load run (as opposed to a single source or line).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("the directory supplied is empty: {}", .0.display())]
    EmptyDirectory(PathBuf),

    #[error("no files found matching pattern: {0}")]
    EmptyGlob(String),

    #[error("input {} needs to be a file or a directory", .0.display())]
    InvalidInput(PathBuf),

    #[error("invalid glob pattern {pattern}: {reason}")]
    Glob { pattern: String, reason: String },

    #[error("failed to prepare insert statement: {0}")]
    Prepare(#[source] WriteError),

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected option values. Mirrors the checks the command line performs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("number of futures must be positive")]
    ZeroPacing,

    #[error("maximum number of rows to load must be positive")]
    ZeroMaxRows,

    #[error("number of threads must be at least 1")]
    ZeroThreads,

    #[error("delimiter must not be empty")]
    EmptyDelimiter,

    #[error("delimiter {0:?} must be a single byte when it can appear inside quotes")]
    QuotedDelimiter(String),

    #[error("write timeout must be positive")]
    ZeroTimeout,

    #[error("bad-row directory {} does not exist or is not a directory", .0.display())]
    BadDir(PathBuf),

    #[error("bad boolean style {0:?}; options are: {1}")]
    BoolStyle(String, String),

    #[error("bad decimal delimiter {0:?}; options are '.' and ','")]
    DecimalStyle(String),

    #[error("bad abort policy {0:?}; options are isolate and halt-run")]
    AbortPolicy(String),

    #[error("read config {}: {reason}", .path.display())]
    File { path: PathBuf, reason: String },
}

/// Problems with the textual table declaration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("expected `keyspace.table(column type, ...)`, got {0:?}")]
    Malformed(String),

    #[error("table {0} declares no columns")]
    NoColumns(String),

    #[error("column definition {0:?} must be `name type`")]
    BadColumn(String),

    #[error("unknown type {ty:?} for column {column}")]
    UnknownType { column: String, ty: String },

    #[error("column {0} declared twice")]
    DuplicateColumn(String),
}

/// Why a single line could not be turned into a row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("column {column} ({ty}): cannot parse {value:?}: {reason}")]
    InvalidValue {
        column: String,
        ty: String,
        value: String,
        reason: String,
    },

    #[error("malformed line: {0}")]
    Malformed(String),

    #[error("line is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Outcome of an asynchronous write that did not succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WriteError {
    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("write did not complete within {0:?}")]
    Timeout(Duration),

    #[error("write was abandoned before completing")]
    Abandoned,

    #[error("session is closed")]
    Closed,
}

impl WriteError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WriteError::Timeout(_))
    }
}
