//! Ingestion configuration shared by every worker of a run.
//!
//! [`IngestConfig`] is immutable once a run starts; each worker receives a
//! reference and builds its own row parser from it.
//!
//! # Example
//!
//! ```
//! use delimload::config::{AbortPolicy, IngestConfig};
//!
//! let cfg = IngestConfig::new("test.t(a int, b text)")
//!     .with_delimiter("|")
//!     .with_skip_rows(1)
//!     .with_max_errors(Some(100))
//!     .with_abort_policy(AbortPolicy::Isolate);
//! assert!(cfg.validate().is_ok());
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Textual encodings accepted for boolean columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolStyle {
    #[default]
    #[serde(rename = "TRUE_FALSE")]
    TrueFalse,
    #[serde(rename = "1_0")]
    OneZero,
    #[serde(rename = "T_F")]
    TF,
    #[serde(rename = "Y_N")]
    YN,
    #[serde(rename = "YES_NO")]
    YesNo,
}

impl BoolStyle {
    pub const ALL: [BoolStyle; 5] = [
        BoolStyle::TrueFalse,
        BoolStyle::OneZero,
        BoolStyle::TF,
        BoolStyle::YN,
        BoolStyle::YesNo,
    ];

    /// The `(true, false)` tokens for this style, upper case.
    pub fn tokens(self) -> (&'static str, &'static str) {
        match self {
            BoolStyle::TrueFalse => ("TRUE", "FALSE"),
            BoolStyle::OneZero => ("1", "0"),
            BoolStyle::TF => ("T", "F"),
            BoolStyle::YN => ("Y", "N"),
            BoolStyle::YesNo => ("YES", "NO"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BoolStyle::TrueFalse => "TRUE_FALSE",
            BoolStyle::OneZero => "1_0",
            BoolStyle::TF => "T_F",
            BoolStyle::YN => "Y_N",
            BoolStyle::YesNo => "YES_NO",
        }
    }

    /// Comma separated list of accepted names, for error messages.
    pub fn options() -> String {
        Self::ALL
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for BoolStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BoolStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::BoolStyle(s.to_string(), Self::options()))
    }
}

/// Decimal separator used by numeric columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalStyle {
    /// `1234.5`
    #[default]
    Point,
    /// `1.234,5` (`.` and spaces are grouping characters)
    Comma,
}

impl FromStr for DecimalStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "." => Ok(DecimalStyle::Point),
            "," => Ok(DecimalStyle::Comma),
            other => Err(ConfigError::DecimalStyle(other.to_string())),
        }
    }
}

/// What an exhausted error budget stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbortPolicy {
    /// Only the failing source stops; siblings run to completion.
    #[default]
    Isolate,
    /// The failing source cancels the whole run; siblings stop at their next line.
    HaltRun,
}

impl FromStr for AbortPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "isolate" => Ok(AbortPolicy::Isolate),
            "halt-run" | "halt_run" => Ok(AbortPolicy::HaltRun),
            other => Err(ConfigError::AbortPolicy(other.to_string())),
        }
    }
}

/// Options for one load run.
///
/// `None` in `max_rows` / `max_errors` means unbounded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Table declaration, e.g. `ks.table(a int, b text)`.
    pub schema: String,
    pub delimiter: String,
    /// Whether the delimiter may appear inside double-quoted fields.
    pub delimiter_in_quotes: bool,
    /// Token that stands for NULL.
    pub null_string: Option<String>,
    /// `chrono` format for timestamp (and date) columns.
    pub date_format: Option<String>,
    pub bool_style: BoolStyle,
    pub decimal_style: DecimalStyle,
    /// Non-blank lines to skip at the start of every source.
    pub skip_rows: u64,
    /// Cap on parse attempts per source.
    pub max_rows: Option<u64>,
    /// Tolerated failures per source; one more aborts the source.
    pub max_errors: Option<u64>,
    /// Where `<source>.BAD` files go.
    pub bad_dir: Option<PathBuf>,
    /// Lines between forced drains of outstanding writes.
    pub pacing_threshold: usize,
    /// Worker pool size for multi-file runs.
    pub num_threads: usize,
    /// Upper bound on one drain; `None` waits forever.
    pub write_timeout_ms: Option<u64>,
    /// Whether failed writes count against the error budget.
    pub count_write_failures: bool,
    pub abort_policy: AbortPolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            schema: String::new(),
            delimiter: ",".to_string(),
            delimiter_in_quotes: false,
            null_string: None,
            date_format: None,
            bool_style: BoolStyle::default(),
            decimal_style: DecimalStyle::default(),
            skip_rows: 0,
            max_rows: None,
            max_errors: Some(10),
            bad_dir: None,
            pacing_threshold: 1000,
            num_threads: 5,
            write_timeout_ms: Some(30_000),
            count_write_failures: true,
            abort_policy: AbortPolicy::default(),
        }
    }
}

impl IngestConfig {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            ..Self::default()
        }
    }

    /// Load a config from a JSON file. Missing keys take their defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::File`] if the file cannot be read or decoded.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file_err = |reason: String| ConfigError::File {
            path: path.to_path_buf(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| file_err(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| file_err(e.to_string()))
    }

    /// Check option ranges. The schema itself is checked when it is parsed.
    ///
    /// # Errors
    /// Returns the first offending option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pacing_threshold == 0 {
            return Err(ConfigError::ZeroPacing);
        }
        if self.max_rows == Some(0) {
            return Err(ConfigError::ZeroMaxRows);
        }
        if self.num_threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if self.delimiter.is_empty() {
            return Err(ConfigError::EmptyDelimiter);
        }
        if self.delimiter_in_quotes && self.delimiter.len() != 1 {
            return Err(ConfigError::QuotedDelimiter(self.delimiter.clone()));
        }
        if self.write_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        if let Some(dir) = &self.bad_dir
            && !dir.is_dir()
        {
            return Err(ConfigError::BadDir(dir.clone()));
        }
        Ok(())
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }

    /// True once `errors` exceeds the tolerated number of failures.
    pub fn error_budget_exceeded(&self, errors: u64) -> bool {
        self.max_errors.is_some_and(|max| errors > max)
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    #[must_use]
    pub fn with_delimiter_in_quotes(mut self, yes: bool) -> Self {
        self.delimiter_in_quotes = yes;
        self
    }

    #[must_use]
    pub fn with_null_string(mut self, token: impl Into<String>) -> Self {
        self.null_string = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_bool_style(mut self, style: BoolStyle) -> Self {
        self.bool_style = style;
        self
    }

    #[must_use]
    pub fn with_decimal_style(mut self, style: DecimalStyle) -> Self {
        self.decimal_style = style;
        self
    }

    #[must_use]
    pub fn with_skip_rows(mut self, n: u64) -> Self {
        self.skip_rows = n;
        self
    }

    #[must_use]
    pub fn with_max_rows(mut self, n: Option<u64>) -> Self {
        self.max_rows = n;
        self
    }

    #[must_use]
    pub fn with_max_errors(mut self, n: Option<u64>) -> Self {
        self.max_errors = n;
        self
    }

    #[must_use]
    pub fn with_bad_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bad_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_pacing_threshold(mut self, n: usize) -> Self {
        self.pacing_threshold = n;
        self
    }

    #[must_use]
    pub fn with_num_threads(mut self, n: usize) -> Self {
        self.num_threads = n;
        self
    }

    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout_ms = timeout.map(|t| t.as_millis().max(1) as u64);
        self
    }

    #[must_use]
    pub fn with_count_write_failures(mut self, yes: bool) -> Self {
        self.count_write_failures = yes;
        self
    }

    #[must_use]
    pub fn with_abort_policy(mut self, policy: AbortPolicy) -> Self {
        self.abort_policy = policy;
        self
    }
}
