//! Line-to-row parsing.
//!
//! A [`RowParser`] turns one line of delimited text into values aligned with
//! the table columns. Parsers may keep per-call state, so every worker builds
//! its own through a [`ParserFactory`]; they are never shared across threads.

use crate::config::{BoolStyle, DecimalStyle, IngestConfig};
use crate::error::ParseFailure;
use crate::schema::{Column, ColumnType, TableSchema};
use crate::value::Value;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::net::IpAddr;
use uuid::Uuid;

/// Fallback timestamp layouts tried when no format is configured (or it does not match).
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses one line into a row.
pub trait RowParser {
    /// # Errors
    /// Returns a [`ParseFailure`] classifying why the line was rejected.
    fn parse(&mut self, line: &str) -> Result<Vec<Value>, ParseFailure>;
}

/// Builds one [`RowParser`] per worker.
pub trait ParserFactory: Send + Sync {
    /// # Errors
    /// Returns an error if the parser cannot be set up for this schema and config.
    fn build(&self, schema: &TableSchema, config: &IngestConfig) -> Result<Box<dyn RowParser>>;
}

/// Factory for [`DelimParser`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DelimParserFactory;

impl ParserFactory for DelimParserFactory {
    fn build(&self, schema: &TableSchema, config: &IngestConfig) -> Result<Box<dyn RowParser>> {
        Ok(Box::new(DelimParser::new(schema, config)))
    }
}

/// Delimited-text parser driven by the table schema.
pub struct DelimParser {
    columns: Vec<Column>,
    delimiter: String,
    quoted: bool,
    null_string: Option<String>,
    date_format: Option<String>,
    bool_style: BoolStyle,
    decimal_style: DecimalStyle,
    fields: Vec<String>,
}

impl DelimParser {
    pub fn new(schema: &TableSchema, config: &IngestConfig) -> Self {
        Self {
            columns: schema.columns().to_vec(),
            delimiter: config.delimiter.clone(),
            quoted: config.delimiter_in_quotes,
            null_string: config.null_string.clone(),
            date_format: config.date_format.clone(),
            bool_style: config.bool_style,
            decimal_style: config.decimal_style,
            fields: Vec::with_capacity(schema.columns().len()),
        }
    }

    fn split(&mut self, line: &str) -> Result<(), ParseFailure> {
        self.fields.clear();
        if !self.quoted {
            self.fields
                .extend(line.split(self.delimiter.as_str()).map(str::to_string));
            return Ok(());
        }

        // Validation guarantees a single-byte delimiter here.
        let delim = self.delimiter.as_bytes().first().copied().unwrap_or(b',');
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delim)
            .from_reader(line.as_bytes());
        let mut record = csv::StringRecord::new();
        match rdr.read_record(&mut record) {
            Ok(true) => {
                self.fields.extend(record.iter().map(str::to_string));
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => Err(ParseFailure::Malformed(e.to_string())),
        }
    }

    fn convert(&self, column: &Column, raw: &str) -> Result<Value, ParseFailure> {
        if self.null_string.as_deref() == Some(raw) {
            return Ok(Value::Null);
        }
        if column.ty.is_textual() {
            if column.ty == ColumnType::Ascii && !raw.is_ascii() {
                return Err(invalid(column, raw, "non-ASCII characters"));
            }
            return Ok(Value::Text(raw.to_string()));
        }

        let s = raw.trim();
        if s.is_empty() {
            return Ok(Value::Null);
        }
        let bad = |reason: String| invalid(column, raw, reason);

        let value = match column.ty {
            ColumnType::TinyInt => Value::TinyInt(s.parse().map_err(|e| bad(format!("{e}")))?),
            ColumnType::SmallInt => Value::SmallInt(s.parse().map_err(|e| bad(format!("{e}")))?),
            ColumnType::Int => Value::Int(s.parse().map_err(|e| bad(format!("{e}")))?),
            ColumnType::BigInt | ColumnType::Counter => {
                Value::BigInt(s.parse().map_err(|e| bad(format!("{e}")))?)
            }
            ColumnType::VarInt => Value::VarInt(s.parse().map_err(|e| bad(format!("{e}")))?),
            ColumnType::Float => {
                let n = self.normalize_number(s);
                Value::Float(n.parse().map_err(|e| bad(format!("{e}")))?)
            }
            ColumnType::Double => {
                let n = self.normalize_number(s);
                Value::Double(n.parse().map_err(|e| bad(format!("{e}")))?)
            }
            ColumnType::Decimal => {
                let n = self.normalize_number(s);
                if !is_decimal(&n) {
                    return Err(bad("not a decimal number".into()));
                }
                Value::Decimal(n)
            }
            ColumnType::Boolean => {
                let (yes, no) = self.bool_style.tokens();
                if s.eq_ignore_ascii_case(yes) {
                    Value::Boolean(true)
                } else if s.eq_ignore_ascii_case(no) {
                    Value::Boolean(false)
                } else {
                    return Err(bad(format!("expected {yes} or {no}")));
                }
            }
            ColumnType::Uuid => Value::Uuid(Uuid::parse_str(s).map_err(|e| bad(format!("{e}")))?),
            ColumnType::TimeUuid => {
                let u = Uuid::parse_str(s).map_err(|e| bad(format!("{e}")))?;
                if u.get_version_num() != 1 {
                    return Err(bad("not a version 1 UUID".into()));
                }
                Value::Uuid(u)
            }
            ColumnType::Timestamp => Value::Timestamp(
                self.parse_timestamp(s)
                    .ok_or_else(|| bad("unrecognized timestamp".into()))?,
            ),
            ColumnType::Date => Value::Date(
                self.parse_date(s)
                    .ok_or_else(|| bad("unrecognized date".into()))?,
            ),
            ColumnType::Inet => {
                Value::Inet(s.parse::<IpAddr>().map_err(|e| bad(format!("{e}")))?)
            }
            ColumnType::Blob => Value::Blob(decode_hex(s).ok_or_else(|| bad("bad hex".into()))?),
            ColumnType::Ascii | ColumnType::Text | ColumnType::Varchar => {
                Value::Text(raw.to_string())
            }
        };
        Ok(value)
    }

    fn normalize_number(&self, s: &str) -> String {
        match self.decimal_style {
            DecimalStyle::Point => s.to_string(),
            DecimalStyle::Comma => s
                .chars()
                .filter(|c| !matches!(c, '.' | ' ' | '\u{a0}'))
                .map(|c| if c == ',' { '.' } else { c })
                .collect(),
        }
    }

    fn parse_timestamp(&self, s: &str) -> Option<NaiveDateTime> {
        if let Some(fmt) = &self.date_format {
            if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(ts);
            }
            if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                return d.and_hms_opt(0, 0, 0);
            }
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Some(ts.naive_utc());
        }
        TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    fn parse_date(&self, s: &str) -> Option<NaiveDate> {
        if let Some(fmt) = &self.date_format {
            if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                return Some(d);
            }
            if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(ts.date());
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    }
}

impl RowParser for DelimParser {
    fn parse(&mut self, line: &str) -> Result<Vec<Value>, ParseFailure> {
        self.split(line)?;
        if self.fields.len() != self.columns.len() {
            return Err(ParseFailure::FieldCount {
                expected: self.columns.len(),
                found: self.fields.len(),
            });
        }
        self.columns
            .iter()
            .zip(&self.fields)
            .map(|(column, raw)| self.convert(column, raw))
            .collect()
    }
}

fn invalid(column: &Column, raw: &str, reason: impl Into<String>) -> ParseFailure {
    ParseFailure::InvalidValue {
        column: column.name.clone(),
        ty: column.ty.to_string(),
        value: raw.to_string(),
        reason: reason.into(),
    }
}

/// Optional sign, digits, at most one `.`, optional exponent.
fn is_decimal(s: &str) -> bool {
    let body = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (mantissa, exponent) = match body.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (body, None),
    };
    let mut dots = 0;
    let mut digits = 0;
    for c in mantissa.chars() {
        match c {
            '.' => dots += 1,
            '0'..='9' => digits += 1,
            _ => return false,
        }
    }
    let exponent_ok = exponent.is_none_or(|e| {
        let e = e.strip_prefix(['-', '+']).unwrap_or(e);
        !e.is_empty() && e.chars().all(|c| c.is_ascii_digit())
    });
    dots <= 1 && digits > 0 && exponent_ok
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}
