//! Typed cell values produced by the row parser.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::net::IpAddr;
use uuid::Uuid;

/// One bound value, aligned with a column of the table schema.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    VarInt(i128),
    Float(f32),
    Double(f64),
    /// Normalized decimal text (`.` separator, no grouping).
    Decimal(String),
    Boolean(bool),
    Uuid(Uuid),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Inet(IpAddr),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render as a CQL literal, suitable for a statement script.
    pub fn to_cql_literal(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Text(s) => quote(s),
            Value::TinyInt(v) => v.to_string(),
            Value::SmallInt(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::BigInt(v) => v.to_string(),
            Value::VarInt(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Decimal(s) => s.clone(),
            Value::Boolean(b) => b.to_string(),
            Value::Uuid(u) => u.to_string(),
            Value::Timestamp(ts) => quote(&ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()),
            Value::Date(d) => quote(&d.format("%Y-%m-%d").to_string()),
            Value::Inet(ip) => quote(&ip.to_string()),
            Value::Blob(bytes) => {
                let mut out = String::with_capacity(2 + bytes.len() * 2);
                out.push_str("0x");
                for b in bytes {
                    out.push_str(&format!("{b:02x}"));
                }
                out
            }
        }
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cql_literal())
    }
}
