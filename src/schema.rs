//! Table declarations and the insert statement derived from them.
//!
//! A declaration names the target table and its columns in load order:
//!
//! ```
//! use delimload::schema::{ColumnType, TableSchema};
//!
//! let schema = TableSchema::parse("test.events(id int, at timestamp, note text)")?;
//! assert_eq!(schema.qualified_name(), "test.events");
//! assert_eq!(schema.columns()[1].ty, ColumnType::Timestamp);
//! assert_eq!(
//!     schema.insert_template().cql(),
//!     "INSERT INTO test.events(id,at,note) VALUES (?,?,?)"
//! );
//! # Ok::<(), delimload::error::SchemaError>(())
//! ```

use crate::error::SchemaError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)^\s*(?:([A-Za-z_][A-Za-z0-9_]*)\s*\.\s*)?([A-Za-z_][A-Za-z0-9_]*)\s*\((.*)\)\s*$",
    )
    .expect("table declaration pattern")
});

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));

/// Column types a loader can bind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Ascii,
    Text,
    Varchar,
    Int,
    BigInt,
    SmallInt,
    TinyInt,
    VarInt,
    Counter,
    Float,
    Double,
    Decimal,
    Boolean,
    Uuid,
    TimeUuid,
    Timestamp,
    Date,
    Inet,
    Blob,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Ascii => "ascii",
            ColumnType::Text => "text",
            ColumnType::Varchar => "varchar",
            ColumnType::Int => "int",
            ColumnType::BigInt => "bigint",
            ColumnType::SmallInt => "smallint",
            ColumnType::TinyInt => "tinyint",
            ColumnType::VarInt => "varint",
            ColumnType::Counter => "counter",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Decimal => "decimal",
            ColumnType::Boolean => "boolean",
            ColumnType::Uuid => "uuid",
            ColumnType::TimeUuid => "timeuuid",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Inet => "inet",
            ColumnType::Blob => "blob",
        }
    }

    /// String-like columns keep empty fields as empty strings.
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            ColumnType::Ascii | ColumnType::Text | ColumnType::Varchar
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.to_ascii_lowercase().as_str() {
            "ascii" => ColumnType::Ascii,
            "text" => ColumnType::Text,
            "varchar" => ColumnType::Varchar,
            "int" => ColumnType::Int,
            "bigint" => ColumnType::BigInt,
            "smallint" => ColumnType::SmallInt,
            "tinyint" => ColumnType::TinyInt,
            "varint" => ColumnType::VarInt,
            "counter" => ColumnType::Counter,
            "float" => ColumnType::Float,
            "double" => ColumnType::Double,
            "decimal" => ColumnType::Decimal,
            "boolean" => ColumnType::Boolean,
            "uuid" => ColumnType::Uuid,
            "timeuuid" => ColumnType::TimeUuid,
            "timestamp" => ColumnType::Timestamp,
            "date" => ColumnType::Date,
            "inet" => ColumnType::Inet,
            "blob" => ColumnType::Blob,
            _ => return Err(()),
        };
        Ok(ty)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

/// A parsed table declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    keyspace: Option<String>,
    table: String,
    columns: Vec<Column>,
}

impl TableSchema {
    /// Parse `keyspace.table(col type, ...)`. The keyspace is optional.
    ///
    /// # Errors
    /// Returns a [`SchemaError`] describing the first problem found.
    pub fn parse(decl: &str) -> Result<Self, SchemaError> {
        let caps = TABLE_RE
            .captures(decl)
            .ok_or_else(|| SchemaError::Malformed(decl.to_string()))?;
        let keyspace = caps.get(1).map(|m| m.as_str().to_string());
        let table = caps[2].to_string();
        let body = caps[3].trim();
        if body.is_empty() {
            return Err(SchemaError::NoColumns(table));
        }

        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for def in body.split(',') {
            let parts: Vec<&str> = def.split_whitespace().collect();
            let [name, ty] = parts.as_slice() else {
                return Err(SchemaError::BadColumn(def.trim().to_string()));
            };
            if !IDENT_RE.is_match(name) {
                return Err(SchemaError::BadColumn(def.trim().to_string()));
            }
            let ty = ty
                .parse::<ColumnType>()
                .map_err(|()| SchemaError::UnknownType {
                    column: name.to_string(),
                    ty: ty.to_string(),
                })?;
            if !seen.insert(name.to_string()) {
                return Err(SchemaError::DuplicateColumn(name.to_string()));
            }
            columns.push(Column {
                name: name.to_string(),
                ty,
            });
        }

        Ok(Self {
            keyspace,
            table,
            columns,
        })
    }

    pub fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// `keyspace.table`, or just `table` without a keyspace.
    pub fn qualified_name(&self) -> String {
        match &self.keyspace {
            Some(ks) => format!("{ks}.{}", self.table),
            None => self.table.clone(),
        }
    }

    /// Derive the insert statement for this table.
    pub fn insert_template(&self) -> InsertTemplate {
        let names: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        let placeholders = vec!["?"; names.len()].join(",");
        let cql = format!(
            "INSERT INTO {}({}) VALUES ({placeholders})",
            self.qualified_name(),
            names.join(",")
        );
        InsertTemplate {
            table: self.qualified_name(),
            columns: names,
            cql,
        }
    }
}

/// Insert statement text plus the pieces a session needs to bind it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertTemplate {
    table: String,
    columns: Vec<String>,
    cql: String,
}

impl InsertTemplate {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn cql(&self) -> &str {
        &self.cql
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }
}
