//! # delimload
//!
//! A **bulk loader** for delimited text. Every input line is parsed against a
//! declared table schema and written to the database as an asynchronous insert.
//!
//! ## Key Features
//!
//! - **One worker per source** - a file, standard input, or every file of a directory
//! - **Bounded parallelism** - directories run on a fixed-size worker pool
//! - **Paced writes** - outstanding inserts are drained every `pacing_threshold` lines
//! - **Bad-row capture** - rejected lines go to `<source>.BAD` files
//! - **Error budgets** - a source stops once its failures exceed `max_errors`
//! - **Skip/limit windows** - skip leading rows, cap the rows parsed per source
//! - **Transparent decompression** - gzip, zstd, bzip2 and xz inputs
//!
//! ## Quick Start
//!
//! ```no_run
//! use delimload::*;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let session = MemorySession::new();
//! let config = IngestConfig::new("test.users(id int, name text, active boolean)")
//!     .with_skip_rows(1)
//!     .with_bad_dir("/tmp/bad");
//!
//! let dispatcher = Dispatcher::new(config, Arc::new(session.clone()))?;
//! let summary = dispatcher.run(&InputTarget::parse("users.csv"))?;
//! assert_eq!(summary.total_inserted as usize, session.row_count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. The [`Dispatcher`] validates the config, parses the schema and prepares the insert once
//! 2. The target expands into [`SourceUnit`]s
//! 3. Each unit runs in an [`IngestWorker`] with its own [`RowParser`]
//! 4. Workers submit rows to the shared [`Session`] and drain through [`PendingWrites`]
//! 5. Worker results fold into a [`RunSummary`]
//!
//! ## Module Overview
//!
//! - [`config`] - load options and their validation
//! - [`schema`] - table declarations and the derived insert
//! - [`parser`] - line-to-row parsing
//! - [`session`] - write submission and write handles
//! - [`pacer`] - draining of outstanding writes
//! - [`worker`] - the per-source loop
//! - [`dispatcher`] - fan-out and aggregation
//! - [`io`] - sources, decompression and bad-row files

pub mod cancel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod io;
pub mod logging;
pub mod pacer;
pub mod parser;
pub mod schema;
pub mod session;
pub mod value;
pub mod worker;

pub use cancel::CancelToken;
pub use config::{AbortPolicy, BoolStyle, DecimalStyle, IngestConfig};
pub use dispatcher::{Dispatcher, RunSummary};
pub use error::{ConfigError, LoadError, ParseFailure, SchemaError, WriteError};
pub use io::source::{InputTarget, SourceUnit};
pub use pacer::{DrainReport, PendingWrites};
pub use parser::{DelimParser, DelimParserFactory, ParserFactory, RowParser};
pub use schema::{ColumnType, InsertTemplate, TableSchema};
pub use session::memory::MemorySession;
pub use session::script::ScriptSession;
pub use session::{PreparedInsert, Session, WriteHandle};
pub use value::Value;
pub use worker::{IngestWorker, WorkerResult, WorkerStatus};
