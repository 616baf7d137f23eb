//! Fan-out of sources to workers, and the run-level summary.
//!
//! A single stream or file runs on the calling thread. A directory or glob
//! runs one worker per file on a dedicated pool of `num_threads` threads;
//! results come back in no particular order relative to execution.
//!
//! # Example
//!
//! ```no_run
//! use delimload::config::IngestConfig;
//! use delimload::dispatcher::Dispatcher;
//! use delimload::io::source::InputTarget;
//! use delimload::session::memory::MemorySession;
//! use std::sync::Arc;
//!
//! # fn main() -> delimload::error::Result<()> {
//! let session = MemorySession::new();
//! let config = IngestConfig::new("test.t(a int, b text)").with_num_threads(4);
//! let dispatcher = Dispatcher::new(config, Arc::new(session.clone()))?;
//! let summary = dispatcher.run(&InputTarget::parse("data/"))?;
//! println!("inserted {}", summary.total_inserted);
//! # Ok(())
//! # }
//! ```

use crate::cancel::CancelToken;
use crate::config::{AbortPolicy, IngestConfig};
use crate::error::{LoadError, Result};
use crate::io::source::{InputTarget, Resolved, SourceUnit};
use crate::parser::{DelimParserFactory, ParserFactory};
use crate::schema::TableSchema;
use crate::session::{PreparedInsert, Session};
use crate::worker::{IngestWorker, WorkerResult, WorkerStatus};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Dispatcher {
    config: IngestConfig,
    schema: TableSchema,
    session: Arc<dyn Session>,
    statement: PreparedInsert,
    parsers: Arc<dyn ParserFactory>,
    cancel: CancelToken,
}

impl Dispatcher {
    /// Validate the config, parse the schema and prepare the insert once.
    ///
    /// # Errors
    /// Configuration, schema and prepare failures; all of them happen before
    /// any source is touched.
    pub fn new(config: IngestConfig, session: Arc<dyn Session>) -> Result<Self> {
        config.validate()?;
        let schema = TableSchema::parse(&config.schema)?;
        let statement = session
            .prepare(&schema.insert_template())
            .map_err(LoadError::Prepare)?;
        Ok(Self {
            config,
            schema,
            session,
            statement,
            parsers: Arc::new(DelimParserFactory),
            cancel: CancelToken::new(),
        })
    }

    /// Use a different row parser for every worker.
    #[must_use]
    pub fn with_parser_factory(mut self, factory: impl ParserFactory + 'static) -> Self {
        self.parsers = Arc::new(factory);
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn statement(&self) -> &PreparedInsert {
        &self.statement
    }

    /// Token shared with every worker; cancelling it stops all of them at their next line.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Expand `target` and load every source in it.
    ///
    /// # Errors
    /// Target resolution errors (missing path, empty directory, bad glob) and
    /// pool construction errors. Per-source failures are reported in the summary.
    pub fn run(&self, target: &InputTarget) -> Result<RunSummary> {
        let resolved = target.resolve()?;
        self.run_resolved(resolved)
    }

    /// Load explicit sources on the worker pool. Colliding names are made distinct first.
    ///
    /// # Errors
    /// See [`Dispatcher::run`].
    pub fn run_units(&self, units: Vec<SourceUnit>) -> Result<RunSummary> {
        self.run_resolved(Resolved::many(units))
    }

    fn run_resolved(&self, resolved: Resolved) -> Result<RunSummary> {
        let results = match resolved {
            Resolved::Single(unit) => vec![self.run_unit(unit)],
            Resolved::Many(units) => self.run_pool(units)?,
        };
        let summary = RunSummary::from_results(results);
        info!(
            rows = summary.total_inserted,
            sources = summary.results.len(),
            "Total rows inserted: {}",
            summary.total_inserted
        );
        Ok(summary)
    }

    fn run_pool(&self, units: Vec<SourceUnit>) -> Result<Vec<WorkerResult>> {
        let threads = self.config.num_threads.min(units.len()).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("delimload-worker-{i}"))
            .build()?;
        Ok(pool.install(|| {
            units
                .into_par_iter()
                .map(|unit| self.run_unit(unit))
                .collect()
        }))
    }

    fn run_unit(&self, unit: SourceUnit) -> WorkerResult {
        let parser = match self.parsers.build(&self.schema, &self.config) {
            Ok(p) => p,
            Err(e) => return WorkerResult::failed(unit.name(), format!("build row parser: {e:#}")),
        };
        let result = IngestWorker::new(
            &self.config,
            self.session.as_ref(),
            &self.statement,
            parser,
            self.cancel.clone(),
        )
        .run(unit);

        if matches!(result.status, WorkerStatus::Aborted { .. })
            && self.config.abort_policy == AbortPolicy::HaltRun
            && !self.cancel.is_cancelled()
        {
            warn!(source = %result.source, "halting run after {} exceeded its error budget", result.source);
            self.cancel.cancel();
        }
        result
    }
}

/// Aggregate of every worker's result.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub results: Vec<WorkerResult>,
    pub total_submitted: u64,
    pub total_inserted: u64,
}

impl RunSummary {
    pub fn from_results(results: Vec<WorkerResult>) -> Self {
        let total_submitted = results.iter().map(|r| r.rows_submitted).sum();
        let total_inserted = results.iter().map(WorkerResult::rows_inserted).sum();
        Self {
            results,
            total_submitted,
            total_inserted,
        }
    }

    /// True when every source completed.
    pub fn is_clean(&self) -> bool {
        self.results.iter().all(WorkerResult::is_completed)
    }

    pub fn result_for(&self, source: &str) -> Option<&WorkerResult> {
        self.results.iter().find(|r| r.source == source)
    }

    /// Sources that did not complete, with their status.
    pub fn incomplete(&self) -> impl Iterator<Item = &WorkerResult> {
        self.results.iter().filter(|r| !r.is_completed())
    }

    /// Write the summary as pretty JSON.
    ///
    /// # Errors
    /// Returns an IO error if the file cannot be written.
    pub fn write_json(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, self).map_err(io::Error::other)?;
        out.write_all(b"\n")?;
        out.flush()
    }
}
