//! The per-source ingestion loop.
//!
//! An [`IngestWorker`] owns one [`SourceUnit`] from open to close:
//!
//! ```text
//! Setup -> Reading -> (Draining <-> Reading) -> Finalizing -> {Completed, Aborted}
//! ```
//!
//! Window accounting:
//! - the line counter counts every physical line and drives pacing
//! - blank lines are never parsed and never count against a window
//! - `skip_rows` skips the first non-blank lines
//! - `max_rows` caps parse attempts; the worker stops reading right after the last one
//! - a line that is not valid UTF-8 is rejected like any other unparsable line
//!
//! A source whose error count exceeds `max_errors` stops at once. Its writes
//! already in flight are drained before the worker returns.

use crate::cancel::CancelToken;
use crate::config::IngestConfig;
use crate::error::ParseFailure;
use crate::io::bad_rows::BadRowSink;
use crate::io::source::SourceUnit;
use crate::pacer::{DrainReport, PendingWrites};
use crate::parser::RowParser;
use crate::session::{PreparedInsert, Session};
use serde::Serialize;
use std::io::BufRead;
use tracing::{error, info, warn};

/// How a worker ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerStatus {
    /// The whole source was read.
    Completed,
    /// The error budget was exceeded.
    Aborted { errors: u64 },
    /// Another source halted the run.
    Cancelled,
    /// The source or its bad-row file could not be opened, read or written.
    Failed { reason: String },
}

/// Outcome of one source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkerResult {
    pub source: String,
    /// Physical lines read, blank and skipped lines included.
    pub lines_read: u64,
    pub rows_submitted: u64,
    pub parse_errors: u64,
    pub write_errors: u64,
    pub drains: u64,
    pub peak_outstanding: usize,
    #[serde(flatten)]
    pub status: WorkerStatus,
}

impl WorkerResult {
    pub(crate) fn failed(source: &str, reason: String) -> Self {
        error!(source = %source, "{reason}");
        Self::empty(source, WorkerStatus::Failed { reason })
    }

    /// A result for a source that never read a line.
    pub(crate) fn empty(source: &str, status: WorkerStatus) -> Self {
        Self {
            source: source.to_string(),
            lines_read: 0,
            rows_submitted: 0,
            parse_errors: 0,
            write_errors: 0,
            drains: 0,
            peak_outstanding: 0,
            status,
        }
    }

    /// Rows whose write was confirmed.
    pub fn rows_inserted(&self) -> u64 {
        self.rows_submitted.saturating_sub(self.write_errors)
    }

    pub fn is_completed(&self) -> bool {
        self.status == WorkerStatus::Completed
    }
}

#[derive(Default)]
struct Tally {
    lines_read: u64,
    parse_attempts: u64,
    rows_submitted: u64,
    parse_errors: u64,
    write_errors: u64,
}

pub struct IngestWorker<'a> {
    config: &'a IngestConfig,
    session: &'a dyn Session,
    statement: &'a PreparedInsert,
    parser: Box<dyn RowParser>,
    cancel: CancelToken,
}

impl<'a> IngestWorker<'a> {
    pub fn new(
        config: &'a IngestConfig,
        session: &'a dyn Session,
        statement: &'a PreparedInsert,
        parser: Box<dyn RowParser>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            config,
            session,
            statement,
            parser,
            cancel,
        }
    }

    /// Process `unit` to the end, or until aborted, cancelled or failed.
    pub fn run(mut self, unit: SourceUnit) -> WorkerResult {
        let source = unit.name().to_string();
        info!(source = %source, "processing {source}");

        let reader = match unit.open() {
            Ok(r) => r,
            Err(e) => return WorkerResult::failed(&source, format!("{e:#}")),
        };
        if self.cancel.is_cancelled() {
            warn!(source = %source, "cancelled: {source} before reading");
            return WorkerResult::empty(&source, WorkerStatus::Cancelled);
        }

        // Only a readable, live source may truncate its previous bad-row file.
        let mut sink = match &self.config.bad_dir {
            Some(dir) => match BadRowSink::create(dir, &source) {
                Ok(sink) => Some(sink),
                Err(e) => {
                    let path = BadRowSink::path_for(dir, &source);
                    return WorkerResult::failed(
                        &source,
                        format!("create bad-row file {}: {e}", path.display()),
                    );
                }
            },
            None => None,
        };

        let mut pending = PendingWrites::new(self.config.pacing_threshold, self.config.write_timeout());
        let mut tally = Tally::default();
        let mut status = self.read_lines(&source, reader, &mut pending, sink.as_mut(), &mut tally);

        let report = pending.drain();
        let exceeded = self.absorb(&source, report, &mut tally);
        if exceeded && status == WorkerStatus::Completed {
            let errors = self.error_count(&tally);
            error!(source = %source, errors, "maximum number of errors exceeded ({errors}) for {source}");
            status = WorkerStatus::Aborted { errors };
        }

        if let Some(sink) = sink
            && let Err(e) = sink.close()
            && !matches!(status, WorkerStatus::Failed { .. })
        {
            status = WorkerStatus::Failed {
                reason: format!("flush bad-row file for {source}: {e}"),
            };
        }

        match &status {
            WorkerStatus::Completed => info!(
                source = %source,
                lines = tally.lines_read,
                rows = tally.rows_submitted,
                "done: {source} number of lines processed: {} ({} inserted)",
                tally.lines_read,
                tally.rows_submitted.saturating_sub(tally.write_errors)
            ),
            WorkerStatus::Cancelled => warn!(
                source = %source,
                lines = tally.lines_read,
                "cancelled: {source} after {} lines ({} inserted)",
                tally.lines_read,
                tally.rows_submitted.saturating_sub(tally.write_errors)
            ),
            WorkerStatus::Aborted { .. } | WorkerStatus::Failed { .. } => {}
        }

        WorkerResult {
            source,
            lines_read: tally.lines_read,
            rows_submitted: tally.rows_submitted,
            parse_errors: tally.parse_errors,
            write_errors: tally.write_errors,
            drains: pending.drains(),
            peak_outstanding: pending.peak(),
            status,
        }
    }

    fn read_lines(
        &mut self,
        source: &str,
        mut reader: Box<dyn BufRead + Send>,
        pending: &mut PendingWrites,
        mut sink: Option<&mut BadRowSink>,
        tally: &mut Tally,
    ) -> WorkerStatus {
        let mut skip = self.config.skip_rows;
        let mut buf = Vec::new();

        loop {
            if self.cancel.is_cancelled() {
                return WorkerStatus::Cancelled;
            }

            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => return WorkerStatus::Completed,
                Ok(_) => {}
                Err(e) => {
                    let reason = format!("read {source} after line {}: {e}", tally.lines_read);
                    error!(source = %source, "{reason}");
                    return WorkerStatus::Failed { reason };
                }
            }
            tally.lines_read += 1;
            let line_no = tally.lines_read;
            let raw = trim_line_ending(&buf);

            if let Some(report) = pending.on_line(line_no)
                && self.absorb(source, report, tally)
            {
                return self.abort(source, tally);
            }

            // Undecodable bytes are a bad row, not a broken source.
            let decoded = std::str::from_utf8(raw);
            if decoded.is_ok_and(|line| line.trim().is_empty()) {
                continue;
            }
            if skip > 0 {
                skip -= 1;
                continue;
            }

            tally.parse_attempts += 1;
            let parsed = decoded
                .map_err(ParseFailure::from)
                .and_then(|line| self.parser.parse(line));
            match parsed {
                Ok(row) => {
                    pending.push(self.session.submit(self.statement, row));
                    tally.rows_submitted += 1;
                }
                Err(failure) => {
                    let shown = String::from_utf8_lossy(raw);
                    warn!(
                        source = %source,
                        line = line_no,
                        "error parsing line {line_no} in {source}: {shown} ({failure})"
                    );
                    tally.parse_errors += 1;
                    if let Some(sink) = sink.as_deref_mut()
                        && let Err(e) = sink.append(raw)
                    {
                        let reason = format!("write {}: {e}", sink.path().display());
                        error!(source = %source, "{reason}");
                        return WorkerStatus::Failed { reason };
                    }
                    if self.config.error_budget_exceeded(self.error_count(tally)) {
                        return self.abort(source, tally);
                    }
                }
            }

            if self
                .config
                .max_rows
                .is_some_and(|max| tally.parse_attempts >= max)
            {
                return WorkerStatus::Completed;
            }
        }
    }

    /// Record a drain; true when write failures pushed the source over budget.
    fn absorb(&self, source: &str, report: DrainReport, tally: &mut Tally) -> bool {
        if report.failures.is_empty() {
            return false;
        }
        for failure in &report.failures {
            warn!(source = %source, "write failed for {source}: {failure}");
        }
        tally.write_errors += report.failures.len() as u64;
        self.config.count_write_failures
            && self.config.error_budget_exceeded(self.error_count(tally))
    }

    fn error_count(&self, tally: &Tally) -> u64 {
        if self.config.count_write_failures {
            tally.parse_errors + tally.write_errors
        } else {
            tally.parse_errors
        }
    }

    fn abort(&self, source: &str, tally: &Tally) -> WorkerStatus {
        let errors = self.error_count(tally);
        error!(source = %source, errors, "maximum number of errors exceeded ({errors}) for {source}");
        WorkerStatus::Aborted { errors }
    }
}

fn trim_line_ending(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\n' | b'\r'] = line {
        line = rest;
    }
    line
}
