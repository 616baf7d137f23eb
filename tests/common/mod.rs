#![allow(dead_code)]

use delimload::{
    CancelToken, DelimParser, IngestConfig, IngestWorker, MemorySession, PreparedInsert, Session,
    SourceUnit, TableSchema, WorkerResult,
};
use std::fs;
use std::path::{Path, PathBuf};

pub const SCHEMA: &str = "test.t(a int, b text)";

/// Write `lines` to `dir/name`, newline terminated.
pub fn write_lines(dir: &Path, name: &str, lines: &[&str]) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    let mut body = lines.join("\n");
    body.push('\n');
    fs::write(&path, body)?;
    Ok(path)
}

/// `n` valid lines `i,row-i` starting at 1.
pub fn good_lines(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{i},row-{i}")).collect()
}

pub fn reader_unit(name: &str, lines: &[&str]) -> SourceUnit {
    let mut body = lines.join("\n");
    body.push('\n');
    SourceUnit::from_reader(name, std::io::Cursor::new(body.into_bytes()))
}

pub fn prepare(session: &MemorySession, config: &IngestConfig) -> anyhow::Result<(TableSchema, PreparedInsert)> {
    let schema = TableSchema::parse(&config.schema)?;
    let statement = session.prepare(&schema.insert_template())?;
    Ok((schema, statement))
}

/// Run one worker over `unit` with a fresh cancel token.
pub fn run_worker(
    config: &IngestConfig,
    session: &MemorySession,
    unit: SourceUnit,
) -> anyhow::Result<WorkerResult> {
    run_worker_with(config, session, unit, CancelToken::new())
}

pub fn run_worker_with(
    config: &IngestConfig,
    session: &MemorySession,
    unit: SourceUnit,
    cancel: CancelToken,
) -> anyhow::Result<WorkerResult> {
    let (schema, statement) = prepare(session, config)?;
    let parser = Box::new(DelimParser::new(&schema, config));
    Ok(IngestWorker::new(config, session, &statement, parser, cancel).run(unit))
}
