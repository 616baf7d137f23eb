//! Session that writes each row as a CQL `INSERT` statement.
//!
//! The output can be replayed with any CQL shell. Writes complete as soon as
//! the statement is handed to the underlying writer.

use super::{PreparedInsert, Session, WriteHandle};
use crate::error::WriteError;
use crate::schema::InsertTemplate;
use crate::value::Value;
use std::io::{self, BufWriter, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

pub struct ScriptSession {
    out: Mutex<BufWriter<Box<dyn Write + Send>>>,
    prepared: AtomicU64,
    closed: AtomicBool,
}

impl ScriptSession {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(BufWriter::new(Box::new(out))),
            prepared: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// # Errors
    /// Returns the underlying writer's error.
    pub fn flush(&self) -> io::Result<()> {
        self.out
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }

    /// Render one statement, terminated by `;`.
    pub fn render(statement: &PreparedInsert, row: &[Value]) -> String {
        let template = statement.template();
        let values = row
            .iter()
            .map(Value::to_cql_literal)
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "INSERT INTO {}({}) VALUES ({values});",
            template.table(),
            template.columns().join(",")
        )
    }
}

impl Session for ScriptSession {
    fn prepare(&self, template: &InsertTemplate) -> Result<PreparedInsert, WriteError> {
        if self.is_closed() {
            return Err(WriteError::Closed);
        }
        let id = self.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(PreparedInsert::new(id, template.clone()))
    }

    fn submit(&self, statement: &PreparedInsert, row: Vec<Value>) -> WriteHandle {
        if self.is_closed() {
            return WriteHandle::ready(Err(WriteError::Closed));
        }
        let line = Self::render(statement, &row);
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let outcome = writeln!(out, "{line}").map_err(|e| WriteError::Rejected(e.to_string()));
        WriteHandle::ready(outcome)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Err(e) = self.flush() {
            tracing::warn!("flushing statement script failed: {e}");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
