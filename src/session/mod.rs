//! Write submission against a database session.
//!
//! A [`Session`] is shared by every worker of a run. Submitting a row never
//! blocks: it returns a [`WriteHandle`] that resolves once the write completes.
//! Handles are only ever resolved by waiting on them; the loader does not poll.
//!
//! Two sessions ship with the crate:
//! - [`memory::MemorySession`] keeps rows in memory (tests, dry runs)
//! - [`script::ScriptSession`] renders each row as a CQL statement to a writer
//!
//! A driver for a live cluster implements [`Session`] by completing the
//! [`WriteCompleter`] half of [`write_channel`] from its own callback.

pub mod memory;
pub mod script;

use crate::error::WriteError;
use crate::schema::InsertTemplate;
use crate::value::Value;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

/// Shared connection to the target table.
pub trait Session: Send + Sync {
    /// Prepare the insert statement once for a run.
    ///
    /// # Errors
    /// Returns a [`WriteError`] if the session rejects the statement.
    fn prepare(&self, template: &InsertTemplate) -> Result<PreparedInsert, WriteError>;

    /// Bind `row` to `statement` and start the write. Never blocks on completion.
    fn submit(&self, statement: &PreparedInsert, row: Vec<Value>) -> WriteHandle;

    /// Stop accepting writes. Later submissions resolve as [`WriteError::Closed`].
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// A statement prepared by a [`Session`], shared read-only by all workers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedInsert {
    id: u64,
    template: Arc<InsertTemplate>,
}

impl PreparedInsert {
    pub fn new(id: u64, template: InsertTemplate) -> Self {
        Self {
            id,
            template: Arc::new(template),
        }
    }

    /// Session-assigned identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn template(&self) -> &InsertTemplate {
        &self.template
    }
}

/// Create a connected completer/handle pair.
pub fn write_channel() -> (WriteCompleter, WriteHandle) {
    let (tx, rx) = mpsc::sync_channel(1);
    (WriteCompleter { tx }, WriteHandle { rx })
}

/// Producer half of a write: completed exactly once by whoever runs the write.
pub struct WriteCompleter {
    tx: SyncSender<Result<(), WriteError>>,
}

impl WriteCompleter {
    pub fn complete(self, outcome: Result<(), WriteError>) {
        // The worker may already have given up on this handle.
        let _ = self.tx.send(outcome);
    }
}

/// An in-flight write, owned by the worker that submitted it.
pub struct WriteHandle {
    rx: Receiver<Result<(), WriteError>>,
}

impl WriteHandle {
    /// A handle that is already resolved.
    pub fn ready(outcome: Result<(), WriteError>) -> Self {
        let (completer, handle) = write_channel();
        completer.complete(outcome);
        handle
    }

    /// Block until the write resolves, or `timeout` elapses.
    ///
    /// A zero timeout still observes an outcome that has already arrived.
    ///
    /// # Errors
    /// The write's own failure, [`WriteError::Timeout`], or
    /// [`WriteError::Abandoned`] if the completer was dropped unresolved.
    pub fn wait(self, timeout: Option<Duration>) -> Result<(), WriteError> {
        match timeout {
            None => self.rx.recv().map_err(|_| WriteError::Abandoned)?,
            Some(limit) => match self.rx.recv_timeout(limit) {
                Ok(outcome) => outcome,
                Err(RecvTimeoutError::Timeout) => Err(WriteError::Timeout(limit)),
                Err(RecvTimeoutError::Disconnected) => Err(WriteError::Abandoned),
            },
        }
    }
}
