//! In-memory session.
//!
//! Stores successfully written rows in a vector and can simulate slow, failing
//! or stalled writes. Clones share the same storage.

use super::{PreparedInsert, Session, WriteHandle, write_channel};
use crate::error::WriteError;
use crate::schema::InsertTemplate;
use crate::value::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

type RowPredicate = dyn Fn(&[Value]) -> bool + Send + Sync;

/// A row accepted by a [`MemorySession`].
#[derive(Clone, Debug, PartialEq)]
pub struct StoredRow {
    pub statement: u64,
    pub values: Vec<Value>,
}

#[derive(Default)]
struct State {
    rows: Mutex<Vec<StoredRow>>,
    // Completers of stalled writes; kept so their handles time out instead of disconnecting.
    stalled: Mutex<Vec<super::WriteCompleter>>,
    prepared: AtomicU64,
    submitted: AtomicU64,
    closed: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MemorySession {
    state: Arc<State>,
    fail_when: Option<Arc<RowPredicate>>,
    stall_when: Option<Arc<RowPredicate>>,
    latency: Option<Duration>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every row matching `pred`.
    #[must_use]
    pub fn failing_when(mut self, pred: impl Fn(&[Value]) -> bool + Send + Sync + 'static) -> Self {
        self.fail_when = Some(Arc::new(pred));
        self
    }

    /// Never complete rows matching `pred`.
    #[must_use]
    pub fn stalling_when(
        mut self,
        pred: impl Fn(&[Value]) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.stall_when = Some(Arc::new(pred));
        self
    }

    /// Complete every write from a helper thread after `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Snapshot of the rows written so far.
    pub fn rows(&self) -> Vec<StoredRow> {
        self.state
            .rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn row_count(&self) -> usize {
        self.state
            .rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of `submit` calls, successful or not.
    pub fn submitted(&self) -> u64 {
        self.state.submitted.load(Ordering::SeqCst)
    }

    pub fn prepared(&self) -> u64 {
        self.state.prepared.load(Ordering::SeqCst)
    }

    fn store(state: &State, statement: u64, values: Vec<Value>) {
        state
            .rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StoredRow { statement, values });
    }
}

impl Session for MemorySession {
    fn prepare(&self, template: &InsertTemplate) -> Result<PreparedInsert, WriteError> {
        if self.is_closed() {
            return Err(WriteError::Closed);
        }
        let id = self.state.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(PreparedInsert::new(id, template.clone()))
    }

    fn submit(&self, statement: &PreparedInsert, row: Vec<Value>) -> WriteHandle {
        self.state.submitted.fetch_add(1, Ordering::SeqCst);
        if self.is_closed() {
            return WriteHandle::ready(Err(WriteError::Closed));
        }
        if row.len() != statement.template().arity() {
            return WriteHandle::ready(Err(WriteError::Rejected(format!(
                "expected {} values, got {}",
                statement.template().arity(),
                row.len()
            ))));
        }
        if self.stall_when.as_ref().is_some_and(|p| p(&row)) {
            let (completer, handle) = write_channel();
            self.state
                .stalled
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(completer);
            return handle;
        }
        if self.fail_when.as_ref().is_some_and(|p| p(&row)) {
            return WriteHandle::ready(Err(WriteError::Rejected("row refused".into())));
        }

        let id = statement.id();
        match self.latency {
            None => {
                Self::store(&self.state, id, row);
                WriteHandle::ready(Ok(()))
            }
            Some(latency) => {
                let (completer, handle) = write_channel();
                let state = Arc::clone(&self.state);
                thread::spawn(move || {
                    thread::sleep(latency);
                    Self::store(&state, id, row);
                    completer.complete(Ok(()));
                });
                handle
            }
        }
    }

    fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }
}
