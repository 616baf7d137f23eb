//! Pacing of outstanding writes.
//!
//! A worker keeps every handle it submits in [`PendingWrites`]. On every line
//! whose number is a multiple of the threshold, and once more at the end of the
//! source, it drains: waits for each outstanding handle and clears the set.
//! This is a periodic full barrier, not a sliding window; the count may grow up
//! to the threshold between drains but never carries across one.

use crate::error::WriteError;
use crate::session::WriteHandle;
use std::time::{Duration, Instant};

/// What one drain observed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainReport {
    /// Handles that resolved successfully.
    pub succeeded: usize,
    /// Failures in submission order.
    pub failures: Vec<WriteError>,
}

impl DrainReport {
    pub fn resolved(&self) -> usize {
        self.succeeded + self.failures.len()
    }

    pub fn timeouts(&self) -> usize {
        self.failures.iter().filter(|e| e.is_timeout()).count()
    }
}

pub struct PendingWrites {
    threshold: u64,
    timeout: Option<Duration>,
    handles: Vec<WriteHandle>,
    drains: u64,
    peak: usize,
}

impl PendingWrites {
    /// `threshold` must be positive; config validation guarantees it.
    pub fn new(threshold: usize, timeout: Option<Duration>) -> Self {
        Self {
            threshold: threshold.max(1) as u64,
            timeout,
            handles: Vec::with_capacity(threshold.min(4096)),
            drains: 0,
            peak: 0,
        }
    }

    pub fn push(&mut self, handle: WriteHandle) {
        self.handles.push(handle);
        self.peak = self.peak.max(self.handles.len());
    }

    pub fn outstanding(&self) -> usize {
        self.handles.len()
    }

    /// Largest number of handles held at once.
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Number of drains performed, including empty ones.
    pub fn drains(&self) -> u64 {
        self.drains
    }

    pub fn is_boundary(&self, line_number: u64) -> bool {
        line_number % self.threshold == 0
    }

    /// Drain if `line_number` falls on a pacing boundary.
    pub fn on_line(&mut self, line_number: u64) -> Option<DrainReport> {
        self.is_boundary(line_number).then(|| self.drain())
    }

    /// Wait for every outstanding handle and clear the set.
    ///
    /// With a timeout, the whole drain shares one deadline; handles still
    /// pending when it passes fail with [`WriteError::Timeout`].
    pub fn drain(&mut self) -> DrainReport {
        self.drains += 1;
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut report = DrainReport::default();
        for handle in self.handles.drain(..) {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            match handle.wait(remaining) {
                Ok(()) => report.succeeded += 1,
                Err(WriteError::Timeout(_)) => {
                    report
                        .failures
                        .push(WriteError::Timeout(self.timeout.unwrap_or_default()));
                }
                Err(e) => report.failures.push(e),
            }
        }
        report
    }
}
