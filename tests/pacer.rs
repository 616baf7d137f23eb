mod common;

use common::{SCHEMA, prepare};
use delimload::{IngestConfig, MemorySession, PendingWrites, Session, Value, WriteError};
use std::time::{Duration, Instant};

fn row(a: i32) -> Vec<Value> {
    vec![Value::Int(a), Value::Text(format!("r{a}"))]
}

#[test]
fn drains_only_on_threshold_multiples() {
    let mut pending = PendingWrites::new(3, None);
    assert_eq!(pending.on_line(1), None);
    assert_eq!(pending.on_line(2), None);
    assert!(pending.on_line(3).is_some());
    assert!(pending.on_line(4).is_none());
    assert!(pending.on_line(6).is_some());
    assert_eq!(pending.drains(), 2);
}

#[test]
fn drain_clears_all_outstanding_writes() -> anyhow::Result<()> {
    let session = MemorySession::new().with_latency(Duration::from_millis(5));
    let config = IngestConfig::new(SCHEMA);
    let (_, statement) = prepare(&session, &config)?;

    let mut pending = PendingWrites::new(10, Some(Duration::from_secs(5)));
    for i in 0..4 {
        pending.push(session.submit(&statement, row(i)));
    }
    assert_eq!(pending.outstanding(), 4);

    let report = pending.drain();
    assert_eq!(report.succeeded, 4);
    assert!(report.failures.is_empty());
    assert_eq!(pending.outstanding(), 0);
    assert_eq!(pending.peak(), 4);
    assert_eq!(session.row_count(), 4);
    Ok(())
}

#[test]
fn failures_are_reported_in_submission_order() -> anyhow::Result<()> {
    let session = MemorySession::new().failing_when(|r| r[0] == Value::Int(2));
    let config = IngestConfig::new(SCHEMA);
    let (_, statement) = prepare(&session, &config)?;

    let mut pending = PendingWrites::new(10, None);
    for i in 1..=3 {
        pending.push(session.submit(&statement, row(i)));
    }
    let report = pending.drain();
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0], WriteError::Rejected(_)));
    assert_eq!(report.resolved(), 3);
    Ok(())
}

#[test]
fn stalled_writes_share_one_deadline() -> anyhow::Result<()> {
    let session = MemorySession::new().stalling_when(|_| true);
    let config = IngestConfig::new(SCHEMA);
    let (_, statement) = prepare(&session, &config)?;

    let timeout = Duration::from_millis(100);
    let mut pending = PendingWrites::new(10, Some(timeout));
    for i in 0..5 {
        pending.push(session.submit(&statement, row(i)));
    }

    let started = Instant::now();
    let report = pending.drain();
    let elapsed = started.elapsed();

    assert_eq!(report.timeouts(), 5);
    assert_eq!(report.failures[4], WriteError::Timeout(timeout));
    assert_eq!(pending.outstanding(), 0);
    // One shared deadline, not 5 x timeout.
    assert!(elapsed < timeout * 4, "drain took {elapsed:?}");
    Ok(())
}
