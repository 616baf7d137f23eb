mod common;

use common::{SCHEMA, prepare};
use delimload::session::write_channel;
use delimload::{IngestConfig, MemorySession, ScriptSession, Session, Value, WriteError};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn memory_session_stores_rows_against_the_statement() -> anyhow::Result<()> {
    let session = MemorySession::new();
    let config = IngestConfig::new(SCHEMA);
    let (_, statement) = prepare(&session, &config)?;

    session
        .submit(&statement, vec![Value::Int(1), Value::Text("x".into())])
        .wait(None)?;
    let rows = session.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].statement, statement.id());
    assert_eq!(session.prepared(), 1);
    Ok(())
}

#[test]
fn memory_session_rejects_wrong_arity() -> anyhow::Result<()> {
    let session = MemorySession::new();
    let (_, statement) = prepare(&session, &IngestConfig::new(SCHEMA))?;
    let outcome = session.submit(&statement, vec![Value::Int(1)]).wait(None);
    assert!(matches!(outcome, Err(WriteError::Rejected(_))));
    assert_eq!(session.row_count(), 0);
    assert_eq!(session.submitted(), 1);
    Ok(())
}

#[test]
fn closed_session_refuses_writes() -> anyhow::Result<()> {
    let session = MemorySession::new();
    let (schema, statement) = prepare(&session, &IngestConfig::new(SCHEMA))?;
    session.close();
    assert!(session.is_closed());
    let outcome = session
        .submit(&statement, vec![Value::Int(1), Value::Null])
        .wait(None);
    assert_eq!(outcome, Err(WriteError::Closed));
    assert!(session.prepare(&schema.insert_template()).is_err());
    Ok(())
}

#[test]
fn dropped_completer_abandons_the_handle() {
    let (completer, handle) = write_channel();
    drop(completer);
    assert_eq!(handle.wait(Some(Duration::from_secs(1))), Err(WriteError::Abandoned));
}

#[test]
fn script_session_renders_literals() -> anyhow::Result<()> {
    let session = MemorySession::new();
    let (_, statement) = prepare(&session, &IngestConfig::new("ks.t(a int, b text, c blob)"))?;
    let line = ScriptSession::render(
        &statement,
        &[Value::Int(3), Value::Text("it's".into()), Value::Blob(vec![1, 255])],
    );
    assert_eq!(line, "INSERT INTO ks.t(a,b,c) VALUES (3,'it''s',0x01ff);");
    Ok(())
}

#[test]
fn script_session_writes_one_statement_per_row() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("out.cql");
    let session = ScriptSession::new(fs::File::create(&path)?);
    let schema = delimload::TableSchema::parse(SCHEMA)?;
    let statement = session.prepare(&schema.insert_template())?;

    session
        .submit(&statement, vec![Value::Int(1), Value::Null])
        .wait(None)?;
    session
        .submit(&statement, vec![Value::Int(2), Value::Text("b".into())])
        .wait(None)?;
    session.close();

    let text = fs::read_to_string(&path)?;
    assert_eq!(
        text,
        "INSERT INTO test.t(a,b) VALUES (1,null);\nINSERT INTO test.t(a,b) VALUES (2,'b');\n"
    );
    Ok(())
}
