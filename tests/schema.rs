use delimload::schema::{ColumnType, TableSchema};
use delimload::SchemaError;

#[test]
fn parses_keyspace_table_and_columns() -> anyhow::Result<()> {
    let schema = TableSchema::parse("test.test3(a int, b BIGINT, c text)")?;
    assert_eq!(schema.keyspace(), Some("test"));
    assert_eq!(schema.table(), "test3");
    let types: Vec<ColumnType> = schema.columns().iter().map(|c| c.ty).collect();
    assert_eq!(types, vec![ColumnType::Int, ColumnType::BigInt, ColumnType::Text]);
    Ok(())
}

#[test]
fn keyspace_is_optional() -> anyhow::Result<()> {
    let schema = TableSchema::parse("events ( id uuid )")?;
    assert_eq!(schema.keyspace(), None);
    assert_eq!(schema.qualified_name(), "events");
    assert_eq!(schema.columns()[0].name, "id");
    Ok(())
}

#[test]
fn insert_template_lists_columns_in_order() -> anyhow::Result<()> {
    let template = TableSchema::parse("ks.t(x int, y double, z boolean)")?.insert_template();
    assert_eq!(template.table(), "ks.t");
    assert_eq!(template.arity(), 3);
    assert_eq!(template.cql(), "INSERT INTO ks.t(x,y,z) VALUES (?,?,?)");
    Ok(())
}

#[test]
fn malformed_declarations_are_rejected() {
    assert!(matches!(
        TableSchema::parse("ks.t a int"),
        Err(SchemaError::Malformed(_))
    ));
    assert!(matches!(
        TableSchema::parse("ks.t()"),
        Err(SchemaError::NoColumns(_))
    ));
    assert!(matches!(
        TableSchema::parse("ks.t(a)"),
        Err(SchemaError::BadColumn(_))
    ));
    assert!(matches!(
        TableSchema::parse("ks.t(a int, b money)"),
        Err(SchemaError::UnknownType { .. })
    ));
    assert!(matches!(
        TableSchema::parse("ks.t(a int, a text)"),
        Err(SchemaError::DuplicateColumn(_))
    ));
}
