use chrono::{NaiveDate, NaiveDateTime};
use delimload::{
    BoolStyle, DecimalStyle, DelimParser, IngestConfig, ParseFailure, RowParser, TableSchema, Value,
};

fn parser(decl: &str, config: IngestConfig) -> anyhow::Result<DelimParser> {
    let schema = TableSchema::parse(decl)?;
    Ok(DelimParser::new(&schema, &config))
}

fn defaults() -> IngestConfig {
    IngestConfig::default()
}

#[test]
fn parses_typed_fields() -> anyhow::Result<()> {
    let mut p = parser("ks.t(a int, b text, c double, d boolean, e bigint)", defaults())?;
    let row = p.parse("1,hello,2.5,true,9000000000")?;
    assert_eq!(
        row,
        vec![
            Value::Int(1),
            Value::Text("hello".into()),
            Value::Double(2.5),
            Value::Boolean(true),
            Value::BigInt(9_000_000_000),
        ]
    );
    Ok(())
}

#[test]
fn wrong_field_count_is_a_failure() -> anyhow::Result<()> {
    let mut p = parser("ks.t(a int, b int)", defaults())?;
    assert_eq!(
        p.parse("1,2,3"),
        Err(ParseFailure::FieldCount {
            expected: 2,
            found: 3
        })
    );
    assert_eq!(
        p.parse("1"),
        Err(ParseFailure::FieldCount {
            expected: 2,
            found: 1
        })
    );
    Ok(())
}

#[test]
fn invalid_number_names_the_column() -> anyhow::Result<()> {
    let mut p = parser("ks.t(a int, b int)", defaults())?;
    match p.parse("1,abc") {
        Err(ParseFailure::InvalidValue { column, ty, value, .. }) => {
            assert_eq!(column, "b");
            assert_eq!(ty, "int");
            assert_eq!(value, "abc");
        }
        other => panic!("expected invalid value, got {other:?}"),
    }
    Ok(())
}

#[test]
fn null_token_and_empty_fields() -> anyhow::Result<()> {
    let mut p = parser(
        "ks.t(a int, b text, c text)",
        defaults().with_null_string("NULL"),
    )?;
    assert_eq!(
        p.parse(",,NULL")?,
        vec![Value::Null, Value::Text(String::new()), Value::Null]
    );
    Ok(())
}

#[test]
fn custom_delimiter() -> anyhow::Result<()> {
    let mut p = parser("ks.t(a int, b text)", defaults().with_delimiter("\t"))?;
    assert_eq!(p.parse("7\tx,y")?, vec![Value::Int(7), Value::Text("x,y".into())]);

    let mut multi = parser("ks.t(a int, b int)", defaults().with_delimiter("||"))?;
    assert_eq!(multi.parse("1||2")?, vec![Value::Int(1), Value::Int(2)]);
    Ok(())
}

#[test]
fn quoted_fields_may_contain_the_delimiter() -> anyhow::Result<()> {
    let mut p = parser(
        "ks.t(a int, b text)",
        defaults().with_delimiter_in_quotes(true),
    )?;
    assert_eq!(
        p.parse(r#"1,"a, b and ""c""""#)?,
        vec![Value::Int(1), Value::Text(r#"a, b and "c""#.into())]
    );

    let mut plain = parser("ks.t(a int, b text)", defaults())?;
    assert!(matches!(
        plain.parse(r#"1,"a, b""#),
        Err(ParseFailure::FieldCount { .. })
    ));
    Ok(())
}

#[test]
fn bool_styles() -> anyhow::Result<()> {
    let mut p = parser("ks.t(a boolean)", defaults().with_bool_style(BoolStyle::YN))?;
    assert_eq!(p.parse("y")?, vec![Value::Boolean(true)]);
    assert_eq!(p.parse("N")?, vec![Value::Boolean(false)]);
    assert!(p.parse("true").is_err());

    let mut ones = parser("ks.t(a boolean)", defaults().with_bool_style(BoolStyle::OneZero))?;
    assert_eq!(ones.parse("0")?, vec![Value::Boolean(false)]);
    Ok(())
}

#[test]
fn comma_decimal_style() -> anyhow::Result<()> {
    let mut p = parser(
        "ks.t(a double, b decimal)",
        defaults()
            .with_delimiter(";")
            .with_decimal_style(DecimalStyle::Comma),
    )?;
    assert_eq!(
        p.parse("1.234,5;-0,25")?,
        vec![Value::Double(1234.5), Value::Decimal("-0.25".into())]
    );
    Ok(())
}

#[test]
fn decimal_rejects_garbage() -> anyhow::Result<()> {
    let mut p = parser("ks.t(a decimal)", defaults())?;
    assert_eq!(p.parse("12.50")?, vec![Value::Decimal("12.50".into())]);
    assert_eq!(p.parse("1e10")?, vec![Value::Decimal("1e10".into())]);
    assert!(p.parse("1.2.3").is_err());
    assert!(p.parse("abc").is_err());
    Ok(())
}

#[test]
fn timestamps_and_dates() -> anyhow::Result<()> {
    let mut p = parser("ks.t(a timestamp, b date)", defaults())?;
    let row = p.parse("2024-03-01 10:20:30,2024-03-02")?;
    let ts = NaiveDateTime::parse_from_str("2024-03-01 10:20:30", "%Y-%m-%d %H:%M:%S")?;
    let d = NaiveDate::from_ymd_opt(2024, 3, 2).ok_or_else(|| anyhow::anyhow!("date"))?;
    assert_eq!(row, vec![Value::Timestamp(ts), Value::Date(d)]);

    let mut custom = parser("ks.t(a timestamp)", defaults().with_date_format("%d/%m/%Y %H:%M"))?;
    let ts = NaiveDateTime::parse_from_str("2024-12-25 08:00:00", "%Y-%m-%d %H:%M:%S")?;
    assert_eq!(custom.parse("25/12/2024 08:00")?, vec![Value::Timestamp(ts)]);
    assert!(custom.parse("yesterday").is_err());
    Ok(())
}

#[test]
fn uuids_inet_and_blobs() -> anyhow::Result<()> {
    let mut p = parser("ks.t(a uuid, b inet, c blob)", defaults())?;
    let row = p.parse("550e8400-e29b-41d4-a716-446655440000,10.0.0.1,0xCAFE")?;
    assert!(matches!(row[0], Value::Uuid(_)));
    assert_eq!(row[1], Value::Inet("10.0.0.1".parse()?));
    assert_eq!(row[2], Value::Blob(vec![0xca, 0xfe]));

    let mut time = parser("ks.t(a timeuuid)", defaults())?;
    assert!(time.parse("550e8400-e29b-41d4-a716-446655440000").is_err());
    assert!(time.parse("c232ab00-9414-11ec-b3c8-9f6bdeced846").is_ok());
    Ok(())
}

#[test]
fn ascii_columns_reject_non_ascii() -> anyhow::Result<()> {
    let mut p = parser("ks.t(a ascii, b text)", defaults())?;
    assert!(p.parse("café,café").is_err());
    assert_eq!(
        p.parse("cafe,café")?,
        vec![Value::Text("cafe".into()), Value::Text("café".into())]
    );
    Ok(())
}
