//! Round-trip and row-decoding behavior over the scripted driver.

mod common;

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use common::{MemConnection, ResultSet, Script, Value};
use snowbind::driver::DriverError;
use snowbind::{
    Encode, FromRow, QueryError, Session, SnowError, StatementSettings, frag,
};

/// Bind `value` as the only parameter of an echoing query and decode it back.
fn roundtrip<T>(value: T) -> T
where
    T: Encode + FromRow + Clone + Send + Sync + 'static,
{
    let mut conn = MemConnection::echo();
    let mut session = Session::new(&mut conn);
    session
        .unique(&frag!("SELECT ", @value.clone()).query())
        .expect("roundtrip query failed")
}

#[test]
fn primitives_roundtrip_unchanged() {
    assert_eq!(roundtrip(true), true);
    assert_eq!(roundtrip(42_i16), 42);
    assert_eq!(roundtrip(-7_i32), -7);
    assert_eq!(roundtrip(9_000_000_000_i64), 9_000_000_000);
    assert_eq!(roundtrip(1.5_f32), 1.5);
    assert_eq!(roundtrip(2.25_f64), 2.25);
    assert_eq!(roundtrip("hello".to_string()), "hello");
    assert_eq!(roundtrip(vec![0_u8, 1, 255]), vec![0, 1, 255]);
}

#[test]
fn temporal_and_structured_values_roundtrip() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    assert_eq!(roundtrip(date), date);

    let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_milli_opt(12, 30, 45, 125)
        .unwrap();
    assert_eq!(roundtrip(ts), ts);

    let instant = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 45).unwrap();
    assert_eq!(roundtrip(instant), instant);

    let id = uuid::Uuid::new_v4();
    assert_eq!(roundtrip(id), id);

    let doc = serde_json::json!({"kind": "event", "points": [1, 2, 3]});
    assert_eq!(roundtrip(doc.clone()), doc);
}

#[test]
fn datetime_roundtrips_through_naive_datetime_text() {
    let ts: NaiveDateTime = roundtrip(
        NaiveDate::from_ymd_opt(1999, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap(),
    );
    assert_eq!(ts.to_string(), "1999-12-31 23:59:59");
}

#[test]
fn null_column_decodes_to_none_for_optional_targets() {
    let mut conn = MemConnection::with_results(vec![ResultSet::new(
        &["EMAIL"],
        vec![vec![Value::Null]],
    )]);
    let mut session = Session::new(&mut conn);

    let email: Option<String> = session
        .unique(&frag!("SELECT email FROM users").query())
        .unwrap();
    assert_eq!(email, None);
}

#[test]
fn null_column_fails_for_non_optional_targets() {
    let mut conn = MemConnection::with_results(vec![ResultSet::new(
        &["EMAIL"],
        vec![vec![Value::Null]],
    )]);
    let mut session = Session::new(&mut conn);

    let err = session
        .unique::<String>(&frag!("SELECT email FROM users").query())
        .unwrap_err();
    assert!(matches!(
        err,
        SnowError::Query(QueryError::ResultSet { .. })
    ));
    assert!(err.to_string().contains("NULL"), "message: {err}");
}

#[derive(Debug, PartialEq, FromRow)]
struct Event {
    id: i64,
    created_at: String,
}

#[test]
fn field_names_resolve_across_label_styles() {
    for labels in [["ID", "CREATED_AT"], ["id", "created_at"], ["Id", "createdAt"]] {
        let mut conn = MemConnection::with_results(vec![ResultSet::new(
            &labels,
            vec![vec![Value::Int(7), Value::text("2024-01-01")]],
        )]);
        let mut session = Session::new(&mut conn);

        let events: Vec<Event> = session
            .list(&frag!("SELECT * FROM events").query())
            .unwrap();
        assert_eq!(
            events,
            vec![Event {
                id: 7,
                created_at: "2024-01-01".to_string()
            }]
        );
    }
}

#[derive(Debug, FromRow)]
struct WrongShape {
    #[allow(dead_code)]
    missing_field: String,
}

#[test]
fn unmatched_field_reports_available_columns_sorted() {
    let mut conn = MemConnection::with_results(vec![ResultSet::new(
        &["NAME", "ID"],
        vec![vec![Value::text("x"), Value::Int(1)]],
    )]);
    let mut session = Session::new(&mut conn);

    let err = session
        .list::<WrongShape>(&frag!("SELECT * FROM t").query())
        .unwrap_err();
    assert!(
        err.to_string()
            .contains("column 'missing_field' not found (available: ID, NAME)"),
        "message: {err}"
    );
}

#[derive(Debug, FromRow)]
struct RenamedField {
    #[row(column = "FULL_NAME")]
    name: String,
}

#[test]
fn column_attribute_overrides_the_lookup_name() {
    let mut conn = MemConnection::with_results(vec![ResultSet::new(
        &["FULL_NAME"],
        vec![vec![Value::text("Ada Lovelace")]],
    )]);
    let mut session = Session::new(&mut conn);

    let rows: Vec<RenamedField> = session.list(&frag!("SELECT * FROM t").query()).unwrap();
    assert_eq!(rows[0].name, "Ada Lovelace");
}

#[derive(Debug, PartialEq, FromRow)]
struct Person {
    id: i64,
    name: String,
}

#[test]
fn first_decode_failure_aborts_iteration_and_closes_resources() {
    let mut conn = MemConnection::new(Script {
        results: vec![ResultSet::new(
            &["id", "name"],
            vec![
                vec![Value::Int(1), Value::text("Ada")],
                vec![Value::Int(2), Value::text("Grace")],
                vec![Value::Int(3), Value::Null],
            ],
        )]
        .into(),
        query_id: Some("qid-123".to_string()),
        ..Script::default()
    });
    let handle = conn.clone();
    let mut session = Session::new(&mut conn);

    let err = session
        .list::<Person>(&frag!("SELECT id, name FROM people").query())
        .unwrap_err();
    assert!(err.to_string().contains("NULL"), "message: {err}");
    assert_eq!(err.query_id(), Some("qid-123"));

    handle.journal(|journal| {
        assert_eq!(journal.cursors_closed, 1);
        assert_eq!(journal.statements_closed, 1);
    });
}

#[test]
fn all_rows_decode_when_every_field_is_present() {
    let mut conn = MemConnection::with_results(vec![ResultSet::new(
        &["id", "name"],
        vec![
            vec![Value::Int(1), Value::text("Ada")],
            vec![Value::Int(2), Value::text("Grace")],
        ],
    )]);
    let mut session = Session::new(&mut conn);

    let people: Vec<Person> = session
        .list(&frag!("SELECT id, name FROM people").query())
        .unwrap();
    assert_eq!(
        people,
        vec![
            Person {
                id: 1,
                name: "Ada".to_string()
            },
            Person {
                id: 2,
                name: "Grace".to_string()
            },
        ]
    );
}

#[test]
fn tuple_rows_decode_positionally() {
    let mut conn = MemConnection::with_results(vec![ResultSet::new(
        &["A", "B"],
        vec![vec![Value::Int(1), Value::text("x")]],
    )]);
    let mut session = Session::new(&mut conn);

    let row: (i64, String) = session.unique(&frag!("SELECT a, b FROM t").query()).unwrap();
    assert_eq!(row, (1, "x".to_string()));
}

#[test]
fn prepare_failure_classifies_as_sql_exception() {
    let mut conn = MemConnection::new(Script {
        fail_prepare: Some(DriverError::new("syntax error").with_state("42000", 1003)),
        ..Script::default()
    });
    let mut session = Session::new(&mut conn);

    let err = session
        .list::<i64>(&frag!("SELEC 1").query())
        .unwrap_err();
    match err {
        SnowError::Query(QueryError::Sql {
            sql_state,
            error_code,
            ..
        }) => {
            assert_eq!(sql_state.as_deref(), Some("42000"));
            assert_eq!(error_code, Some(1003));
        }
        other => panic!("expected Sql error, got {other}"),
    }
}

#[test]
fn execute_failure_carries_the_drivers_query_id() {
    let mut conn = MemConnection::new(Script {
        fail_execute: Some(
            DriverError::new("warehouse suspended")
                .with_state("57014", 604)
                .with_query_id("qid-err"),
        ),
        ..Script::default()
    });
    let mut session = Session::new(&mut conn);

    let err = session
        .list::<i64>(&frag!("SELECT 1").query())
        .unwrap_err();
    assert_eq!(err.query_id(), Some("qid-err"));
}

#[test]
fn statement_settings_are_applied_when_supported() {
    let mut conn = MemConnection::with_results(vec![ResultSet::new(
        &["N"],
        vec![vec![Value::Int(1)]],
    )]);
    let handle = conn.clone();
    let settings = StatementSettings {
        query_timeout: Some(std::time::Duration::from_secs(30)),
        fetch_size: Some(500),
    };
    let mut session = Session::with_settings(&mut conn, settings);

    let n: i64 = session.unique(&frag!("SELECT n FROM t").query()).unwrap();
    assert_eq!(n, 1);
    handle.journal(|journal| {
        assert_eq!(
            journal.settings,
            vec!["query_timeout=30s".to_string(), "fetch_size=500".to_string()]
        );
    });
}

#[test]
fn unsupported_statement_settings_are_swallowed() {
    let mut conn = MemConnection::new(Script {
        results: vec![ResultSet::new(&["N"], vec![vec![Value::Int(1)]])].into(),
        fail_settings: true,
        ..Script::default()
    });
    let settings = StatementSettings {
        query_timeout: Some(std::time::Duration::from_secs(30)),
        fetch_size: Some(500),
    };
    let mut session = Session::with_settings(&mut conn, settings);

    // Settings failures are best-effort; the query itself must succeed.
    let n: i64 = session.unique(&frag!("SELECT n FROM t").query()).unwrap();
    assert_eq!(n, 1);
}

#[test]
fn placeholder_parameter_mismatch_is_caught_before_the_driver() {
    let mut conn = MemConnection::echo();
    let handle = conn.clone();
    let mut session = Session::new(&mut conn);

    let err = session
        .list::<i64>(&snowbind::Fragment::new("SELECT ?").query())
        .unwrap_err();
    assert!(matches!(
        err,
        SnowError::Query(QueryError::PreparedStatement { .. })
    ));
    handle.journal(|journal| assert!(journal.prepared.is_empty()));
}
