//! Integration tests for PostgresProvider
//!
//! These tests require a PostgreSQL server. They skip when none answers.

use sqlhelpers::audit::AuditedHelper;
use sqlhelpers::config::ConnectionAttributes;
use sqlhelpers::config::connections::SslMode;
use sqlhelpers::db::postgres::PostgresProvider;
use sqlhelpers::db::provider::ConnectionProvider;
use sqlhelpers::db::types::CellValue;
use sqlhelpers::db::{QueryResult, SqlHelper};

/// Get test database connection attributes
fn test_provider() -> PostgresProvider {
    let host = std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string());
    let database = std::env::var("TEST_DB_NAME").unwrap_or_else(|_| "test_db".to_string());
    let mut attrs = ConnectionAttributes::new(host, database);
    attrs.port = Some(
        std::env::var("TEST_DB_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5433),
    );
    attrs.username = std::env::var("TEST_DB_USER").unwrap_or_else(|_| "test_user".to_string());
    attrs.set_password(
        std::env::var("TEST_DB_PASSWORD").unwrap_or_else(|_| "test_password".to_string()),
    );
    PostgresProvider::new(attrs, SslMode::Disable)
}

fn connected_helper() -> Option<SqlHelper> {
    let provider = test_provider();
    let target = provider.describe();
    let mut helper = SqlHelper::new(provider);
    match helper.get_connection_and_cursor() {
        Ok(()) => Some(helper),
        Err(e) => {
            eprintln!("Skipping test: Database not available at {} - {}", target, e);
            None
        }
    }
}

#[test]
fn test_execute_simple_query() {
    let Some(mut helper) = connected_helper() else {
        return;
    };

    let result = helper.query("SELECT 1 as num, 'hello' as msg").unwrap();
    match result {
        QueryResult::Row(row) => {
            assert_eq!(row.values[0], CellValue::Integer(1));
            assert_eq!(row.values[1], CellValue::Text("hello".to_string()));
        }
        other => panic!("Expected one row, got {:?}", other),
    }
    assert_eq!(
        helper.results_column_names(),
        Some(vec!["num".to_string(), "msg".to_string()])
    );
}

#[test]
fn test_existence_check_collapses_to_bool() {
    let Some(mut helper) = connected_helper() else {
        return;
    };
    let result = helper
        .query("SELECT EXISTS (SELECT 1 FROM pg_tables WHERE tablename = 'pg_class')")
        .unwrap();
    assert!(matches!(result, QueryResult::Scalar(CellValue::Boolean(_))));
}

#[test]
fn test_audit_trail_end_to_end() {
    let Some(mut helper) = connected_helper() else {
        return;
    };
    let table = format!("sqlhelpers_it_{}", std::process::id());
    helper
        .execute(
            &format!("CREATE TABLE {} (id SERIAL PRIMARY KEY, name TEXT)", table),
            true,
        )
        .unwrap();

    let mut audited = AuditedHelper::builder(helper)
        .track(table.as_str())
        .build()
        .unwrap();
    assert_eq!(audited.last_report().triggers_created.len(), 3);
    assert!(audited.provision().unwrap().is_noop());

    audited
        .execute(&format!("INSERT INTO {} (name) VALUES ('andrew')", table), true)
        .unwrap();
    audited
        .query(&format!(
            "SELECT operation, old_row_data::text AS old_row, new_row_data->>'name' AS name \
             FROM audit_log WHERE table_name = '{}'",
            table
        ))
        .unwrap();
    let records = audited.to_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["operation"], CellValue::from("INSERT"));
    assert!(records[0]["old_row"].is_null());
    assert_eq!(records[0]["name"], CellValue::from("andrew"));

    audited
        .execute(&format!("DROP TABLE {}", table), true)
        .unwrap();
    audited
        .execute(
            &format!("DELETE FROM audit_log WHERE table_name = '{}'", table),
            true,
        )
        .unwrap();
}

#[test]
fn test_mixed_case_table_provisions_twice() {
    let Some(mut helper) = connected_helper() else {
        return;
    };
    let table = format!("SqlHelpers_Mixed_{}", std::process::id());
    helper
        .execute(
            &format!("CREATE TABLE {} (id SERIAL PRIMARY KEY, name TEXT)", table),
            true,
        )
        .unwrap();

    let mut audited = AuditedHelper::builder(helper)
        .track(table.as_str())
        .build()
        .unwrap();
    assert_eq!(audited.last_report().triggers_created.len(), 3);
    assert_eq!(audited.column_names(&table).unwrap(), vec!["id", "name"]);

    let report = audited.provision().unwrap().clone();
    assert!(report.is_noop());
    assert_eq!(report.triggers_present, vec![table.clone()]);

    audited
        .execute(&format!("INSERT INTO {} (name) VALUES ('andrew')", table), true)
        .unwrap();
    let logged = audited
        .query(&format!(
            "SELECT new_row_data->>'name' FROM audit_log WHERE table_name = '{}'",
            table.to_lowercase()
        ))
        .unwrap()
        .clone();
    assert_eq!(logged.as_scalar(), Some(&CellValue::from("andrew")));

    audited
        .execute(&format!("DROP TABLE {}", table), true)
        .unwrap();
    audited
        .execute(
            &format!(
                "DELETE FROM audit_log WHERE table_name = '{}'",
                table.to_lowercase()
            ),
            true,
        )
        .unwrap();
}
