//! Integration tests for SqlServerProvider
//!
//! Runs only when TEST_MSSQL_CONNECTION_STRING names a reachable server.

use sqlhelpers::db::sqlserver::SqlServerProvider;
use sqlhelpers::db::types::CellValue;
use sqlhelpers::db::{QueryResult, SqlHelper};

fn connected_helper() -> Option<SqlHelper> {
    let Ok(connection_string) = std::env::var("TEST_MSSQL_CONNECTION_STRING") else {
        eprintln!("Skipping test: TEST_MSSQL_CONNECTION_STRING not set");
        return None;
    };
    let provider = SqlServerProvider::from_connection_string(&connection_string).ok()?;
    let mut helper = SqlHelper::new(provider);
    match helper.get_connection_and_cursor() {
        Ok(()) => Some(helper),
        Err(e) => {
            eprintln!("Skipping test: SQL Server not available - {}", e);
            None
        }
    }
}

#[test]
fn test_system_user_collapses_to_scalar() {
    let Some(mut helper) = connected_helper() else {
        return;
    };
    let result = helper.query("SELECT SYSTEM_USER").unwrap();
    assert!(matches!(result, QueryResult::Scalar(CellValue::Text(_))));
}

#[test]
fn test_multi_row_result() {
    let Some(mut helper) = connected_helper() else {
        return;
    };
    let result = helper
        .query("SELECT v FROM (VALUES (1), (2), (3)) AS t(v)")
        .unwrap();
    assert_eq!(result.row_count(), 3);
}

#[test]
fn test_empty_result_keeps_column_names() {
    let Some(mut helper) = connected_helper() else {
        return;
    };
    let result = helper
        .query("SELECT name, object_id FROM sys.tables WHERE 1 = 0")
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(
        helper.results_column_names(),
        Some(vec!["name".to_string(), "object_id".to_string()])
    );
    assert!(helper.to_records().unwrap().is_empty());
}
