//! End-to-end tests against real SQLite databases

use crate::common::temp_db_path;
use sqlhelpers::audit::AuditedHelper;
use sqlhelpers::db::sqlite::SqliteProvider;
use sqlhelpers::db::types::CellValue;
use sqlhelpers::db::{QueryResult, SqlHelper};
use sqlhelpers::error::DbError;

fn create_table(path: &std::path::Path) {
    let mut helper = SqlHelper::new(SqliteProvider::new(path));
    helper.get_connection_and_cursor().unwrap();
    helper
        .execute(
            "create table t (id integer primary key autoincrement, name text)",
            true,
        )
        .unwrap();
}

fn audit_rows(helper: &mut SqlHelper) -> Vec<sqlhelpers::db::Record> {
    helper
        .query("select table_name, operation, old_row_data, new_row_data from audit_log order by id")
        .unwrap();
    helper.to_records().unwrap()
}

fn json(cell: &CellValue) -> serde_json::Value {
    serde_json::from_str(cell.as_str().unwrap()).unwrap()
}

#[test]
fn test_insert_is_logged() {
    let (_dir, path) = temp_db_path();
    create_table(&path);

    let mut audited = AuditedHelper::new(SqliteProvider::new(&path), ["t"]).unwrap();
    audited
        .execute("insert into t (name) values ('andrew')", true)
        .unwrap();

    let rows = audit_rows(&mut audited);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["table_name"], CellValue::from("t"));
    assert_eq!(rows[0]["operation"], CellValue::from("INSERT"));
    assert!(rows[0]["old_row_data"].is_null());
    assert_eq!(
        json(&rows[0]["new_row_data"]),
        serde_json::json!({"id": 1, "name": "andrew"})
    );
}

#[test]
fn test_update_and_delete_are_logged() {
    let (_dir, path) = temp_db_path();
    create_table(&path);

    let mut audited = AuditedHelper::new(SqliteProvider::new(&path), ["t"]).unwrap();
    audited.execute("insert into t (name) values ('a')", true).unwrap();
    audited
        .execute("update t set name = 'b' where id = 1", true)
        .unwrap();
    audited.execute("delete from t where id = 1", true).unwrap();

    let rows = audit_rows(&mut audited);
    let ops: Vec<_> = rows
        .iter()
        .map(|r| r["operation"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ops, vec!["INSERT", "UPDATE", "DELETE"]);

    assert_eq!(json(&rows[1]["old_row_data"])["name"], "a");
    assert_eq!(json(&rows[1]["new_row_data"])["name"], "b");
    assert_eq!(json(&rows[2]["old_row_data"])["name"], "b");
    assert!(rows[2]["new_row_data"].is_null());
}

#[test]
fn test_second_instance_provisions_nothing() {
    let (_dir, path) = temp_db_path();
    create_table(&path);

    let first = AuditedHelper::new(SqliteProvider::new(&path), ["t"]).unwrap();
    assert!(!first.last_report().is_noop());
    drop(first);

    let mut second = AuditedHelper::new(SqliteProvider::new(&path), ["t"]).unwrap();
    assert!(second.last_report().is_noop());
    assert_eq!(second.last_report().triggers_present, vec!["t"]);

    let count = second
        .query("select count(*) from sqlite_master where type = 'trigger'")
        .unwrap()
        .clone();
    assert_eq!(count, QueryResult::Scalar(CellValue::Integer(3)));

    // one row per write, not one per provisioning pass
    second.execute("insert into t (name) values ('x')", true).unwrap();
    assert_eq!(audit_rows(&mut second).len(), 1);
}

#[test]
fn test_differently_cased_name_reprovisions_as_noop() {
    let (_dir, path) = temp_db_path();
    create_table(&path);

    let mut audited = AuditedHelper::new(SqliteProvider::new(&path), ["T"]).unwrap();
    assert_eq!(audited.last_report().triggers_created.len(), 3);
    assert!(audited.provision().unwrap().is_noop());

    audited.execute("insert into t (name) values ('x')", true).unwrap();
    assert_eq!(audit_rows(&mut audited).len(), 1);
}

#[test]
fn test_tracking_a_second_table_later() {
    let (_dir, path) = temp_db_path();
    create_table(&path);
    {
        let mut helper = SqlHelper::new(SqliteProvider::new(&path));
        helper.get_connection_and_cursor().unwrap();
        helper.execute("create table u (code text)", true).unwrap();
    }

    AuditedHelper::new(SqliteProvider::new(&path), ["t"]).unwrap();
    let audited = AuditedHelper::new(SqliteProvider::new(&path), ["t", "u"]).unwrap();
    let report = audited.last_report();
    assert!(!report.audit_table_created);
    assert_eq!(report.triggers_present, vec!["t"]);
    assert_eq!(
        report.triggers_created,
        vec!["after_u_insert", "after_u_update", "after_u_delete"]
    );
}

#[test]
fn test_untracked_table_is_not_logged() {
    let (_dir, path) = temp_db_path();
    create_table(&path);
    let mut audited = AuditedHelper::new(SqliteProvider::new(&path), ["t"]).unwrap();
    audited.execute("create table other (v integer)", true).unwrap();
    audited.execute("insert into other values (1)", true).unwrap();
    let result = audited.query("select count(*) from audit_log").unwrap();
    assert_eq!(result.as_scalar(), Some(&CellValue::Integer(0)));
}

#[test]
fn test_normalization_through_sqlite() {
    let mut helper = SqlHelper::new(SqliteProvider::in_memory());
    helper.get_connection_and_cursor().unwrap();

    let result = helper.query("select 1 = 1").unwrap();
    assert_eq!(result, &QueryResult::Scalar(CellValue::Integer(1)));

    let result = helper.query("select 'andrew', ''").unwrap();
    assert_eq!(result, &QueryResult::Scalar(CellValue::from("andrew")));

    let result = helper.query("select 'andrew', 'x'").unwrap();
    assert!(matches!(result, QueryResult::Row(_)));

    let result = helper
        .query("select 1, 'a' union all select 2, 'b' union all select 3, 'c'")
        .unwrap();
    assert_eq!(result.row_count(), 3);
}

#[test]
fn test_records_are_sorted_by_column_name() {
    let mut helper = SqlHelper::new(SqliteProvider::in_memory());
    helper.get_connection_and_cursor().unwrap();
    helper
        .query("select 'a' as name, 1 as id union all select 'b', 2")
        .unwrap();
    let records = helper.to_records().unwrap();
    assert_eq!(records.len(), 2);
    let keys: Vec<_> = records[0].keys().cloned().collect();
    assert_eq!(keys, vec!["id", "name"]);
    assert_eq!(records[1]["id"], CellValue::Integer(2));
}

#[test]
fn test_query_before_connecting_fails_cleanly() {
    let mut helper = SqlHelper::new(SqliteProvider::in_memory());
    assert!(matches!(
        helper.query("select 1"),
        Err(DbError::NoCursorInitialized)
    ));
    assert!(matches!(helper.cursor_check(), Err(DbError::NoCursorInitialized)));
    assert!(matches!(
        helper.to_records(),
        Err(DbError::NoResultsToConvert)
    ));
}
