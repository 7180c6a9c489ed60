//! SQLite templates
//!
//! Triggers carry inline bodies; row images are `json_object` calls built
//! from the table's columns.

use crate::audit::catalog::TemplateRole;

pub(super) static TEMPLATES: [(TemplateRole, &str); 8] = [
    (TemplateRole::AuditTableDdl, AUDIT_LOG_CREATE_TABLE),
    (TemplateRole::AuditTableExistsCheck, AUDIT_LOG_CREATED_CHECK),
    (TemplateRole::TriggerExistsCheck, HAS_TRIGGER_CHECK),
    (TemplateRole::ColumnNamesQuery, GET_COLUMN_NAMES),
    (TemplateRole::InsertTriggerDdl, INSERT_TRIGGER),
    (TemplateRole::UpdateTriggerDdl, UPDATE_TRIGGER),
    (TemplateRole::DeleteTriggerDdl, DELETE_TRIGGER),
    (TemplateRole::TriggerInfoQuery, GET_TRIGGER_INFO),
];

const AUDIT_LOG_CREATE_TABLE: &str = "\
CREATE TABLE audit_log
(
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    table_name   TEXT NOT NULL,
    operation    TEXT NOT NULL,
    old_row_data TEXT,
    new_row_data TEXT,
    change_time  TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);";

const AUDIT_LOG_CREATED_CHECK: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'audit_log';";

const HAS_TRIGGER_CHECK: &str = "\
SELECT name
FROM sqlite_master
WHERE type = 'trigger'
  AND tbl_name = '{table}' COLLATE NOCASE;";

const GET_COLUMN_NAMES: &str = "SELECT name AS columnName FROM pragma_table_info('{table}');";

const INSERT_TRIGGER: &str = "\
CREATE TRIGGER after_{table_name}_insert
AFTER INSERT ON {table_name}
BEGIN
    INSERT INTO audit_log (table_name, operation, old_row_data, new_row_data)
    VALUES ('{table_name}', 'INSERT', NULL, {new_row_json});
END;";

const UPDATE_TRIGGER: &str = "\
CREATE TRIGGER after_{table_name}_update
AFTER UPDATE ON {table_name}
BEGIN
    INSERT INTO audit_log (table_name, operation, old_row_data, new_row_data)
    VALUES ('{table_name}', 'UPDATE', {old_row_json}, {new_row_json});
END;";

const DELETE_TRIGGER: &str = "\
CREATE TRIGGER after_{table_name}_delete
AFTER DELETE ON {table_name}
BEGIN
    INSERT INTO audit_log (table_name, operation, old_row_data, new_row_data)
    VALUES ('{table_name}', 'DELETE', {old_row_json}, NULL);
END;";

const GET_TRIGGER_INFO: &str = "\
SELECT name     AS trigger_name,
       tbl_name AS table_name,
       sql      AS trigger_definition
FROM sqlite_master
WHERE type = 'trigger'
ORDER BY name;";
