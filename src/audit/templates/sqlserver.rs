//! SQL Server templates
//!
//! Trigger bodies read the `inserted` / `deleted` pseudo-tables. Inserts
//! and deletes log one row per affected row through a `JSON_OBJECT` row
//! image; updates log the statement's before and after sets as JSON arrays
//! since the two pseudo-tables cannot be paired without a key.

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
CREATE TABLE audit_log (
    id INT IDENTITY(1,1) PRIMARY KEY,
    table_name NVARCHAR(128) NOT NULL,
    operation NVARCHAR(10) NOT NULL,
    old_row_data NVARCHAR(MAX),
    new_row_data NVARCHAR(MAX),
    change_time DATETIME2 DEFAULT CURRENT_TIMESTAMP
);";

const AUDIT_LOG_CREATED_CHECK: &str =
    "SELECT name FROM sys.tables WHERE name = 'audit_log';";

const HAS_TRIGGER_CHECK: &str = "\
SELECT tr.name
FROM sys.triggers tr
JOIN sys.tables t ON t.object_id = tr.parent_id
WHERE t.name = '{table}';";

const GET_COLUMN_NAMES: &str = "\
SELECT COLUMN_NAME AS columnName
FROM INFORMATION_SCHEMA.COLUMNS
WHERE TABLE_NAME = '{table}'
ORDER BY ORDINAL_POSITION;";

const INSERT_TRIGGER: &str = "\
CREATE TRIGGER after_{table_name}_insert
ON {table_name}
AFTER INSERT
AS
BEGIN
    SET NOCOUNT ON;
    INSERT INTO audit_log (table_name, operation, old_row_data, new_row_data)
    SELECT '{table_name}', 'INSERT', NULL, {new_row_json}
    FROM inserted AS NEW;
END;";

const UPDATE_TRIGGER: &str = "\
CREATE TRIGGER after_{table_name}_update
ON {table_name}
AFTER UPDATE
AS
BEGIN
    SET NOCOUNT ON;
    INSERT INTO audit_log (table_name, operation, old_row_data, new_row_data)
    VALUES (
        '{table_name}',
        'UPDATE',
        (SELECT * FROM deleted FOR JSON PATH),
        (SELECT * FROM inserted FOR JSON PATH)
    );
END;";

const DELETE_TRIGGER: &str = "\
CREATE TRIGGER after_{table_name}_delete
ON {table_name}
AFTER DELETE
AS
BEGIN
    SET NOCOUNT ON;
    INSERT INTO audit_log (table_name, operation, old_row_data, new_row_data)
    SELECT '{table_name}', 'DELETE', {old_row_json}, NULL
    FROM deleted AS OLD;
END;";

const GET_TRIGGER_INFO: &str = "\
SELECT tr.name AS trigger_name,
       OBJECT_NAME(tr.parent_id) AS table_name,
       OBJECT_DEFINITION(tr.object_id) AS trigger_definition
FROM sys.triggers tr
ORDER BY tr.name;";
