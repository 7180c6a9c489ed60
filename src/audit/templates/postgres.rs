//! PostgreSQL templates
//!
//! Triggers attach a stored plpgsql function per operation, so the
//! function DDL and an existence check for it are part of the set. The
//! functions serialize rows with `row_to_json` and need no row images.

use crate::audit::catalog::TemplateRole;

pub(super) static TEMPLATES: [(TemplateRole, &str); 12] = [
    (TemplateRole::AuditTableDdl, AUDIT_LOG_CREATE_TABLE),
    (TemplateRole::AuditTableExistsCheck, AUDIT_LOG_CREATED_CHECK),
    (TemplateRole::TriggerExistsCheck, HAS_TRIGGER_CHECK),
    (TemplateRole::ColumnNamesQuery, GET_COLUMN_NAMES),
    (TemplateRole::InsertTriggerDdl, INSERT_TRIGGER),
    (TemplateRole::UpdateTriggerDdl, UPDATE_TRIGGER),
    (TemplateRole::DeleteTriggerDdl, DELETE_TRIGGER),
    (TemplateRole::InsertFunctionDdl, LOG_AFTER_INSERT_FUNC),
    (TemplateRole::UpdateFunctionDdl, LOG_AFTER_UPDATE_FUNC),
    (TemplateRole::DeleteFunctionDdl, LOG_AFTER_DELETE_FUNC),
    (TemplateRole::FunctionExistsCheck, FUNCTION_EXISTS_CHECK),
    (TemplateRole::TriggerInfoQuery, GET_TRIGGER_INFO),
];

const AUDIT_LOG_CREATE_TABLE: &str = "\
CREATE TABLE {schema_name}.audit_log (
    id SERIAL PRIMARY KEY,
    table_name TEXT NOT NULL,
    operation TEXT NOT NULL,
    old_row_data JSONB,
    new_row_data JSONB,
    change_time TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);";

const AUDIT_LOG_CREATED_CHECK: &str = "\
SELECT tablename
FROM pg_tables
WHERE schemaname = '{schema_name}'
  AND tablename = 'audit_log';";

// to_regclass resolves the name exactly as the unquoted trigger DDL does.
const HAS_TRIGGER_CHECK: &str = "\
SELECT t.tgname::text AS trigger_name
FROM pg_trigger t
WHERE t.tgrelid = to_regclass('{table}')
  AND NOT t.tgisinternal;";

const GET_COLUMN_NAMES: &str = "\
SELECT a.attname::text AS columnName
FROM pg_attribute a
WHERE a.attrelid = to_regclass('{table}')
  AND a.attnum > 0
  AND NOT a.attisdropped
ORDER BY a.attnum;";

const FUNCTION_EXISTS_CHECK: &str = "\
SELECT p.proname::text
FROM pg_proc p
JOIN pg_namespace n ON n.oid = p.pronamespace
WHERE p.proname = '{function_name}'
  AND n.nspname = '{schema_name}';";

const LOG_AFTER_INSERT_FUNC: &str = "\
CREATE OR REPLACE FUNCTION {schema_name}.{function_name}() RETURNS TRIGGER AS $$
BEGIN
    INSERT INTO {schema_name}.audit_log (table_name, operation, old_row_data, new_row_data)
    VALUES (TG_TABLE_NAME, 'INSERT', NULL, row_to_json(NEW)::jsonb);
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;";

const LOG_AFTER_UPDATE_FUNC: &str = "\
CREATE OR REPLACE FUNCTION {schema_name}.{function_name}() RETURNS TRIGGER AS $$
BEGIN
    INSERT INTO {schema_name}.audit_log (table_name, operation, old_row_data, new_row_data)
    VALUES (TG_TABLE_NAME, 'UPDATE', row_to_json(OLD)::jsonb, row_to_json(NEW)::jsonb);
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;";

const LOG_AFTER_DELETE_FUNC: &str = "\
CREATE OR REPLACE FUNCTION {schema_name}.{function_name}() RETURNS TRIGGER AS $$
BEGIN
    INSERT INTO {schema_name}.audit_log (table_name, operation, old_row_data, new_row_data)
    VALUES (TG_TABLE_NAME, 'DELETE', row_to_json(OLD)::jsonb, NULL);
    RETURN OLD;
END;
$$ LANGUAGE plpgsql;";

const INSERT_TRIGGER: &str = "\
CREATE TRIGGER after_{table_name}_insert
AFTER INSERT ON {table_name}
FOR EACH ROW EXECUTE FUNCTION {schema_name}.{function_name}();";

const UPDATE_TRIGGER: &str = "\
CREATE TRIGGER after_{table_name}_update
AFTER UPDATE ON {table_name}
FOR EACH ROW EXECUTE FUNCTION {schema_name}.{function_name}();";

const DELETE_TRIGGER: &str = "\
CREATE TRIGGER after_{table_name}_delete
AFTER DELETE ON {table_name}
FOR EACH ROW EXECUTE FUNCTION {schema_name}.{function_name}();";

const GET_TRIGGER_INFO: &str = "\
SELECT t.tgname::text AS trigger_name,
       c.relname::text AS table_name,
       pg_get_triggerdef(t.oid) AS trigger_definition
FROM pg_trigger t
JOIN pg_class c ON c.oid = t.tgrelid
WHERE NOT t.tgisinternal
ORDER BY t.tgname;";
