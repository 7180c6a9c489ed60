//! Trigger provisioning
//!
//! Makes the audit table, the Postgres trigger functions and the
//! per-operation triggers exist for every tracked table. Each object is
//! checked before it is created, so provisioning can be re-run safely after
//! a partial failure.

use crate::audit::catalog::{Bindings, Operation, TemplateCatalog, TemplateRole, placeholder};
use crate::audit::contract::TrackedTableSet;
use crate::db::helper::SqlHelper;
use crate::db::types::{CellValue, Dialect, Row};
use crate::error::{DbError, DbResult, Result};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, error, info};

/// What a provisioning pass created and what it found in place
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub audit_table_created: bool,
    /// Trigger functions created (Postgres only)
    pub functions_created: Vec<String>,
    pub triggers_created: Vec<String>,
    /// Tables whose triggers all existed already
    pub triggers_present: Vec<String>,
}

impl ProvisionReport {
    /// True when the pass issued no DDL at all
    pub fn is_noop(&self) -> bool {
        !self.audit_table_created
            && self.functions_created.is_empty()
            && self.triggers_created.is_empty()
    }
}

/// Runs the check-then-create sequence against one catalog
pub struct TriggerProvisioner<'a> {
    catalog: &'a TemplateCatalog,
    schema_name: &'a str,
}

impl<'a> TriggerProvisioner<'a> {
    pub fn new(catalog: &'a TemplateCatalog, schema_name: &'a str) -> Self {
        Self {
            catalog,
            schema_name,
        }
    }

    /// Provision audit infrastructure for every table in `tables`.
    ///
    /// Existence checks run as plain queries; every DDL statement is
    /// committed.
    ///
    /// # Errors
    /// Any failing statement aborts the pass with
    /// `DbError::ProvisioningFailed` carrying the statement text. A catalog
    /// role that cannot be rendered surfaces as a contract error.
    pub fn provision(&self, helper: &mut SqlHelper, tables: &TrackedTableSet) -> Result<ProvisionReport> {
        let span = helper.span().clone();
        let _enter = span.enter();
        info!(tables = %tables, "provisioning audit infrastructure");

        let mut report = ProvisionReport {
            audit_table_created: self.ensure_audit_table(helper)?,
            ..Default::default()
        };

        if self.catalog.dialect().uses_trigger_functions() {
            report.functions_created = self.ensure_functions(helper)?;
        }

        for table in tables.iter() {
            let created = self.ensure_triggers(helper, table)?;
            if created.is_empty() {
                report.triggers_present.push(table.to_string());
            } else {
                report.triggers_created.extend(created);
            }
        }

        info!(
            audit_table_created = report.audit_table_created,
            functions_created = report.functions_created.len(),
            triggers_created = report.triggers_created.len(),
            "provisioning finished"
        );
        Ok(report)
    }

    fn base_bindings(&self) -> Bindings<'_> {
        Bindings::new().schema_name(self.schema_name)
    }

    fn ensure_audit_table(&self, helper: &mut SqlHelper) -> Result<bool> {
        let check = self
            .catalog
            .render(TemplateRole::AuditTableExistsCheck, &self.base_bindings())?;
        if !check_rows(helper, &check)?.is_empty() {
            debug!("audit table already exists");
            return Ok(false);
        }

        let ddl = self
            .catalog
            .render(TemplateRole::AuditTableDdl, &self.base_bindings())?;
        apply(helper, &ddl)?;
        info!("created audit table");
        Ok(true)
    }

    fn ensure_functions(&self, helper: &mut SqlHelper) -> Result<Vec<String>> {
        let mut created = Vec::new();
        for op in Operation::ALL {
            let name = op.function_name();
            let bindings = self.base_bindings().function_name(name.clone());

            let check = self
                .catalog
                .render(TemplateRole::FunctionExistsCheck, &bindings)?;
            if !check_rows(helper, &check)?.is_empty() {
                debug!(function = %name, "trigger function already exists");
                continue;
            }

            let ddl = self.catalog.render(op.function_role(), &bindings)?;
            apply(helper, &ddl)?;
            info!(function = %name, "created trigger function");
            created.push(name);
        }
        Ok(created)
    }

    /// Create whichever of the table's three triggers are missing
    fn ensure_triggers(&self, helper: &mut SqlHelper, table: &str) -> Result<Vec<String>> {
        let check = self.catalog.render(
            TemplateRole::TriggerExistsCheck,
            &self.base_bindings().table(table),
        )?;
        // Unquoted identifiers are case-insensitive in every dialect.
        let existing: HashSet<String> = first_column(&check_rows(helper, &check)?)
            .map(str::to_lowercase)
            .collect();

        let missing: Vec<Operation> = Operation::ALL
            .into_iter()
            .filter(|op| !existing.contains(&op.trigger_name(table).to_lowercase()))
            .collect();
        if missing.is_empty() {
            info!(table, "audit triggers already present, skipping");
            return Ok(Vec::new());
        }

        let needs_images = missing.iter().any(|op| {
            let role = op.trigger_role();
            self.catalog.uses_placeholder(role, placeholder::OLD_ROW_JSON)
                || self.catalog.uses_placeholder(role, placeholder::NEW_ROW_JSON)
        });
        let (old_image, new_image) = if needs_images {
            let columns = self.column_names(helper, table)?;
            let dialect = self.catalog.dialect();
            (
                row_image(dialect, "OLD", &columns),
                row_image(dialect, "NEW", &columns),
            )
        } else {
            (String::new(), String::new())
        };

        let mut created = Vec::with_capacity(missing.len());
        for op in missing {
            let bindings = self
                .base_bindings()
                .table(table)
                .function_name(op.function_name())
                .old_row_json(old_image.as_str())
                .new_row_json(new_image.as_str());
            let ddl = self.catalog.render(op.trigger_role(), &bindings)?;
            apply(helper, &ddl)?;
            let name = op.trigger_name(table);
            info!(trigger = %name, "created audit trigger");
            created.push(name);
        }
        Ok(created)
    }

    fn column_names(&self, helper: &mut SqlHelper, table: &str) -> Result<Vec<String>> {
        let sql = self.catalog.render(
            TemplateRole::ColumnNamesQuery,
            &self.base_bindings().table(table),
        )?;
        Ok(first_column(&check_rows(helper, &sql)?)
            .map(str::to_string)
            .collect())
    }
}

/// Build the expression serializing one row as a JSON object.
///
/// `alias` names the row inside the trigger body (`OLD` / `NEW`).
pub fn row_image(dialect: Dialect, alias: &str, columns: &[String]) -> String {
    let pairs: Vec<String> = columns
        .iter()
        .map(|col| match dialect {
            Dialect::Sqlite | Dialect::Postgres => format!("'{}', {}.\"{}\"", col, alias, col),
            Dialect::SqlServer => format!("'{}': {}.[{}]", col, alias, col),
        })
        .collect();
    let function = match dialect {
        Dialect::Sqlite => "json_object",
        Dialect::Postgres => "json_build_object",
        Dialect::SqlServer => "JSON_OBJECT",
    };
    format!("{}({})", function, pairs.join(", "))
}

fn first_column(rows: &[Row]) -> impl Iterator<Item = &str> {
    rows.iter()
        .filter_map(|row| row.get(0))
        .filter_map(CellValue::as_str)
}

fn check_rows(helper: &mut SqlHelper, sql: &str) -> DbResult<Vec<Row>> {
    helper
        .fetch_rows(sql, false)
        .map_err(|e| provisioning_failed(sql, e))
}

fn apply(helper: &mut SqlHelper, sql: &str) -> DbResult<()> {
    helper
        .execute(sql, true)
        .map(|_| ())
        .map_err(|e| provisioning_failed(sql, e))
}

fn provisioning_failed(sql: &str, source: DbError) -> DbError {
    let err = DbError::ProvisioningFailed {
        statement: sql.trim().to_string(),
        source: Box::new(source),
    };
    error!("{}", err);
    err
}
