//! Built-in template sets
//!
//! One module per dialect. Each exposes `TEMPLATES`, a role-to-SQL table
//! covering every required role of its dialect plus the trigger listing.

mod postgres;
mod sqlite;
mod sqlserver;

use crate::audit::catalog::TemplateRole;
use crate::db::types::Dialect;

/// Name of the audit table every dialect creates
pub const AUDIT_TABLE: &str = "audit_log";

pub(crate) fn builtin(dialect: Dialect) -> &'static [(TemplateRole, &'static str)] {
    match dialect {
        Dialect::Postgres => &postgres::TEMPLATES,
        Dialect::SqlServer => &sqlserver::TEMPLATES,
        Dialect::Sqlite => &sqlite::TEMPLATES,
    }
}
