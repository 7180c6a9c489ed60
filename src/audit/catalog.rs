//! Template catalog
//!
//! Every statement the provisioner issues comes from a per-dialect catalog
//! of SQL text keyed by [`TemplateRole`]. Templates carry named
//! placeholders that are filled by plain text replacement, so every bound
//! value must come from trusted configuration.

use crate::audit::contract::NOT_IMPLEMENTED;
use crate::audit::templates;
use crate::db::types::Dialect;
use crate::error::{ContractError, ContractResult};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder names understood by [`TemplateCatalog::render`]
pub mod placeholder {
    pub const TABLE: &str = "{table}";
    pub const TABLE_NAME: &str = "{table_name}";
    pub const FUNCTION_NAME: &str = "{function_name}";
    pub const SCHEMA_NAME: &str = "{schema_name}";
    pub const OLD_ROW_JSON: &str = "{old_row_json}";
    pub const NEW_ROW_JSON: &str = "{new_row_json}";
}

/// A named slot in a dialect's template catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateRole {
    AuditTableDdl,
    AuditTableExistsCheck,
    TriggerExistsCheck,
    ColumnNamesQuery,
    InsertTriggerDdl,
    UpdateTriggerDdl,
    DeleteTriggerDdl,
    InsertFunctionDdl,
    UpdateFunctionDdl,
    DeleteFunctionDdl,
    FunctionExistsCheck,
    /// Lists every trigger with its table and definition. Optional.
    TriggerInfoQuery,
}

impl TemplateRole {
    pub const ALL: [TemplateRole; 12] = [
        TemplateRole::AuditTableDdl,
        TemplateRole::AuditTableExistsCheck,
        TemplateRole::TriggerExistsCheck,
        TemplateRole::ColumnNamesQuery,
        TemplateRole::InsertTriggerDdl,
        TemplateRole::UpdateTriggerDdl,
        TemplateRole::DeleteTriggerDdl,
        TemplateRole::InsertFunctionDdl,
        TemplateRole::UpdateFunctionDdl,
        TemplateRole::DeleteFunctionDdl,
        TemplateRole::FunctionExistsCheck,
        TemplateRole::TriggerInfoQuery,
    ];

    /// The attribute name used in error messages and configuration
    pub fn attribute_name(&self) -> &'static str {
        match self {
            TemplateRole::AuditTableDdl => "AUDIT_LOG_CREATE_TABLE",
            TemplateRole::AuditTableExistsCheck => "AUDIT_LOG_CREATED_CHECK",
            TemplateRole::TriggerExistsCheck => "HAS_TRIGGER_CHECK",
            TemplateRole::ColumnNamesQuery => "GET_COLUMN_NAMES",
            TemplateRole::InsertTriggerDdl => "INSERT_TRIGGER",
            TemplateRole::UpdateTriggerDdl => "UPDATE_TRIGGER",
            TemplateRole::DeleteTriggerDdl => "DELETE_TRIGGER",
            TemplateRole::InsertFunctionDdl => "LOG_AFTER_INSERT_FUNC",
            TemplateRole::UpdateFunctionDdl => "LOG_AFTER_UPDATE_FUNC",
            TemplateRole::DeleteFunctionDdl => "LOG_AFTER_DELETE_FUNC",
            TemplateRole::FunctionExistsCheck => "FUNCTION_EXISTS_CHECK",
            TemplateRole::TriggerInfoQuery => "GET_TRIGGER_INFO",
        }
    }

    pub fn from_attribute_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.attribute_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for TemplateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute_name())
    }
}

/// Row-level operations that get an audit trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Insert, Operation::Update, Operation::Delete];

    /// Value written to `audit_log.operation`
    pub fn keyword(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }

    pub fn trigger_role(&self) -> TemplateRole {
        match self {
            Operation::Insert => TemplateRole::InsertTriggerDdl,
            Operation::Update => TemplateRole::UpdateTriggerDdl,
            Operation::Delete => TemplateRole::DeleteTriggerDdl,
        }
    }

    pub fn function_role(&self) -> TemplateRole {
        match self {
            Operation::Insert => TemplateRole::InsertFunctionDdl,
            Operation::Update => TemplateRole::UpdateFunctionDdl,
            Operation::Delete => TemplateRole::DeleteFunctionDdl,
        }
    }

    /// Trigger function name: the function role's attribute name without
    /// its `_FUNC` suffix, lower-cased (`log_after_insert`)
    pub fn function_name(&self) -> String {
        let attr = self.function_role().attribute_name();
        attr.strip_suffix("_FUNC").unwrap_or(attr).to_ascii_lowercase()
    }

    /// Name of the trigger installed on `table` for this operation
    pub fn trigger_name(&self, table: &str) -> String {
        format!("after_{}_{}", table, self.keyword().to_ascii_lowercase())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

const BASE_ROLES: [TemplateRole; 7] = [
    TemplateRole::AuditTableDdl,
    TemplateRole::AuditTableExistsCheck,
    TemplateRole::TriggerExistsCheck,
    TemplateRole::ColumnNamesQuery,
    TemplateRole::InsertTriggerDdl,
    TemplateRole::UpdateTriggerDdl,
    TemplateRole::DeleteTriggerDdl,
];

const POSTGRES_ROLES: [TemplateRole; 11] = [
    TemplateRole::AuditTableDdl,
    TemplateRole::AuditTableExistsCheck,
    TemplateRole::TriggerExistsCheck,
    TemplateRole::ColumnNamesQuery,
    TemplateRole::InsertTriggerDdl,
    TemplateRole::UpdateTriggerDdl,
    TemplateRole::DeleteTriggerDdl,
    TemplateRole::InsertFunctionDdl,
    TemplateRole::UpdateFunctionDdl,
    TemplateRole::DeleteFunctionDdl,
    TemplateRole::FunctionExistsCheck,
];

impl Dialect {
    /// Roles the provisioning algorithm needs for this dialect
    pub fn required_roles(&self) -> &'static [TemplateRole] {
        match self {
            Dialect::Postgres => &POSTGRES_ROLES,
            Dialect::SqlServer | Dialect::Sqlite => &BASE_ROLES,
        }
    }

    /// Whether triggers attach a stored function rather than an inline body
    pub fn uses_trigger_functions(&self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

/// Values substituted into a template
#[derive(Debug, Clone, Default)]
pub struct Bindings<'a> {
    values: Vec<(&'static str, Cow<'a, str>)>,
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(mut self, key: &'static str, value: impl Into<Cow<'a, str>>) -> Self {
        self.values.retain(|(k, _)| *k != key);
        self.values.push((key, value.into()));
        self
    }

    /// Binds both `{table}` and `{table_name}`
    pub fn table(self, table: &'a str) -> Self {
        self.bind(placeholder::TABLE, table)
            .bind(placeholder::TABLE_NAME, table)
    }

    pub fn function_name(self, name: impl Into<Cow<'a, str>>) -> Self {
        self.bind(placeholder::FUNCTION_NAME, name)
    }

    pub fn schema_name(self, schema: &'a str) -> Self {
        self.bind(placeholder::SCHEMA_NAME, schema)
    }

    pub fn old_row_json(self, image: impl Into<Cow<'a, str>>) -> Self {
        self.bind(placeholder::OLD_ROW_JSON, image)
    }

    pub fn new_row_json(self, image: impl Into<Cow<'a, str>>) -> Self {
        self.bind(placeholder::NEW_ROW_JSON, image)
    }

    fn apply(&self, template: &str) -> String {
        self.values
            .iter()
            .fold(template.to_string(), |sql, (key, value)| {
                sql.replace(key, value)
            })
    }
}

/// Per-dialect mapping from template role to SQL text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateCatalog {
    dialect: Dialect,
    templates: BTreeMap<TemplateRole, String>,
}

impl TemplateCatalog {
    /// The built-in template set for a dialect
    pub fn for_dialect(dialect: Dialect) -> Self {
        let templates = templates::builtin(dialect)
            .iter()
            .map(|(role, sql)| (*role, sql.to_string()))
            .collect();
        Self { dialect, templates }
    }

    /// A catalog with no templates, to be filled with `with_template`
    pub fn empty(dialect: Dialect) -> Self {
        Self {
            dialect,
            templates: BTreeMap::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Set or replace the template for a role
    pub fn with_template(mut self, role: TemplateRole, sql: impl Into<String>) -> Self {
        self.templates.insert(role, sql.into());
        self
    }

    /// Remove the template for a role
    pub fn without(mut self, role: TemplateRole) -> Self {
        self.templates.remove(&role);
        self
    }

    pub fn get(&self, role: TemplateRole) -> Option<&str> {
        self.templates.get(&role).map(String::as_str)
    }

    /// Present, non-blank, and not the placeholder value
    pub fn is_usable(&self, role: TemplateRole) -> bool {
        self.get(role)
            .map(str::trim)
            .is_some_and(|sql| !sql.is_empty() && sql != NOT_IMPLEMENTED)
    }

    /// Required roles of this catalog's dialect that are not usable
    pub fn missing_roles(&self) -> Vec<TemplateRole> {
        self.dialect
            .required_roles()
            .iter()
            .copied()
            .filter(|role| !self.is_usable(*role))
            .collect()
    }

    pub fn uses_placeholder(&self, role: TemplateRole, placeholder: &str) -> bool {
        self.get(role).is_some_and(|sql| sql.contains(placeholder))
    }

    /// Fill a role's placeholders. Unbound placeholders are left as written.
    ///
    /// # Errors
    /// Returns `ContractError::MissingRequiredAttribute` naming the role if
    /// it is not usable
    pub fn render(&self, role: TemplateRole, bindings: &Bindings<'_>) -> ContractResult<String> {
        if !self.is_usable(role) {
            return Err(ContractError::MissingRequiredAttribute {
                dialect: self.dialect,
                missing: vec![role],
            });
        }
        Ok(bindings.apply(self.get(role).unwrap_or_default()))
    }
}
