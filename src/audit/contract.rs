//! Construction-time capability contract
//!
//! A tracking-enabled backend may only be built when its catalog fills
//! every role its dialect needs and at least one real table is nominated.

use crate::audit::catalog::TemplateCatalog;
use crate::error::{ContractError, ContractResult};
use std::fmt;

/// Placeholder value marking a template that was declared but not written
pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";

/// Table name that stands for "nothing to track"
pub const IGNORE_TABLE: &str = "_MAGIC_IGNORE_STRING_";

/// Ordered, de-duplicated set of tables nominated for auditing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedTableSet {
    tables: Vec<String>,
}

impl TrackedTableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table. Returns false if it was already present.
    pub fn insert(&mut self, table: impl Into<String>) -> bool {
        let table = table.into();
        if self.tables.contains(&table) {
            return false;
        }
        self.tables.push(table);
        true
    }

    /// Tables to provision, in nomination order, without the ignore sentinel
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tables
            .iter()
            .map(String::as_str)
            .filter(|t| *t != IGNORE_TABLE && !t.trim().is_empty())
    }

    /// Number of tables that would be provisioned
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<S: Into<String>> FromIterator<S> for TrackedTableSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for table in iter {
            set.insert(table);
        }
        set
    }
}

impl<S: Into<String>> Extend<S> for TrackedTableSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for table in iter {
            self.insert(table);
        }
    }
}

impl fmt::Display for TrackedTableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iter().collect::<Vec<_>>().join(", "))
    }
}

/// Check a catalog and table set before a tracking-enabled backend exists.
///
/// # Errors
/// `ContractError::MissingRequiredAttribute` listing every required role
/// that is absent, blank or `NOT_IMPLEMENTED`; otherwise
/// `ContractError::NoTrackedTables` when only the sentinel (or nothing) was
/// nominated.
pub fn validate(catalog: &TemplateCatalog, tables: &TrackedTableSet) -> ContractResult<()> {
    let missing = catalog.missing_roles();
    if !missing.is_empty() {
        return Err(ContractError::MissingRequiredAttribute {
            dialect: catalog.dialect(),
            missing,
        });
    }
    if tables.is_empty() {
        return Err(ContractError::NoTrackedTables);
    }
    Ok(())
}
