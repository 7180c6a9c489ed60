//! Tracking-enabled backend
//!
//! [`AuditedHelper`] wraps a [`SqlHelper`] and guarantees that its tables
//! carry audit triggers before the caller gets to run a single query.

use crate::audit::catalog::{Bindings, TemplateCatalog, TemplateRole};
use crate::audit::contract::{self, TrackedTableSet};
use crate::audit::provisioner::{ProvisionReport, TriggerProvisioner};
use crate::config::settings::DEFAULT_SCHEMA_NAME;
use crate::db::helper::SqlHelper;
use crate::db::provider::ConnectionProvider;
use crate::db::results::Record;
use crate::db::types::CellValue;
use crate::error::{ConfigError, Result};
use std::ops::{Deref, DerefMut};
use tracing::{debug, error};

/// A [`SqlHelper`] whose tracked tables have been provisioned
pub struct AuditedHelper {
    helper: SqlHelper,
    catalog: TemplateCatalog,
    tables: TrackedTableSet,
    schema_name: String,
    last_report: ProvisionReport,
}

/// Builder for [`AuditedHelper`]
pub struct AuditedHelperBuilder {
    helper: SqlHelper,
    catalog: Option<TemplateCatalog>,
    tables: TrackedTableSet,
    schema_name: String,
}

impl AuditedHelper {
    pub fn builder(helper: SqlHelper) -> AuditedHelperBuilder {
        AuditedHelperBuilder {
            helper,
            catalog: None,
            tables: TrackedTableSet::new(),
            schema_name: DEFAULT_SCHEMA_NAME.to_string(),
        }
    }

    /// Track `tables` with the built-in templates of the provider's dialect
    pub fn new<I, S>(provider: impl ConnectionProvider + 'static, tables: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder(SqlHelper::new(provider)).tables(tables).build()
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn tracked_tables(&self) -> &TrackedTableSet {
        &self.tables
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// Report of the most recent provisioning pass
    pub fn last_report(&self) -> &ProvisionReport {
        &self.last_report
    }

    /// Run provisioning again, reconnecting first if needed
    pub fn provision(&mut self) -> Result<&ProvisionReport> {
        if !self.helper.is_ready_for_query() {
            self.helper.get_connection_and_cursor()?;
        }
        let report = TriggerProvisioner::new(&self.catalog, &self.schema_name)
            .provision(&mut self.helper, &self.tables)?;
        self.last_report = report;
        Ok(&self.last_report)
    }

    /// Column names of `table`, in the order the catalog query returns them
    pub fn column_names(&mut self, table: &str) -> Result<Vec<String>> {
        let sql = self.catalog.render(
            TemplateRole::ColumnNamesQuery,
            &Bindings::new().schema_name(&self.schema_name).table(table),
        )?;
        let rows = self.helper.fetch_rows(&sql, false)?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get(0))
            .filter_map(CellValue::as_str)
            .map(str::to_string)
            .collect())
    }

    /// Name, table and definition of every trigger in the database
    ///
    /// # Errors
    /// `ContractError::MissingRequiredAttribute` when the catalog has no
    /// trigger listing query
    pub fn trigger_info(&mut self) -> Result<Vec<Record>> {
        let sql = self.catalog.render(
            TemplateRole::TriggerInfoQuery,
            &Bindings::new().schema_name(&self.schema_name),
        )?;
        if self.helper.query(&sql)?.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.helper.to_records()?)
    }

    pub fn into_inner(self) -> SqlHelper {
        self.helper
    }
}

impl Deref for AuditedHelper {
    type Target = SqlHelper;

    fn deref(&self) -> &SqlHelper {
        &self.helper
    }
}

impl DerefMut for AuditedHelper {
    fn deref_mut(&mut self) -> &mut SqlHelper {
        &mut self.helper
    }
}

impl AuditedHelperBuilder {
    /// Add one table to track
    pub fn track(mut self, table: impl Into<String>) -> Self {
        self.tables.insert(table);
        self
    }

    /// Add several tables to track
    pub fn tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables.extend(tables);
        self
    }

    /// Replace the built-in templates
    pub fn catalog(mut self, catalog: TemplateCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Schema holding the audit table and trigger functions (Postgres)
    pub fn schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = schema_name.into();
        self
    }

    /// Validate, connect if needed, then provision.
    ///
    /// # Errors
    /// Contract violations are reported before any connection is opened.
    /// `ConfigError::DialectMismatch` when the catalog targets another
    /// dialect than the helper's provider.
    pub fn build(self) -> Result<AuditedHelper> {
        let Self {
            mut helper,
            catalog,
            tables,
            schema_name,
        } = self;
        let dialect = helper.dialect();
        let catalog = catalog.unwrap_or_else(|| TemplateCatalog::for_dialect(dialect));

        {
            let _enter = helper.span().enter();
            if catalog.dialect() != dialect {
                let err = ConfigError::DialectMismatch {
                    catalog: catalog.dialect(),
                    backend: dialect,
                };
                error!("{}", err);
                return Err(err.into());
            }
            contract::validate(&catalog, &tables).map_err(|e| {
                error!("{}", e);
                e
            })?;
            debug!(tables = %tables, "template contract satisfied");
        }

        if !helper.is_ready_for_query() {
            helper.get_connection_and_cursor()?;
        }

        let mut audited = AuditedHelper {
            helper,
            catalog,
            tables,
            schema_name,
            last_report: ProvisionReport::default(),
        };
        audited.provision()?;
        Ok(audited)
    }
}
