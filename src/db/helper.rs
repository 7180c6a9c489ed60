//! Uniform query surface over any connection provider
//!
//! `SqlHelper` owns at most one live connection/cursor pair, runs arbitrary
//! SQL through it, and keeps the normalized result of the last statement.

use crate::db::provider::{Connection, ConnectionProvider, Cursor};
use crate::db::results::{self, QueryResult, Record};
use crate::db::types::{ColumnDef, Dialect, Row};
use crate::error::{DbError, DbResult};
use tracing::{Span, debug, error, info, warn};

/// Query helper bound to one backend
pub struct SqlHelper {
    provider: Box<dyn ConnectionProvider>,
    connection: Option<Box<dyn Connection>>,
    cursor: Option<Box<dyn Cursor>>,
    query_results: Option<QueryResult>,
    last_rows: Vec<Row>,
    span: Span,
}

impl SqlHelper {
    /// Create a helper that logs into its own `sqlhelpers` span
    pub fn new(provider: impl ConnectionProvider + 'static) -> Self {
        let span = tracing::info_span!("sqlhelpers", dialect = %provider.dialect());
        Self::with_span(provider, span)
    }

    /// Create a helper that logs into a caller-supplied span
    pub fn with_span(provider: impl ConnectionProvider + 'static, span: Span) -> Self {
        let helper = Self {
            provider: Box::new(provider),
            connection: None,
            cursor: None,
            query_results: None,
            last_rows: Vec::new(),
            span,
        };
        helper.span.in_scope(|| {
            info!(
                backend = %helper.provider.describe(),
                "initialized sqlhelpers v{}",
                env!("CARGO_PKG_VERSION")
            )
        });
        helper
    }

    pub fn dialect(&self) -> Dialect {
        self.provider.dialect()
    }

    /// The span every event of this helper is recorded in
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Open a connection and cursor, replacing any existing pair
    pub fn get_connection_and_cursor(&mut self) -> DbResult<()> {
        let span = self.span.clone();
        let _enter = span.enter();
        debug!("getting connection and cursor");
        if self.connection.is_some() {
            self.teardown();
        }
        let mut connection = self.provider.connect().map_err(log_error)?;
        let cursor = connection.cursor().map_err(log_error)?;
        self.connection = Some(connection);
        self.cursor = Some(cursor);
        debug!("fetched connection and cursor");
        Ok(())
    }

    /// Close the connection; the next `get_connection_and_cursor` reopens it
    pub fn close(&mut self) -> DbResult<()> {
        let _enter = self.span.enter();
        self.cursor = None;
        match self.connection.take() {
            Some(mut connection) => {
                connection.close().map_err(log_error)?;
                debug!("connection closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// True once a cursor exists and its connection is still open
    pub fn is_ready_for_query(&self) -> bool {
        self.cursor.is_some() && self.connection.as_ref().is_some_and(|c| c.is_open())
    }

    /// Fail with `NoCursorInitialized` unless a query can run
    pub fn cursor_check(&self) -> DbResult<()> {
        if self.cursor.is_none() {
            let _enter = self.span.enter();
            return Err(log_error(DbError::NoCursorInitialized));
        }
        if !self.connection.as_ref().is_some_and(|c| c.is_open()) {
            let _enter = self.span.enter();
            return Err(log_error(DbError::NoConnectionInitialized));
        }
        Ok(())
    }

    /// Run a read-only statement. Same as `execute(sql, false)`.
    pub fn query(&mut self, sql: &str) -> DbResult<&QueryResult> {
        self.execute(sql, false)
    }

    /// Run a statement, committing afterwards when `is_commit` is set.
    ///
    /// The normalized result replaces the stored one and is returned.
    pub fn execute(&mut self, sql: &str, is_commit: bool) -> DbResult<&QueryResult> {
        self.cursor_check()?;
        let span = self.span.clone();
        let _enter = span.enter();
        let rows = self.run(sql, is_commit).map_err(|e| {
            error!(sql, error = %e, "statement failed");
            e
        })?;

        if rows.is_empty() {
            if !is_commit {
                warn!("query returned no results");
            }
        } else {
            info!("{} item(s) returned.", rows.len());
        }
        if let Some(columns) = self.results_columns() {
            let described: Vec<String> = columns
                .iter()
                .map(|c| format!("{} {}", c.name, c.data_type))
                .collect();
            debug!(columns = %described.join(", "), "result columns");
        }

        self.last_rows = rows.clone();
        Ok(self.query_results.insert(QueryResult::normalize(rows)))
    }

    fn run(&mut self, sql: &str, is_commit: bool) -> DbResult<Vec<Row>> {
        let cursor = self.cursor.as_mut().ok_or(DbError::NoCursorInitialized)?;
        cursor.execute(sql)?;
        if is_commit {
            let connection = self
                .connection
                .as_mut()
                .ok_or(DbError::NoConnectionInitialized)?;
            info!("committing changes");
            connection.commit()?;
        }
        cursor.fetch_all()
    }

    /// Run a statement and hand back its raw, uncollapsed rows
    pub fn fetch_rows(&mut self, sql: &str, is_commit: bool) -> DbResult<Vec<Row>> {
        self.execute(sql, is_commit)?;
        Ok(self.last_rows.clone())
    }

    /// Normalized result of the last statement
    pub fn query_results(&self) -> Option<&QueryResult> {
        self.query_results.as_ref()
    }

    /// Column metadata of the last statement
    pub fn results_columns(&self) -> Option<&[ColumnDef]> {
        self.cursor.as_ref().and_then(|c| c.description())
    }

    /// Column names of the last statement
    pub fn results_column_names(&self) -> Option<Vec<String>> {
        self.results_columns()
            .map(|cols| cols.iter().map(|c| c.name.clone()).collect())
    }

    /// Rows of the last statement keyed by column name
    pub fn to_records(&self) -> DbResult<Vec<Record>> {
        results::to_records(self.results_columns(), &self.last_rows).map_err(|e| {
            let _enter = self.span.enter();
            log_error(e)
        })
    }

    fn teardown(&mut self) {
        self.cursor = None;
        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.close() {
                warn!(error = %e, "failed to close previous connection");
            }
        }
    }
}

impl Drop for SqlHelper {
    fn drop(&mut self) {
        let span = self.span.clone();
        let _enter = span.enter();
        self.teardown();
    }
}

fn log_error(e: DbError) -> DbError {
    error!("{}", e);
    e
}
