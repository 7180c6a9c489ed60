//! Connection provider boundary
//!
//! Defines the interface every backend adapter implements. A provider opens
//! connections; a connection hands out cursors and commits; a cursor runs
//! statements and buffers their rows and column metadata.
//!
//! All calls block the current thread. Connections and cursors are not
//! `Send`: one helper instance owns exactly one live pair.

use crate::db::types::{ColumnDef, Dialect, Row};
use crate::error::{DbError, DbResult};
use std::cell::RefCell;
use std::rc::Rc;

/// Opens live connections for one dialect
pub trait ConnectionProvider {
    /// The SQL dialect spoken by connections from this provider
    fn dialect(&self) -> Dialect;

    /// Establish a new connection
    ///
    /// # Errors
    /// Returns `DbError::ConnectionFailed` if the connection cannot be established
    fn connect(&self) -> DbResult<Box<dyn Connection>>;

    /// Human-readable target description. Must never contain credentials.
    fn describe(&self) -> String;
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for Box<P> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn connect(&self) -> DbResult<Box<dyn Connection>> {
        (**self).connect()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// A live database connection
pub trait Connection {
    /// Create a cursor bound to this connection
    ///
    /// # Errors
    /// Returns `DbError::NoConnectionInitialized` if the connection was closed
    fn cursor(&mut self) -> DbResult<Box<dyn Cursor>>;

    /// Commit pending work
    fn commit(&mut self) -> DbResult<()>;

    /// Close the connection. Cursors created from it stop working.
    fn close(&mut self) -> DbResult<()>;

    fn is_open(&self) -> bool;
}

/// Executes statements on a connection
pub trait Cursor {
    /// Run one statement, buffering its rows and column metadata
    ///
    /// # Errors
    /// Returns `DbError::QueryFailed` if the driver rejects the statement,
    /// `DbError::NoConnectionInitialized` if the connection is gone
    fn execute(&mut self, sql: &str) -> DbResult<()>;

    /// Drain the rows buffered by the last `execute`
    fn fetch_all(&mut self) -> DbResult<Vec<Row>>;

    /// Column metadata of the last statement, `None` if it produced no columns
    fn description(&self) -> Option<&[ColumnDef]>;
}

/// Everything one statement produced
#[derive(Debug, Clone, Default)]
pub struct StatementOutput {
    pub columns: Option<Vec<ColumnDef>>,
    pub rows: Vec<Row>,
}

/// Driver-specific state behind the generic connection/cursor pair
pub(crate) trait Session: 'static {
    fn run(&mut self, sql: &str) -> DbResult<StatementOutput>;
    fn commit(&mut self) -> DbResult<()>;
    fn close(self) -> DbResult<()>;
}

type Shared<S> = Rc<RefCell<Option<S>>>;

fn with_session<S, T>(shared: &Shared<S>, f: impl FnOnce(&mut S) -> DbResult<T>) -> DbResult<T> {
    let mut guard = shared.borrow_mut();
    let session = guard.as_mut().ok_or(DbError::NoConnectionInitialized)?;
    f(session)
}

/// Connection over a driver session; cursors share the session
pub(crate) struct SessionConnection<S> {
    shared: Shared<S>,
}

impl<S: Session> SessionConnection<S> {
    pub(crate) fn new(session: S) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Some(session))),
        }
    }
}

impl<S: Session> Connection for SessionConnection<S> {
    fn cursor(&mut self) -> DbResult<Box<dyn Cursor>> {
        if !self.is_open() {
            return Err(DbError::NoConnectionInitialized);
        }
        Ok(Box::new(SessionCursor {
            shared: Rc::clone(&self.shared),
            columns: None,
            rows: Vec::new(),
        }))
    }

    fn commit(&mut self) -> DbResult<()> {
        with_session(&self.shared, |s| s.commit())
    }

    fn close(&mut self) -> DbResult<()> {
        let session = self.shared.borrow_mut().take();
        match session {
            Some(s) => s.close(),
            None => Ok(()),
        }
    }

    fn is_open(&self) -> bool {
        self.shared.borrow().is_some()
    }
}

struct SessionCursor<S> {
    shared: Shared<S>,
    columns: Option<Vec<ColumnDef>>,
    rows: Vec<Row>,
}

impl<S: Session> Cursor for SessionCursor<S> {
    fn execute(&mut self, sql: &str) -> DbResult<()> {
        let output = with_session(&self.shared, |s| s.run(sql))?;
        self.columns = output.columns;
        self.rows = output.rows;
        Ok(())
    }

    fn fetch_all(&mut self) -> DbResult<Vec<Row>> {
        if self.shared.borrow().is_none() {
            return Err(DbError::NoConnectionInitialized);
        }
        Ok(std::mem::take(&mut self.rows))
    }

    fn description(&self) -> Option<&[ColumnDef]> {
        self.columns.as_deref()
    }
}
