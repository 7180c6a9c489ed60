//! SQLite database provider
//!
//! Concrete implementation using rusqlite. Statements run in autocommit
//! mode; foreign key enforcement is switched on for every connection.

use crate::db::provider::{Connection, ConnectionProvider, Session, SessionConnection, StatementOutput};
use crate::db::types::{CellValue, ColumnDef, DataType, Dialect, Row};
use crate::error::{DbError, DbResult};
use rusqlite::types::ValueRef;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MEMORY_PATH: &str = ":memory:";

/// Opens connections to one SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteProvider {
    db_file_path: PathBuf,
}

impl SqliteProvider {
    pub fn new(db_file_path: impl Into<PathBuf>) -> Self {
        Self {
            db_file_path: db_file_path.into(),
        }
    }

    /// A private in-memory database. Every new connection starts empty.
    pub fn in_memory() -> Self {
        Self::new(MEMORY_PATH)
    }

    pub fn db_file_path(&self) -> &Path {
        &self.db_file_path
    }

    fn is_memory(&self) -> bool {
        self.db_file_path.as_os_str() == MEMORY_PATH
    }
}

impl ConnectionProvider for SqliteProvider {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn connect(&self) -> DbResult<Box<dyn Connection>> {
        info!("Attempting to connect to {}", self.db_file_path.display());
        let conn = if self.is_memory() {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&self.db_file_path)
        }
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        info!("Connection was successful");

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!("PRAGMA foreign_keys set to ON");

        Ok(Box::new(SessionConnection::new(SqliteSession { conn })))
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.db_file_path.display())
    }
}

struct SqliteSession {
    conn: rusqlite::Connection,
}

impl Session for SqliteSession {
    fn run(&mut self, sql: &str) -> DbResult<StatementOutput> {
        let map_err = |e: rusqlite::Error| DbError::QueryFailed(e.to_string());

        let mut stmt = self.conn.prepare(sql).map_err(map_err)?;
        let columns: Vec<ColumnDef> = stmt
            .columns()
            .iter()
            .map(|col| {
                let data_type = col
                    .decl_type()
                    .map(DataType::from_declared)
                    .unwrap_or_else(|| DataType::Unknown(String::new()));
                ColumnDef::new(col.name(), data_type)
            })
            .collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([]).map_err(map_err)?;
        while let Some(row) = cursor.next().map_err(map_err)? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(cell_from_ref(row.get_ref(idx).map_err(map_err)?));
            }
            rows.push(Row::new(values));
        }

        Ok(StatementOutput {
            columns: (width > 0).then_some(columns),
            rows,
        })
    }

    fn commit(&mut self) -> DbResult<()> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("COMMIT;")
                .map_err(|e| DbError::QueryFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn close(self) -> DbResult<()> {
        self.conn
            .close()
            .map_err(|(_, e)| DbError::ConnectionFailed(e.to_string()))
    }
}

/// SQLite values are dynamically typed; map by storage class.
fn cell_from_ref(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(i) => CellValue::Integer(i),
        ValueRef::Real(f) => CellValue::Float(f),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => CellValue::Binary(bytes.to_vec()),
    }
}
