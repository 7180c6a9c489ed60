//! Database abstraction layer
//!
//! A trait-based boundary over the drivers, three concrete adapters, and
//! the helper that runs SQL through any of them and normalizes results.

pub mod helper;
pub mod postgres;
pub mod provider;
pub mod results;
pub mod sqlite;
pub mod sqlserver;
pub mod types;

// Re-export main types
pub use helper::SqlHelper;
pub use provider::{Connection, ConnectionProvider, Cursor};
pub use results::{QueryResult, Record};
pub use types::{CellValue, ColumnDef, DataType, Dialect, Row};
