//! sqlhelpers - one calling surface for several SQL backends, with audit trails
//!
//! sqlhelpers runs arbitrary SQL against PostgreSQL, SQL Server or SQLite
//! through a single blocking API, and can retrofit an audit trail onto chosen
//! tables by installing dialect-specific triggers that log every insert,
//! update and delete into an `audit_log` table.
//!
//! # Architecture
//!
//! - [`db`]: the connection boundary, the three adapters, and [`SqlHelper`]
//!   which runs statements and normalizes their results
//! - [`audit`]: template catalogs, the construction-time contract, and the
//!   provisioner behind [`AuditedHelper`]
//! - [`config`]: connection attributes, connection strings, settings file
//! - [`error`]: error types and result aliases
//!
//! # Example
//!
//! ```no_run
//! use sqlhelpers::audit::AuditedHelper;
//! use sqlhelpers::db::sqlite::SqliteProvider;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Validates the SQLite templates, connects, and installs the triggers
//! let mut helper = AuditedHelper::new(SqliteProvider::new("app.db"), ["orders"])?;
//!
//! helper.execute("INSERT INTO orders (item) VALUES ('widget')", true)?;
//! helper.query("SELECT operation, new_row_data FROM audit_log")?;
//! for record in helper.to_records()? {
//!     println!("{:?}", record);
//! }
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod config;
pub mod db;
pub mod error;

pub use audit::AuditedHelper;
pub use db::SqlHelper;
pub use error::{ConfigError, ContractError, DbError, Result, SqlHelpersError};
