//! Error types for sqlhelpers
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors with clear error chains.

use crate::audit::catalog::TemplateRole;
use crate::db::types::Dialect;
use std::io;

/// Main error type for sqlhelpers
#[derive(Debug, thiserror::Error)]
pub enum SqlHelpersError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A tracking-enabled backend was declared incompletely
    #[error("Contract violation: {0}")]
    Contract(#[from] ContractError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Construction-time failures of a tracking-enabled backend.
///
/// These are programmer errors in the backend declaration and are never
/// worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// One or more template roles are absent, blank, or still the placeholder
    #[error("Missing required {dialect} template attribute(s): {}", join_roles(.missing))]
    MissingRequiredAttribute {
        dialect: Dialect,
        missing: Vec<TemplateRole>,
    },

    /// The tracked table set is empty or holds only the ignore sentinel
    #[error(
        "No tables have been specified to track. \
         Please specify at least one table to track."
    )]
    NoTrackedTables,
}

/// Database operation errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Failed to establish connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// No cursor has been acquired yet
    #[error(
        "Cursor has not been initialized yet, \
         run get_connection_and_cursor before querying"
    )]
    NoCursorInitialized,

    /// The connection behind a cursor is gone
    #[error(
        "Connection has not been initialized yet, \
         run get_connection_and_cursor before querying"
    )]
    NoConnectionInitialized,

    /// Records were requested before any query produced column metadata
    #[error("A query has not been executed, please execute a query before calling this method.")]
    NoResultsToConvert,

    /// A statement issued while provisioning audit infrastructure failed
    #[error("Provisioning failed while running `{statement}`: {source}")]
    ProvisioningFailed {
        statement: String,
        #[source]
        source: Box<DbError>,
    },
}

/// Configuration loading/parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Home directory not found
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// Config file not found
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Config file could not be read
    #[error("Failed to read configuration: {0}")]
    Io(#[from] io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Decoding was asked to work on an empty connection string
    #[error("A connection string is required")]
    ConnectionStringRequired,

    /// A template catalog was paired with a backend of another dialect
    #[error("Template catalog is for {catalog}, but the backend speaks {backend}")]
    DialectMismatch { catalog: Dialect, backend: Dialect },
}

fn join_roles(roles: &[TemplateRole]) -> String {
    roles
        .iter()
        .map(|r| r.attribute_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Specialized Result type for sqlhelpers operations
pub type Result<T> = std::result::Result<T, SqlHelpersError>;

/// Specialized Result type for database operations
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Specialized Result type for config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized Result type for contract validation
pub type ContractResult<T> = std::result::Result<T, ContractError>;
