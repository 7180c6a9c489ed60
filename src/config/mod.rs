//! Configuration management
//!
//! Handles connection attributes, connection strings and user settings.

pub mod connections;
pub mod settings;

pub use connections::{ConnectionAttributes, ConnectionStringCodec, SslMode};
pub use settings::{Settings, TrackingSettings, load_settings};
