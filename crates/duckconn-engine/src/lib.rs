//! duckconn-engine - connection build orchestration
//!
//! Ties the core pipeline to a concrete driver:
//! - `ConnectionBuilder` runs resolve, connect and bootstrap with timing
//! - `ConnectionCache` keeps one connection per name
//! - `ConnectionManager` is the get-or-create entry point
//! - `SecretsFile` loads named configurations from TOML

pub mod builder;
pub mod cache;
pub mod connection;
pub mod manager;
pub mod secrets;

use duckconn_core::errors::ExError;

pub type Result<T> = std::result::Result<T, ExError>;

pub use builder::ConnectionBuilder;
pub use cache::{ConnectionCache, SharedConnection};
pub use connection::{Connection, ConnectionMetrics};
pub use manager::ConnectionManager;
pub use secrets::SecretsFile;
