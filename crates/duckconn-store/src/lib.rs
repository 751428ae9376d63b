//! duckconn-store - DuckDB-backed driver, handle and remote fetcher
//!
//! Provides:
//! - `DuckDbDriver` opening in-memory, file and managed-cloud databases
//! - `DuckDbHandle` mapping DuckDB rows onto core `QueryResult`s
//! - `HttpFetcher` staging remote sources with atomic writes

pub mod db;
pub mod driver;
pub mod errors;
pub mod fetch;
pub mod handle;

pub use driver::DuckDbDriver;
pub use errors::Result;
pub use fetch::HttpFetcher;
pub use handle::DuckDbHandle;
