//! Remote source staging

pub mod atomic;
pub mod http;

pub use atomic::atomic_stream;
pub use http::{staged_file_name, HttpFetcher};
