//! Core types shared across duckconn facilities
//!
//! This crate provides foundational types used by the error handling,
//! logging and connection layers:
//!
//! - **Correlation types**: BuildId for tagging a single connection build
//! - **Sensitive data**: Sensitive<T> marker for automatic redaction
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::BuildId;
pub use sensitive::Sensitive;
