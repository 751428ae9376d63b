//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names consistent between the logging macros,
//! the error facility and test assertions.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_BUILD_ID: &str = "build_id";

// Connection identifiers
pub const FIELD_CONNECTION: &str = "connection";
pub const FIELD_TARGET_KEY: &str = "target_key";
pub const FIELD_INTENT_KIND: &str = "intent_kind";
pub const FIELD_TABLE: &str = "table";
pub const FIELD_TOKEN_FINGERPRINT: &str = "token_fingerprint";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Build phase operation names
pub const OP_BUILD: &str = "build_connection";
pub const OP_RESOLVE: &str = "resolve";
pub const OP_CONNECT: &str = "connect";
pub const OP_BOOTSTRAP: &str = "bootstrap";
pub const OP_FETCH: &str = "fetch_source";
