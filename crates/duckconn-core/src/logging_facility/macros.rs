//! Op-bracketing macros for the connection build phases
//!
//! Every phase of a build (`resolve`, `connect`, `bootstrap`, `fetch_source`)
//! and the enclosing `build_connection` emits one `start` event and exactly
//! one of `end` or `end_error`, all tagged with `op` and `component`. Op names
//! are the `schema::OP_*` constants; callers must depend on
//! `duckconn-core-types` for them and for the event names.

/// Emit the `start` event for a build phase
///
/// Extra fields follow `tracing` syntax and usually identify the build.
///
/// ```
/// # use duckconn_core::log_op_start;
/// use duckconn_core_types::schema::{OP_BUILD, OP_CONNECT};
/// log_op_start!(OP_BUILD, name = "events", build_id = "0190a3c1");
/// log_op_start!(OP_CONNECT, target_key = "file:///srv/data/events.duckdb");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = duckconn_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = duckconn_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Emit the `end` event for a phase that succeeded
///
/// `duration_ms` is required and comes first.
///
/// ```
/// # use duckconn_core::log_op_end;
/// use duckconn_core_types::schema::OP_BOOTSTRAP;
/// log_op_end!(OP_BOOTSTRAP, duration_ms = 412, table = "events", outcome = "materialized");
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = duckconn_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = duckconn_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Emit the `end_error` event for a phase that failed
///
/// The error is converted into `ExError` and logged with its kind, its stable
/// `ERR_*` code and its message.
///
/// ```
/// # use duckconn_core::log_op_error;
/// use duckconn_core::errors::ConnError;
/// use duckconn_core_types::schema::OP_RESOLVE;
/// let err = ConnError::UnsupportedScheme { input: "ftp://host/db".to_string() };
/// log_op_error!(OP_RESOLVE, err, duration_ms = 0, build_id = "0190a3c1");
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        use $crate::errors::ExError;
        let ex_err: ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = duckconn_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            message = %ex_err,
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        use $crate::errors::ExError;
        let ex_err: ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = duckconn_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            message = %ex_err,
            $($field)*
        );
    }};
}
