use crate::metrics::MetricsSnapshot;
use duckconn_core_types::BuildId;
use thiserror::Error;

/// Result type alias using ConnError
pub type Result<T> = std::result::Result<T, ConnError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers can match on without
/// parsing messages, and that the CLI prints alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Configuration / resolution (raised before any handle is opened)
    UnsupportedScheme,
    InvalidConfig,

    // Factory
    StorageAccess,
    Authentication,
    Network,

    // Bootstrap
    BootstrapFailure,

    // Connection usage
    Query,
    ConnectionClosed,

    // Integration/IO
    Io,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::UnsupportedScheme => "ERR_UNSUPPORTED_SCHEME",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::StorageAccess => "ERR_STORAGE_ACCESS",
            ExErrorKind::Authentication => "ERR_AUTHENTICATION",
            ExErrorKind::Network => "ERR_NETWORK",
            ExErrorKind::BootstrapFailure => "ERR_BOOTSTRAP_FAILURE",
            ExErrorKind::Query => "ERR_QUERY",
            ExErrorKind::ConnectionClosed => "ERR_CONNECTION_CLOSED",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether an operation failing with this kind may succeed on retry.
    ///
    /// Only connectivity failures qualify; a rejected credential never does.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExErrorKind::Network)
    }
}

/// A single violated configuration constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling plus the context
/// needed to diagnose a failed build: target key, build id, the aggregated
/// field errors and the phase timings recorded up to the failure.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    target_key: Option<String>,
    build_id: Option<BuildId>,
    message: String,
    source: Option<Box<ExError>>,
    field_errors: Vec<FieldError>,
    metrics: Option<MetricsSnapshot>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            target_key: None,
            build_id: None,
            message: String::new(),
            source: None,
            field_errors: Vec::new(),
            metrics: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add target key context
    pub fn with_target_key(mut self, key: impl Into<String>) -> Self {
        self.target_key = Some(key.into());
        self
    }

    /// Add build correlation context
    pub fn with_build_id(mut self, build_id: BuildId) -> Self {
        self.build_id = Some(build_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach the aggregated field errors of an invalid configuration
    pub fn with_field_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.field_errors = errors;
        self
    }

    /// Attach the metrics recorded up to the failure point
    pub fn with_metrics(mut self, metrics: MetricsSnapshot) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the target key context, if any
    pub fn target_key(&self) -> Option<&str> {
        self.target_key.as_deref()
    }

    /// Get the build id context, if any
    pub fn build_id(&self) -> Option<&BuildId> {
        self.build_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Aggregated field errors (non-empty only for `InvalidConfig`)
    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    /// Metrics recorded up to the failure point, if the error left a build
    pub fn metrics(&self) -> Option<&MetricsSnapshot> {
        self.metrics.as_ref()
    }

    /// Innermost error kind, following wrapped sources
    pub fn root_kind(&self) -> ExErrorKind {
        let mut current = self;
        while let Some(next) = current.source.as_deref() {
            current = next;
        }
        current.kind
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(key) = &self.target_key {
            write!(f, " (target: {})", key)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain failures raised by the pure kernel functions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnError {
    /// Target identifier does not match any supported scheme
    #[error("Unsupported connection target: '{input}'")]
    UnsupportedScheme { input: String },

    /// Configuration violated one or more constraints
    #[error("Invalid configuration: {}", join_field_errors(.errors))]
    InvalidConfig { errors: Vec<FieldError> },

    /// Local database file could not be opened or created
    #[error("Cannot access database file {path}: {reason}")]
    StorageAccess { path: String, reason: String },

    /// Managed service rejected the credential
    #[error("Authentication failed for {database}: {reason}")]
    Authentication { database: String, reason: String },

    /// Connectivity failure (DNS, refused, timeout, HTTP error status)
    #[error("Network failure reaching {target}: {reason}")]
    Network { target: String, reason: String },

    /// Materializing the remote source failed
    #[error("Bootstrap failed for {target_key}: {cause}")]
    BootstrapFailure {
        target_key: String,
        cause: Box<ConnError>,
    },

    /// Statement execution failed
    #[error("Query failed: {reason}")]
    Query { reason: String },

    /// Connection was used after close
    #[error("Connection '{name}' is closed")]
    ConnectionClosed { name: String },

    /// Internal error (should never happen)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConnError {
    /// Shorthand for a single-field configuration failure
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConnError::InvalidConfig {
            errors: vec![FieldError::new(field, reason)],
        }
    }

    /// Same rule as [`ExErrorKind::is_retryable`]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConnError::Network { .. })
    }
}

impl From<ConnError> for ExError {
    fn from(err: ConnError) -> Self {
        match err {
            ConnError::UnsupportedScheme { input } => ExError::new(ExErrorKind::UnsupportedScheme)
                .with_op("resolve")
                .with_message(format!("Unsupported connection target: '{}'", input)),

            ConnError::InvalidConfig { errors } => {
                let message = format!("Invalid configuration: {}", join_field_errors(&errors));
                ExError::new(ExErrorKind::InvalidConfig)
                    .with_op("validate")
                    .with_message(message)
                    .with_field_errors(errors)
            }

            ConnError::StorageAccess { path, reason } => ExError::new(ExErrorKind::StorageAccess)
                .with_op("connect")
                .with_message(format!("Cannot access database file {}: {}", path, reason)),

            ConnError::Authentication { database, reason } => {
                ExError::new(ExErrorKind::Authentication)
                    .with_op("connect")
                    .with_message(format!("Authentication failed for {}: {}", database, reason))
            }

            ConnError::Network { target, reason } => ExError::new(ExErrorKind::Network)
                .with_message(format!("Network failure reaching {}: {}", target, reason)),

            ConnError::BootstrapFailure { target_key, cause } => {
                let source: ExError = (*cause).into();
                ExError::new(ExErrorKind::BootstrapFailure)
                    .with_op("bootstrap")
                    .with_target_key(target_key)
                    .with_message("Bootstrap failed")
                    .with_source(source)
            }

            ConnError::Query { reason } => ExError::new(ExErrorKind::Query)
                .with_op("query")
                .with_message(reason),

            ConnError::ConnectionClosed { name } => ExError::new(ExErrorKind::ConnectionClosed)
                .with_op("query")
                .with_message(format!("Connection '{}' is closed", name)),

            ConnError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}
