//! Sensitive data marker for automatic redaction
//!
//! The `Sensitive<T>` wrapper keeps credentials such as the managed-cloud
//! token out of Debug and Display output, and therefore out of logs.

use std::fmt;

/// Wrapper for sensitive data that redacts itself in Debug and Display
///
/// # Example
///
/// ```
/// use duckconn_core_types::Sensitive;
///
/// let token = Sensitive::new("md-token-123");
/// assert_eq!(format!("{:?}", token), "***REDACTED***");
/// assert_eq!(format!("{}", token), "***REDACTED***");
///
/// // Access the actual value when needed
/// assert_eq!(token.expose(), &"md-token-123");
/// ```
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap a sensitive value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the underlying sensitive value
    ///
    /// Only call this where the raw value must leave the process,
    /// e.g. when handing the token to the database driver.
    pub fn expose(&self) -> &T {
        &self.0
    }

    /// Consume the wrapper and return the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T: Clone> Clone for Sensitive<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_debug_redaction() {
        let secret = Sensitive::new("md-secret-token");
        let debug_str = format!("{:?}", secret);
        assert_eq!(debug_str, "***REDACTED***");
        assert!(!debug_str.contains("md-secret-token"));
    }

    #[test]
    fn test_sensitive_display_redaction() {
        let secret = Sensitive::new("api-key-12345");
        let display_str = format!("{}", secret);
        assert!(!display_str.contains("api-key"));
    }

    #[test]
    fn test_sensitive_expose_and_into_inner() {
        let secret = Sensitive::new(String::from("token"));
        assert_eq!(secret.expose(), "token");
        assert_eq!(secret.into_inner(), "token");
    }

    #[test]
    fn test_sensitive_inside_struct_debug() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct Credentials {
            database: String,
            token: Sensitive<String>,
        }

        let creds = Credentials {
            database: "analytics".to_string(),
            token: Sensitive::new("secret123".to_string()),
        };

        let debug_str = format!("{:?}", creds);
        assert!(debug_str.contains("analytics"));
        assert!(debug_str.contains("***REDACTED***"));
        assert!(!debug_str.contains("secret123"));
    }
}
