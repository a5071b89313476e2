use chrono::{DateTime, Utc};

use crate::error::SqlDbalError;

/// An error message kept by the [`ErrorRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
    pub message: String,
    /// Statement that was running when the error occurred, if any.
    pub query: Option<String>,
    pub at: DateTime<Utc>,
}

/// Append-only log of every error an engine instance has seen.
///
/// With `show_errors` on, each registered error is also emitted as a
/// `tracing` warning.
#[derive(Debug)]
pub struct ErrorRegistry {
    errors: Vec<CapturedError>,
    show_errors: bool,
}

impl Default for ErrorRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ErrorRegistry {
    #[must_use]
    pub fn new(show_errors: bool) -> Self {
        Self {
            errors: Vec::new(),
            show_errors,
        }
    }

    pub fn register(&mut self, message: impl Into<String>, query: Option<&str>) {
        let message = message.into();
        if self.show_errors {
            match query {
                Some(query) => tracing::warn!(error = %message, query, "database error"),
                None => tracing::warn!(error = %message, "database error"),
            }
        }
        self.errors.push(CapturedError {
            message,
            query: query.map(str::to_string),
            at: Utc::now(),
        });
    }

    /// Register `err` and hand it back, for use in `map_err` chains.
    pub fn capture(&mut self, err: SqlDbalError, query: Option<&str>) -> SqlDbalError {
        self.register(err.to_string(), query);
        err
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(|e| e.message.as_str())
    }

    #[must_use]
    pub fn captured(&self) -> &[CapturedError] {
        &self.errors
    }

    #[must_use]
    pub fn show_errors(&self) -> bool {
        self.show_errors
    }

    pub fn set_show_errors(&mut self, show: bool) {
        self.show_errors = show;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_error_is_most_recent() {
        let mut reg = ErrorRegistry::new(false);
        assert_eq!(reg.last_error(), None);
        reg.register("first", None);
        reg.register("second", Some("SELECT 1"));
        assert_eq!(reg.last_error(), Some("second"));
        assert_eq!(reg.captured().len(), 2);
        assert_eq!(reg.captured()[1].query.as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn capture_returns_the_error() {
        let mut reg = ErrorRegistry::new(false);
        let err = reg.capture(SqlDbalError::ConfigError("no host".into()), None);
        assert!(matches!(err, SqlDbalError::ConfigError(_)));
        assert_eq!(reg.last_error(), Some("Configuration error: no host"));
    }
}
