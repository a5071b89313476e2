use std::fmt;
use std::panic::Location;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Engine method and caller location of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub method: &'static str,
    pub file: &'static str,
    pub line: u32,
}

impl CallSite {
    pub(crate) fn new(method: &'static str, location: &'static Location<'static>) -> Self {
        Self {
            method,
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Database::{} at {}:{}", self.method, self.file, self.line)
    }
}

/// The most recent statement, replaced on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    pub raw: String,
    pub normalized: String,
    pub call_site: CallSite,
    pub at: DateTime<Utc>,
}

/// One entry of the trace log kept while tracing is on.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub query: String,
    pub call_site: CallSite,
    pub elapsed: Duration,
    /// Rows affected or rows returned.
    pub rows: usize,
    pub cached: bool,
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}
