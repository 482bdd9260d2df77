//! Error taxonomy for evalbench.
//!
//! Generation failures never escape the grading policy; they are folded into
//! a failing verdict. Persistence failures propagate to the caller of
//! load/save. Configuration errors are surfaced at the service boundary as a
//! distinct "not configured" signal.

/// Failure of the upstream text-generation call.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// No credential configured for the provider.
    #[error("{var} is not set")]
    NotConfigured { var: &'static str },

    /// Upstream answered with a non-success status. The message is the
    /// provider's own error text when it sent one.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Call did not complete within the configured timeout.
    #[error("generation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Connection, TLS or body decoding failure.
    #[error("{message}")]
    Network { message: String },
}

impl GenerationError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Network {
                message: format!("request timed out: {e}"),
            };
        }
        Self::Network {
            message: e.to_string(),
        }
    }
}

/// Storage read/write failure.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// No database configured; reads degrade to empty state, writes fail.
    #[error("Database not configured. Set EVALBENCH_DB or pass --db to persist data.")]
    NotConfigured,

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A result references a test case or grader that is not in the saved state.
    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("failed to prepare database directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(pub String);
