//! Error types for quarry

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use quarry_cond::ParseError;

/// Result type alias for quarry operations
pub type ExecResult<T> = Result<T, Error>;

/// Result type alias for statement building
pub type BuildResult<T> = Result<T, BuildError>;

/// A statement sequence that cannot be rendered into SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// `#{` left in text that reached emission.
    #[error("unresolved placeholder in '{0}'")]
    UnresolvedPlaceholder(String),

    /// An argument expression that does not resolve in the scope.
    #[error("unresolved argument '{0}'")]
    UnresolvedArgument(String),

    /// A foreach collection that is not a list.
    #[error("'{0}' is not a collection")]
    NotACollection(String),

    /// A foreach over an empty collection would emit e.g. `IN ()`.
    #[error("collection '{0}' is empty")]
    EmptyCollection(String),

    /// A SET clause where no assignment applies.
    #[error("SET clause has no assignments")]
    EmptySet,
}

/// Error types for statement execution.
///
/// `Clone` so one in-flight load can hand the same failure to every waiter.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Condition text rejected by the parser
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Statement sequence could not be rendered
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Failure reported by the executor
    #[error("Execution error: {0}")]
    Execution(Arc<dyn StdError + Send + Sync>),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error (identifiers, argument shapes)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Pagination could not rewrite the statement
    #[error("Pagination error: {0}")]
    Pagination(String),

    /// Cache-aside call given an empty key
    #[error("empty cache key provided")]
    EmptyCacheKey,

    /// Caller stopped waiting for a cache load; the load itself may still succeed
    #[error("cache load timed out after {timeout:?}, key: {key}")]
    CacheTimeout { key: String, timeout: Duration },

    /// Whole-call timeout
    #[error("Query timeout after {0:?}")]
    Timeout(Duration),

    /// The chain produced a reply of a different type than the caller asked for
    #[error("unexpected reply type, expected {expected}")]
    UnexpectedReply { expected: &'static str },

    /// A transactional block panicked
    #[error("panicked: {0}")]
    Panicked(String),

    /// Rollback failed after the block had already failed
    #[error("{cause} (rollback failed: {rollback})")]
    Rollback {
        cause: Box<Error>,
        rollback: Box<Error>,
    },

    /// Invalid engine configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a driver error.
    pub fn execution(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Execution(Arc::new(err))
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a whole-call timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this is a cache wait timeout
    pub fn is_cache_timeout(&self) -> bool {
        matches!(self, Self::CacheTimeout { .. })
    }

    /// The error that decided a rollback, looking through rollback failures.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Rollback { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::execution(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(err.to_string())
    }
}
