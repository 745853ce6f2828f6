//! Error types for the external IP resolver
//!
//! Two families of errors exist:
//!
//! - [`ProviderError`]: the outcome of a single failed provider attempt. The
//!   engine consumes these locally (log, demote, try the next provider) and
//!   never surfaces them to callers.
//! - [`Error`]: everything else - configuration defects, registry lookups and
//!   failures of the non-blocking facade.

use thiserror::Error;

/// Result type alias for resolver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the resolver
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors, including malformed built-in endpoints
    #[error("Configuration error: {0}")]
    Config(String),

    /// A provider identifier was requested that nothing registered
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Two providers share the same identifier
    #[error("Duplicate provider: {0}")]
    DuplicateProvider(String),

    /// A non-blocking resolution was cancelled before it started
    #[error("Resolution cancelled before it started")]
    Cancelled,

    /// The background resolution task did not complete normally
    #[error("Resolution task failed: {0}")]
    Task(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unknown provider error
    pub fn unknown_provider(name: impl Into<String>) -> Self {
        Self::UnknownProvider(name.into())
    }

    /// Create a duplicate provider error
    pub fn duplicate_provider(name: impl Into<String>) -> Self {
        Self::DuplicateProvider(name.into())
    }

    /// Create a task error
    pub fn task(msg: impl Into<String>) -> Self {
        Self::Task(msg.into())
    }
}

/// Failure of one provider attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Reaching or reading from the external source failed
    #[error("communication failed: {0}")]
    Communication(String),

    /// A response arrived but does not represent an IP address
    #[error("unparseable response: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Create a communication error
    pub fn communication(msg: impl Into<String>) -> Self {
        Self::Communication(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Whether this failure happened at the transport level
    pub fn is_communication(&self) -> bool {
        matches!(self, Self::Communication(_))
    }

    /// Whether this failure happened while interpreting a response
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}
