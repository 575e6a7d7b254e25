//! Error types for the policy engine.
//!
//! Distinguishes soft failures (a context variable that is simply absent)
//! from hard failures (malformed queries, broken substitution) so callers
//! can downgrade the former to a log line while the latter surface as rule
//! errors.

use thiserror::Error;

/// Error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// A context variable or query result was not found.
    /// This is a soft error: most call sites log it and move on.
    #[error("variable {0} not found in context")]
    NotFound(String),

    /// A JMESPath expression failed to compile or evaluate
    #[error("invalid query {expression}: {message}")]
    MalformedQuery { expression: String, message: String },

    /// Variable substitution failed
    #[error("variable substitution failed: {0}")]
    Substitution(String),

    /// A precondition or deny condition could not be evaluated
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// A named context entry could not be loaded
    #[error("failed to load context entry {entry}: {message}")]
    ContextLoad { entry: String, message: String },

    /// A foreach list expression did not produce an array
    #[error("foreach list {0} did not evaluate to an array")]
    NotAList(String),

    /// Element-scoped iteration over a non-object element
    #[error("cannot use elementScope=true for elements that are not maps, got {0}")]
    ElementScope(String),

    /// The pod security payload could not be evaluated
    #[error("pod security evaluation failed: {0}")]
    PodSecurity(String),

    /// The ambient cancellation token fired
    #[error("context cancelled")]
    Cancelled,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unrecoverable internal failure
    #[error("{0}")]
    Internal(String),
}

impl EngineError {
    /// Check if this error indicates a missing variable rather than a
    /// genuine failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
