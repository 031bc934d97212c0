//! Error types for IronView

use thiserror::Error;

/// The main error type for IronView operations
#[derive(Error, Debug)]
pub enum Error {
    // Parser errors
    #[error("Parse error: {0}")]
    Parse(String),

    // Declaration errors, raised once while a view is being built
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    // Evaluation errors
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid type cast from {from} to {to}")]
    InvalidCast { from: String, to: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Overflow in {operation}")]
    Overflow { operation: String },

    // Read pipeline errors
    #[error("Local sort exceeded the in-memory limit of {limit} rows")]
    MemoryLimitExceeded { limit: usize },

    #[error("Error reading view {view}: {source}")]
    Read {
        view: String,
        #[source]
        source: Box<Error>,
    },

    // Write errors
    #[error("Feature is locked by another transaction: {0}")]
    FeatureLocked(String),

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an error raised by an underlying source while reading through `view`
    pub fn while_reading(self, view: &str) -> Error {
        match self {
            // Already attributed to a view; keep the innermost context
            err @ Error::Read { .. } => err,
            other => Error::Read {
                view: view.to_string(),
                source: Box::new(other),
            },
        }
    }
}

/// Result type alias using IronView's Error
pub type Result<T> = std::result::Result<T, Error>;
