//! Error types for docql

use thiserror::Error;

/// Result type alias using the docql Error
pub type Result<T> = std::result::Result<T, Error>;

/// Which runtime function table a call was dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Aggregate function table (`AVG`, `COUNT`, ...)
    Aggregate,
    /// Built-in scalar function table
    Builtin,
    /// User-defined function table
    Udf,
}

impl std::fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionKind::Aggregate => f.write_str("aggregate"),
            FunctionKind::Builtin => f.write_str("built-in"),
            FunctionKind::Udf => f.write_str("user-defined"),
        }
    }
}

/// Core error types for the query compiler and its reference runtime
#[derive(Error, Debug)]
pub enum Error {
    /// No compiler handler exists for a grammar node kind (in this position)
    #[error("Unsupported node kind: {0}")]
    UnsupportedNodeKind(String),

    /// `SELECT *` used while zero or several aliases are bound
    #[error("'SELECT *' is only valid with a single input set")]
    AmbiguousStarProjection,

    /// Grammar tree could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Function name not present in the table the plan dispatches to
    #[error("Unknown {kind} function: {name}")]
    UnknownFunction {
        /// Table the call was routed to
        kind: FunctionKind,
        /// Function name as written in the query
        name: String,
    },

    /// User-defined function registration or invocation failed
    #[error("UDF error: {0}")]
    Udf(String),

    /// Plan evaluation failed
    #[error("Execution error: {0}")]
    Execution(String),
}

impl Error {
    /// Create an unsupported-node-kind error
    pub fn unsupported(kind: impl Into<String>) -> Self {
        Self::UnsupportedNodeKind(kind.into())
    }

    /// Create a UDF error
    pub fn udf(msg: impl Into<String>) -> Self {
        Self::Udf(msg.into())
    }

    /// Create an execution error
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Whether the error was raised while compiling rather than executing
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedNodeKind(_) | Error::AmbiguousStarProjection | Error::Json(_)
        )
    }
}
