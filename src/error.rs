use thiserror::Error;

/// Result type for analyzer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the reachability core.
///
/// Everything here is a compiler-internal defect: either the front end
/// handed us an ill-formed graph (the `Graph` variants, raised while the
/// builder validates its input), or an invariant broke mid-traversal (the
/// remaining variants). None of these are recoverable; the enclosing
/// compilation aborts.
#[derive(Error, Debug)]
pub enum Error {
    #[error("graph error: {message}")]
    Graph { message: String },

    #[error("well-known member missing: {what}")]
    MissingWellKnown { what: String },

    #[error("array type ({leaf}, dims={dims}) not interned; array lattice closure is incomplete")]
    UnknownArrayType { leaf: String, dims: usize },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a graph construction error
    pub fn graph(message: impl Into<String>) -> Self {
        Self::Graph { message: message.into() }
    }

    /// Create an internal invariant-violation error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}
