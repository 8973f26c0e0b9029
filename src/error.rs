//! Error types for membank.

use thiserror::Error;

/// Error taxonomy for memory operations.
///
/// The three variants map to distinct caller obligations:
/// - [`NotFound`](MemoryError::NotFound) — the referenced project or file
///   has no stored content; correctable by the caller.
/// - [`InvalidArgument`](MemoryError::InvalidArgument) — malformed request
///   parameters, rejected before any store or model access.
/// - [`Dependency`](MemoryError::Dependency) — tokenizer, embedder, or
///   store failure; opaque to the caller and never downgraded to an empty
///   result set.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Referenced project or file has no content.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed query or request parameters.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Tokenizer, embedder, or store failure.
    #[error("dependency failure: {0}")]
    Dependency(String),
}

impl MemoryError {
    /// Wrap an arbitrary upstream failure as a dependency error.
    pub fn dependency<E: std::fmt::Display>(context: &str, err: E) -> Self {
        MemoryError::Dependency(format!("{}: {}", context, err))
    }
}

impl From<sqlx::Error> for MemoryError {
    fn from(err: sqlx::Error) -> Self {
        MemoryError::Dependency(format!("store: {}", err))
    }
}

/// Result type alias for memory operations.
pub type Result<T> = std::result::Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = MemoryError::NotFound("project 'demo'".to_string());
        assert_eq!(err.to_string(), "not found: project 'demo'");
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = MemoryError::InvalidArgument("top_k must be in 1..=20".to_string());
        assert_eq!(err.to_string(), "invalid argument: top_k must be in 1..=20");
    }

    #[test]
    fn test_dependency_display() {
        let err = MemoryError::Dependency("embedder: connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "dependency failure: embedder: connection refused"
        );
    }

    #[test]
    fn test_dependency_helper_wraps_context() {
        let err = MemoryError::dependency("tokenizer", "vocab file missing");
        assert!(matches!(err, MemoryError::Dependency(_)));
        assert!(err.to_string().contains("tokenizer"));
        assert!(err.to_string().contains("vocab file missing"));
    }
}
