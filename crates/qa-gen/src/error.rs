//! Error types for qa-gen

use qa_core::CoreError;
use thiserror::Error;

/// Generation errors
#[derive(Error, Debug)]
pub enum GenError {
    /// Backend call failed (G001)
    #[error("[G001] Generation backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },

    /// Request would exceed the configured token limit (G002)
    #[error("[G002] Request needs about {estimated} tokens, limit is {limit}")]
    TokenLimit { estimated: u64, limit: u32 },

    /// Prompt or script template error (G003)
    #[error("[G003] Template error: {0}")]
    Template(String),

    /// Backend returned output the ledger cannot use (G004)
    #[error("[G004] Backend returned unusable output: {0}")]
    InvalidOutput(String),
}

/// Result type alias for GenError
pub type GenResult<T> = Result<T, GenError>;

impl From<minijinja::Error> for GenError {
    fn from(err: minijinja::Error) -> Self {
        GenError::Template(err.to_string())
    }
}

impl GenError {
    /// Wrap as the dependency failure reported to callers of the workflow
    pub fn into_dependency_failure(self, operation: &str) -> CoreError {
        CoreError::DependencyFailure {
            operation: operation.to_string(),
            message: self.to_string(),
        }
    }
}
