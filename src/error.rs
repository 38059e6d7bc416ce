//! Error types for fixed-point acceleration operations.

use std::fmt;

/// Result type for acceleration operations.
pub type AccelResult<T> = Result<T, AccelError>;

/// Errors that can occur while building or driving an accelerator.
#[derive(Debug, Clone)]
pub enum AccelError {
    /// Invalid construction parameter or input shape.
    InvalidInput { context: String },

    /// Numerical computation failed (e.g., a tensor op on mismatched data).
    NumericalError { message: String },

    /// Error from underlying numr operation.
    NumrError(String),
}

impl fmt::Display for AccelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { context } => {
                write!(f, "Invalid input: {}", context)
            }
            Self::NumericalError { message } => {
                write!(f, "Numerical error: {}", message)
            }
            Self::NumrError(msg) => {
                write!(f, "numr error: {}", msg)
            }
        }
    }
}

impl std::error::Error for AccelError {}

impl From<numr::error::Error> for AccelError {
    fn from(err: numr::error::Error) -> Self {
        Self::NumrError(err.to_string())
    }
}
