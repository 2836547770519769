//! Error types for value decoding and checking.

use thiserror::Error;

use crate::Type;

/// Errors produced by the value model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    /// The interchange document has a shape no `Value` maps to.
    #[error("cannot decode value: {0}")]
    Decode(String),

    /// NaN and infinities have no interchange representation.
    #[error("cannot encode non-finite number {0}")]
    NonFinite(f64),

    /// A value does not have the type a schema demands.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: Type, found: Type },
}

/// Result type for value model operations.
pub type DataResult<T> = Result<T, DataError>;
