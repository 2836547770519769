//! Error types for loading and running scripts.

use std::fmt;
use std::path::PathBuf;

use pivot_data::Type;
use pivot_ecs::{EcsError, ErrorKind};
use thiserror::Error;

/// Syntax error with the offending token and its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    /// Text of the token found, or `end of input`.
    pub found: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, found {} at line {}, column {}",
            self.message, self.found, self.line, self.column
        )
    }
}

impl std::error::Error for ParseError {}

/// Errors raised while loading or running a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown type `{name}` at line {line}")]
    UnknownType { name: String, line: usize },

    #[error("unknown variable `{name}` in system `{system}`")]
    UnknownVariable { name: String, system: String },

    #[error("unknown function `{name}` in system `{system}`")]
    UnknownFunction { name: String, system: String },

    #[error("`{name}` is bound twice in system `{system}`")]
    DuplicateBinding { name: String, system: String },

    #[error("entity `{binding}` does not declare component `{component}` in system `{system}`")]
    UndeclaredComponent {
        binding: String,
        component: String,
        system: String,
    },

    #[error("invalid emit of `{event}` in system `{system}`: {reason}")]
    InvalidEmit {
        event: String,
        system: String,
        reason: String,
    },

    #[error("invalid operation `{op}` between {left} and {right}")]
    InvalidOperation {
        op: &'static str,
        left: Type,
        right: Type,
    },

    #[error("invalid operation `{op}` on {operand}")]
    InvalidUnary { op: &'static str, operand: Type },

    #[error("{ty} has no field `{field}`")]
    UnknownField { field: String, ty: Type },

    #[error("condition must be Boolean, found {found}")]
    ConditionNotBoolean { found: Type },

    #[error("cannot assign {found} to `{target}` of type {expected}")]
    AssignmentType {
        target: String,
        expected: Type,
        found: Type,
    },

    #[error("vector components must be Number, found {found}")]
    VectorComponent { found: Type },

    #[error("entity `{name}` cannot be used as a value")]
    EntityAsValue { name: String },

    #[error("bad arguments to `{name}`: {reason}")]
    BuiltinArguments { name: String, reason: String },

    #[error("Cannot divide by zero.")]
    DivisionByZero,

    #[error("Cannot modulo by zero.")]
    ModuloByZero,

    #[error("system `{system}` exceeded its budget of {budget} steps")]
    StepBudgetExceeded { system: String, budget: u64 },
}

impl ScriptError {
    /// Class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::Parse,
            Self::Ecs(err) => err.kind(),
            Self::Io { .. }
            | Self::UnknownType { .. }
            | Self::UnknownVariable { .. }
            | Self::UnknownFunction { .. }
            | Self::DuplicateBinding { .. }
            | Self::UndeclaredComponent { .. }
            | Self::InvalidEmit { .. } => ErrorKind::Validation,
            Self::InvalidOperation { .. }
            | Self::InvalidUnary { .. }
            | Self::UnknownField { .. }
            | Self::ConditionNotBoolean { .. }
            | Self::AssignmentType { .. }
            | Self::VectorComponent { .. }
            | Self::EntityAsValue { .. }
            | Self::BuiltinArguments { .. } => ErrorKind::Type,
            Self::DivisionByZero | Self::ModuloByZero | Self::StepBudgetExceeded { .. } => {
                ErrorKind::RuntimeOperation
            }
        }
    }
}

/// Result type for script operations.
pub type ScriptResult<T> = Result<T, ScriptError>;
