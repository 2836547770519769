//! Error types for the entity-component layer.

use pivot_data::{DataError, Type};
use thiserror::Error;

use crate::{ComponentId, DispatchReport, Entity};

/// Boxed error returned by system bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Broad class of a failure, shared by every Pivot crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A description or request is malformed.
    Validation,
    /// A name is registered twice.
    Registration,
    /// An entity or component id is out of bounds or a cap was reached.
    Range,
    /// A value does not have the type it must have.
    Type,
    /// Script syntax error.
    Parse,
    /// Failure while running: division by zero, exhausted budgets, failed systems.
    RuntimeOperation,
}

/// Errors that can occur in the entity-component layer.
#[derive(Debug, Error)]
pub enum EcsError {
    #[error("{what} description has an empty name")]
    EmptyName { what: &'static str },

    #[error("system `{system}` has an empty argument")]
    EmptyArgument { system: String },

    #[error("component `{component}` used by `{owner}` is not registered")]
    UnregisteredComponent { component: String, owner: String },

    #[error("{what} `{name}` is already registered")]
    AlreadyRegistered { what: &'static str, name: String },

    #[error("system `{0}` is not registered")]
    UnregisteredSystem(String),

    #[error("event `{0}` is not registered")]
    UnregisteredEvent(String),

    #[error("event `{event}` does not match its declaration: {reason}")]
    EventMismatch { event: String, reason: String },

    #[error("too many entities in existence")]
    TooManyEntities,

    #[error("entity {0} out of range")]
    EntityOutOfRange(Entity),

    #[error("entity {0} is not alive")]
    EntityNotAlive(Entity),

    #[error("too many component kinds in one scene (max {max})")]
    TooManyComponents { max: usize },

    #[error("unknown component id {0:?}")]
    UnknownComponentId(ComponentId),

    #[error("invalid value for component `{component}`: {source}")]
    ComponentType {
        component: String,
        #[source]
        source: DataError,
    },

    #[error("payload of event `{event}` must be {expected}, found {found}")]
    PayloadType {
        event: String,
        expected: Type,
        found: Type,
    },

    #[error("event `{event}` needs {expected} target entities, got {found}")]
    MissingTargets {
        event: String,
        expected: usize,
        found: usize,
    },

    #[error("entity {entity} has no `{component}` component")]
    MissingComponent { entity: Entity, component: String },

    #[error("system `{system}` failed: {source}")]
    SystemFailed {
        system: String,
        #[source]
        source: BoxError,
    },

    /// `report` holds what ran before the cascade was cut.
    #[error("event cascade deeper than {max} while emitting `{event}`")]
    CascadeDepthExceeded {
        event: String,
        max: usize,
        report: Box<DispatchReport>,
    },

    #[error("more than {max} events dispatched by one send")]
    CascadeOverflow {
        max: usize,
        report: Box<DispatchReport>,
    },

    #[error("scene {0} is not registered")]
    UnknownScene(u32),

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] DataError),
}

impl EcsError {
    /// Work completed before a cascade bound stopped the dispatch.
    pub fn partial_report(&self) -> Option<&DispatchReport> {
        match self {
            Self::CascadeDepthExceeded { report, .. } | Self::CascadeOverflow { report, .. } => {
                Some(report)
            }
            _ => None,
        }
    }

    /// Class of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyName { .. }
            | Self::EmptyArgument { .. }
            | Self::UnregisteredComponent { .. }
            | Self::UnregisteredSystem(_)
            | Self::UnregisteredEvent(_)
            | Self::EventMismatch { .. }
            | Self::MissingTargets { .. }
            | Self::MissingComponent { .. }
            | Self::UnknownScene(_) => ErrorKind::Validation,
            Self::AlreadyRegistered { .. } => ErrorKind::Registration,
            Self::TooManyEntities
            | Self::EntityOutOfRange(_)
            | Self::EntityNotAlive(_)
            | Self::TooManyComponents { .. }
            | Self::UnknownComponentId(_) => ErrorKind::Range,
            Self::ComponentType { .. } | Self::PayloadType { .. } | Self::Snapshot(_) => {
                ErrorKind::Type
            }
            Self::SystemFailed { .. }
            | Self::CascadeDepthExceeded { .. }
            | Self::CascadeOverflow { .. } => ErrorKind::RuntimeOperation,
        }
    }
}

/// Result type for entity-component operations.
pub type EcsResult<T> = Result<T, EcsError>;
