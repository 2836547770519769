//! Events and dispatch bookkeeping.

use pivot_data::Value;

use crate::{ComponentId, EcsError, Entity};

/// An occurrence sent to a scene: a named event with target entities and a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    /// Role `i` of the event binds `entities[i]`. Extra entities are carried but unbound.
    pub entities: Vec<Entity>,
    pub payload: Value,
}

impl Event {
    pub fn new(name: impl Into<String>, entities: Vec<Entity>, payload: Value) -> Self {
        Self {
            name: name.into(),
            entities,
            payload,
        }
    }
}

/// A component owned by a role-bound entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentRef {
    pub entity: Entity,
    pub component: ComponentId,
}

/// An event plus, for each role of the listening system, the components it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct EventWithComponent {
    pub event: Event,
    pub components: Vec<Vec<ComponentRef>>,
}

impl EventWithComponent {
    /// Entity bound to role `role`.
    pub fn entity(&self, role: usize) -> Option<Entity> {
        self.event.entities.get(role).copied()
    }
}

/// Bounds applied while draining follow-up events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Maximum number of follow-up generations below the sent event.
    pub max_cascade_depth: usize,
    /// Maximum number of events processed by a single send, the sent event included.
    pub max_events: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_cascade_depth: 32,
            max_events: 4096,
        }
    }
}

/// Outcome of a successful send.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Every event processed, in dispatch order.
    pub dispatched: Vec<Event>,
    /// Number of system bodies that ran to completion.
    pub invocations: usize,
    /// Failed systems and rejected follow-up events.
    pub failures: Vec<EcsError>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
