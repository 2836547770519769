//! Name-keyed registries of descriptions.
//!
//! Indexes are plain values owned by the host. They are cheap to clone (descriptions are
//! shared behind `Arc`), which lets a loader stage registrations and commit them at once.

use std::sync::Arc;

use hashbrown::HashMap;
use tracing::debug;

use crate::{ComponentDescription, EcsError, EcsResult, EventDescription, SystemDescription};

/// Anything stored in an [`Index`].
pub trait Described {
    /// Kind used in error messages.
    const KIND: &'static str;

    fn name(&self) -> &str;
}

impl Described for ComponentDescription {
    const KIND: &'static str = "component";

    fn name(&self) -> &str {
        &self.name
    }
}

impl Described for EventDescription {
    const KIND: &'static str = "event";

    fn name(&self) -> &str {
        &self.name
    }
}

impl Described for SystemDescription {
    const KIND: &'static str = "system";

    fn name(&self) -> &str {
        &self.name
    }
}

/// Descriptions in registration order with lookup by name.
#[derive(Debug)]
pub struct Index<D> {
    descriptions: Vec<Arc<D>>,
    by_name: HashMap<String, usize>,
}

pub type ComponentIndex = Index<ComponentDescription>;
pub type EventIndex = Index<EventDescription>;
pub type SystemIndex = Index<SystemDescription>;

impl<D> Default for Index<D> {
    fn default() -> Self {
        Self {
            descriptions: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<D> Clone for Index<D> {
    fn clone(&self) -> Self {
        Self {
            descriptions: self.descriptions.clone(),
            by_name: self.by_name.clone(),
        }
    }
}

impl<D: Described> Index<D> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<D>> {
        self.by_name.get(name).map(|&i| &self.descriptions[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Descriptions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<D>> {
        self.descriptions.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptions.iter().map(|d| d.name())
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    fn insert(&mut self, description: D) -> EcsResult<Arc<D>> {
        let name = description.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(EcsError::AlreadyRegistered {
                what: D::KIND,
                name,
            });
        }
        debug!(kind = D::KIND, name = %name, "registered description");
        let description = Arc::new(description);
        self.by_name.insert(name, self.descriptions.len());
        self.descriptions.push(Arc::clone(&description));
        Ok(description)
    }
}

impl Index<ComponentDescription> {
    pub fn register(
        &mut self,
        description: ComponentDescription,
    ) -> EcsResult<Arc<ComponentDescription>> {
        description.validate()?;
        self.insert(description)
    }
}

impl Index<EventDescription> {
    pub fn register(
        &mut self,
        description: EventDescription,
        components: &ComponentIndex,
    ) -> EcsResult<Arc<EventDescription>> {
        description.validate(components)?;
        self.insert(description)
    }
}

impl Index<SystemDescription> {
    pub fn register(
        &mut self,
        description: SystemDescription,
        components: &ComponentIndex,
    ) -> EcsResult<Arc<SystemDescription>> {
        description.validate(components)?;
        self.insert(description)
    }
}

/// The three indexes a host keeps together.
#[derive(Debug, Clone, Default)]
pub struct Indexes {
    pub components: ComponentIndex,
    pub events: EventIndex,
    pub systems: SystemIndex,
}

impl Indexes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_component(
        &mut self,
        description: ComponentDescription,
    ) -> EcsResult<Arc<ComponentDescription>> {
        self.components.register(description)
    }

    pub fn register_event(
        &mut self,
        description: EventDescription,
    ) -> EcsResult<Arc<EventDescription>> {
        self.events.register(description, &self.components)
    }

    /// Register a system. Its event is declared on the fly when unknown, and must agree
    /// with the existing declaration otherwise.
    pub fn register_system(
        &mut self,
        description: SystemDescription,
    ) -> EcsResult<Arc<SystemDescription>> {
        description.validate(&self.components)?;
        if self.systems.contains(&description.name) {
            return Err(EcsError::AlreadyRegistered {
                what: "system",
                name: description.name,
            });
        }
        if let Some(listener) = &description.event_listener {
            match self.events.get(&listener.name) {
                Some(declared) => declared.check_compatible(listener)?,
                None => {
                    self.events.register(listener.clone(), &self.components)?;
                }
            }
        }
        self.systems.insert(description)
    }
}

#[cfg(test)]
mod tests {
    use pivot_data::{BasicType, Type};

    use super::*;
    use crate::Role;

    fn number(name: &str) -> ComponentDescription {
        ComponentDescription::new(name, Type::Basic(BasicType::Number))
    }

    fn listener(name: &str, payload: Type) -> EventDescription {
        EventDescription {
            name: name.into(),
            roles: Vec::new(),
            payload,
        }
    }

    fn system(name: &str, event: EventDescription) -> SystemDescription {
        SystemDescription::new(
            name,
            vec![Role::new("e", ["Health"])],
            Some(event),
            |_, _, _| Ok(Vec::new()),
        )
    }

    #[test]
    fn test_duplicate_component() {
        let mut index = ComponentIndex::new();
        index.register(number("Health")).unwrap();
        let err = index.register(number("Health")).unwrap_err();
        assert_eq!(err.to_string(), "component `Health` is already registered");
        assert_eq!(err.kind(), crate::ErrorKind::Registration);
    }

    #[test]
    fn test_registration_order_is_kept() {
        let mut index = ComponentIndex::new();
        for name in ["C", "A", "B"] {
            index.register(number(name)).unwrap();
        }
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["C", "A", "B"]);
        assert_eq!(index.get("A").unwrap().name, "A");
        assert!(index.get("D").is_none());
    }

    #[test]
    fn test_system_declares_its_event() {
        let mut indexes = Indexes::new();
        indexes.register_component(number("Health")).unwrap();
        let tick = listener("Tick", Type::Basic(BasicType::Number));
        indexes.register_system(system("Regen", tick.clone())).unwrap();

        assert_eq!(indexes.events.get("Tick").map(|e| e.as_ref()), Some(&tick));
        assert!(indexes.systems.contains("Regen"));
    }

    #[test]
    fn test_system_must_agree_with_event() {
        let mut indexes = Indexes::new();
        indexes.register_component(number("Health")).unwrap();
        indexes
            .register_event(listener("Tick", Type::Basic(BasicType::Number)))
            .unwrap();

        let err = indexes
            .register_system(system("Regen", listener("Tick", Type::empty_record())))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
        assert!(!indexes.systems.contains("Regen"));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut index = ComponentIndex::new();
        index.register(number("A")).unwrap();
        let mut staged = index.clone();
        staged.register(number("B")).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(staged.len(), 2);
    }
}
