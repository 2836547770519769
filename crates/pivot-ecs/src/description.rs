//! Descriptions of components, events and systems.
//!
//! Descriptions are created once when a script (or host code) is loaded and are
//! shared by every scene through the [`Index`](crate::Index) objects.

use std::fmt;
use std::sync::Arc;

use pivot_data::{Type, Value};

use crate::{
    ArrayCombination, BoxError, ComponentArray, ComponentIndex, DenseArray, EcsError, EcsResult,
    Event, EventWithComponent,
};

/// Creates the storage array for a component.
pub type ArrayFactory = fn(Arc<ComponentDescription>) -> Box<dyn ComponentArray>;

/// A named component schema.
#[derive(Clone)]
pub struct ComponentDescription {
    pub name: String,
    pub ty: Type,
    pub default_value: Value,
    pub array_factory: ArrayFactory,
}

impl ComponentDescription {
    /// Describe a component stored in a [`DenseArray`], defaulting every field.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        let default_value = Value::default_for(&ty);
        Self {
            name: name.into(),
            ty,
            default_value,
            array_factory: DenseArray::create,
        }
    }

    /// Build an empty storage array for this component.
    pub fn create_array(this: &Arc<Self>) -> Box<dyn ComponentArray> {
        (this.array_factory)(Arc::clone(this))
    }

    pub fn validate(&self) -> EcsResult<()> {
        if self.name.is_empty() {
            return Err(EcsError::EmptyName { what: "component" });
        }
        self.default_value
            .check(&self.ty)
            .map_err(|source| EcsError::ComponentType {
                component: self.name.clone(),
                source,
            })
    }
}

impl fmt::Debug for ComponentDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescription")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

/// An entity slot with the components it must own.
///
/// Used both for the roles of an event and for the iterated parameters of a system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub components: Vec<String>,
}

impl Role {
    pub fn new<I, S>(name: impl Into<String>, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            components: components.into_iter().map(Into::into).collect(),
        }
    }
}

/// Contract of an event: its roles and its payload type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDescription {
    pub name: String,
    pub roles: Vec<Role>,
    pub payload: Type,
}

impl EventDescription {
    pub fn validate(&self, components: &ComponentIndex) -> EcsResult<()> {
        if self.name.is_empty() {
            return Err(EcsError::EmptyName { what: "event" });
        }
        check_registered(&self.name, self.roles.iter(), components)
    }

    /// Whether `other` describes the same contract. Role names are not compared.
    pub fn check_compatible(&self, other: &Self) -> EcsResult<()> {
        let mismatch = |reason: String| EcsError::EventMismatch {
            event: self.name.clone(),
            reason,
        };
        if self.payload != other.payload {
            return Err(mismatch(format!(
                "payload {} differs from {}",
                other.payload, self.payload
            )));
        }
        if self.roles.len() != other.roles.len() {
            return Err(mismatch(format!(
                "{} roles instead of {}",
                other.roles.len(),
                self.roles.len()
            )));
        }
        for (i, (ours, theirs)) in self.roles.iter().zip(&other.roles).enumerate() {
            if ours.components != theirs.components {
                return Err(mismatch(format!(
                    "role {i} requires [{}] instead of [{}]",
                    theirs.components.join(", "),
                    ours.components.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Executable body of a system.
///
/// Receives its own description, a view over the arrays it declared, and the event that
/// triggered it. Returns the follow-up events to dispatch.
pub type SystemFn = Arc<
    dyn Fn(
            &SystemDescription,
            &mut ArrayCombination<'_>,
            &EventWithComponent,
        ) -> Result<Vec<Event>, BoxError>
        + Send
        + Sync,
>;

/// A behavior bound to component requirements and an event.
#[derive(Clone)]
pub struct SystemDescription {
    pub name: String,
    /// Iterated entity parameters. The body runs for each combination of matching entities.
    pub params: Vec<Role>,
    pub event_listener: Option<EventDescription>,
    pub system: SystemFn,
}

impl SystemDescription {
    pub fn new<F>(
        name: impl Into<String>,
        params: Vec<Role>,
        event_listener: Option<EventDescription>,
        body: F,
    ) -> Self
    where
        F: Fn(
                &Self,
                &mut ArrayCombination<'_>,
                &EventWithComponent,
            ) -> Result<Vec<Event>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            params,
            event_listener,
            system: Arc::new(body),
        }
    }

    /// The signature: every component named by the parameters, first occurrence order.
    pub fn components(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.params.iter().flat_map(|p| &p.components) {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    /// Components named by the parameters and by the event roles.
    pub fn all_components(&self) -> Vec<&str> {
        let mut names = self.components();
        let roles = self.event_listener.iter().flat_map(|e| &e.roles);
        for name in roles.flat_map(|r| &r.components) {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    pub fn validate(&self, components: &ComponentIndex) -> EcsResult<()> {
        if self.name.is_empty() {
            return Err(EcsError::EmptyName { what: "system" });
        }
        if self.params.is_empty() || self.params.iter().any(|p| p.components.is_empty()) {
            return Err(EcsError::EmptyArgument {
                system: self.name.clone(),
            });
        }
        check_registered(&self.name, self.params.iter(), components)?;
        if let Some(event) = &self.event_listener {
            if event.name.is_empty() {
                return Err(EcsError::EmptyName { what: "event" });
            }
            check_registered(&self.name, event.roles.iter(), components)?;
        }
        Ok(())
    }

    /// Whether this system listens to the named event.
    pub fn listens_to(&self, event: &str) -> bool {
        self.event_listener.as_ref().is_some_and(|e| e.name == event)
    }
}

impl fmt::Debug for SystemDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemDescription")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("event_listener", &self.event_listener)
            .finish_non_exhaustive()
    }
}

fn check_registered<'a>(
    owner: &str,
    roles: impl Iterator<Item = &'a Role>,
    components: &ComponentIndex,
) -> EcsResult<()> {
    for name in roles.flat_map(|r| &r.components) {
        if !components.contains(name) {
            return Err(EcsError::UnregisteredComponent {
                component: name.clone(),
                owner: owner.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pivot_data::BasicType;

    use super::*;

    fn index_with(names: &[&str]) -> ComponentIndex {
        let mut index = ComponentIndex::new();
        for name in names {
            index
                .register(ComponentDescription::new(
                    *name,
                    Type::Basic(BasicType::Number),
                ))
                .unwrap();
        }
        index
    }

    fn system(name: &str, components: &[&str]) -> SystemDescription {
        SystemDescription::new(
            name,
            vec![Role::new("anyEntity", components.iter().copied())],
            None,
            |_, _, _| Ok(Vec::new()),
        )
    }

    #[test]
    fn test_valid_system_description() {
        let index = index_with(&["Position"]);
        assert!(system("Gravity", &["Position"]).validate(&index).is_ok());
    }

    #[test]
    fn test_empty_system_name() {
        let index = index_with(&["Position"]);
        let err = system("", &["Position"]).validate(&index).unwrap_err();
        assert!(err.to_string().contains("empty name"));
    }

    #[test]
    fn test_empty_system_argument() {
        let index = index_with(&["Position"]);
        let err = system("Gravity", &[]).validate(&index).unwrap_err();
        assert!(err.to_string().contains("empty argument"));
    }

    #[test]
    fn test_unregistered_component_is_named() {
        let index = index_with(&["Position"]);
        let err = system("Gravity", &["Position", "Velocity"])
            .validate(&index)
            .unwrap_err();
        assert!(err.to_string().contains("Velocity"));
    }

    #[test]
    fn test_event_roles_are_validated() {
        let index = index_with(&["Stats"]);
        let event = EventDescription {
            name: "Kill".into(),
            roles: vec![Role::new("player", ["Stats", "Inventory"])],
            payload: Type::Basic(BasicType::String),
        };
        let err = event.validate(&index).unwrap_err();
        assert!(err.to_string().contains("Inventory"));
    }

    #[test]
    fn test_compatibility_ignores_role_names() {
        let declared = EventDescription {
            name: "Kill".into(),
            roles: vec![Role::new("", ["Stats"])],
            payload: Type::Basic(BasicType::String),
        };
        let mut header = declared.clone();
        header.roles[0].name = "e".into();
        assert!(declared.check_compatible(&header).is_ok());

        header.payload = Type::Basic(BasicType::Number);
        assert!(matches!(
            declared.check_compatible(&header),
            Err(EcsError::EventMismatch { .. })
        ));
    }

    #[test]
    fn test_signature_deduplicates() {
        let mut desc = system("Pair", &["A", "B"]);
        desc.params.push(Role::new("other", ["B", "C"]));
        assert_eq!(desc.components(), vec!["A", "B", "C"]);
    }
}
