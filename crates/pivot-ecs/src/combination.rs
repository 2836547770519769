//! Joined view over the arrays a system works on.

use pivot_data::Value;
use smallvec::SmallVec;

use crate::{ComponentId, ComponentManager, EcsError, EcsResult, Entity, EntityManager, Signature};

/// Read/write view joining the arrays of the components a system declared.
///
/// Components outside the view are invisible: reads return `None` and writes fail.
/// Entities are matched through their signatures.
pub struct ArrayCombination<'a> {
    manager: &'a mut ComponentManager,
    entities: &'a EntityManager,
    components: SmallVec<[ComponentId; 8]>,
}

impl<'a> ArrayCombination<'a> {
    pub fn new(
        manager: &'a mut ComponentManager,
        entities: &'a EntityManager,
        components: impl IntoIterator<Item = ComponentId>,
    ) -> Self {
        Self {
            manager,
            entities,
            components: components.into_iter().collect(),
        }
    }

    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Id of a component in this view, by name.
    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.manager
            .component_id(name)
            .filter(|id| self.components.contains(id))
    }

    /// Name of a component in this view.
    pub fn component_name(&self, id: ComponentId) -> Option<&str> {
        if !self.components.contains(&id) {
            return None;
        }
        self.manager.description(id).ok().map(|d| d.name.as_str())
    }

    /// Entities whose signature covers every component in `ids`, ascending.
    ///
    /// Entities owning only some of them are skipped.
    pub fn matching_entities(&self, ids: &[ComponentId]) -> Vec<Entity> {
        if ids.is_empty() || !ids.iter().all(|id| self.components.contains(id)) {
            return Vec::new();
        }
        let required = Signature::of(ids.iter().copied());
        self.entities
            .iter()
            .filter(|&entity| {
                self.entities
                    .signature(entity)
                    .is_ok_and(|signature| signature.matches(required))
            })
            .collect()
    }

    /// Entities that own every component of the view.
    pub fn matching(&self) -> Vec<Entity> {
        self.matching_entities(&self.components)
    }

    pub fn get(&self, entity: Entity, id: ComponentId) -> Option<&Value> {
        if self.components.contains(&id) {
            self.manager.get(entity, id)
        } else {
            None
        }
    }

    /// Write back a value the entity already owns. The value is type-checked.
    pub fn set(&mut self, entity: Entity, id: ComponentId, value: Value) -> EcsResult<()> {
        if !self.components.contains(&id) {
            return Err(EcsError::UnknownComponentId(id));
        }
        self.manager.set(entity, id, value)
    }
}
