//! Per-scene component storage.

use std::sync::Arc;

use hashbrown::HashMap;
use pivot_data::Value;
use tracing::debug;

use crate::{
    ComponentArray, ComponentDescription, ComponentId, EcsError, EcsResult, Entity,
    MAX_COMPONENTS,
};

/// Owns one array per component kind registered in a scene.
///
/// Component ids are assigned here in registration order, so the same component may
/// have different ids in different scenes. Arrays are created on the first write.
#[derive(Debug, Default)]
pub struct ComponentManager {
    descriptions: Vec<Arc<ComponentDescription>>,
    arrays: Vec<Option<Box<dyn ComponentArray>>>,
    ids: HashMap<String, ComponentId>,
}

impl ComponentManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component kind, returning its id. Registering a known name again
    /// returns the existing id.
    pub fn register(&mut self, description: &Arc<ComponentDescription>) -> EcsResult<ComponentId> {
        if let Some(&id) = self.ids.get(&description.name) {
            return Ok(id);
        }
        if self.descriptions.len() >= MAX_COMPONENTS {
            return Err(EcsError::TooManyComponents {
                max: MAX_COMPONENTS,
            });
        }
        let id = ComponentId::from_raw(self.descriptions.len() as u32);
        debug!(component = %description.name, ?id, "component registered in scene");
        self.ids.insert(description.name.clone(), id);
        self.descriptions.push(Arc::clone(description));
        self.arrays.push(None);
        Ok(id)
    }

    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.ids.get(name).copied()
    }

    pub fn description(&self, id: ComponentId) -> EcsResult<&Arc<ComponentDescription>> {
        self.descriptions
            .get(id.index())
            .ok_or(EcsError::UnknownComponentId(id))
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        (0..self.descriptions.len()).map(|i| ComponentId::from_raw(i as u32))
    }

    /// Store `value` for `entity`, replacing any previous value.
    pub fn add(&mut self, entity: Entity, id: ComponentId, value: Value) -> EcsResult<()> {
        self.array_mut(id)?.set(entity, Some(value))?;
        Ok(())
    }

    /// Overwrite a value the entity already owns.
    pub fn set(&mut self, entity: Entity, id: ComponentId, value: Value) -> EcsResult<()> {
        if self.get(entity, id).is_none() {
            return Err(EcsError::MissingComponent {
                entity,
                component: self.description(id)?.name.clone(),
            });
        }
        self.add(entity, id, value)
    }

    pub fn remove(&mut self, entity: Entity, id: ComponentId) -> EcsResult<Option<Value>> {
        self.description(id)?;
        match &mut self.arrays[id.index()] {
            Some(array) => array.set(entity, None),
            None => Ok(None),
        }
    }

    pub fn get(&self, entity: Entity, id: ComponentId) -> Option<&Value> {
        self.array(id)?.get(entity)
    }

    pub fn contains(&self, entity: Entity, id: ComponentId) -> bool {
        self.get(entity, id).is_some()
    }

    /// Full array of a component, if anything was ever stored in it.
    pub fn array(&self, id: ComponentId) -> Option<&dyn ComponentArray> {
        self.arrays.get(id.index())?.as_deref()
    }

    fn array_mut(&mut self, id: ComponentId) -> EcsResult<&mut Box<dyn ComponentArray>> {
        let description = self.description(id)?;
        let description = Arc::clone(description);
        Ok(self.arrays[id.index()]
            .get_or_insert_with(|| ComponentDescription::create_array(&description)))
    }

    /// Every component value owned by `entity`, in id order.
    pub fn all_components(&self, entity: Entity) -> Vec<(ComponentId, &Value)> {
        self.ids()
            .filter_map(|id| self.get(entity, id).map(|value| (id, value)))
            .collect()
    }

    /// Drop every value owned by a destroyed entity.
    pub fn entity_destroyed(&mut self, entity: Entity) -> EcsResult<()> {
        for array in self.arrays.iter_mut().flatten() {
            array.set(entity, None)?;
        }
        Ok(())
    }
}
