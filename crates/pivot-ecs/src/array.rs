//! Per-component storage.

use std::fmt;
use std::sync::Arc;

use pivot_data::Value;

use crate::{ComponentDescription, EcsError, EcsResult, Entity};

/// Storage of one component kind for every entity of a scene.
///
/// Writes are type-checked against the component's schema.
pub trait ComponentArray: Send + Sync {
    fn description(&self) -> &Arc<ComponentDescription>;

    fn get(&self, entity: Entity) -> Option<&Value>;

    /// Store `value` for `entity`, or clear the slot with `None`.
    /// Returns the previous value.
    fn set(&mut self, entity: Entity, value: Option<Value>) -> EcsResult<Option<Value>>;

    /// Entities with a value, ascending.
    fn entities(&self) -> Box<dyn Iterator<Item = Entity> + '_>;

    fn len(&self) -> usize;

    fn contains(&self, entity: Entity) -> bool {
        self.get(entity).is_some()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for dyn ComponentArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentArray")
            .field("component", &self.description().name)
            .field("len", &self.len())
            .finish()
    }
}

/// Entity-indexed slots. The default storage of every component.
pub struct DenseArray {
    description: Arc<ComponentDescription>,
    slots: Vec<Option<Value>>,
    len: usize,
}

impl DenseArray {
    #[must_use]
    pub const fn new(description: Arc<ComponentDescription>) -> Self {
        Self {
            description,
            slots: Vec::new(),
            len: 0,
        }
    }

    /// [`ArrayFactory`](crate::ArrayFactory) for dense storage.
    pub fn create(description: Arc<ComponentDescription>) -> Box<dyn ComponentArray> {
        Box::new(Self::new(description))
    }
}

impl ComponentArray for DenseArray {
    fn description(&self) -> &Arc<ComponentDescription> {
        &self.description
    }

    fn get(&self, entity: Entity) -> Option<&Value> {
        self.slots.get(entity.index())?.as_ref()
    }

    fn set(&mut self, entity: Entity, value: Option<Value>) -> EcsResult<Option<Value>> {
        if let Some(value) = &value {
            value
                .check(&self.description.ty)
                .map_err(|source| EcsError::ComponentType {
                    component: self.description.name.clone(),
                    source,
                })?;
        }

        let index = entity.index();
        if index >= self.slots.len() {
            if value.is_none() {
                return Ok(None);
            }
            self.slots.resize(index + 1, None);
        }

        let stored = value.is_some();
        let previous = std::mem::replace(&mut self.slots[index], value);
        match (previous.is_some(), stored) {
            (false, true) => self.len += 1,
            (true, false) => self.len -= 1,
            _ => {}
        }
        Ok(previous)
    }

    fn entities(&self) -> Box<dyn Iterator<Item = Entity> + '_> {
        Box::new(
            self.slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.is_some())
                .map(|(i, _)| Entity::from_raw(i as u32)),
        )
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use pivot_data::{BasicType, Record, Type};

    use super::*;

    fn stats_array() -> Box<dyn ComponentArray> {
        let description = Arc::new(ComponentDescription::new(
            "Stats",
            Type::record([("xp", Type::Basic(BasicType::Number))]),
        ));
        ComponentDescription::create_array(&description)
    }

    fn stats(xp: f64) -> Value {
        let mut record = Record::new();
        record.insert("xp".into(), Value::Number(xp));
        Value::Record(record)
    }

    #[test]
    fn test_set_and_get() {
        let mut array = stats_array();
        let e = Entity::from_raw(7);
        assert!(array.get(e).is_none());
        array.set(e, Some(stats(42.0))).unwrap();
        assert_eq!(array.get(e), Some(&stats(42.0)));
        assert_eq!(array.len(), 1);
        assert_eq!(array.entities().collect::<Vec<_>>(), vec![e]);
    }

    #[test]
    fn test_type_is_checked() {
        let mut array = stats_array();
        let err = array
            .set(Entity::from_raw(0), Some(Value::Number(1.0)))
            .unwrap_err();
        assert!(matches!(err, EcsError::ComponentType { .. }));
        assert!(array.is_empty());
    }

    #[test]
    fn test_clear_slot() {
        let mut array = stats_array();
        let e = Entity::from_raw(1);
        array.set(e, Some(stats(1.0))).unwrap();
        let previous = array.set(e, None).unwrap();
        assert_eq!(previous, Some(stats(1.0)));
        assert!(!array.contains(e));
        assert_eq!(array.len(), 0);
        assert_eq!(array.set(Entity::from_raw(99), None).unwrap(), None);
    }
}
