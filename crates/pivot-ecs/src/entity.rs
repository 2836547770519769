//! Entity identifiers and their allocation.
//!
//! Ids are plain indices. A destroyed id goes back into a pool and the smallest
//! pooled id is always handed out first, so ids stay dense.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{EcsError, EcsResult, Signature};

/// Upper bound on simultaneously live entities.
pub const MAX_ENTITIES: u32 = 5000;

/// Handle of a game object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(u32);

impl Entity {
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Slot of this entity in dense per-entity storage.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocates entity ids and tracks the signature of each live entity.
#[derive(Debug, Clone)]
pub struct EntityManager {
    /// Exclusive upper bound for ids.
    capacity: u32,
    /// Destroyed ids below `next_fresh`, ready for reuse.
    free: BTreeSet<u32>,
    /// Lowest id never handed out.
    next_fresh: u32,
    /// Signature per slot; `None` when the slot is not alive.
    signatures: Vec<Option<Signature>>,
    alive_count: u32,
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityManager {
    /// Create a manager capped at [`MAX_ENTITIES`].
    #[must_use]
    pub const fn new() -> Self {
        Self::with_capacity(MAX_ENTITIES)
    }

    /// Create a manager with a custom cap.
    #[must_use]
    pub const fn with_capacity(capacity: u32) -> Self {
        Self {
            capacity,
            free: BTreeSet::new(),
            next_fresh: 0,
            signatures: Vec::new(),
            alive_count: 0,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Allocate the smallest available id.
    pub fn create(&mut self) -> EcsResult<Entity> {
        let id = if let Some(id) = self.free.pop_first() {
            id
        } else if self.next_fresh < self.capacity {
            self.next_fresh += 1;
            self.signatures.push(None);
            self.next_fresh - 1
        } else {
            return Err(EcsError::TooManyEntities);
        };

        self.signatures[id as usize] = Some(Signature::EMPTY);
        self.alive_count += 1;
        Ok(Entity(id))
    }

    /// Release an id and clear its signature.
    pub fn destroy(&mut self, entity: Entity) -> EcsResult<()> {
        self.check_alive(entity)?;
        self.signatures[entity.index()] = None;
        self.free.insert(entity.0);
        self.alive_count -= 1;
        Ok(())
    }

    /// Fail unless `entity` is in range and alive.
    pub fn check_alive(&self, entity: Entity) -> EcsResult<()> {
        if entity.0 >= self.capacity {
            return Err(EcsError::EntityOutOfRange(entity));
        }
        if self.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::EntityNotAlive(entity))
        }
    }

    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        matches!(self.signatures.get(entity.index()), Some(Some(_)))
    }

    pub fn signature(&self, entity: Entity) -> EcsResult<Signature> {
        self.check_alive(entity)?;
        Ok(self.signatures[entity.index()].unwrap_or_default())
    }

    pub fn set_signature(&mut self, entity: Entity, signature: Signature) -> EcsResult<()> {
        self.check_alive(entity)?;
        self.signatures[entity.index()] = Some(signature);
        Ok(())
    }

    /// Number of live entities.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.alive_count as usize
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.alive_count == 0
    }

    /// Live entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.signatures
            .iter()
            .enumerate()
            .filter(|(_, signature)| signature.is_some())
            .map(|(id, _)| Entity(id as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComponentId;

    #[test]
    fn test_ids_are_sequential() {
        let mut entities = EntityManager::new();
        let a = entities.create().unwrap();
        let b = entities.create().unwrap();
        assert_eq!(a.id(), 0);
        assert_eq!(b.id(), 1);
        assert_eq!(entities.len(), 2);
    }

    #[test]
    fn test_smallest_free_id_is_reused() {
        let mut entities = EntityManager::new();
        let ids: Vec<_> = (0..5).map(|_| entities.create().unwrap()).collect();
        entities.destroy(ids[3]).unwrap();
        entities.destroy(ids[1]).unwrap();
        assert_eq!(entities.create().unwrap(), ids[1]);
        assert_eq!(entities.create().unwrap(), ids[3]);
        assert_eq!(entities.create().unwrap().id(), 5);
    }

    #[test]
    fn test_cap_is_enforced() {
        let mut entities = EntityManager::new();
        for _ in 0..MAX_ENTITIES {
            entities.create().unwrap();
        }
        let err = entities.create().unwrap_err();
        assert!(matches!(err, EcsError::TooManyEntities));
        assert_eq!(err.to_string(), "too many entities in existence");
    }

    #[test]
    fn test_destroyed_id_is_creatable_once() {
        let mut entities = EntityManager::with_capacity(3);
        let ids: Vec<_> = (0..3).map(|_| entities.create().unwrap()).collect();
        assert!(entities.create().is_err());

        entities.destroy(ids[2]).unwrap();
        assert_eq!(entities.create().unwrap(), ids[2]);
        assert!(entities.create().is_err());
    }

    #[test]
    fn test_out_of_range_access() {
        let mut entities = EntityManager::new();
        let far = Entity::from_raw(MAX_ENTITIES);
        assert!(matches!(
            entities.destroy(far),
            Err(EcsError::EntityOutOfRange(_))
        ));
        assert!(matches!(
            entities.signature(far),
            Err(EcsError::EntityOutOfRange(_))
        ));
        assert!(matches!(
            entities.signature(Entity::from_raw(4)),
            Err(EcsError::EntityNotAlive(_))
        ));
    }

    #[test]
    fn test_destroy_clears_signature() {
        let mut entities = EntityManager::new();
        let e = entities.create().unwrap();
        let id = ComponentId::from_raw(2);
        entities
            .set_signature(e, Signature::EMPTY.with(id))
            .unwrap();
        entities.destroy(e).unwrap();

        let again = entities.create().unwrap();
        assert_eq!(again, e);
        assert_eq!(entities.signature(again).unwrap(), Signature::EMPTY);
    }

    #[test]
    fn test_iter_skips_dead() {
        let mut entities = EntityManager::new();
        let ids: Vec<_> = (0..4).map(|_| entities.create().unwrap()).collect();
        entities.destroy(ids[2]).unwrap();
        let alive: Vec<_> = entities.iter().collect();
        assert_eq!(alive, vec![ids[0], ids[1], ids[3]]);
    }
}
