//! Scenes: entities, their components and the systems that run on them.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use hashbrown::HashMap;
use pivot_data::Value;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::{
    ArrayCombination, ComponentArray, ComponentDescription, ComponentId, ComponentIndex,
    ComponentManager, ComponentRef, DispatchConfig, DispatchReport, EcsError, EcsResult, Entity,
    EntityManager, EntitySnapshot, Event, EventIndex, EventWithComponent, Indexes, SceneSnapshot,
    Signature, SystemDescription,
};

/// Snapshot entities decoded against their schemas, waiting to be created.
type Decoded<'a> = Vec<(Option<&'a str>, Vec<(&'a Arc<ComponentDescription>, Value)>)>;

#[derive(Debug)]
struct RegisteredSystem {
    description: Arc<SystemDescription>,
    /// Ids of every component the system reads, parameters and event roles alike.
    components: SmallVec<[ComponentId; 8]>,
}

/// A world of entities.
///
/// A scene is the sole writer of its component arrays. Descriptions come from the host's
/// [`Indexes`]; the scene only keeps the ids it assigned to them.
#[derive(Debug)]
pub struct Scene {
    name: String,
    entities: EntityManager,
    components: ComponentManager,
    systems: Vec<RegisteredSystem>,
    /// Named entities, by name.
    name_index: BTreeMap<String, Entity>,
    entity_names: HashMap<Entity, String>,
    config: DispatchConfig,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, DispatchConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: DispatchConfig) -> Self {
        Self {
            name: name.into(),
            entities: EntityManager::new(),
            components: ComponentManager::new(),
            systems: Vec::new(),
            name_index: BTreeMap::new(),
            entity_names: HashMap::new(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn config(&self) -> DispatchConfig {
        self.config
    }

    pub fn set_config(&mut self, config: DispatchConfig) {
        self.config = config;
    }

    pub const fn components(&self) -> &ComponentManager {
        &self.components
    }

    // Entities

    pub fn create_entity(&mut self) -> EcsResult<Entity> {
        let entity = self.entities.create()?;
        trace!(scene = %self.name, %entity, "entity created");
        Ok(entity)
    }

    /// Create an entity reachable through [`Scene::find_entity`].
    pub fn create_named_entity(&mut self, name: impl Into<String>) -> EcsResult<Entity> {
        let name = name.into();
        if self.name_index.contains_key(&name) {
            return Err(EcsError::AlreadyRegistered {
                what: "entity",
                name,
            });
        }
        let entity = self.create_entity()?;
        self.name_index.insert(name.clone(), entity);
        self.entity_names.insert(entity, name);
        Ok(entity)
    }

    /// Destroy an entity and drop all of its component values.
    pub fn destroy_entity(&mut self, entity: Entity) -> EcsResult<()> {
        self.entities.destroy(entity)?;
        self.components.entity_destroyed(entity)?;
        if let Some(name) = self.entity_names.remove(&entity) {
            self.name_index.remove(&name);
        }
        trace!(scene = %self.name, %entity, "entity destroyed");
        Ok(())
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Live entities, ascending.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    pub const fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Display name of an entity. Unnamed entities are called `Entity <id>`.
    pub fn entity_name(&self, entity: Entity) -> String {
        self.entity_names
            .get(&entity)
            .cloned()
            .unwrap_or_else(|| format!("Entity {entity}"))
    }

    pub fn find_entity(&self, name: &str) -> Option<Entity> {
        self.name_index.get(name).copied()
    }

    pub fn signature(&self, entity: Entity) -> EcsResult<Signature> {
        self.entities.signature(entity)
    }

    // Components

    /// Make a component kind known to this scene.
    pub fn register_component(
        &mut self,
        description: &Arc<ComponentDescription>,
    ) -> EcsResult<ComponentId> {
        self.components.register(description)
    }

    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.components.component_id(name)
    }

    /// Attach (or replace) a component value. The value must match the component's type.
    pub fn add_component(
        &mut self,
        entity: Entity,
        id: ComponentId,
        value: Value,
    ) -> EcsResult<()> {
        let signature = self.entities.signature(entity)?;
        self.components.add(entity, id, value)?;
        self.entities.set_signature(entity, signature.with(id))
    }

    /// Register the component if needed and attach a value.
    pub fn insert(
        &mut self,
        entity: Entity,
        description: &Arc<ComponentDescription>,
        value: Value,
    ) -> EcsResult<ComponentId> {
        let id = self.register_component(description)?;
        self.add_component(entity, id, value)?;
        Ok(id)
    }

    pub fn remove_component(
        &mut self,
        entity: Entity,
        id: ComponentId,
    ) -> EcsResult<Option<Value>> {
        let signature = self.entities.signature(entity)?;
        let previous = self.components.remove(entity, id)?;
        self.entities.set_signature(entity, signature.without(id))?;
        Ok(previous)
    }

    pub fn get_component(&self, entity: Entity, id: ComponentId) -> EcsResult<Option<&Value>> {
        self.entities.check_alive(entity)?;
        Ok(self.components.get(entity, id))
    }

    pub fn component_array(&self, id: ComponentId) -> Option<&dyn ComponentArray> {
        self.components.array(id)
    }

    /// Every component of an entity with its name.
    pub fn all_components(&self, entity: Entity) -> EcsResult<Vec<(&str, &Value)>> {
        self.entities.check_alive(entity)?;
        let mut named = Vec::new();
        for (id, value) in self.components.all_components(entity) {
            named.push((self.components.description(id)?.name.as_str(), value));
        }
        Ok(named)
    }

    // Systems

    /// Enable a system of the host's index in this scene.
    pub fn register_system(&mut self, name: &str, indexes: &Indexes) -> EcsResult<()> {
        let description = indexes
            .systems
            .get(name)
            .ok_or_else(|| EcsError::UnregisteredSystem(name.to_string()))?;
        if self.has_system(name) {
            return Err(EcsError::AlreadyRegistered {
                what: "system",
                name: name.to_string(),
            });
        }

        let mut components = SmallVec::new();
        for component in description.all_components() {
            let component_description = indexes.components.get(component).ok_or_else(|| {
                EcsError::UnregisteredComponent {
                    component: component.to_string(),
                    owner: name.to_string(),
                }
            })?;
            components.push(self.components.register(component_description)?);
        }

        debug!(scene = %self.name, system = name, "system registered in scene");
        self.systems.push(RegisteredSystem {
            description: Arc::clone(description),
            components,
        });
        Ok(())
    }

    pub fn has_system(&self, name: &str) -> bool {
        self.systems.iter().any(|s| s.description.name == name)
    }

    /// Registered systems, in registration order.
    pub fn systems(&self) -> impl Iterator<Item = &Arc<SystemDescription>> {
        self.systems.iter().map(|s| &s.description)
    }

    // Events

    /// Send an event and drain every follow-up event it causes.
    pub fn send_event(
        &mut self,
        events: &EventIndex,
        name: &str,
        payload: Value,
        targets: Vec<Entity>,
    ) -> EcsResult<DispatchReport> {
        self.dispatch(events, Event::new(name, targets, payload))
    }

    /// Dispatch an event to every listening system, in system registration order.
    ///
    /// The sent event is checked before anything runs and a bad one fails the whole call.
    /// Follow-up events are processed breadth-first; a failing system or a rejected
    /// follow-up is recorded in the report and dispatch continues.
    ///
    /// Exceeding the [`DispatchConfig`] bounds aborts the call once the current event has
    /// reached all of its systems. The error carries the report of what ran.
    pub fn dispatch(&mut self, events: &EventIndex, event: Event) -> EcsResult<DispatchReport> {
        self.check_event(events, &event)?;

        let max_depth = self.config.max_cascade_depth;
        let mut report = DispatchReport::default();
        let mut queue = VecDeque::from([(event, 0_usize)]);
        while let Some((event, depth)) = queue.pop_front() {
            if report.dispatched.len() >= self.config.max_events {
                return Err(EcsError::CascadeOverflow {
                    max: self.config.max_events,
                    report: Box::new(report),
                });
            }
            if depth > 0 {
                if let Err(err) = self.check_event(events, &event) {
                    warn!(event = %event.name, error = %err, "follow-up event rejected");
                    report.failures.push(err);
                    continue;
                }
            }

            trace!(event = %event.name, depth, "dispatching event");
            let mut too_deep = None;
            for index in 0..self.systems.len() {
                if !self.systems[index].description.listens_to(&event.name) {
                    continue;
                }
                match self.invoke(index, &event) {
                    Ok(follow_ups) => {
                        report.invocations += 1;
                        for next in follow_ups {
                            if depth < max_depth {
                                queue.push_back((next, depth + 1));
                            } else if too_deep.is_none() {
                                too_deep = Some(next.name);
                            }
                        }
                    }
                    Err(err) => {
                        warn!(event = %event.name, error = %err, "system failed");
                        report.failures.push(err);
                    }
                }
            }
            report.dispatched.push(event);

            if let Some(event) = too_deep {
                return Err(EcsError::CascadeDepthExceeded {
                    event,
                    max: max_depth,
                    report: Box::new(report),
                });
            }
        }
        Ok(report)
    }

    fn check_event(&self, events: &EventIndex, event: &Event) -> EcsResult<()> {
        let description = events
            .get(&event.name)
            .ok_or_else(|| EcsError::UnregisteredEvent(event.name.clone()))?;

        let found = event.payload.type_of();
        if found != description.payload {
            return Err(EcsError::PayloadType {
                event: event.name.clone(),
                expected: description.payload.clone(),
                found,
            });
        }
        if event.entities.len() < description.roles.len() {
            return Err(EcsError::MissingTargets {
                event: event.name.clone(),
                expected: description.roles.len(),
                found: event.entities.len(),
            });
        }
        for &entity in &event.entities {
            self.entities.check_alive(entity)?;
        }
        for (role, &entity) in description.roles.iter().zip(&event.entities) {
            self.bind_role(entity, &role.components)?;
        }
        Ok(())
    }

    fn bind_role(&self, entity: Entity, components: &[String]) -> EcsResult<Vec<ComponentRef>> {
        components
            .iter()
            .map(|name| {
                self.components
                    .component_id(name)
                    .filter(|&id| self.components.contains(entity, id))
                    .map(|component| ComponentRef { entity, component })
                    .ok_or_else(|| EcsError::MissingComponent {
                        entity,
                        component: name.clone(),
                    })
            })
            .collect()
    }

    fn invoke(&mut self, index: usize, event: &Event) -> EcsResult<Vec<Event>> {
        let registered = &self.systems[index];
        let description = Arc::clone(&registered.description);
        let ids = registered.components.clone();

        let roles = description
            .event_listener
            .as_ref()
            .map_or(&[][..], |listener| listener.roles.as_slice());
        let mut components = Vec::with_capacity(roles.len());
        for (i, role) in roles.iter().enumerate() {
            let entity = event
                .entities
                .get(i)
                .copied()
                .ok_or_else(|| EcsError::MissingTargets {
                    event: event.name.clone(),
                    expected: roles.len(),
                    found: event.entities.len(),
                })?;
            components.push(self.bind_role(entity, &role.components)?);
        }
        let bound = EventWithComponent {
            event: event.clone(),
            components,
        };

        trace!(system = %description.name, event = %event.name, "invoking system");
        let mut combination = ArrayCombination::new(&mut self.components, &self.entities, ids);
        (description.system)(&description, &mut combination, &bound).map_err(|source| {
            EcsError::SystemFailed {
                system: description.name.clone(),
                source,
            }
        })
    }

    // Snapshots

    /// Copy every live entity and its components.
    pub fn snapshot(&self) -> EcsResult<SceneSnapshot> {
        let mut entities = Vec::with_capacity(self.entities.len());
        for entity in self.entities.iter() {
            let mut components = BTreeMap::new();
            for (id, value) in self.components.all_components(entity) {
                let name = self.components.description(id)?.name.clone();
                components.insert(name, value.to_json()?);
            }
            entities.push(EntitySnapshot {
                name: self.entity_names.get(&entity).cloned(),
                components,
            });
        }
        Ok(SceneSnapshot {
            name: self.name.clone(),
            entities,
        })
    }

    /// Create the entities of a snapshot in this scene. Values are decoded against the
    /// schemas of `index` before any entity is created.
    pub fn load_snapshot(
        &mut self,
        snapshot: &SceneSnapshot,
        index: &ComponentIndex,
    ) -> EcsResult<Vec<Entity>> {
        let mut decoded = Vec::with_capacity(snapshot.entities.len());
        for entity in &snapshot.entities {
            let mut values = Vec::with_capacity(entity.components.len());
            for (name, json) in &entity.components {
                let description =
                    index
                        .get(name)
                        .ok_or_else(|| EcsError::UnregisteredComponent {
                            component: name.clone(),
                            owner: snapshot.name.clone(),
                        })?;
                let value = Value::from_json_typed(json, &description.ty).map_err(|source| {
                    EcsError::ComponentType {
                        component: name.clone(),
                        source,
                    }
                })?;
                values.push((description, value));
            }
            decoded.push((entity.name.as_deref(), values));
        }

        let mut created = Vec::with_capacity(decoded.len());
        if let Err(err) = self.create_decoded(decoded, &mut created) {
            for entity in created {
                if let Err(cleanup) = self.destroy_entity(entity) {
                    warn!(
                        scene = %self.name,
                        %entity,
                        error = %cleanup,
                        "snapshot rollback failed"
                    );
                }
            }
            return Err(err);
        }
        debug!(scene = %self.name, count = created.len(), "snapshot loaded");
        Ok(created)
    }

    /// Pushes each entity to `created` as soon as it exists so a failed load can be undone.
    fn create_decoded(
        &mut self,
        decoded: Decoded<'_>,
        created: &mut Vec<Entity>,
    ) -> EcsResult<()> {
        for (name, values) in decoded {
            let entity = match name {
                Some(name) => self.create_named_entity(name)?,
                None => self.create_entity()?,
            };
            created.push(entity);
            for (description, value) in values {
                self.insert(entity, description, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pivot_data::{BasicType, Record, Type};

    use super::*;

    fn health() -> Arc<ComponentDescription> {
        Arc::new(ComponentDescription::new(
            "Health",
            Type::record([("hp", Type::Basic(BasicType::Number))]),
        ))
    }

    fn hp(value: f64) -> Value {
        let mut record = Record::new();
        record.insert("hp".into(), Value::Number(value));
        Value::Record(record)
    }

    #[test]
    fn test_add_component_updates_signature() {
        let mut scene = Scene::new("test");
        let e = scene.create_entity().unwrap();
        let id = scene.insert(e, &health(), hp(10.0)).unwrap();
        assert!(scene.signature(e).unwrap().contains(id));
        assert_eq!(scene.get_component(e, id).unwrap(), Some(&hp(10.0)));

        scene.remove_component(e, id).unwrap();
        assert!(!scene.signature(e).unwrap().contains(id));
        assert_eq!(scene.get_component(e, id).unwrap(), None);
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let mut scene = Scene::new("test");
        let e = scene.create_entity().unwrap();
        let id = scene.register_component(&health()).unwrap();
        let err = scene
            .add_component(e, id, Value::Number(1.0))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Type);
        assert!(!scene.signature(e).unwrap().contains(id));
    }

    #[test]
    fn test_destroy_clears_values_and_names() {
        let mut scene = Scene::new("test");
        let e = scene.create_named_entity("player").unwrap();
        let id = scene.insert(e, &health(), hp(3.0)).unwrap();
        assert_eq!(scene.find_entity("player"), Some(e));
        assert_eq!(scene.entity_name(e), "player");

        scene.destroy_entity(e).unwrap();
        assert_eq!(scene.find_entity("player"), None);

        let again = scene.create_entity().unwrap();
        assert_eq!(again, e);
        assert_eq!(scene.get_component(again, id).unwrap(), None);
        assert_eq!(scene.entity_name(again), format!("Entity {}", again.id()));
    }

    #[test]
    fn test_duplicate_entity_name() {
        let mut scene = Scene::new("test");
        scene.create_named_entity("player").unwrap();
        assert!(matches!(
            scene.create_named_entity("player"),
            Err(EcsError::AlreadyRegistered { what: "entity", .. })
        ));
        assert_eq!(scene.entity_count(), 1);
    }

    #[test]
    fn test_all_components_by_name() {
        let mut scene = Scene::new("test");
        let e = scene.create_entity().unwrap();
        scene.insert(e, &health(), hp(1.0)).unwrap();
        let all = scene.all_components(e).unwrap();
        assert_eq!(all, vec![("Health", &hp(1.0))]);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut index = ComponentIndex::new();
        let description = index
            .register(ComponentDescription::new(
                "Health",
                Type::record([("hp", Type::Basic(BasicType::Number))]),
            ))
            .unwrap();

        let mut scene = Scene::new("level");
        let a = scene.create_named_entity("hero").unwrap();
        scene.insert(a, &description, hp(42.0)).unwrap();
        scene.create_entity().unwrap();

        let snapshot = scene.snapshot().unwrap();
        let text = serde_json::to_string(&snapshot).unwrap();
        let parsed: SceneSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, snapshot);

        let mut copy = Scene::new("copy");
        let created = copy.load_snapshot(&parsed, &index).unwrap();
        assert_eq!(created.len(), 2);
        let hero = copy.find_entity("hero").unwrap();
        let id = copy.component_id("Health").unwrap();
        assert_eq!(copy.get_component(hero, id).unwrap(), Some(&hp(42.0)));
    }

    #[test]
    fn test_load_snapshot_checks_before_creating() {
        let index = ComponentIndex::new();
        let snapshot: SceneSnapshot = serde_json::from_str(
            r#"{ "name": "bad", "entities": [ {}, { "components": { "Ghost": 1 } } ] }"#,
        )
        .unwrap();
        let mut scene = Scene::new("target");
        assert!(scene.load_snapshot(&snapshot, &index).is_err());
        assert_eq!(scene.entity_count(), 0);
    }
}
