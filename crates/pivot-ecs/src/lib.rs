//! Pivot ECS - entities, typed component storage and event dispatch.
//!
//! # Key Concepts
//!
//! - **Entity**: an id drawn from a recycling pool, capped at [`MAX_ENTITIES`]
//! - **Component**: a named [`Type`](pivot_data::Type) schema; values live in per-scene arrays
//! - **System**: a body bound to component requirements, run when its event is sent
//! - **Event**: a named payload with entity roles, dispatched to every listening system
//!
//! Descriptions are registered into [`Indexes`] owned by the host, never into global state.
//! Each [`Scene`] assigns its own [`ComponentId`]s and owns the arrays.
//!
//! ```
//! use pivot_data::{BasicType, Type, Value};
//! use pivot_ecs::{
//!     ComponentDescription, EventDescription, Indexes, Role, Scene, SystemDescription,
//! };
//!
//! let mut indexes = Indexes::new();
//! let health = indexes
//!     .register_component(ComponentDescription::new("Health", Type::Basic(BasicType::Number)))
//!     .unwrap();
//! indexes
//!     .register_system(SystemDescription::new(
//!         "Regen",
//!         vec![Role::new("e", ["Health"])],
//!         Some(EventDescription {
//!             name: "Tick".into(),
//!             roles: Vec::new(),
//!             payload: Type::Basic(BasicType::Number),
//!         }),
//!         |_, combination, _| {
//!             let Some(id) = combination.component_id("Health") else {
//!                 return Ok(Vec::new());
//!             };
//!             for entity in combination.matching() {
//!                 combination.set(entity, id, Value::Number(100.0))?;
//!             }
//!             Ok(Vec::new())
//!         },
//!     ))
//!     .unwrap();
//!
//! let mut scene = Scene::new("level");
//! scene.register_system("Regen", &indexes).unwrap();
//! let e = scene.create_entity().unwrap();
//! let id = scene.insert(e, &health, Value::Number(1.0)).unwrap();
//!
//! let report = scene.send_event(&indexes.events, "Tick", Value::Number(0.016), vec![]).unwrap();
//! assert!(report.is_clean());
//! assert_eq!(scene.get_component(e, id).unwrap(), Some(&Value::Number(100.0)));
//! ```

mod array;
mod combination;
mod component;
mod description;
mod entity;
mod error;
mod event;
mod index;
mod manager;
mod scene;
mod scene_manager;
mod snapshot;

pub use array::{ComponentArray, DenseArray};
pub use combination::ArrayCombination;
pub use component::{ComponentId, MAX_COMPONENTS, Signature};
pub use description::{
    ArrayFactory, ComponentDescription, EventDescription, Role, SystemDescription, SystemFn,
};
pub use entity::{Entity, EntityManager, MAX_ENTITIES};
pub use error::{BoxError, EcsError, EcsResult, ErrorKind};
pub use event::{ComponentRef, DispatchConfig, DispatchReport, Event, EventWithComponent};
pub use index::{ComponentIndex, Described, EventIndex, Index, Indexes, SystemIndex};
pub use manager::ComponentManager;
pub use scene::Scene;
pub use scene_manager::{SceneId, SceneManager};
pub use snapshot::{EntitySnapshot, SceneSnapshot};
