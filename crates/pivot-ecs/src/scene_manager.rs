//! Registry of the scenes a host keeps loaded.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::{EcsError, EcsResult, Scene};

/// Identifier of a scene in a [`SceneManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(u32);

impl SceneId {
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct SceneManager {
    scenes: BTreeMap<SceneId, Scene>,
    next_id: u32,
    current: Option<SceneId>,
}

impl SceneManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a scene. The first registered scene becomes current.
    pub fn register(&mut self, scene: Scene) -> SceneId {
        let id = SceneId(self.next_id);
        self.next_id += 1;
        debug!(%id, scene = scene.name(), "scene registered");
        self.scenes.insert(id, scene);
        self.current.get_or_insert(id);
        id
    }

    /// Remove a scene. Unregistering the current scene leaves no scene current.
    pub fn unregister(&mut self, id: SceneId) -> EcsResult<Scene> {
        let scene = self
            .scenes
            .remove(&id)
            .ok_or(EcsError::UnknownScene(id.0))?;
        if self.current == Some(id) {
            self.current = None;
        }
        Ok(scene)
    }

    pub fn set_current(&mut self, id: SceneId) -> EcsResult<()> {
        if !self.scenes.contains_key(&id) {
            return Err(EcsError::UnknownScene(id.0));
        }
        self.current = Some(id);
        Ok(())
    }

    pub const fn current_id(&self) -> Option<SceneId> {
        self.current
    }

    pub fn current(&self) -> Option<&Scene> {
        self.scenes.get(&self.current?)
    }

    pub fn current_mut(&mut self) -> Option<&mut Scene> {
        self.scenes.get_mut(&self.current?)
    }

    pub fn get(&self, id: SceneId) -> EcsResult<&Scene> {
        self.scenes.get(&id).ok_or(EcsError::UnknownScene(id.0))
    }

    pub fn get_mut(&mut self, id: SceneId) -> EcsResult<&mut Scene> {
        self.scenes.get_mut(&id).ok_or(EcsError::UnknownScene(id.0))
    }

    /// Id of the first scene with this name.
    pub fn find(&self, name: &str) -> Option<SceneId> {
        self.scenes
            .iter()
            .find(|(_, scene)| scene.name() == name)
            .map(|(&id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_scene_is_current() {
        let mut manager = SceneManager::new();
        let menu = manager.register(Scene::new("menu"));
        let level = manager.register(Scene::new("level"));
        assert_eq!(manager.current_id(), Some(menu));

        manager.set_current(level).unwrap();
        assert_eq!(manager.current().map(Scene::name), Some("level"));
        assert_eq!(manager.find("menu"), Some(menu));
    }

    #[test]
    fn test_unregister_current() {
        let mut manager = SceneManager::new();
        let id = manager.register(Scene::new("only"));
        let scene = manager.unregister(id).unwrap();
        assert_eq!(scene.name(), "only");
        assert!(manager.current().is_none());
        assert!(manager.is_empty());
        assert!(matches!(
            manager.set_current(id),
            Err(EcsError::UnknownScene(_))
        ));
        assert!(manager.get(id).is_err());
    }
}
