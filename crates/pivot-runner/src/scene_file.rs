//! JSON scene files: the entities to create and the events to send.

use std::fs;
use std::path::Path;

use eyre::WrapErr;
use pivot_ecs::SceneSnapshot;
use serde::Deserialize;

/// A snapshot plus a list of events to send once it is loaded.
#[derive(Debug, Deserialize)]
pub struct SceneFile {
    #[serde(flatten)]
    pub snapshot: SceneSnapshot,
    #[serde(default)]
    pub events: Vec<ScriptedEvent>,
}

/// An event to send. Targets are entity names.
#[derive(Debug, Deserialize)]
pub struct ScriptedEvent {
    pub name: String,
    /// Encoded payload; the event's default payload when absent.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub targets: Vec<String>,
}

impl SceneFile {
    pub fn read(path: &Path) -> eyre::Result<Self> {
        let text = fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read scene {}", path.display()))?;
        serde_json::from_str(&text).wrap_err_with(|| format!("invalid scene {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scene_file() {
        let file: SceneFile = serde_json::from_str(
            r#"{
                "name": "arena",
                "entities": [
                    { "name": "hero", "components": { "Stats": { "xp": 42 } } },
                    { "components": {} }
                ],
                "events": [
                    { "name": "Kill", "payload": "Thrax", "targets": ["hero"] },
                    { "name": "Tick" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(file.snapshot.name, "arena");
        assert_eq!(file.snapshot.entities.len(), 2);
        assert_eq!(file.snapshot.entities[0].name.as_deref(), Some("hero"));
        assert_eq!(file.events[0].targets, vec!["hero"]);
        assert_eq!(file.events[1].payload, None);
    }
}
