//! Serializable copies of a scene's entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Entities of a scene with their component values in interchange encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub name: String,
    #[serde(default)]
    pub entities: Vec<EntitySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Component name to encoded value.
    #[serde(default)]
    pub components: BTreeMap<String, serde_json::Value>,
}
