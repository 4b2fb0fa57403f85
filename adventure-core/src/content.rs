//! Scene graph content: scenes, choices and their effects.
//!
//! Content is loaded once, validated, and then shared read-only for the
//! lifetime of the process. Every reference between scenes is checked at
//! load time so gameplay lookups never meet a dangling edge.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Key of the implicit pseudo-scene used when the current scene cannot be found.
///
/// Choices may target it explicitly; content may not declare a scene with it.
pub const LOST_SCENE_KEY: &str = "lost";

/// The adventure bundled with the crate.
const BUILTIN_CONTENT: &str = include_str!("../content/sunken_light.json");

/// Errors from loading or validating content.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Content declares no scenes")]
    Empty,

    #[error("Scene key '{0}' is declared more than once")]
    DuplicateScene(String),

    #[error("Scene key '{0}' is reserved")]
    ReservedKey(String),

    #[error("Scene '{scene}' declares choice '{choice}' more than once")]
    DuplicateChoice { scene: String, choice: String },

    #[error("Scene '{scene}' has invalid choice id '{choice}' (ids must be lowercase with no whitespace)")]
    InvalidChoiceId { scene: String, choice: String },

    #[error("Choice '{choice}' in scene '{scene}' leads to unknown scene '{target}'")]
    DanglingReference {
        scene: String,
        choice: String,
        target: String,
    },

    #[error("Start scene '{0}' does not exist")]
    MissingStart(String),
}

/// A deterministic append to the session's continuity data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Append a line to the journal.
    AddJournal(String),
    /// Append an item id to the inventory.
    AddInventory(String),
}

/// A labeled edge from one scene to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub description: String,
    #[serde(rename = "result")]
    pub result_scene_key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
}

impl Choice {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        result_scene_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            result_scene_key: result_scene_key.into(),
            effects: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// A node in the content graph. Choices keep their declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub key: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl Scene {
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            description: description.into(),
            choices: Vec::new(),
        }
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    /// Look up a choice by id.
    pub fn choice(&self, id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == id)
    }
}

/// On-disk shape of a content file.
#[derive(Debug, Deserialize)]
struct ContentFile {
    title: String,
    start: String,
    scenes: Vec<Scene>,
}

/// The immutable, validated content graph.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    title: String,
    start: String,
    scenes: Vec<Scene>,
    index: HashMap<String, usize>,
}

impl SceneGraph {
    /// Build and validate a graph from its parts.
    pub fn new(
        title: impl Into<String>,
        start: impl Into<String>,
        scenes: Vec<Scene>,
    ) -> Result<Self, ContentError> {
        let start = start.into();

        if scenes.is_empty() {
            return Err(ContentError::Empty);
        }

        let mut index = HashMap::with_capacity(scenes.len());
        for (position, scene) in scenes.iter().enumerate() {
            if scene.key == LOST_SCENE_KEY {
                return Err(ContentError::ReservedKey(scene.key.clone()));
            }
            if index.insert(scene.key.clone(), position).is_some() {
                return Err(ContentError::DuplicateScene(scene.key.clone()));
            }
        }

        for scene in &scenes {
            let mut seen = HashSet::new();
            for choice in &scene.choices {
                if !is_valid_choice_id(&choice.id) {
                    return Err(ContentError::InvalidChoiceId {
                        scene: scene.key.clone(),
                        choice: choice.id.clone(),
                    });
                }
                if !seen.insert(choice.id.as_str()) {
                    return Err(ContentError::DuplicateChoice {
                        scene: scene.key.clone(),
                        choice: choice.id.clone(),
                    });
                }
                let target = &choice.result_scene_key;
                if target != LOST_SCENE_KEY && !index.contains_key(target) {
                    return Err(ContentError::DanglingReference {
                        scene: scene.key.clone(),
                        choice: choice.id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        if !index.contains_key(&start) {
            return Err(ContentError::MissingStart(start));
        }

        Ok(Self {
            title: title.into(),
            start,
            scenes,
            index,
        })
    }

    /// Parse and validate content from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ContentError> {
        let file: ContentFile = serde_json::from_str(json)?;
        Self::new(file.title, file.start, file.scenes)
    }

    /// Load and validate content from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let content = fs::read_to_string(path).await?;
        Self::from_json_str(&content)
    }

    /// The bundled adventure, "The Sunken Light".
    pub fn builtin() -> Result<Self, ContentError> {
        Self::from_json_str(BUILTIN_CONTENT)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Key of the designated starting scene.
    pub fn start_key(&self) -> &str {
        &self.start
    }

    /// The designated starting scene.
    pub fn start_scene(&self) -> &Scene {
        // `new` guarantees the start key is indexed.
        &self.scenes[self.index[&self.start]]
    }

    pub fn scene(&self, key: &str) -> Option<&Scene> {
        self.index.get(key).map(|&i| &self.scenes[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// All scenes in declared order.
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

fn is_valid_choice_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(|c| c.is_whitespace() || c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_scenes() -> Vec<Scene> {
        vec![
            Scene::new("dock", "Dock", "A rotten dock.")
                .with_choice(Choice::new("board", "Board the skiff", "skiff")),
            Scene::new("skiff", "Skiff", "A leaky skiff.")
                .with_choice(Choice::new("return", "Climb back onto the dock", "dock")),
        ]
    }

    #[test]
    fn test_builtin_content_loads() {
        let graph = SceneGraph::builtin().unwrap();
        assert_eq!(graph.title(), "The Sunken Light");
        assert_eq!(graph.start_key(), "intro");
        assert_eq!(graph.start_scene().key, "intro");
        for key in ["intro", "box", "tower_approach", "tide_pools", "lantern_room", "reef_hollow"] {
            assert!(graph.contains(key), "missing scene {key}");
        }
    }

    #[test]
    fn test_builtin_choices_all_lead_somewhere() {
        let graph = SceneGraph::builtin().unwrap();
        for scene in graph.scenes() {
            assert!(!scene.choices.is_empty(), "{} has no exits", scene.key);
            for choice in &scene.choices {
                let target = &choice.result_scene_key;
                assert!(
                    graph.contains(target) || target == LOST_SCENE_KEY,
                    "{}.{} -> {}",
                    scene.key,
                    choice.id,
                    target
                );
            }
        }
    }

    #[test]
    fn test_builtin_has_cycles_back_to_start() {
        let graph = SceneGraph::builtin().unwrap();
        let returns_to_start = graph
            .scenes()
            .iter()
            .flat_map(|s| s.choices.iter())
            .filter(|c| c.result_scene_key == "intro")
            .count();
        assert!(returns_to_start >= 2);
    }

    #[test]
    fn test_take_map_effects() {
        let graph = SceneGraph::builtin().unwrap();
        let choice = graph.scene("box").unwrap().choice("take_map").unwrap();
        assert_eq!(choice.result_scene_key, "tower_approach");
        assert_eq!(
            choice.effects[0],
            Effect::AddJournal(
                "Found seaweed map: 'Below the broken light, the reef remembers.'".to_string()
            )
        );
        assert_eq!(choice.effects[1], Effect::AddInventory("seaweed_map".to_string()));
    }

    #[test]
    fn test_choice_order_is_preserved() {
        let graph = SceneGraph::builtin().unwrap();
        let ids: Vec<_> = graph
            .scene("intro")
            .unwrap()
            .choices
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["inspect_box", "walk_lighthouse", "follow_shells"]);
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let scenes = vec![Scene::new("dock", "Dock", "A rotten dock.")
            .with_choice(Choice::new("swim", "Swim away", "open_sea"))];
        let err = SceneGraph::new("Test", "dock", scenes).unwrap_err();
        assert!(matches!(
            err,
            ContentError::DanglingReference { ref target, .. } if target == "open_sea"
        ));
    }

    #[test]
    fn test_lost_target_allowed() {
        let scenes = vec![Scene::new("dock", "Dock", "A rotten dock.")
            .with_choice(Choice::new("dive", "Dive into the fog", LOST_SCENE_KEY))];
        assert!(SceneGraph::new("Test", "dock", scenes).is_ok());
    }

    #[test]
    fn test_lost_key_reserved() {
        let scenes = vec![Scene::new(LOST_SCENE_KEY, "Lost", "Fog.")];
        let err = SceneGraph::new("Test", LOST_SCENE_KEY, scenes).unwrap_err();
        assert!(matches!(err, ContentError::ReservedKey(_)));
    }

    #[test]
    fn test_duplicate_choice_rejected() {
        let scenes = vec![Scene::new("dock", "Dock", "A rotten dock.")
            .with_choice(Choice::new("wait", "Wait", "dock"))
            .with_choice(Choice::new("wait", "Wait longer", "dock"))];
        let err = SceneGraph::new("Test", "dock", scenes).unwrap_err();
        assert!(matches!(err, ContentError::DuplicateChoice { .. }));
    }

    #[test]
    fn test_duplicate_scene_rejected() {
        let mut scenes = two_scenes();
        scenes.push(Scene::new("dock", "Dock again", "Another dock."));
        let err = SceneGraph::new("Test", "dock", scenes).unwrap_err();
        assert!(matches!(err, ContentError::DuplicateScene(ref k) if k == "dock"));
    }

    #[test]
    fn test_invalid_choice_id_rejected() {
        let scenes = vec![Scene::new("dock", "Dock", "A rotten dock.")
            .with_choice(Choice::new("Board Skiff", "Board the skiff", "dock"))];
        let err = SceneGraph::new("Test", "dock", scenes).unwrap_err();
        assert!(matches!(err, ContentError::InvalidChoiceId { .. }));
    }

    #[test]
    fn test_missing_start_rejected() {
        let err = SceneGraph::new("Test", "harbor", two_scenes()).unwrap_err();
        assert!(matches!(err, ContentError::MissingStart(ref k) if k == "harbor"));
    }

    #[test]
    fn test_empty_content_rejected() {
        let err = SceneGraph::new("Test", "dock", vec![]).unwrap_err();
        assert!(matches!(err, ContentError::Empty));
    }

    #[test]
    fn test_from_json_effects() {
        let json = r#"{
            "title": "Tiny",
            "start": "a",
            "scenes": [
                {"key": "a", "title": "A", "description": "First.", "choices": [
                    {"id": "go", "description": "Go on", "result": "a",
                     "effects": [{"add_journal": "Went on."}, {"add_inventory": "pebble"}]}
                ]}
            ]
        }"#;
        let graph = SceneGraph::from_json_str(json).unwrap();
        let choice = graph.scene("a").unwrap().choice("go").unwrap();
        assert_eq!(
            choice.effects,
            vec![
                Effect::AddJournal("Went on.".to_string()),
                Effect::AddInventory("pebble".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = SceneGraph::from_json_str("{\"title\": 3}").unwrap_err();
        assert!(matches!(err, ContentError::Json(_)));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("content.json");
        std::fs::write(&path, BUILTIN_CONTENT).expect("write should succeed");

        let graph = SceneGraph::load(&path).await.expect("load should succeed");
        assert_eq!(graph.len(), SceneGraph::builtin().unwrap().len());
    }
}
