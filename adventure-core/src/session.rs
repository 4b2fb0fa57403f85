//! GameSession - the public entry points of the adventure engine.
//!
//! A `GameSession` owns one player's [`SessionState`] and wires together the
//! scene graph, the action resolver, the rules and the narrative renderer.
//! Every entry point returns a [`Response`] whose narrative ends with the
//! terminal prompt; none of them fail. Snapshots are handed to the
//! [`PersistenceGateway`] after each operation and written in the background.

use crate::content::{ContentError, Effect, SceneGraph};
use crate::narrative::{
    render_clarification, render_journal, render_lost, render_opening, render_scene,
};
use crate::persist::{JsonFileStore, PersistError, PersistenceGateway, Snapshot, SnapshotStore};
use crate::resolver::{ActionResolver, MatchPass, Resolution};
use crate::rules::take_choice;
use crate::state::{SessionId, SessionState};
use crate::tools::{ToolCall, ToolError};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Environment variable naming the snapshot directory.
pub const ENV_SAVE_DIR: &str = "ADVENTURE_SAVE_DIR";
/// Environment variable naming a content file to load instead of the built-in adventure.
pub const ENV_CONTENT: &str = "ADVENTURE_CONTENT";
/// Environment variable setting how many moves the journal summary lists.
pub const ENV_RECENT_HISTORY: &str = "ADVENTURE_RECENT_HISTORY";

/// Errors from GameSession constructors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("No saved session with id {0}")]
    SnapshotNotFound(SessionId),

    #[error("Persistence is disabled - no save directory configured")]
    PersistenceDisabled,
}

/// Configuration for creating a game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Directory for session snapshots. `None` disables persistence.
    pub save_dir: Option<PathBuf>,

    /// Content file to load. `None` uses the built-in adventure.
    pub content_path: Option<PathBuf>,

    /// Number of recent moves listed in the journal summary.
    pub recent_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_dir: Some(PathBuf::from("saves")),
            content_path: None,
            recent_history: 5,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `ADVENTURE_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup.
    ///
    /// An empty `ADVENTURE_SAVE_DIR` disables persistence. An unparsable
    /// `ADVENTURE_RECENT_HISTORY` is ignored with a warning.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(ENV_SAVE_DIR) {
            let dir = dir.trim();
            self.save_dir = if dir.is_empty() {
                None
            } else {
                Some(PathBuf::from(dir))
            };
        }

        if let Some(path) = lookup(ENV_CONTENT) {
            let path = path.trim();
            if !path.is_empty() {
                self.content_path = Some(PathBuf::from(path));
            }
        }

        if let Some(value) = lookup(ENV_RECENT_HISTORY) {
            match value.trim().parse() {
                Ok(count) => self.recent_history = count,
                Err(_) => warn!(
                    variable = ENV_RECENT_HISTORY,
                    %value,
                    "ignoring invalid recent history length"
                ),
            }
        }

        self
    }

    /// Set the snapshot directory.
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    /// Load content from a file instead of the built-in adventure.
    pub fn with_content_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.content_path = Some(path.into());
        self
    }

    /// Set how many recent moves the journal lists.
    pub fn with_recent_history(mut self, count: usize) -> Self {
        self.recent_history = count;
        self
    }

    /// Do not write snapshots.
    pub fn without_persistence(mut self) -> Self {
        self.save_dir = None;
        self
    }

    /// Load the configured scene graph.
    pub async fn load_content(&self) -> Result<SceneGraph, ContentError> {
        match &self.content_path {
            Some(path) => SceneGraph::load(path).await,
            None => SceneGraph::builtin(),
        }
    }

    /// The snapshot store for the configured directory, if any.
    pub fn snapshot_store(&self) -> Option<JsonFileStore> {
        self.save_dir.as_ref().map(JsonFileStore::new)
    }

    /// Start a persistence gateway for the configured store.
    pub fn persistence(&self) -> PersistenceGateway {
        match self.snapshot_store() {
            Some(store) => PersistenceGateway::spawn(Arc::new(store)),
            None => PersistenceGateway::disabled(),
        }
    }
}

/// What an entry point did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// A fresh session began at the starting scene.
    Started,
    /// An utterance resolved to a choice and the session moved.
    Advanced { choice_id: String, pass: MatchPass },
    /// No choice matched; the session is unchanged.
    Unresolved,
    /// The current scene does not exist.
    Lost,
    /// Read-only view of the session.
    Described,
}

/// Response from an entry point.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// Text for the game master to speak.
    pub narrative: String,

    pub outcome: TurnOutcome,

    /// Effects applied during this turn.
    pub effects: Vec<Effect>,
}

impl Response {
    fn new(narrative: String, outcome: TurnOutcome) -> Self {
        Self {
            narrative,
            outcome,
            effects: Vec::new(),
        }
    }

    pub fn is_advanced(&self) -> bool {
        matches!(self.outcome, TurnOutcome::Advanced { .. })
    }
}

/// One player's adventure.
pub struct GameSession {
    graph: Arc<SceneGraph>,
    config: SessionConfig,
    persistence: PersistenceGateway,
    resolver: ActionResolver,
    state: SessionState,
}

impl GameSession {
    /// Create a session positioned at the starting scene.
    ///
    /// Nothing is persisted until an entry point is called; most callers
    /// follow up with [`GameSession::start`].
    pub fn new(graph: Arc<SceneGraph>, config: SessionConfig, persistence: PersistenceGateway) -> Self {
        let state = SessionState::new(graph.start_key(), None);
        Self {
            graph,
            config,
            persistence,
            resolver: ActionResolver::new(),
            state,
        }
    }

    /// Load content and start persistence as configured.
    pub async fn from_config(config: SessionConfig) -> Result<Self, SessionError> {
        let graph = Arc::new(config.load_content().await?);
        let persistence = config.persistence();
        Ok(Self::new(graph, config, persistence))
    }

    /// Restore a session from a stored snapshot.
    pub fn resume(
        graph: Arc<SceneGraph>,
        config: SessionConfig,
        persistence: PersistenceGateway,
        snapshot: Snapshot,
    ) -> Self {
        let state = snapshot.session;
        info!(
            session_id = %state.session_id,
            scene = %state.current_scene_key,
            turns = state.turn_count(),
            "session resumed"
        );
        if !graph.contains(&state.current_scene_key) {
            warn!(
                session_id = %state.session_id,
                scene = %state.current_scene_key,
                "resumed session points at an unknown scene"
            );
        }
        Self {
            graph,
            config,
            persistence,
            resolver: ActionResolver::new(),
            state,
        }
    }

    /// Load content and the snapshot for `session_id` from the configured directory.
    pub async fn resume_from_config(
        config: SessionConfig,
        session_id: SessionId,
    ) -> Result<Self, SessionError> {
        let store = config
            .snapshot_store()
            .ok_or(SessionError::PersistenceDisabled)?;
        let snapshot = store
            .load(session_id)
            .await?
            .ok_or(SessionError::SnapshotNotFound(session_id))?;
        let graph = Arc::new(config.load_content().await?);
        let persistence = config.persistence();
        Ok(Self::resume(graph, config, persistence, snapshot))
    }

    /// Begin a fresh session at the starting scene.
    pub fn start(&mut self, player_name: Option<&str>) -> Response {
        self.state = SessionState::new(self.graph.start_key(), player_name);
        info!(
            session_id = %self.state.session_id,
            player = self.state.player_name.as_deref().unwrap_or(""),
            "session started"
        );
        self.persist();
        self.opening()
    }

    /// Resolve an utterance against the current scene and take the matching choice.
    pub fn player_action(&mut self, utterance: &str) -> Response {
        let graph = Arc::clone(&self.graph);

        let Some(scene) = graph.scene(&self.state.current_scene_key) else {
            self.persist();
            return self.lost();
        };

        match self.resolver.resolve(scene, utterance) {
            Resolution::Resolved { choice, pass } => {
                debug!(
                    session_id = %self.state.session_id,
                    scene = %scene.key,
                    choice = %choice.id,
                    ?pass,
                    "action resolved"
                );
                take_choice(&mut self.state, choice, Utc::now());
                self.persist();

                let narrative = match graph.scene(&choice.result_scene_key) {
                    Some(next) => render_scene(next),
                    None => {
                        self.warn_lost();
                        render_lost(&self.state)
                    }
                };
                Response {
                    narrative,
                    outcome: TurnOutcome::Advanced {
                        choice_id: choice.id.clone(),
                        pass,
                    },
                    effects: choice.effects.clone(),
                }
            }
            Resolution::Unresolved => {
                debug!(
                    session_id = %self.state.session_id,
                    scene = %scene.key,
                    utterance,
                    "action unresolved"
                );
                self.persist();
                Response::new(render_clarification(scene, utterance), TurnOutcome::Unresolved)
            }
        }
    }

    /// Narration for the current scene. Does not change the session.
    pub fn current_scene(&self) -> Response {
        self.persist();
        match self.graph.scene(&self.state.current_scene_key) {
            Some(scene) => Response::new(render_scene(scene), TurnOutcome::Described),
            None => self.lost(),
        }
    }

    /// Summary of the session. Does not change the session.
    pub fn journal(&self) -> Response {
        self.persist();
        Response::new(
            render_journal(&self.state, self.config.recent_history),
            TurnOutcome::Described,
        )
    }

    /// Throw the session away and begin again, keeping the player's name.
    pub fn restart(&mut self) -> Response {
        let previous = self.state.session_id;
        let player_name = self.state.player_name.clone();
        self.state = SessionState::new(self.graph.start_key(), player_name.as_deref());
        info!(
            session_id = %self.state.session_id,
            previous_session_id = %previous,
            "session restarted"
        );
        self.persist();
        self.opening()
    }

    /// Dispatch a tool call from the game master model.
    pub fn call_tool(&mut self, name: &str, input: &Value) -> Result<Response, ToolError> {
        let call = ToolCall::parse(name, input)?;
        debug!(session_id = %self.state.session_id, tool = name, "tool call");
        Ok(match call {
            ToolCall::StartAdventure { player_name } => self.start(player_name.as_deref()),
            ToolCall::PlayerAction { action } => self.player_action(&action),
            ToolCall::GetCurrentScene => self.current_scene(),
            ToolCall::ShowJournal => self.journal(),
            ToolCall::RestartAdventure => self.restart(),
        })
    }

    /// Wait for all submitted snapshots to be written.
    pub async fn flush(&self) -> Result<(), PersistError> {
        self.persistence.flush().await
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session_id(&self) -> SessionId {
        self.state.session_id
    }

    pub fn player_name(&self) -> Option<&str> {
        self.state.player_name.as_deref()
    }

    pub fn current_scene_key(&self) -> &str {
        &self.state.current_scene_key
    }

    /// Whether the current scene is missing from the graph.
    pub fn is_lost(&self) -> bool {
        !self.graph.contains(&self.state.current_scene_key)
    }

    pub fn graph(&self) -> &Arc<SceneGraph> {
        &self.graph
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn persistence(&self) -> &PersistenceGateway {
        &self.persistence
    }

    /// Snapshot of the session as it would be persisted now.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_session(&self.graph, &self.state, Utc::now())
    }

    fn opening(&self) -> Response {
        let scene = self.graph.start_scene();
        Response::new(
            render_opening(self.graph.title(), scene, &self.state),
            TurnOutcome::Started,
        )
    }

    fn lost(&self) -> Response {
        self.warn_lost();
        Response::new(render_lost(&self.state), TurnOutcome::Lost)
    }

    fn warn_lost(&self) {
        warn!(
            session_id = %self.state.session_id,
            scene = %self.state.current_scene_key,
            "current scene not found; session is lost"
        );
    }

    fn persist(&self) {
        if self.persistence.is_enabled() {
            self.persistence.submit(self.snapshot());
        }
    }
}
