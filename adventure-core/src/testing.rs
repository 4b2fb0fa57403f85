//! Testing utilities for the adventure engine.
//!
//! This module provides tools for integration testing:
//! - `TestHarness` for scripted sessions over the built-in content
//! - `FailingStore` for exercising persistence failures
//! - Assertion helpers for verifying session state

use crate::content::SceneGraph;
use crate::narrative::TERMINAL_PROMPT;
use crate::persist::{MemoryStore, PersistError, PersistenceGateway, Snapshot, SnapshotStore};
use crate::session::{GameSession, Response, SessionConfig};
use crate::state::{SessionId, SessionState};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A snapshot store whose writes always fail.
#[derive(Debug, Default)]
pub struct FailingStore {
    attempts: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of save calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for FailingStore {
    async fn save(&self, _snapshot: &Snapshot) -> Result<(), PersistError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PersistError::Io(std::io::Error::other("simulated write failure")))
    }

    async fn load(&self, _session_id: SessionId) -> Result<Option<Snapshot>, PersistError> {
        Ok(None)
    }
}

/// Test harness for scripted sessions.
///
/// Snapshots go to an in-memory store. Construct inside a Tokio runtime so
/// the persistence writer can run; outside one, persistence is disabled.
pub struct TestHarness {
    pub session: GameSession,
    store: MemoryStore,
    responses: Vec<Response>,
}

impl TestHarness {
    /// Harness over the built-in adventure.
    pub fn new() -> Self {
        let graph = SceneGraph::builtin().unwrap_or_else(|e| panic!("built-in content: {e}"));
        Self::with_graph(graph)
    }

    /// Harness over custom content.
    pub fn with_graph(graph: SceneGraph) -> Self {
        let store = MemoryStore::new();
        let persistence = PersistenceGateway::spawn(Arc::new(store.clone()));
        let session = GameSession::new(Arc::new(graph), SessionConfig::new(), persistence);
        Self {
            session,
            store,
            responses: Vec::new(),
        }
    }

    /// Start the session.
    pub fn start(&mut self, player_name: Option<&str>) -> Response {
        let response = self.session.start(player_name);
        self.responses.push(response.clone());
        response
    }

    /// Send a player utterance.
    pub fn input(&mut self, text: &str) -> Response {
        let response = self.session.player_action(text);
        self.responses.push(response.clone());
        response
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn scene_key(&self) -> &str {
        self.session.current_scene_key()
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Wait for pending snapshots, then return this session's stored snapshot.
    pub async fn stored_snapshot(&self) -> Option<Snapshot> {
        self.session
            .flush()
            .await
            .unwrap_or_else(|e| panic!("flush failed: {e}"));
        self.store.get(self.session.session_id())
    }

    pub fn last_narrative(&self) -> Option<&str> {
        self.responses.last().map(|r| r.narrative.as_str())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert that narration ends with the terminal prompt.
pub fn assert_terminal_prompt(narrative: &str) {
    assert!(
        narrative.ends_with(TERMINAL_PROMPT),
        "Expected narration to end with {TERMINAL_PROMPT:?}, got: {narrative:?}"
    );
}

/// Assert the current scene.
pub fn assert_scene(harness: &TestHarness, key: &str) {
    assert_eq!(harness.scene_key(), key, "Unexpected current scene");
}

/// Assert a journal entry exists.
pub fn assert_journal_contains(state: &SessionState, entry: &str) {
    assert!(
        state.journal.iter().any(|e| e == entry),
        "Expected journal entry {entry:?}, journal is {:?}",
        state.journal
    );
}

/// Assert the structural invariants of a session's history.
///
/// `history` and `choices_made` agree one to one, each move starts where the
/// previous one ended, the last move ends at the current scene and
/// timestamps never go backwards.
pub fn assert_history_consistent(state: &SessionState) {
    assert_eq!(
        state.history.len(),
        state.choices_made.len(),
        "history and choices_made diverged"
    );

    for (record, choice) in state.history.iter().zip(&state.choices_made) {
        assert_eq!(&record.action, choice, "choices_made out of step with history");
    }

    for pair in state.history.windows(2) {
        assert_eq!(pair[0].to, pair[1].from, "history is not a connected path");
        assert!(
            pair[0].timestamp <= pair[1].timestamp,
            "history timestamps went backwards"
        );
    }

    if let Some(last) = state.history.last() {
        assert_eq!(last.to, state.current_scene_key, "last move does not end at the current scene");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_harness_persists_snapshots() {
        let mut harness = TestHarness::new();
        harness.start(Some("Marin"));
        harness.input("inspect_box");

        let snapshot = harness.stored_snapshot().await.expect("Snapshot should exist");
        assert_eq!(snapshot.session.current_scene_key, "box");
        assert_eq!(harness.store().len(), 1);
    }

    #[test]
    fn test_harness_scripted_play() {
        let mut harness = TestHarness::new();
        harness.start(None);
        harness.input("inspect_box");
        harness.input("take the map");

        assert_scene(&harness, "tower_approach");
        assert_journal_contains(
            harness.state(),
            "Found seaweed map: 'Below the broken light, the reef remembers.'",
        );
        assert_history_consistent(harness.state());
        assert_terminal_prompt(harness.last_narrative().unwrap());
    }

    #[tokio::test]
    async fn test_failing_store_counts_attempts() {
        let store = FailingStore::new();
        let graph = SceneGraph::builtin().unwrap();
        let state = SessionState::new("intro", None);
        let snapshot = Snapshot::from_session(&graph, &state, chrono::Utc::now());

        assert!(store.save(&snapshot).await.is_err());
        assert_eq!(store.attempts(), 1);
        assert!(store.load(state.session_id).await.unwrap().is_none());
    }
}
