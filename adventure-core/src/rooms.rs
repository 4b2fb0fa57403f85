//! One session per voice room.
//!
//! Each room holds its own [`GameSession`] behind a mutex, so turns within a
//! room are serialized while rooms proceed independently. All rooms share the
//! scene graph and the persistence gateway.

use crate::content::SceneGraph;
use crate::persist::PersistenceGateway;
use crate::session::{GameSession, Response, SessionConfig, SessionError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// A session shared between the tasks serving one room.
pub type SharedSession = Arc<Mutex<GameSession>>;

pub struct RoomRegistry {
    graph: Arc<SceneGraph>,
    config: SessionConfig,
    persistence: PersistenceGateway,
    rooms: RwLock<HashMap<String, SharedSession>>,
}

impl RoomRegistry {
    pub fn new(graph: Arc<SceneGraph>, config: SessionConfig, persistence: PersistenceGateway) -> Self {
        Self {
            graph,
            config,
            persistence,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Load content and start persistence as configured.
    pub async fn from_config(config: SessionConfig) -> Result<Self, SessionError> {
        let graph = Arc::new(config.load_content().await?);
        let persistence = config.persistence();
        Ok(Self::new(graph, config, persistence))
    }

    /// Join a room.
    ///
    /// A new room gets a freshly started session and its opening narration.
    /// An existing room keeps its session; the response describes the
    /// current scene and `player_name` is ignored.
    pub async fn open(&self, room: &str, player_name: Option<&str>) -> (SharedSession, Response) {
        let mut rooms = self.rooms.write().await;

        if let Some(existing) = rooms.get(room) {
            let session = Arc::clone(existing);
            drop(rooms);
            let response = session.lock().await.current_scene();
            return (session, response);
        }

        let mut session = GameSession::new(
            Arc::clone(&self.graph),
            self.config.clone(),
            self.persistence.clone(),
        );
        let response = session.start(player_name);
        info!(room, session_id = %session.session_id(), "room opened");

        let session = Arc::new(Mutex::new(session));
        rooms.insert(room.to_string(), Arc::clone(&session));
        (session, response)
    }

    pub async fn get(&self, room: &str) -> Option<SharedSession> {
        self.rooms.read().await.get(room).cloned()
    }

    /// Remove a room. Its last snapshot stays in the store.
    pub async fn close(&self, room: &str) -> Option<SharedSession> {
        let removed = self.rooms.write().await.remove(room);
        if removed.is_some() {
            info!(room, "room closed");
        }
        removed
    }

    /// Names of open rooms, sorted.
    pub async fn rooms(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rooms.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn persistence(&self) -> &PersistenceGateway {
        &self.persistence
    }

    pub fn graph(&self) -> &Arc<SceneGraph> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TurnOutcome;

    fn registry() -> RoomRegistry {
        RoomRegistry::new(
            Arc::new(SceneGraph::builtin().unwrap()),
            SessionConfig::new().without_persistence(),
            PersistenceGateway::disabled(),
        )
    }

    #[tokio::test]
    async fn test_open_creates_and_reuses() {
        let registry = registry();
        let (first, response) = registry.open("harbor", Some("Marin")).await;
        assert_eq!(response.outcome, TurnOutcome::Started);

        first.lock().await.player_action("inspect_box");

        let (second, response) = registry.open("harbor", Some("Someone Else")).await;
        assert_eq!(response.outcome, TurnOutcome::Described);
        assert!(Arc::ptr_eq(&first, &second));
        let session = second.lock().await;
        assert_eq!(session.current_scene_key(), "box");
        assert_eq!(session.player_name(), Some("Marin"));
    }

    #[tokio::test]
    async fn test_close_and_list() {
        let registry = registry();
        registry.open("tavern", None).await;
        registry.open("harbor", None).await;
        assert_eq!(registry.rooms().await, vec!["harbor", "tavern"]);

        assert!(registry.close("tavern").await.is_some());
        assert!(registry.close("tavern").await.is_none());
        assert!(registry.get("tavern").await.is_none());
        assert_eq!(registry.rooms().await, vec!["harbor"]);
    }
}
