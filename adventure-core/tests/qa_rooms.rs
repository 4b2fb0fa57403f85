//! Independent sessions running side by side.

use adventure_core::{
    JsonFileStore, MemoryStore, PersistenceGateway, RoomRegistry, SceneGraph, SessionConfig,
    SnapshotStore,
};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_rooms_stay_isolated() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = SessionConfig::new().with_save_dir(temp_dir.path());
    let registry = Arc::new(RoomRegistry::from_config(config).await.unwrap());

    let (harbor, _) = registry.open("harbor", Some("Marin")).await;
    let (cliffs, _) = registry.open("cliffs", Some("Wren")).await;

    let harbor_task = tokio::spawn({
        let harbor = Arc::clone(&harbor);
        async move {
            for utterance in ["inspect_box", "take_pearl", "take_pearl", "take the map"] {
                harbor.lock().await.player_action(utterance);
                tokio::task::yield_now().await;
            }
        }
    });
    let cliffs_task = tokio::spawn({
        let cliffs = Arc::clone(&cliffs);
        async move {
            for utterance in ["follow_shells", "grab the key", "climb_stair", "descend"] {
                cliffs.lock().await.player_action(utterance);
                tokio::task::yield_now().await;
            }
        }
    });
    harbor_task.await.unwrap();
    cliffs_task.await.unwrap();

    let harbor = harbor.lock().await;
    let cliffs = cliffs.lock().await;
    assert_ne!(harbor.session_id(), cliffs.session_id());

    assert_eq!(harbor.current_scene_key(), "tower_approach");
    assert_eq!(harbor.state().inventory, vec!["black_pearl", "black_pearl", "seaweed_map"]);
    assert_eq!(harbor.player_name(), Some("Marin"));

    assert_eq!(cliffs.current_scene_key(), "reef_hollow");
    assert_eq!(cliffs.state().inventory, vec!["brass_key"]);
    assert_eq!(cliffs.player_name(), Some("Wren"));

    registry.persistence().flush().await.unwrap();
    let store = JsonFileStore::new(temp_dir.path());
    let harbor_snapshot = store.load(harbor.session_id()).await.unwrap().unwrap();
    let cliffs_snapshot = store.load(cliffs.session_id()).await.unwrap().unwrap();
    assert_eq!(harbor_snapshot.session, *harbor.state());
    assert_eq!(cliffs_snapshot.session, *cliffs.state());
}

#[tokio::test]
async fn rooms_share_one_gateway() {
    let store = MemoryStore::new();
    let registry = RoomRegistry::new(
        Arc::new(SceneGraph::builtin().unwrap()),
        SessionConfig::new(),
        PersistenceGateway::spawn(Arc::new(store.clone())),
    );

    for room in ["one", "two", "three"] {
        let (session, _) = registry.open(room, None).await;
        session.lock().await.player_action("inspect_box");
    }
    registry.persistence().flush().await.unwrap();

    assert_eq!(store.len(), 3);
    for id in store.session_ids() {
        assert_eq!(store.get(id).unwrap().session.current_scene_key, "box");
    }
}

#[tokio::test]
async fn closed_room_reopens_fresh() {
    let registry = RoomRegistry::new(
        Arc::new(SceneGraph::builtin().unwrap()),
        SessionConfig::new().without_persistence(),
        PersistenceGateway::disabled(),
    );

    let (first, _) = registry.open("harbor", None).await;
    first.lock().await.player_action("inspect_box");
    let first_id = first.lock().await.session_id();

    registry.close("harbor").await;
    let (second, _) = registry.open("harbor", None).await;
    let second = second.lock().await;
    assert_ne!(second.session_id(), first_id);
    assert_eq!(second.current_scene_key(), "intro");
}
