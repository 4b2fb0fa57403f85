//! Session snapshot persistence.
//!
//! After every operation the session is serialized into a [`Snapshot`] and
//! handed to a [`PersistenceGateway`]. The gateway owns a background writer
//! task, so a turn never waits on storage; snapshots are written in the order
//! they were submitted and failures are logged, counted and otherwise
//! ignored.
//!
//! Snapshots are keyed by session id. [`JsonFileStore`] replaces a session's
//! file atomically: the new contents go to a staging file in the same
//! directory which is then renamed over the target.

use crate::content::{Scene, SceneGraph, LOST_SCENE_KEY};
use crate::narrative::{LOST_DESCRIPTION, LOST_TITLE};
use crate::state::{SessionId, SessionState, TransitionRecord};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::fs;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Persistence writer has shut down")]
    GatewayClosed,
}

/// A choice as it appears in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceView {
    pub id: String,
    pub description: String,
    pub result: String,
}

/// The scene the session is in, as stored alongside the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneView {
    pub key: String,
    pub title: String,
    pub description: String,
    pub choices: Vec<ChoiceView>,
}

impl SceneView {
    pub fn of(scene: &Scene) -> Self {
        Self {
            key: scene.key.clone(),
            title: scene.title.clone(),
            description: scene.description.clone(),
            choices: scene
                .choices
                .iter()
                .map(|c| ChoiceView {
                    id: c.id.clone(),
                    description: c.description.clone(),
                    result: c.result_scene_key.clone(),
                })
                .collect(),
        }
    }

    /// View of the lost pseudo-scene.
    pub fn lost() -> Self {
        Self {
            key: LOST_SCENE_KEY.to_string(),
            title: LOST_TITLE.to_string(),
            description: LOST_DESCRIPTION.to_string(),
            choices: Vec::new(),
        }
    }
}

/// Full durable serialization of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub session: SessionState,
    pub current_scene: SceneView,
    pub journal: Vec<String>,
    pub inventory: Vec<String>,
    pub history: Vec<TransitionRecord>,
    /// ISO-8601 UTC with a `Z` suffix.
    pub last_updated_at: String,
}

impl Snapshot {
    pub fn from_session(graph: &SceneGraph, state: &SessionState, now: DateTime<Utc>) -> Self {
        let current_scene = graph
            .scene(&state.current_scene_key)
            .map(SceneView::of)
            .unwrap_or_else(SceneView::lost);

        Self {
            session: state.clone(),
            current_scene,
            journal: state.journal.clone(),
            inventory: state.inventory.clone(),
            history: state.history.clone(),
            last_updated_at: iso_timestamp(now),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session.session_id
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Format a timestamp as ISO-8601 UTC with millisecond precision and `Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Durable storage for snapshots, keyed by session id.
///
/// `save` replaces the whole stored snapshot for that session.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError>;

    async fn load(&self, session_id: SessionId) -> Result<Option<Snapshot>, PersistError>;
}

/// One JSON file per session in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the snapshot file for a session.
    pub fn path_for(&self, session_id: SessionId) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        let content = snapshot.to_json()?;
        fs::create_dir_all(&self.dir).await?;

        let staging = StagingFile::new(&self.dir, snapshot.session_id());
        let written = async {
            fs::write(staging.path(), content).await?;
            fs::rename(staging.path(), self.path_for(snapshot.session_id())).await
        }
        .await;

        match written {
            Ok(()) => {
                staging.commit();
                Ok(())
            }
            Err(e) => {
                staging.discard().await;
                Err(e.into())
            }
        }
    }

    async fn load(&self, session_id: SessionId) -> Result<Option<Snapshot>, PersistError> {
        match fs::read_to_string(self.path_for(session_id)).await {
            Ok(content) => Ok(Some(Snapshot::from_json(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Temporary file for a snapshot write.
///
/// Failed writes remove it with [`StagingFile::discard`]. The drop guard only
/// fires when the save future is dropped before it finishes.
struct StagingFile {
    path: PathBuf,
    settled: bool,
}

impl StagingFile {
    fn new(dir: &Path, session_id: SessionId) -> Self {
        let path = dir.join(format!(".{session_id}.{}.tmp", Uuid::new_v4().simple()));
        Self {
            path,
            settled: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The file has been renamed into place; nothing to clean up.
    fn commit(mut self) {
        self.settled = true;
    }

    async fn discard(mut self) {
        if let Err(e) = fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %self.path.display(), error = %e, "could not remove staging file");
            }
        }
        self.settled = true;
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if !self.settled {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// In-process snapshot storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshots: Arc<Mutex<HashMap<SessionId, Snapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: SessionId) -> Option<Snapshot> {
        self.lock().get(&session_id).cloned()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Snapshot>> {
        self.snapshots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        self.lock().insert(snapshot.session_id(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, session_id: SessionId) -> Result<Option<Snapshot>, PersistError> {
        Ok(self.get(session_id))
    }
}

#[derive(Debug)]
enum WriterCommand {
    Save(Box<Snapshot>),
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle to the background snapshot writer.
///
/// The writer task exits once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct PersistenceGateway {
    tx: Option<mpsc::UnboundedSender<WriterCommand>>,
    failed_writes: Arc<AtomicUsize>,
}

impl PersistenceGateway {
    /// Start a writer task for `store` on the current Tokio runtime.
    ///
    /// Outside a runtime there is nowhere to run the writer; the gateway is
    /// then disabled and a warning is logged.
    pub fn spawn(store: Arc<dyn SnapshotStore>) -> Self {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("no Tokio runtime available; session snapshots will not be persisted");
                return Self::disabled();
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let failed_writes = Arc::new(AtomicUsize::new(0));
        handle.spawn(run_writer(store, rx, Arc::clone(&failed_writes)));

        Self {
            tx: Some(tx),
            failed_writes,
        }
    }

    /// A gateway that drops every snapshot.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            failed_writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue a snapshot for writing. Never blocks.
    pub fn submit(&self, snapshot: Snapshot) {
        let Some(tx) = &self.tx else {
            return;
        };
        let session_id = snapshot.session_id();
        if tx.send(WriterCommand::Save(Box::new(snapshot))).is_err() {
            warn!(%session_id, "persistence writer has shut down; snapshot dropped");
        }
    }

    /// Wait until every snapshot submitted before this call has been handled.
    pub async fn flush(&self) -> Result<(), PersistError> {
        let Some(tx) = &self.tx else {
            return Ok(());
        };
        let (done_tx, done_rx) = oneshot::channel();
        tx.send(WriterCommand::Flush(done_tx))
            .map_err(|_| PersistError::GatewayClosed)?;
        done_rx.await.map_err(|_| PersistError::GatewayClosed)
    }

    /// Number of snapshot writes that have failed so far.
    pub fn failed_writes(&self) -> usize {
        self.failed_writes.load(Ordering::Relaxed)
    }
}

async fn run_writer(
    store: Arc<dyn SnapshotStore>,
    mut rx: mpsc::UnboundedReceiver<WriterCommand>,
    failed_writes: Arc<AtomicUsize>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            WriterCommand::Save(snapshot) => {
                let session_id = snapshot.session_id();
                match store.save(&snapshot).await {
                    Ok(()) => debug!(%session_id, "session snapshot written"),
                    Err(e) => {
                        failed_writes.fetch_add(1, Ordering::Relaxed);
                        warn!(%session_id, error = %e, "failed to write session snapshot");
                    }
                }
            }
            WriterCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("persistence writer stopped");
}
