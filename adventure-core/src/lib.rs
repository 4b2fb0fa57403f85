//! Adventure state-machine engine for a voice game master.
//!
//! This crate provides:
//! - A validated, immutable scene graph loaded from JSON content
//! - A permissive resolver from free-form utterances to scene choices
//! - Per-session continuity (journal, inventory, transition history)
//! - Narration that always ends with the terminal prompt
//! - Background snapshot persistence keyed by session id
//!
//! # Quick Start
//!
//! ```ignore
//! use adventure_core::{GameSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new().with_save_dir("saves");
//!     let mut session = GameSession::from_config(config).await?;
//!
//!     println!("{}", session.start(Some("Marin")).narrative);
//!     println!("{}", session.player_action("inspect the shell box").narrative);
//!
//!     session.flush().await?;
//!     Ok(())
//! }
//! ```

pub mod content;
pub mod headless;
pub mod narrative;
pub mod persist;
pub mod resolver;
pub mod rooms;
pub mod rules;
pub mod session;
pub mod state;
pub mod testing;
pub mod tools;

// Primary public API
pub use content::{Choice, ContentError, Effect, Scene, SceneGraph};
pub use headless::{HeadlessGame, TranscriptEntry};
pub use narrative::TERMINAL_PROMPT;
pub use persist::{JsonFileStore, MemoryStore, PersistError, PersistenceGateway, Snapshot, SnapshotStore};
pub use resolver::{ActionResolver, MatchPass, Resolution};
pub use rooms::{RoomRegistry, SharedSession};
pub use session::{GameSession, Response, SessionConfig, SessionError, TurnOutcome};
pub use state::{SessionId, SessionState, TransitionRecord};
pub use tools::{AdventureTools, ToolCall, ToolDefinition, ToolError};
