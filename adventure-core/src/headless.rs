//! Headless game interface for programmatic use.
//!
//! This module provides a simplified interface for running adventures without
//! a voice pipeline. It's designed for:
//! - Scripted play-throughs in tests
//! - The line-oriented terminal driver
//! - Agents exercising the engine through plain text
//!
//! # Example
//!
//! ```ignore
//! use adventure_core::headless::HeadlessGame;
//! use adventure_core::SessionConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut game = HeadlessGame::from_config(SessionConfig::from_env()).await?;
//!
//!     println!("{}", game.start(Some("Marin")).narrative);
//!     println!("{}", game.send("inspect the shell box").narrative);
//!     println!("Scene: {}", game.current_scene_key());
//!
//!     game.flush().await?;
//!     Ok(())
//! }
//! ```

use crate::persist::PersistError;
use crate::session::{GameSession, Response, SessionConfig, SessionError, TurnOutcome};
use crate::state::SessionId;

/// A headless adventure that can be controlled programmatically.
pub struct HeadlessGame {
    session: GameSession,
    /// Transcript of all exchanges.
    transcript: Vec<TranscriptEntry>,
}

/// An entry in the game transcript.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    /// Player input, or the command that produced the response.
    pub player_input: String,
    /// Narrative returned to the player.
    pub response: String,
    pub outcome: TurnOutcome,
    /// Turn number, starting at 1.
    pub turn: usize,
}

impl HeadlessGame {
    pub fn new(session: GameSession) -> Self {
        Self {
            session,
            transcript: Vec::new(),
        }
    }

    /// Create a game from configuration. Call [`HeadlessGame::start`] next.
    pub async fn from_config(config: SessionConfig) -> Result<Self, SessionError> {
        Ok(Self::new(GameSession::from_config(config).await?))
    }

    /// Continue a saved session.
    pub async fn resume(config: SessionConfig, session_id: SessionId) -> Result<Self, SessionError> {
        Ok(Self::new(
            GameSession::resume_from_config(config, session_id).await?,
        ))
    }

    /// Begin a fresh adventure.
    pub fn start(&mut self, player_name: Option<&str>) -> Response {
        let response = self.session.start(player_name);
        self.record("#start", &response);
        response
    }

    /// Send a player utterance.
    pub fn send(&mut self, input: &str) -> Response {
        let response = self.session.player_action(input);
        self.record(input, &response);
        response
    }

    /// Describe the current scene again.
    pub fn scene(&mut self) -> Response {
        let response = self.session.current_scene();
        self.record("#scene", &response);
        response
    }

    pub fn journal(&mut self) -> Response {
        let response = self.session.journal();
        self.record("#journal", &response);
        response
    }

    pub fn restart(&mut self) -> Response {
        let response = self.session.restart();
        self.record("#restart", &response);
        response
    }

    /// Wait for pending snapshots to be written.
    pub async fn flush(&self) -> Result<(), PersistError> {
        self.session.flush().await
    }

    fn record(&mut self, input: &str, response: &Response) {
        self.transcript.push(TranscriptEntry {
            player_input: input.to_string(),
            response: response.narrative.clone(),
            outcome: response.outcome.clone(),
            turn: self.transcript.len() + 1,
        });
    }

    // ========================================================================
    // Game State Queries
    // ========================================================================

    pub fn session_id(&self) -> SessionId {
        self.session.session_id()
    }

    pub fn player_name(&self) -> Option<&str> {
        self.session.player_name()
    }

    pub fn current_scene_key(&self) -> &str {
        self.session.current_scene_key()
    }

    pub fn inventory(&self) -> &[String] {
        &self.session.state().inventory
    }

    pub fn journal_entries(&self) -> &[String] {
        &self.session.state().journal
    }

    pub fn is_lost(&self) -> bool {
        self.session.is_lost()
    }

    /// Get the transcript of all exchanges.
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Get the last response, if any.
    pub fn last_response(&self) -> Option<&str> {
        self.transcript.last().map(|e| e.response.as_str())
    }

    /// Number of accepted moves in the current session.
    pub fn turn_count(&self) -> usize {
        self.session.state().turn_count()
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }
}
