//! Mutable per-session continuity data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a play session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// One accepted move through the scene graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: String,
    pub action: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
}

/// All mutable continuity data for one player's session.
///
/// `history` and `choices_made` always have the same length; both only grow
/// through [`crate::rules::take_choice`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: SessionId,
    pub player_name: Option<String>,
    pub current_scene_key: String,
    pub history: Vec<TransitionRecord>,
    pub journal: Vec<String>,
    pub inventory: Vec<String>,
    pub choices_made: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl SessionState {
    /// Create a fresh session positioned at `start_scene`.
    ///
    /// Blank player names are treated as absent.
    pub fn new(start_scene: impl Into<String>, player_name: Option<&str>) -> Self {
        let player_name = player_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        Self {
            session_id: SessionId::new(),
            player_name,
            current_scene_key: start_scene.into(),
            history: Vec::new(),
            journal: Vec::new(),
            inventory: Vec::new(),
            choices_made: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn last_transition(&self) -> Option<&TransitionRecord> {
        self.history.last()
    }

    /// The last `count` transitions, oldest first.
    pub fn recent_history(&self, count: usize) -> &[TransitionRecord] {
        let skip = self.history.len().saturating_sub(count);
        &self.history[skip..]
    }

    /// Number of accepted actions so far.
    pub fn turn_count(&self) -> usize {
        self.history.len()
    }

    pub fn has_item(&self, item_id: &str) -> bool {
        self.inventory.iter().any(|item| item == item_id)
    }

    /// Timestamp for the next transition.
    ///
    /// Never earlier than the previous transition (or the session start), so
    /// a wall clock stepping backwards cannot reorder history.
    pub fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let floor = self
            .last_transition()
            .map(|r| r.timestamp)
            .unwrap_or(self.started_at);
        now.max(floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(n: i64, at: DateTime<Utc>) -> TransitionRecord {
        TransitionRecord {
            from: format!("s{n}"),
            action: format!("a{n}"),
            to: format!("s{}", n + 1),
            timestamp: at,
        }
    }

    #[test]
    fn test_new_session() {
        let state = SessionState::new("intro", Some("Marin"));
        assert_eq!(state.current_scene_key, "intro");
        assert_eq!(state.player_name.as_deref(), Some("Marin"));
        assert!(state.history.is_empty());
        assert!(state.journal.is_empty());
        assert!(state.inventory.is_empty());
        assert!(state.choices_made.is_empty());
    }

    #[test]
    fn test_blank_player_name_is_none() {
        assert_eq!(SessionState::new("intro", Some("   ")).player_name, None);
        assert_eq!(SessionState::new("intro", None).player_name, None);
        assert_eq!(
            SessionState::new("intro", Some("  Wren ")).player_name.as_deref(),
            Some("Wren")
        );
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionState::new("intro", None);
        let b = SessionState::new("intro", None);
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_session_id_parse_round_trip() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }

    #[test]
    fn test_recent_history_is_oldest_first() {
        let mut state = SessionState::new("s0", None);
        let t0 = state.started_at;
        for n in 0..4 {
            state.history.push(record(n, t0 + Duration::seconds(n)));
        }
        let recent = state.recent_history(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "a2");
        assert_eq!(recent[1].action, "a3");
        assert_eq!(state.recent_history(10).len(), 4);
    }

    #[test]
    fn test_next_timestamp_never_goes_backwards() {
        let mut state = SessionState::new("s0", None);
        let later = state.started_at + Duration::seconds(30);
        state.history.push(record(0, later));

        let skewed = later - Duration::seconds(10);
        assert_eq!(state.next_timestamp(skewed), later);

        let after = later + Duration::seconds(1);
        assert_eq!(state.next_timestamp(after), after);
    }

    #[test]
    fn test_serialized_timestamps_are_utc_z() {
        let state = SessionState::new("intro", None);
        let json = serde_json::to_value(&state).unwrap();
        let started = json["started_at"].as_str().unwrap();
        assert!(started.ends_with('Z'), "{started}");
    }
}
