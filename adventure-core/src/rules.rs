//! Applying a resolved choice to a session.
//!
//! Taking a choice is one step: apply its effects, append the transition
//! record, record the choice, move to the result scene. The step runs only
//! after resolution has succeeded against validated content, and none of its
//! parts can fail, so a step is never partially recorded.

use crate::content::{Choice, Effect};
use crate::state::{SessionState, TransitionRecord};
use chrono::{DateTime, Utc};

/// Apply effects to the session in order.
pub fn apply_effects(state: &mut SessionState, effects: &[Effect]) {
    for effect in effects {
        apply_effect(state, effect);
    }
}

/// Apply a single effect. Journal and inventory are append-only; repeating a
/// choice appends duplicates.
pub fn apply_effect(state: &mut SessionState, effect: &Effect) {
    match effect {
        Effect::AddJournal(text) => state.journal.push(text.clone()),
        Effect::AddInventory(item_id) => state.inventory.push(item_id.clone()),
    }
}

/// Append a transition record and the matching `choices_made` entry.
pub fn record_transition(
    state: &mut SessionState,
    from: impl Into<String>,
    action: impl Into<String>,
    to: impl Into<String>,
    timestamp: DateTime<Utc>,
) -> TransitionRecord {
    let record = TransitionRecord {
        from: from.into(),
        action: action.into(),
        to: to.into(),
        timestamp,
    };
    state.choices_made.push(record.action.clone());
    state.history.push(record.clone());
    record
}

/// Take `choice` from the current scene.
pub fn take_choice(state: &mut SessionState, choice: &Choice, now: DateTime<Utc>) -> TransitionRecord {
    let from = state.current_scene_key.clone();
    let timestamp = state.next_timestamp(now);

    apply_effects(state, &choice.effects);
    let record = record_transition(
        state,
        from,
        &choice.id,
        &choice.result_scene_key,
        timestamp,
    );
    state.current_scene_key = choice.result_scene_key.clone();
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::SceneGraph;
    use chrono::Duration;

    #[test]
    fn test_apply_journal_and_inventory() {
        let mut state = SessionState::new("intro", None);
        apply_effects(
            &mut state,
            &[
                Effect::AddJournal("Heard the bell.".to_string()),
                Effect::AddInventory("bell_rope".to_string()),
            ],
        );
        assert_eq!(state.journal, vec!["Heard the bell."]);
        assert_eq!(state.inventory, vec!["bell_rope"]);
        // Effects alone never touch history.
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_take_choice_records_one_transition() {
        let graph = SceneGraph::builtin().unwrap();
        let choice = graph.scene("intro").unwrap().choice("inspect_box").unwrap();
        let mut state = SessionState::new("intro", None);

        let record = take_choice(&mut state, choice, Utc::now());

        assert_eq!(record.from, "intro");
        assert_eq!(record.action, "inspect_box");
        assert_eq!(record.to, "box");
        assert_eq!(state.current_scene_key, "box");
        assert_eq!(state.history, vec![record]);
        assert_eq!(state.choices_made, vec!["inspect_box"]);
    }

    #[test]
    fn test_take_choice_applies_effects_once() {
        let graph = SceneGraph::builtin().unwrap();
        let choice = graph.scene("box").unwrap().choice("take_map").unwrap();
        let mut state = SessionState::new("box", None);

        take_choice(&mut state, choice, Utc::now());

        assert_eq!(
            state.journal,
            vec!["Found seaweed map: 'Below the broken light, the reef remembers.'"]
        );
        assert_eq!(state.inventory, vec!["seaweed_map"]);
        assert_eq!(state.current_scene_key, "tower_approach");
    }

    #[test]
    fn test_repeated_choice_appends_duplicates() {
        let graph = SceneGraph::builtin().unwrap();
        let choice = graph.scene("box").unwrap().choice("take_pearl").unwrap();
        let mut state = SessionState::new("box", None);

        take_choice(&mut state, choice, Utc::now());
        take_choice(&mut state, choice, Utc::now());

        assert_eq!(state.inventory, vec!["black_pearl", "black_pearl"]);
        assert_eq!(state.journal.len(), 2);
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history.len(), state.choices_made.len());
        assert_eq!(state.current_scene_key, "box");
    }

    #[test]
    fn test_timestamps_clamped_when_clock_goes_backwards() {
        let graph = SceneGraph::builtin().unwrap();
        let scene = graph.scene("box").unwrap();
        let mut state = SessionState::new("box", None);
        let now = Utc::now() + Duration::seconds(60);

        take_choice(&mut state, scene.choice("take_pearl").unwrap(), now);
        take_choice(
            &mut state,
            scene.choice("take_pearl").unwrap(),
            now - Duration::seconds(30),
        );

        assert_eq!(state.history[1].timestamp, state.history[0].timestamp);
    }
}
