//! Turning scenes and session state into spoken-delivery text.
//!
//! Every string produced here ends with [`TERMINAL_PROMPT`]. The voice
//! pipeline treats that suffix as the end of the game master's turn.

use crate::content::Scene;
use crate::state::SessionState;

/// Closing line of every narration.
pub const TERMINAL_PROMPT: &str = "What do you do?";

/// Title shown for the lost pseudo-scene.
pub const LOST_TITLE: &str = "Lost";

/// Description shown for the lost pseudo-scene.
pub const LOST_DESCRIPTION: &str =
    "Thick sea fog swallows the world. Nothing here matches any place you remember.";

/// Narration for a scene: description, then one line per choice.
pub fn render_scene(scene: &Scene) -> String {
    let mut text = scene.description.trim().to_string();

    if !scene.choices.is_empty() {
        text.push_str("\n\n");
        text.push_str(&choice_lines(scene));
    }

    with_prompt(text)
}

/// Narration for the start of a session.
pub fn render_opening(adventure_title: &str, scene: &Scene, state: &SessionState) -> String {
    let greeting = match &state.player_name {
        Some(name) => format!("Welcome, {name}, to {adventure_title}."),
        None => format!("Welcome to {adventure_title}."),
    };
    format!("{greeting}\n\n{}", render_scene(scene))
}

/// Narration when an utterance matched no choice.
pub fn render_clarification(scene: &Scene, utterance: &str) -> String {
    let utterance = utterance.trim();
    let mut text = if utterance.is_empty() {
        "I didn't catch that.".to_string()
    } else {
        format!("I'm not sure how to \"{utterance}\" here.")
    };

    if scene.choices.is_empty() {
        text.push_str(" There is nothing to do here right now.");
    } else {
        text.push_str(" You could:\n");
        text.push_str(&choice_lines(scene));
    }

    with_prompt(text)
}

/// Narration when the current scene cannot be found.
pub fn render_lost(state: &SessionState) -> String {
    let mut text = LOST_DESCRIPTION.to_string();
    if let Some(name) = &state.player_name {
        text.push_str(&format!(" Stay calm, {name}."));
    }
    text.push_str(" Say \"restart\" to begin the adventure again.");
    with_prompt(text)
}

/// Summary of the session: identity, journal, inventory and recent moves.
pub fn render_journal(state: &SessionState, recent: usize) -> String {
    let mut text = format!("Session {}.\n", state.session_id);
    text.push_str(&format!(
        "Player: {}.\n",
        state.player_name.as_deref().unwrap_or("unnamed adventurer")
    ));

    text.push_str("\nJournal:\n");
    if state.journal.is_empty() {
        text.push_str("- Nothing written yet.\n");
    } else {
        for entry in &state.journal {
            text.push_str(&format!("- {entry}\n"));
        }
    }

    text.push_str("\nInventory: ");
    if state.inventory.is_empty() {
        text.push_str("empty.\n");
    } else {
        let items: Vec<String> = state.inventory.iter().map(|i| item_label(i)).collect();
        text.push_str(&format!("{}.\n", items.join(", ")));
    }

    let moves = state.recent_history(recent);
    if !moves.is_empty() {
        text.push_str("\nRecent moves:\n");
        for record in moves {
            text.push_str(&format!(
                "- {} from {} to {}\n",
                record.action, record.from, record.to
            ));
        }
    }

    with_prompt(text)
}

/// Spoken form of an item id: `seaweed_map` becomes `seaweed map`.
pub fn item_label(item_id: &str) -> String {
    item_id.replace('_', " ")
}

fn choice_lines(scene: &Scene) -> String {
    scene
        .choices
        .iter()
        .map(|c| format!("{} (say: {})", c.description, c.id))
        .collect::<Vec<_>>()
        .join("\n")
}

fn with_prompt(body: String) -> String {
    format!("{}\n\n{TERMINAL_PROMPT}", body.trim_end())
}
