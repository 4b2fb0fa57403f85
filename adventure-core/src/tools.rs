//! Tool surface for the game master model.
//!
//! The language model driving the voice channel never parses scenes itself;
//! it calls these tools and speaks the returned narrative verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Errors from parsing a tool call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool {tool} is missing required argument {argument}")]
    MissingArgument { tool: String, argument: String },
}

/// A tool definition as offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Collection of adventure tools.
pub struct AdventureTools;

impl AdventureTools {
    /// All tool definitions.
    pub fn all() -> Vec<ToolDefinition> {
        vec![
            Self::start_adventure(),
            Self::player_action(),
            Self::get_current_scene(),
            Self::show_journal(),
            Self::restart_adventure(),
        ]
    }

    /// Look up a definition by name.
    pub fn get(name: &str) -> Option<ToolDefinition> {
        Self::all().into_iter().find(|tool| tool.name == name)
    }

    fn start_adventure() -> ToolDefinition {
        ToolDefinition {
            name: "start_adventure".to_string(),
            description: "Start a new adventure for the player. Call this when the player asks to play or begin. Speak the returned narrative exactly as given.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "player_name": {
                        "type": "string",
                        "description": "Name the player wants to be called, if they gave one"
                    }
                },
                "required": []
            }),
        }
    }

    fn player_action() -> ToolDefinition {
        ToolDefinition {
            name: "player_action".to_string(),
            description: "Pass what the player said they want to do in the current scene. Use the player's own words. Speak the returned narrative exactly as given.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "description": "The player's utterance, e.g. 'take the map' or 'climb the tower'"
                    }
                },
                "required": ["action"]
            }),
        }
    }

    fn get_current_scene() -> ToolDefinition {
        ToolDefinition {
            name: "get_current_scene".to_string(),
            description: "Describe the current scene again and list the available choices. Use when the player asks where they are or what they can do.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    fn show_journal() -> ToolDefinition {
        ToolDefinition {
            name: "show_journal".to_string(),
            description: "Summarize the player's journal, inventory and recent moves. Use when the player asks what they have found or done so far.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    fn restart_adventure() -> ToolDefinition {
        ToolDefinition {
            name: "restart_adventure".to_string(),
            description: "Discard the current progress and begin the adventure again from the start. Only use when the player clearly asks to restart.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }
}

/// A parsed tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    StartAdventure { player_name: Option<String> },
    PlayerAction { action: String },
    GetCurrentScene,
    ShowJournal,
    RestartAdventure,
}

impl ToolCall {
    /// Parse a call by tool name and JSON input.
    pub fn parse(name: &str, input: &Value) -> Result<Self, ToolError> {
        match name {
            "start_adventure" => Ok(ToolCall::StartAdventure {
                player_name: input["player_name"].as_str().map(str::to_string),
            }),
            "player_action" => {
                let action = input["action"]
                    .as_str()
                    .ok_or_else(|| ToolError::MissingArgument {
                        tool: name.to_string(),
                        argument: "action".to_string(),
                    })?;
                Ok(ToolCall::PlayerAction {
                    action: action.to_string(),
                })
            }
            "get_current_scene" => Ok(ToolCall::GetCurrentScene),
            "show_journal" => Ok(ToolCall::ShowJournal),
            "restart_adventure" => Ok(ToolCall::RestartAdventure),
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }
}
