//! Line-oriented driver for the adventure.
//!
//! Stands in for the voice pipeline: each input line is one player
//! utterance, and each narrative is printed exactly as it would be spoken.

use adventure_core::{AdventureTools, HeadlessGame, SessionConfig, SessionError, SessionId};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::warn;

/// Options gathered from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub player_name: Option<String>,
    pub resume: Option<SessionId>,
    pub config: SessionConfig,
}

/// Errors from command-line parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("{0} requires a value")]
    MissingValue(&'static str),

    #[error("'{0}' is not a valid session id")]
    InvalidSessionId(String),

    #[error("unknown argument '{0}'")]
    Unknown(String),
}

/// Parse arguments on top of a base configuration (usually from the environment).
pub fn parse_options(args: &[String], config: SessionConfig) -> Result<CliOptions, ArgError> {
    let mut options = CliOptions {
        player_name: None,
        resume: None,
        config,
    };

    let mut args = args.iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--name" => {
                let name = args.next().ok_or(ArgError::MissingValue("--name"))?;
                options.player_name = Some(name.clone());
            }
            "--content" => {
                let path = args.next().ok_or(ArgError::MissingValue("--content"))?;
                options.config = options.config.with_content_path(path);
            }
            "--save-dir" => {
                let dir = args.next().ok_or(ArgError::MissingValue("--save-dir"))?;
                options.config = options.config.with_save_dir(dir);
            }
            "--no-save" => {
                options.config = options.config.without_persistence();
            }
            "--resume" => {
                let id = args.next().ok_or(ArgError::MissingValue("--resume"))?;
                let session_id = id
                    .parse()
                    .map_err(|_| ArgError::InvalidSessionId(id.clone()))?;
                options.resume = Some(session_id);
            }
            other => return Err(ArgError::Unknown(other.to_string())),
        }
    }

    Ok(options)
}

/// Run the adventure over stdin and stdout.
pub async fn run_headless(options: CliOptions) -> Result<(), SessionError> {
    let mut game = match options.resume {
        Some(session_id) => HeadlessGame::resume(options.config, session_id).await?,
        None => HeadlessGame::from_config(options.config).await?,
    };

    println!("=== {} ===", game.session().graph().title());
    print_commands();
    println!();

    if options.resume.is_some() {
        print_narrative(&game.scene().narrative);
    } else {
        print_narrative(&game.start(options.player_name.as_deref()).narrative);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('#') {
            match command.trim() {
                "quit" | "exit" => {
                    println!("Goodbye!");
                    break;
                }
                "scene" => print_narrative(&game.scene().narrative),
                "journal" => print_narrative(&game.journal().narrative),
                "restart" => print_narrative(&game.restart().narrative),
                "status" => {
                    println!("[STATUS]");
                    println!("  Session: {}", game.session_id());
                    println!("  Player: {}", game.player_name().unwrap_or("(unnamed)"));
                    println!("  Scene: {}", game.current_scene_key());
                    println!("  Moves: {}", game.turn_count());
                    println!();
                }
                "tools" => {
                    println!("[TOOLS]");
                    for tool in AdventureTools::all() {
                        println!("  {} - {}", tool.name, tool.description);
                    }
                    println!();
                }
                "help" => print_commands(),
                _ => println!("[ERROR] Unknown command. Type #help for help."),
            }
            stdout.flush().ok();
            continue;
        }

        print_narrative(&game.send(line).narrative);
        stdout.flush().ok();
    }

    if let Err(e) = game.flush().await {
        warn!(error = %e, "could not flush pending snapshots");
    }
    println!("[SESSION] {}", game.session_id());

    Ok(())
}

fn print_narrative(narrative: &str) {
    println!("[GM]");
    for para in narrative.split("\n\n") {
        println!("{para}");
    }
    println!();
}

fn print_commands() {
    println!("Commands:");
    println!("  #scene    - Describe the current scene again");
    println!("  #journal  - Show journal, inventory and recent moves");
    println!("  #restart  - Start the adventure over");
    println!("  #status   - Show session id and position");
    println!("  #tools    - List the tools offered to the game master model");
    println!("  #help     - Show this help");
    println!("  #quit     - Exit");
    println!("  (anything else is spoken as the player's action)");
}
