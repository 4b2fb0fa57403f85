//! Terminal driver for the adventure engine.
//!
//! Plays the built-in adventure (or a content file) over stdin/stdout, the
//! same way the voice game master drives it: one utterance in, one narrative
//! out.
//!
//! ```bash
//! cargo run -p adventure -- --name Marin --save-dir saves
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` to adjust verbosity.

mod headless;

use adventure_core::SessionConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adventure=info,adventure_core=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let options = match headless::parse_options(&args, SessionConfig::from_env()) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Run with --help for usage.");
            std::process::exit(2);
        }
    };

    headless::run_headless(options).await.map_err(|e| e.into())
}

fn print_help() {
    println!("Adventure - voice game master engine, terminal edition");
    println!();
    println!("USAGE:");
    println!("  adventure [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help          Show this help message");
    println!("  --name <NAME>       Player name used in greetings");
    println!("  --content <PATH>    Load adventure content from a JSON file");
    println!("  --save-dir <DIR>    Directory for session snapshots (default: saves)");
    println!("  --no-save           Do not write session snapshots");
    println!("  --resume <ID>       Continue a saved session");
    println!();
    println!("ENVIRONMENT:");
    println!("  ADVENTURE_SAVE_DIR        Snapshot directory (empty disables saving)");
    println!("  ADVENTURE_CONTENT         Content file path");
    println!("  ADVENTURE_RECENT_HISTORY  Moves listed by #journal (default: 5)");
    println!("  RUST_LOG                  Log filter (default: adventure=info,adventure_core=info)");
    println!();
    println!("EXAMPLES:");
    println!("  adventure                              # Play The Sunken Light");
    println!("  adventure --name Marin --no-save");
    println!("  adventure --resume 0b6c1c3e-5b7a-4a53-9d4f-2f3f7e1c9a10");
}
