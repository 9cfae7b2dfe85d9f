mod config;
mod convert;

use clap::{Parser, Subcommand};
use event_json::OutputRegistry;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "event_json=info,event_json_cli=info";

#[derive(Debug, Parser)]
#[command(name = "event-json")]
#[command(about = "Write newline-delimited event records as a single JSON object")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert JSONL records into one `{"event_0": ..., "event_1": ...}` document.
    Convert(convert::Args),
    /// List the available output modules.
    Formats,
}

fn init_tracing() {
    // Logs go to stderr so stdout stays a clean JSON document.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), convert::Error> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Convert(args) => convert::run(args).map(|_| ()),
        Command::Formats => {
            for (name, description) in OutputRegistry::with_defaults().names_and_descriptions() {
                println!("{name}\t{description}");
            }
            Ok(())
        }
    }
}
