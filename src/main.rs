mod commands;
mod error;
mod handler;
mod path;
mod response;
mod rules;
mod send;
mod store;
mod telemetry;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::check::CheckArgs;
use commands::init::InitArgs;
use commands::respond::RespondArgs;
use commands::show::ShowArgs;

#[derive(Debug, Parser)]
#[command(
    name = "onreply",
    version,
    about = "Rule-driven auto-responder for polled chat messages"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a rules file
    Check(CheckArgs),
    /// Show the effective settings after replica reconciliation and defaults
    Show(ShowArgs),
    /// Write the built-in default rules into the store
    Init(InitArgs),
    /// Replay a captured poll response through the responder engine
    Respond(RespondArgs),
    /// Print the JSON Schema for the rules document
    Schema,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Check(_) => "check",
            Self::Show(_) => "show",
            Self::Init(_) => "init",
            Self::Respond(_) => "respond",
            Self::Schema => "schema",
        }
    }
}

fn main() -> ExitCode {
    telemetry::init();

    let cli = Cli::parse();

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Check(args) => args.execute(),
        Commands::Show(args) => args.execute(),
        Commands::Init(args) => args.execute(),
        Commands::Respond(args) => args.execute(),
        Commands::Schema => commands::schema::run_schema(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(exit_err) = e.downcast_ref::<error::ExitError>() {
                eprintln!("error: {exit_err}");
                exit_err.exit_code()
            } else {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
