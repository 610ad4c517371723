//! ModSync CLI - reconcile local content packages against a multiplayer host.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "modsync", version, about = "Content package synchronization for multiplayer clients")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation attempt against a host-exported manifest
    Join(commands::join::JoinArgs),
    /// List packages in a local library
    Library(commands::library::LibraryArgs),
    /// Show the committed enabled-package set
    Enabled(commands::enabled::EnabledArgs),
}

fn main() {
    let _guard = match modsync::logging::init_logging() {
        Ok(guard) => Some(guard),
        Err(e) => {
            modsync::logging::init_logging_stderr();
            tracing::warn!(error = %e, "file logging unavailable, using stderr");
            None
        }
    };

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Join(args) => commands::join::run(args),
        Commands::Library(args) => commands::library::run(args),
        Commands::Enabled(args) => commands::enabled::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
