//! The `enabled` subcommand: show the committed enabled-package set.

use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use console::style;

use modsync::sync::EnabledPackages;
use modsync::SyncConfig;

#[derive(Args)]
pub struct EnabledArgs {
    /// Override the enabled-set file location
    #[arg(long)]
    enabled_file: Option<PathBuf>,
}

pub fn run(args: EnabledArgs) -> Result<(), Box<dyn Error>> {
    let path = args
        .enabled_file
        .unwrap_or_else(|| SyncConfig::default().enabled_path);

    let store = EnabledPackages::at_path(&path)?;
    let snapshot = store.snapshot();

    match &snapshot.core {
        Some(core) => println!(
            "{} {} ({})",
            style("core:").bold(),
            core.name,
            core.hash.short()
        ),
        None => {
            println!("no enabled set committed at {}", path.display());
            return Ok(());
        }
    }

    for package in &snapshot.regular {
        let tag = if package.is_client_only() {
            " [client-only]"
        } else {
            ""
        };
        println!("  {} ({}){}", package.name, package.hash.short(), tag);
    }
    println!("{} regular package(s)", snapshot.regular.len());
    Ok(())
}
