//! The `library` subcommand: list discovered local packages.

use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use console::style;

use modsync::package::scan_library;

#[derive(Args)]
pub struct LibraryArgs {
    /// Package library directory to scan
    #[arg(long)]
    dir: PathBuf,
}

pub fn run(args: LibraryArgs) -> Result<(), Box<dyn Error>> {
    let mut packages = scan_library(&args.dir);
    if packages.is_empty() {
        println!("no packages found under {}", args.dir.display());
        return Ok(());
    }

    packages.sort_by(|a, b| a.name.cmp(&b.name));
    for package in &packages {
        let tag = if package.is_client_only() {
            style("client-only").yellow().to_string()
        } else {
            package.kind.to_string()
        };
        println!(
            "{:<32} {:<12} v{:<10} {}",
            style(&package.name).bold(),
            tag,
            package.version,
            package.hash.short(),
        );
    }
    println!("{} package(s)", packages.len());
    Ok(())
}
