//! The `join` subcommand: run one full reconciliation attempt.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use modsync::package::{load_server_set, scan_library, ServerPackage};
use modsync::sync::{
    AutoConfirm, BoxFuture, DirTransport, EnabledPackages, HttpTransport, Reconciler,
    ShellExtractor, SyncConfirmer, SyncOutcome, SyncProgress, Transport,
};
use modsync::SyncConfig;

#[derive(Args)]
pub struct JoinArgs {
    /// Host-exported package manifest (JSON array of descriptors)
    #[arg(long)]
    manifest: PathBuf,

    /// Where archives are served from: a directory or an http(s) URL
    #[arg(long)]
    archives: String,

    /// Local package library directory
    #[arg(long)]
    library: PathBuf,

    /// Skip the confirmation prompt
    #[arg(long)]
    yes: bool,

    /// Override the enabled-set file location
    #[arg(long)]
    enabled_file: Option<PathBuf>,

    /// Override the download staging directory
    #[arg(long)]
    staging: Option<PathBuf>,

    /// Name of the base package that must already match the host
    #[arg(long)]
    base_package: Option<String>,
}

/// Interactive consent gate backed by a terminal prompt.
struct PromptConfirmer;

impl SyncConfirmer for PromptConfirmer {
    fn confirm<'a>(&'a self, missing: &'a [ServerPackage]) -> BoxFuture<'a, bool> {
        let lines: Vec<String> = missing
            .iter()
            .map(|p| format!("  {} ({}, {})", style(&p.name).bold(), p.kind, p.hash.short()))
            .collect();

        Box::pin(async move {
            // dialoguer blocks; keep it off the reconciler's executor thread.
            tokio::task::spawn_blocking(move || {
                println!(
                    "The host requires {} package(s) you don't have installed:",
                    lines.len()
                );
                for line in &lines {
                    println!("{line}");
                }
                dialoguer::Confirm::new()
                    .with_prompt("Download them now?")
                    .default(false)
                    .interact()
                    .unwrap_or(false)
            })
            .await
            .unwrap_or(false)
        })
    }
}

pub fn run(args: JoinArgs) -> Result<(), Box<dyn Error>> {
    let server = load_server_set(&args.manifest)?;
    let local = scan_library(&args.library);

    let mut config = SyncConfig::default();
    if let Some(staging) = args.staging {
        config = config.with_staging_dir(staging);
    }
    if let Some(path) = args.enabled_file {
        config = config.with_enabled_path(path);
    }
    if let Some(base) = args.base_package {
        config = config.with_base_package(base);
    }

    let transport: Arc<dyn Transport> =
        if args.archives.starts_with("http://") || args.archives.starts_with("https://") {
            Arc::new(HttpTransport::new(args.archives.clone()))
        } else {
            Arc::new(DirTransport::new(&args.archives))
        };

    let confirmer: Arc<dyn SyncConfirmer> = if args.yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(PromptConfirmer)
    };

    let enabled = Arc::new(EnabledPackages::at_path(&config.enabled_path)?);
    let mut reconciler = Reconciler::new(
        config,
        transport,
        Arc::new(ShellExtractor::new()),
        confirmer,
        enabled,
    );

    let cancel = reconciler.cancel_token();
    ctrlc::set_handler(move || cancel.cancel())?;

    let reporter = spawn_progress_reporter(reconciler.progress());

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(reconciler.run(&server, &local));
    reporter.join().ok();

    match outcome? {
        SyncOutcome::Committed(report) => {
            println!(
                "{} core {}, {} regular package(s) enabled ({} downloaded, {} bytes)",
                style("synced:").green().bold(),
                report.core,
                report.regular_count,
                report.downloaded_count,
                report.bytes_downloaded,
            );
            Ok(())
        }
        SyncOutcome::Declined => {
            println!("{} downloads declined, disconnecting", style("stopped:").yellow());
            Ok(())
        }
        SyncOutcome::Aborted => {
            println!("{} attempt aborted", style("stopped:").yellow());
            Ok(())
        }
    }
}

/// Poll the attempt's progress and render a per-package bar.
///
/// Hidden until the first transfer starts, so the confirmation prompt isn't
/// drawn over.
fn spawn_progress_reporter(progress: Arc<SyncProgress>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden());
        bar.set_style(
            ProgressStyle::with_template("{msg:32} {bytes:>10}/{total_bytes:<10} {wide_bar}")
                .expect("static template"),
        );

        let mut visible = false;
        while !progress.is_finished() {
            if let Some(name) = progress.current_package() {
                if !visible {
                    bar.set_draw_target(ProgressDrawTarget::stderr());
                    visible = true;
                }
                let (received, total) = progress.current_bytes();
                bar.set_length(total);
                bar.set_position(received);
                bar.set_message(format!(
                    "{} [{}/{}]",
                    name,
                    progress.completed_packages() + 1,
                    progress.total_packages()
                ));
            }
            thread::sleep(Duration::from_millis(100));
        }
        bar.finish_and_clear();
    })
}
