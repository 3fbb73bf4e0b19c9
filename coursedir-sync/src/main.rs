//! coursedir-sync - Catalog reconciliation entry point
//!
//! Batch tool, run-to-completion: one invocation reconciles one catalog
//! against one upstream export file. Concurrent runs against the same root
//! folder are prevented by scheduling convention, not by this binary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coursedir_common::changelog::RunSummary;
use coursedir_common::config::{self, CatalogPaths, TomlConfig};
use coursedir_common::Error;
use coursedir_sync::{engine, enrollment, notify::LogNotifier};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for coursedir-sync
#[derive(Parser, Debug)]
#[command(name = "coursedir-sync")]
#[command(about = "Catalog reconciliation for the coursedir training directory")]
#[command(version)]
struct Args {
    /// Root folder containing the catalog files
    #[arg(short, long, env = "COURSEDIR_ROOT")]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the course catalog against an upstream course export
    Courses {
        /// Path to the upstream course export file
        feed: PathBuf,
    },
    /// Sync offering enrollment counters from the attendance export
    Enrollments {
        /// Path to the upstream attendance export file
        feed: PathBuf,
    },
    /// Hide catalog records whose expiration date has passed
    Expire,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load();

    let default_filter = toml_config
        .log_level
        .clone()
        .unwrap_or_else(|| "coursedir_sync=info,coursedir_common=info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&default_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let root = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    info!("Root folder: {}", root.display());
    let paths = CatalogPaths::new(root);
    let notifier = LogNotifier;

    let result = match &args.command {
        Command::Courses { feed } => engine::run_course_sync(&paths, feed, &notifier),
        Command::Enrollments { feed } => enrollment::run_enrollment_sync(&paths, feed, &notifier),
        Command::Expire => engine::run_expiration_sweep(&paths, &notifier),
    };

    match result {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            report_abort(&e);
            Err(anyhow::Error::new(e)).context("run aborted")
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("Catalog: {}", summary.catalog);
    println!(
        "  updated: {}  created: {}  hidden: {}  unmatched: {}",
        summary.updated, summary.created, summary.hidden, summary.unmatched
    );
    if summary.malformed_rows > 0 {
        println!("  malformed rows preserved: {}", summary.malformed_rows);
    }
    if summary.unresolved_fields > 0 {
        println!("  unresolved field translations: {}", summary.unresolved_fields);
    }
    if !summary.duplicates.is_empty() {
        println!("  duplicate candidates (manual resolution required):");
        for dup in &summary.duplicates {
            println!(
                "    {} {:?} collides with {} {:?} ({})",
                dup.feed_code, dup.feed_title, dup.catalog_code, dup.catalog_title, dup.catalog_guid
            );
        }
    }
    if !summary.changes.is_empty() {
        println!("  changes:");
        for entry in &summary.changes {
            println!("    {} {}: {}", entry.code, entry.title, entry.description);
        }
    }
}

/// Name the fatal error and state what was (not) modified
fn report_abort(e: &Error) {
    let note = match e {
        Error::SourceUnreadable { .. } | Error::Backup { .. } => {
            "no data was modified; the catalog is in its pre-run state"
        }
        Error::AtomicReplace { .. } => {
            "the original catalog file is untouched; the backup file is the recovery path"
        }
        _ => "the catalog was not rewritten",
    };
    eprintln!("error: {}", e);
    eprintln!("{}", note);
}
