//! dedup-companion - command-line host for the file-deduplicator engine
//!
//! Stands in for a UI shell: it loads preferences, scans a folder through
//! [`ScanController`], prints the duplicate groups and can move one file to
//! the trash, which triggers a rescan.
//!
//! # Execution Flow
//!
//! 1. Parse arguments, initialize logging → `<log-dir>/dedup-companion.<date>`
//! 2. Load preferences (`<config-dir>/preferences.yaml` + `DEDUP_*` env)
//! 3. Build a single-threaded tokio runtime (the host's event loop)
//! 4. Scan the requested folder, or the preferred default folder
//! 5. Optionally trash `--trash <PATH>` and print the rescanned report
//!
//! Ctrl-C cancels the running scan and kills the engine.

use anyhow::{Context, Result, anyhow, bail};
use camino::Utf8PathBuf;
use clap::Parser;
use dedup_companion::services::format::{group_subtitle, group_title};
use dedup_companion::services::{Notice, NoticeStyle, file_name, format_file_size, scan_notice};
use dedup_companion::{
    APP_NAME, CliOutput, ConfigManager, DeletionCoordinator, HashAlgorithm, Metrics, Preferences,
    ScanController, ScanOptions, VERSION,
};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "dedup-companion", version, about = "Find and trash duplicate files via file-deduplicator")]
struct Cli {
    /// Folder to scan. Defaults to the preferred scan location.
    directory: Option<Utf8PathBuf>,

    /// Hash algorithm (sha256, md5, sha1). Defaults to the preference.
    #[arg(long)]
    algorithm: Option<HashAlgorithm>,

    /// Ignore files smaller than this many bytes
    #[arg(long)]
    min_size: Option<u64>,

    /// Only scan the top-level folder
    #[arg(long)]
    no_recursive: bool,

    /// Move this file to the trash after scanning, then rescan
    #[arg(long, value_name = "PATH")]
    trash: Option<String>,

    /// Directory holding preferences.yaml
    #[arg(long, default_value = "dedup-companion")]
    config_dir: Utf8PathBuf,

    #[arg(long, default_value = "logs")]
    log_dir: String,

    /// Verbose logging, mirrored to the console
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = dedup_companion::logging::setup_logging_with_console(
        &cli.log_dir,
        "dedup-companion",
        cli.debug,
        cli.debug,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let preferences = config_manager.load_preferences()?;

    // Single-threaded event loop, like the UI host this replaces.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(run(cli, preferences));

    tracing::info!("Shutting down");
    result
}

async fn run(cli: Cli, preferences: Preferences) -> Result<()> {
    let metrics = Arc::new(Metrics::new());
    let controller = Arc::new(
        ScanController::from_preferences(preferences.clone()).with_metrics(Arc::clone(&metrics)),
    );

    // Every Ctrl-C cancels whatever scan is in flight at that moment.
    let canceller = Arc::clone(&controller);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            canceller.request_cancel();
        }
    });

    let directory = match cli.directory {
        Some(dir) => dir,
        None => preferences
            .default_location()
            .map(Utf8PathBuf::from)
            .ok_or_else(|| {
                anyhow!("No folder given and no default scan location configured")
            })?,
    };

    let options = ScanOptions {
        recursive: !cli.no_recursive,
        algorithm: cli.algorithm.unwrap_or(preferences.algorithm),
        min_size: cli.min_size,
    };

    print_notice(&Notice::scanning(directory.as_str()));

    let output = match controller.start(&directory, options).await {
        Ok(output) => output,
        Err(err) => {
            print_notice(&Notice::scan_failed(&err));
            metrics.log_summary();
            bail!(err);
        }
    };

    print_report(&output);
    print_notice(&scan_notice(&output));

    if let Some(path) = cli.trash {
        let file = output
            .duplicates
            .iter()
            .flat_map(|g| g.files.iter())
            .find(|f| f.path == path)
            .cloned()
            .ok_or_else(|| anyhow!("{} is not part of the duplicate report", path))?;

        let coordinator = DeletionCoordinator::with_system_trash(Arc::clone(&controller));
        match coordinator.delete_file(&file).await {
            Ok(outcome) => {
                print_notice(&Notice::trashed(outcome.trashed.as_str()));
                match outcome.rescan {
                    Some(Ok(rescanned)) => {
                        print_report(&rescanned);
                        print_notice(&scan_notice(&rescanned));
                    }
                    Some(Err(err)) => print_notice(&Notice::scan_failed(&err)),
                    None => {}
                }
            }
            Err(err) => print_notice(&Notice::delete_failed(&err)),
        }
    }

    metrics.log_summary();
    Ok(())
}

fn print_report(output: &CliOutput) {
    println!(
        "{} files in {} duplicate groups",
        output.file_count(),
        output.duplicates.len()
    );
    for (index, group) in output.duplicates.iter().enumerate() {
        println!("{}  ({})", group_title(index, group), group_subtitle(group));
        for file in &group.files {
            println!(
                "  {:<32} {:>10}  {}  {}",
                file_name(&file.path),
                format_file_size(file.size),
                file.mod_time.format("%Y-%m-%d"),
                file.path
            );
        }
    }
}

fn print_notice(notice: &Notice) {
    let marker = match notice.style {
        NoticeStyle::Progress => "..",
        NoticeStyle::Success => "ok",
        NoticeStyle::Failure => "!!",
    };
    println!("[{}] {}: {}", marker, notice.title, notice.message);
}
