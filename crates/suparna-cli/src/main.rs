mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use suparna_core::storage::Database;
use suparna_core::{AbortHandle, AppConfig, ScanEngine, ScanResult, ScanStatus};
use tracing::{error, info, warn};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let loaded = match &args.config {
        Some(path) => suparna_core::config::load_configuration_from(path),
        None => suparna_core::config::load_configuration(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    match args.command {
        Some(Commands::Scan { paths }) => {
            if let Err(err) = run_scan(&config, paths) {
                error!("Error: {:#}", err);
                process::exit(1);
            }
        }
        Some(Commands::Search { keyword, limit }) => run_search(&config, &keyword, limit)?,
        Some(Commands::Duplicates { limit, offset }) => run_duplicates(&config, offset, limit)?,
        Some(Commands::Stats) => run_stats(&config)?,
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        Some(Commands::TruncateDb) => {
            if prompt_confirm(
                "Are you SURE you want to COMPLETELY DELETE the Database?",
                Some(false),
            )? {
                open_db(&config)?.truncate_all()?;
                println!("All tables truncated");
            }
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn open_db(config: &AppConfig) -> anyhow::Result<Database> {
    Database::open(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path))
}

fn run_scan(config: &AppConfig, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let roots: Vec<PathBuf> = if paths.is_empty() {
        suparna_core::config::non_overlapping_directories(config.root_paths.clone())
            .into_iter()
            .map(PathBuf::from)
            .collect()
    } else {
        paths
    };
    if roots.is_empty() {
        anyhow::bail!("no paths given and no root_paths configured");
    }

    let engine = ScanEngine::new(config.clone());

    // The Ctrl-C handler can only be installed once; it cancels whichever scan is current.
    let current: Arc<Mutex<Option<AbortHandle>>> = Arc::new(Mutex::new(None));
    let handler_slot = Arc::clone(&current);
    ctrlc::set_handler(move || {
        if let Ok(slot) = handler_slot.lock() {
            if let Some(handle) = slot.as_ref() {
                if handle.abort() {
                    warn!("Interrupt received, stopping scan...");
                }
            }
        }
    })
    .context("installing Ctrl-C handler")?;

    for root in roots {
        if let Ok(mut slot) = current.lock() {
            *slot = Some(engine.abort_handle());
        }

        let reporter = CliReporter::new();
        let result = engine
            .scan(&root, &reporter)
            .with_context(|| format!("scanning {}", root.display()))?;

        info!("{}", scan_summary(&result));
        println!(
            "{}: {} originals, {} duplicates, {} skipped",
            result.root.display(),
            format!("{}", result.originals).green(),
            format!("{}", result.duplicates).red(),
            format!("{}", skipped_files(&result)).yellow(),
        );

        if result.status == ScanStatus::Aborted {
            warn!("Scan aborted; partial results were kept");
            break;
        }
    }

    Ok(())
}

fn skipped_files(result: &ScanResult) -> usize {
    result.hash_failures + result.persist_failures
}

/// Uncoloured summary line for the log file.
fn scan_summary(result: &ScanResult) -> String {
    format!(
        "{}: {} originals, {} duplicates, {} skipped",
        result.root.display(),
        result.originals,
        result.duplicates,
        skipped_files(result),
    )
}

fn run_search(config: &AppConfig, keyword: &str, limit: i64) -> anyhow::Result<()> {
    let db = open_db(config)?;
    let files = db.search_files(keyword, limit)?;
    if files.is_empty() {
        println!("No files matching '{}'", keyword);
    }
    for file in files {
        println!(
            "{}  {}  {} bytes  {}",
            file.name.bold(),
            file.path,
            file.size,
            file.modified_time.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}

fn run_duplicates(config: &AppConfig, offset: i64, limit: i64) -> anyhow::Result<()> {
    let db = open_db(config)?;
    for listing in db.list_duplicates(offset, limit)? {
        println!(
            "{} {} {}",
            listing.duplicate.path.red(),
            "->".dimmed(),
            listing.original_path
        );
    }
    Ok(())
}

fn run_stats(config: &AppConfig) -> anyhow::Result<()> {
    let db = open_db(config)?;
    println!("Files:      {}", format!("{}", db.file_count()?).green());
    println!("Duplicates: {}", format!("{}", db.duplicate_count()?).red());
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
