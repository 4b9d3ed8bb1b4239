use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "suparna")]
#[command(about = "Index directory trees and flag duplicate files", long_about = None)]
pub struct Cli {
    /// Configuration file to read instead of ./Config.*
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index the given directories (defaults to the configured root paths)
    Scan {
        paths: Vec<PathBuf>,
    },
    /// Search indexed files by name
    Search {
        keyword: String,
        #[arg(short, long, default_value_t = 50)]
        limit: i64,
    },
    /// List files recorded as duplicates
    Duplicates {
        #[arg(short, long, default_value_t = 50)]
        limit: i64,
        #[arg(short, long, default_value_t = 0)]
        offset: i64,
    },
    /// Show row counts of the index
    Stats,
    /// Print configuration values
    PrintConfig,
    /// Truncate all database tables
    TruncateDb,
}
