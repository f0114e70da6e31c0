pub mod import;
pub mod init;
pub mod report;

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::filter::LevelFilter;

use crate::db::{get_connection, DB_FILE};
use crate::error::{FinportError, Result};
use crate::settings::get_data_dir;

/// Open the configured database, refusing to create one implicitly.
pub(crate) fn open_db() -> Result<Connection> {
    let db_path = get_data_dir().join(DB_FILE);
    if !db_path.exists() {
        return Err(FinportError::NotInitialized(db_path));
    }
    get_connection(&db_path)
}

#[derive(Parser)]
#[command(name = "finport", about = "Import CSV transaction statements into a categorized ledger.")]
pub struct Cli {
    /// Log verbosity: off, error, warn, info, debug, trace (RUST_LOG overrides)
    #[arg(long = "log-level", global = true, default_value_t = LevelFilter::WARN)]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for finport data (default: ~/Documents/finport)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import a CSV file with columns title,type,value,category.
    Import {
        /// Path to the CSV file to import
        file: String,
        /// Leave the file in place after a successful import
        #[arg(long)]
        keep: bool,
    },
    /// List all transactions with the current balance.
    Transactions,
    /// List categories and how many transactions use each.
    Categories,
    /// Show total income, outcome and balance.
    Balance,
    /// Show previous imports.
    History,
}
