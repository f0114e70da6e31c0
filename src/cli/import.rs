use std::path::PathBuf;

use colored::Colorize;

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::importer::import_file;
use crate::reports::get_balance;
use crate::settings::load_settings;

pub fn run(file: &str, keep: bool) -> Result<()> {
    let file_path = PathBuf::from(file);
    let settings = load_settings();
    let mut conn = open_db()?;

    let keep_file = keep || !settings.delete_after_import;
    let result = import_file(&mut conn, &file_path, keep_file)?;

    println!(
        "{} imported, {} skipped (missing title, type or value)",
        result.transactions.len().to_string().green(),
        result.skipped
    );
    println!(
        "{} new categories, {} existing",
        result.created_categories, result.existing_categories
    );
    if result.file_removed {
        println!("Removed {}", file_path.display());
    }

    let balance = get_balance(&conn)?;
    println!("Balance: {}", money(balance.total).bold());
    Ok(())
}
