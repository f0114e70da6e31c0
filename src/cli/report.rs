use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::{money, short_checksum, signed};
use crate::models::Balance;
use crate::reports;

fn balance_table(balance: &Balance) -> Table {
    let total = if balance.total >= 0.0 {
        money(balance.total).green().bold()
    } else {
        money(balance.total).red().bold()
    };
    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![Cell::new("Income"), Cell::new(money(balance.income))]);
    table.add_row(vec![Cell::new("Outcome"), Cell::new(money(balance.outcome))]);
    table.add_row(vec![Cell::new("Total".bold()), Cell::new(total)]);
    table
}

pub fn transactions() -> Result<()> {
    let conn = open_db()?;
    let txns = reports::list_transactions(&conn)?;
    if txns.is_empty() {
        println!("No transactions yet. Run `finport import <file>` to add some.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Type", "Value", "Category"]);
    for txn in &txns {
        table.add_row(vec![
            Cell::new(txn.id.unwrap_or_default()),
            Cell::new(&txn.title),
            Cell::new(txn.kind),
            Cell::new(signed(txn.kind, txn.value)),
            Cell::new(&txn.category.title),
        ]);
    }
    println!("Transactions\n{table}");

    let balance = reports::get_balance(&conn)?;
    println!("{}", balance_table(&balance));
    Ok(())
}

pub fn categories() -> Result<()> {
    let conn = open_db()?;
    let cats = reports::list_categories(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Transactions"]);
    for summary in cats {
        table.add_row(vec![
            Cell::new(summary.category.id.unwrap_or_default()),
            Cell::new(summary.category.title),
            Cell::new(summary.transaction_count),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}

pub fn balance() -> Result<()> {
    let conn = open_db()?;
    let balance = reports::get_balance(&conn)?;
    println!("Balance\n{}", balance_table(&balance));
    Ok(())
}

pub fn history() -> Result<()> {
    let conn = open_db()?;
    let imports = reports::list_imports(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "File", "Imported", "Skipped", "Checksum", "When"]);
    for record in &imports {
        table.add_row(vec![
            Cell::new(record.id),
            Cell::new(&record.filename),
            Cell::new(record.record_count),
            Cell::new(record.skipped_count),
            Cell::new(short_checksum(&record.checksum)),
            Cell::new(&record.imported_at),
        ]);
    }
    println!("Imports\n{table}");
    Ok(())
}
