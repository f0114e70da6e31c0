use rusqlite::Connection;

use crate::error::Result;
use crate::models::{Balance, Category, ImportRecord, Transaction, TransactionType};

// ---------------------------------------------------------------------------
// Balance
// ---------------------------------------------------------------------------

pub fn get_balance(conn: &Connection) -> Result<Balance> {
    let (income, outcome): (f64, f64) = conn.query_row(
        "SELECT \
            COALESCE(SUM(CASE WHEN type = 'income' THEN value END), 0.0), \
            COALESCE(SUM(CASE WHEN type = 'outcome' THEN value END), 0.0) \
         FROM transactions",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(Balance {
        income,
        outcome,
        total: income - outcome,
    })
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

pub fn list_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.title, t.type, t.value, c.id, c.title \
         FROM transactions t JOIN categories c ON c.id = t.category_id \
         ORDER BY t.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let raw_type: String = row.get(2)?;
            let kind = raw_type.parse::<TransactionType>().map_err(|v| {
                rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, v.into())
            })?;
            Ok(Transaction {
                id: Some(row.get(0)?),
                title: row.get(1)?,
                kind,
                value: row.get(3)?,
                category: Category {
                    id: Some(row.get(4)?),
                    title: row.get(5)?,
                },
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct CategorySummary {
    pub category: Category,
    pub transaction_count: i64,
}

pub fn list_categories(conn: &Connection) -> Result<Vec<CategorySummary>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.title, COUNT(t.id) \
         FROM categories c LEFT JOIN transactions t ON t.category_id = c.id \
         GROUP BY c.id, c.title ORDER BY c.title, c.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CategorySummary {
                category: Category {
                    id: Some(row.get(0)?),
                    title: row.get(1)?,
                },
                transaction_count: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_imports(conn: &Connection) -> Result<Vec<ImportRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, record_count, skipped_count, checksum, imported_at \
         FROM imports ORDER BY id DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ImportRecord {
                id: row.get(0)?,
                filename: row.get(1)?,
                record_count: row.get(2)?,
                skipped_count: row.get(3)?,
                checksum: row.get(4)?,
                imported_at: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
