//! Store interfaces the importer works against, plus their SQLite implementations.
//!
//! `create` only builds an unsaved value (`id: None`); `save` persists a batch and
//! fills in the ids.

use std::collections::HashSet;

use rusqlite::Connection;

use crate::error::{FinportError, Result};
use crate::models::{Category, Transaction, TransactionType};

// SQLite caps bound parameters per statement; stay well below it.
const LOOKUP_CHUNK: usize = 500;

pub trait CategoryStore {
    /// Existing categories whose title is one of `titles`.
    fn find_by_titles(&self, titles: &[String]) -> Result<Vec<Category>>;

    fn create(&self, title: &str) -> Category {
        Category {
            id: None,
            title: title.to_string(),
        }
    }

    fn save(&self, categories: &mut [Category]) -> Result<()>;
}

pub trait TransactionStore {
    fn create(&self, title: &str, kind: TransactionType, value: f64, category: &Category) -> Transaction {
        Transaction {
            id: None,
            title: title.to_string(),
            kind,
            value,
            category: category.clone(),
        }
    }

    fn save(&self, transactions: &mut [Transaction]) -> Result<()>;
}

pub struct SqliteCategories<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCategories<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl CategoryStore for SqliteCategories<'_> {
    fn find_by_titles(&self, titles: &[String]) -> Result<Vec<Category>> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = titles.iter().filter(|t| seen.insert(t.as_str())).collect();

        let mut found = Vec::new();
        for chunk in unique.chunks(LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("SELECT id, title FROM categories WHERE title IN ({placeholders}) ORDER BY id");
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                    Ok(Category {
                        id: Some(row.get(0)?),
                        title: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            found.extend(rows);
        }
        Ok(found)
    }

    fn save(&self, categories: &mut [Category]) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO categories (title) VALUES (?1)")?;
        for category in categories.iter_mut().filter(|c| c.id.is_none()) {
            stmt.execute([&category.title])?;
            category.id = Some(self.conn.last_insert_rowid());
        }
        Ok(())
    }
}

pub struct SqliteTransactions<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteTransactions<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl TransactionStore for SqliteTransactions<'_> {
    fn save(&self, transactions: &mut [Transaction]) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO transactions (title, type, value, category_id) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for txn in transactions.iter_mut().filter(|t| t.id.is_none()) {
            let category_id = txn
                .category
                .id
                .ok_or_else(|| FinportError::UnresolvedCategory(txn.category.title.clone()))?;
            stmt.execute(rusqlite::params![txn.title, txn.kind.as_str(), txn.value, category_id])?;
            txn.id = Some(self.conn.last_insert_rowid());
        }
        Ok(())
    }
}
