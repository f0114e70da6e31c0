use std::collections::HashSet;
use std::path::Path;

use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{FinportError, Result};
use crate::models::{Category, CsvRow, Transaction, TransactionType};
use crate::store::{CategoryStore, SqliteCategories, SqliteTransactions, TransactionStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_value(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '$'], "");
    let value: f64 = s.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn cell(record: &csv::StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("")
}

fn remove_source(file_path: &Path) -> Result<()> {
    std::fs::remove_file(file_path)?;
    info!(path = %file_path.display(), "removed imported file");
    Ok(())
}

/// Distinct category titles not already present in `existing`, in order of first appearance.
pub fn titles_to_create(titles: &[String], existing: &[Category]) -> Vec<String> {
    let known: HashSet<&str> = existing.iter().map(|c| c.title.as_str()).collect();
    let mut seen = HashSet::new();
    titles
        .iter()
        .filter(|t| !known.contains(t.as_str()))
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// CSV reading
// ---------------------------------------------------------------------------

pub struct ParsedFile {
    pub rows: Vec<CsvRow>,
    pub skipped: usize,
}

/// Reads `title,type,value,category` rows, skipping the header line.
///
/// Rows with an empty title, type or value are dropped and counted in `skipped`.
/// A kept row with an unknown type or a non-numeric value fails the whole read.
pub fn read_rows(file_path: &Path) -> Result<ParsedFile> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(std::io::BufReader::new(file));

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let (title, raw_type, raw_value) = (cell(&record, 0), cell(&record, 1), cell(&record, 2));

        if title.is_empty() || raw_type.is_empty() || raw_value.is_empty() {
            debug!(line, "skipping incomplete row");
            skipped += 1;
            continue;
        }

        let kind: TransactionType = raw_type
            .parse()
            .map_err(|value| FinportError::InvalidType { line, value })?;
        let value = parse_value(raw_value).ok_or_else(|| FinportError::InvalidValue {
            line,
            value: raw_value.to_string(),
        })?;

        rows.push(CsvRow {
            title: title.to_string(),
            kind,
            value,
            category: cell(&record, 3).to_string(),
        });
    }

    debug!(kept = rows.len(), skipped, "read import file");
    Ok(ParsedFile { rows, skipped })
}

// ---------------------------------------------------------------------------
// Importer
// ---------------------------------------------------------------------------

pub struct Reconciled {
    pub transactions: Vec<Transaction>,
    pub created_categories: usize,
    pub existing_categories: usize,
}

pub struct Importer<'s, C, T> {
    categories: &'s C,
    transactions: &'s T,
}

impl<'s, C, T> Importer<'s, C, T>
where
    C: CategoryStore,
    T: TransactionStore,
{
    pub fn new(categories: &'s C, transactions: &'s T) -> Self {
        Self {
            categories,
            transactions,
        }
    }

    /// Reads `file_path`, persists its categories and transactions, then deletes the file.
    ///
    /// The two save steps are not atomic here; a failure between them leaves the new
    /// categories in the store. Use [`import_file`] for the all-or-nothing SQLite path.
    #[allow(dead_code)]
    pub fn import(&self, file_path: &Path) -> Result<Vec<Transaction>> {
        let parsed = read_rows(file_path)?;
        let reconciled = self.persist(&parsed.rows)?;
        remove_source(file_path)?;
        Ok(reconciled.transactions)
    }

    /// Reconciles the rows' categories against the store and saves one transaction per row.
    pub fn persist(&self, rows: &[CsvRow]) -> Result<Reconciled> {
        let titles: Vec<String> = rows.iter().map(|r| r.category.clone()).collect();

        let existing = self.categories.find_by_titles(&titles)?;
        let mut created: Vec<Category> = titles_to_create(&titles, &existing)
            .iter()
            .map(|title| self.categories.create(title))
            .collect();
        self.categories.save(&mut created)?;
        debug!(
            existing = existing.len(),
            created = created.len(),
            "reconciled categories"
        );

        let created_categories = created.len();
        let existing_categories = existing.len();

        // New categories first, then the ones already in the store.
        let mut known = created;
        known.extend(existing);

        let mut transactions = rows
            .iter()
            .map(|row| -> Result<Transaction> {
                let category = known
                    .iter()
                    .find(|c| c.title == row.category)
                    .ok_or_else(|| FinportError::UnresolvedCategory(row.category.clone()))?;
                Ok(self.transactions.create(&row.title, row.kind, row.value, category))
            })
            .collect::<Result<Vec<_>>>()?;
        self.transactions.save(&mut transactions)?;
        info!(count = transactions.len(), "saved transactions");

        Ok(Reconciled {
            transactions,
            created_categories,
            existing_categories,
        })
    }
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

pub struct ImportResult {
    pub transactions: Vec<Transaction>,
    pub created_categories: usize,
    pub existing_categories: usize,
    pub skipped: usize,
    pub file_removed: bool,
}

/// Imports `file_path` into the database inside a single SQLite transaction.
///
/// The import is logged in `imports` and committed before the file is removed, so a
/// failure at any point leaves both the database and the file untouched.
pub fn import_file(conn: &mut Connection, file_path: &Path, keep_file: bool) -> Result<ImportResult> {
    let parsed = read_rows(file_path)?;
    let checksum = compute_checksum(file_path)?;

    let tx = conn.transaction()?;
    let reconciled = {
        let categories = SqliteCategories::new(&tx);
        let transactions = SqliteTransactions::new(&tx);
        Importer::new(&categories, &transactions).persist(&parsed.rows)?
    };
    tx.execute(
        "INSERT INTO imports (filename, record_count, skipped_count, checksum) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            reconciled.transactions.len() as i64,
            parsed.skipped as i64,
            checksum,
        ],
    )?;
    tx.commit()?;

    if !keep_file {
        remove_source(file_path)?;
    }

    Ok(ImportResult {
        transactions: reconciled.transactions,
        created_categories: reconciled.created_categories,
        existing_categories: reconciled.existing_categories,
        skipped: parsed.skipped,
        file_removed: !keep_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use std::path::PathBuf;

    const HEADER: &str = "title,type,value,category";

    fn write_csv(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut content = format!("{HEADER}\n");
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        std::fs::write(&path, &content).unwrap();
        path
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    fn category_titles(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT title FROM categories ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    struct FailingTransactions;

    impl TransactionStore for FailingTransactions {
        fn save(&self, _transactions: &mut [Transaction]) -> Result<()> {
            Err(FinportError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("5000"), Some(5000.0));
        assert_eq!(parse_value("1,234.56"), Some(1234.56));
        assert_eq!(parse_value("$20"), Some(20.0));
        assert_eq!(parse_value("abc"), None);
        assert_eq!(parse_value("NaN"), None);
    }

    #[test]
    fn test_titles_to_create_dedupes_in_order() {
        let titles: Vec<String> = ["Food", "Job", "Food", "Rent", "Job"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let existing = vec![Category {
            id: Some(1),
            title: "Rent".to_string(),
        }];
        assert_eq!(titles_to_create(&titles, &existing), vec!["Food", "Job"]);
    }

    #[test]
    fn test_read_rows_skips_header_and_incomplete_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "stmt.csv", &[
            "Salary,income,5000,Job",
            ",income,5000,Job",
            "Lunch,,20,Food",
            "Taxi,outcome,,Transport",
            "Coffee,outcome",
            "Lunch,outcome,20,Food",
        ]);
        let parsed = read_rows(&path).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped, 4);
        assert_eq!(parsed.rows[0].title, "Salary");
        assert_eq!(parsed.rows[1].title, "Lunch");
    }

    #[test]
    fn test_read_rows_trims_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "stmt.csv", &["  Salary , income ,  5000 ,  Job  "]);
        let parsed = read_rows(&path).unwrap();
        let row = &parsed.rows[0];
        assert_eq!(row.title, "Salary");
        assert_eq!(row.kind, TransactionType::Income);
        assert_eq!(row.value, 5000.0);
        assert_eq!(row.category, "Job");
    }

    #[test]
    fn test_read_rows_whitespace_only_cells_are_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "stmt.csv", &["   ,income,5000,Job"]);
        let parsed = read_rows(&path).unwrap();
        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.skipped, 1);
    }

    #[test]
    fn test_read_rows_rejects_unknown_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "stmt.csv", &[
            "Salary,income,5000,Job",
            "Lunch,expense,20,Food",
        ]);
        match read_rows(&path) {
            Err(FinportError::InvalidType { line, value }) => {
                assert_eq!(line, 3);
                assert_eq!(value, "expense");
            }
            other => panic!("expected InvalidType, got {:?}", other.map(|p| p.rows)),
        }
    }

    #[test]
    fn test_read_rows_rejects_non_numeric_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "stmt.csv", &["Lunch,outcome,twenty,Food"]);
        assert!(matches!(
            read_rows(&path),
            Err(FinportError::InvalidValue { line: 2, .. })
        ));
    }

    #[test]
    fn test_read_rows_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_rows(&dir.path().join("nope.csv")),
            Err(FinportError::Io(_))
        ));
    }

    #[test]
    fn test_import_into_empty_store() {
        let (dir, conn) = test_db();
        let path = write_csv(dir.path(), "stmt.csv", &[
            "Salary,income,5000,Job",
            "Lunch,outcome,20,Food",
        ]);
        let categories = SqliteCategories::new(&conn);
        let transactions = SqliteTransactions::new(&conn);
        let saved = Importer::new(&categories, &transactions).import(&path).unwrap();

        assert_eq!(saved.len(), 2);
        assert_eq!(category_titles(&conn), vec!["Job", "Food"]);
        assert_eq!(saved[0].title, "Salary");
        assert_eq!(saved[0].kind, TransactionType::Income);
        assert_eq!(saved[0].category.title, "Job");
        assert_eq!(saved[1].category.title, "Food");
        assert!(saved.iter().all(|t| t.id.is_some() && t.category.id.is_some()));
        assert!(!path.exists());
    }

    #[test]
    fn test_import_links_rows_to_stored_categories() {
        let (dir, conn) = test_db();
        let path = write_csv(dir.path(), "stmt.csv", &[
            "Salary,income,5000,Job",
            "Lunch,outcome,20,Food",
            "Dinner,outcome,35,Food",
        ]);
        let categories = SqliteCategories::new(&conn);
        let transactions = SqliteTransactions::new(&conn);
        Importer::new(&categories, &transactions).import(&path).unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT t.title, c.title FROM transactions t JOIN categories c ON c.id = t.category_id ORDER BY t.id",
            )
            .unwrap();
        let pairs: Vec<(String, String)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(
            pairs,
            vec![
                ("Salary".to_string(), "Job".to_string()),
                ("Lunch".to_string(), "Food".to_string()),
                ("Dinner".to_string(), "Food".to_string()),
            ]
        );
    }

    #[test]
    fn test_import_reuses_existing_categories() {
        let (dir, conn) = test_db();
        conn.execute("INSERT INTO categories (title) VALUES ('Food')", []).unwrap();
        let path = write_csv(dir.path(), "stmt.csv", &[
            "Lunch,outcome,20,Food",
            "Salary,income,5000,Job",
        ]);
        let categories = SqliteCategories::new(&conn);
        let transactions = SqliteTransactions::new(&conn);
        let saved = Importer::new(&categories, &transactions).import(&path).unwrap();

        assert_eq!(category_titles(&conn), vec!["Food", "Job"]);
        assert_eq!(saved[0].category.id, Some(1));
        assert_eq!(saved[1].category.title, "Job");
    }

    #[test]
    fn test_import_creates_each_title_once() {
        let (dir, conn) = test_db();
        let path = write_csv(dir.path(), "stmt.csv", &[
            "Lunch,outcome,20,Food",
            "Dinner,outcome,35,Food",
            "Snack,outcome,5,Food",
        ]);
        let categories = SqliteCategories::new(&conn);
        let transactions = SqliteTransactions::new(&conn);
        let saved = Importer::new(&categories, &transactions).import(&path).unwrap();

        assert_eq!(category_titles(&conn), vec!["Food"]);
        assert!(saved.iter().all(|t| t.category.id == saved[0].category.id));
    }

    #[test]
    fn test_import_drops_rows_without_title() {
        let (dir, conn) = test_db();
        let path = write_csv(dir.path(), "stmt.csv", &[",income,5000,Job"]);
        let categories = SqliteCategories::new(&conn);
        let transactions = SqliteTransactions::new(&conn);
        let saved = Importer::new(&categories, &transactions).import(&path).unwrap();

        assert!(saved.is_empty());
        assert_eq!(count(&conn, "categories"), 0);
        assert_eq!(count(&conn, "transactions"), 0);
    }

    #[test]
    fn test_import_is_not_idempotent() {
        let (dir, conn) = test_db();
        let rows = ["Lunch,outcome,20,Food"];
        let categories = SqliteCategories::new(&conn);
        let transactions = SqliteTransactions::new(&conn);
        let importer = Importer::new(&categories, &transactions);

        importer.import(&write_csv(dir.path(), "a.csv", &rows)).unwrap();
        importer.import(&write_csv(dir.path(), "b.csv", &rows)).unwrap();

        assert_eq!(count(&conn, "transactions"), 2);
        assert_eq!(count(&conn, "categories"), 1);
    }

    #[test]
    fn test_import_failure_keeps_file_and_new_categories() {
        let (dir, conn) = test_db();
        let path = write_csv(dir.path(), "stmt.csv", &["Lunch,outcome,20,Food"]);
        let categories = SqliteCategories::new(&conn);
        let result = Importer::new(&categories, &FailingTransactions).import(&path);

        assert!(result.is_err());
        assert!(path.exists());
        assert_eq!(category_titles(&conn), vec!["Food"]);
    }

    #[test]
    fn test_import_file_records_batch() {
        let (dir, mut conn) = test_db();
        let path = write_csv(dir.path(), "stmt.csv", &[
            "Salary,income,5000,Job",
            ",income,100,Job",
            "Lunch,outcome,20,Food",
        ]);
        let result = import_file(&mut conn, &path, false).unwrap();

        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.created_categories, 2);
        assert_eq!(result.existing_categories, 0);
        assert_eq!(result.skipped, 1);
        assert!(result.file_removed);
        assert!(!path.exists());

        let (filename, records, skipped, checksum): (String, i64, i64, String) = conn
            .query_row(
                "SELECT filename, record_count, skipped_count, checksum FROM imports",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .unwrap();
        assert_eq!(filename, "stmt.csv");
        assert_eq!(records, 2);
        assert_eq!(skipped, 1);
        assert_eq!(checksum.len(), 64);
    }

    #[test]
    fn test_import_file_keep_file() {
        let (dir, mut conn) = test_db();
        let path = write_csv(dir.path(), "stmt.csv", &["Lunch,outcome,20,Food"]);
        let result = import_file(&mut conn, &path, true).unwrap();
        assert!(!result.file_removed);
        assert!(path.exists());
        assert_eq!(count(&conn, "transactions"), 1);
    }

    #[test]
    fn test_import_file_rolls_back_on_storage_failure() {
        let (dir, mut conn) = test_db();
        conn.execute_batch("DROP TABLE transactions").unwrap();
        let path = write_csv(dir.path(), "stmt.csv", &["Lunch,outcome,20,Food"]);

        assert!(matches!(
            import_file(&mut conn, &path, false),
            Err(FinportError::Db(_))
        ));
        assert_eq!(count(&conn, "categories"), 0);
        assert_eq!(count(&conn, "imports"), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_import_file_invalid_row_persists_nothing() {
        let (dir, mut conn) = test_db();
        let path = write_csv(dir.path(), "stmt.csv", &[
            "Salary,income,5000,Job",
            "Lunch,refund,20,Food",
        ]);
        assert!(import_file(&mut conn, &path, false).is_err());
        assert_eq!(count(&conn, "categories"), 0);
        assert_eq!(count(&conn, "transactions"), 0);
        assert!(path.exists());
    }
}
