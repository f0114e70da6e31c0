use std::fmt;
use std::str::FromStr;

/// Direction of a transaction. Stored as `income` / `outcome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Income,
    Outcome,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Outcome => "outcome",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "outcome" => Ok(Self::Outcome),
            other => Err(other.to_string()),
        }
    }
}

/// A category as held by the store. `id` is `None` until the category is saved.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: Option<i64>,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: Option<i64>,
    pub title: String,
    pub kind: TransactionType,
    pub value: f64,
    pub category: Category,
}

/// One kept line of an import file, trimmed and validated, before reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub title: String,
    pub kind: TransactionType,
    pub value: f64,
    pub category: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Balance {
    pub income: f64,
    pub outcome: f64,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub id: i64,
    pub filename: String,
    pub record_count: i64,
    pub skipped_count: i64,
    pub checksum: String,
    pub imported_at: String,
}
