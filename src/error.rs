use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinportError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid transaction type '{value}' on line {line} (expected income or outcome)")]
    InvalidType { line: u64, value: String },

    #[error("Invalid value '{value}' on line {line}")]
    InvalidValue { line: u64, value: String },

    #[error("No category found for title '{0}'")]
    UnresolvedCategory(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("No database found at {}\nRun `finport init` to create one.", .0.display())]
    NotInitialized(PathBuf),
}

pub type Result<T> = std::result::Result<T, FinportError>;
