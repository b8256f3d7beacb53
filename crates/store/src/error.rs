use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite error.
    Sqlite(rusqlite::Error),
    /// A persisted value no longer parses as its domain type (unknown rule,
    /// status, or decision string). Indicates an out-of-band edit.
    Corrupt { table: String, detail: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "database error: {e}"),
            Self::Corrupt { table, detail } => {
                write!(f, "corrupt row in '{table}': {detail}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            Self::Corrupt { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

impl StoreError {
    pub(crate) fn corrupt(table: &str, detail: impl Into<String>) -> Self {
        Self::Corrupt {
            table: table.into(),
            detail: detail.into(),
        }
    }
}
