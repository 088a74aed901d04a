use std::path::PathBuf;

/// File the ledger uses when no path is given.
pub const DEFAULT_DATABASE_PATH: &str = "car_rental_database.db";

/// Where the ledger keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub database_path: PathBuf,
    /// Use a private in-memory database instead of a file.
    pub in_memory: bool,
}

impl LedgerConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            in_memory: false,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            database_path: PathBuf::from(":memory:"),
            in_memory: true,
        }
    }

    /// Connection URL understood by sqlx. File databases are created on demand.
    pub fn database_url(&self) -> String {
        if self.in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", self.database_path.display())
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE_PATH)
    }
}
