//! SQLite configuration.

use std::path::PathBuf;

/// Connection settings. The defaults suit a single-process deployment with
/// WAL mode for concurrent reads.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
    pub wal_mode: bool,
    pub busy_timeout_ms: u32,
}

impl SqliteConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            wal_mode: true,
            busy_timeout_ms: 5000,
        }
    }

    /// In-memory database for tests.
    pub fn memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            // WAL is meaningless without a file.
            wal_mode: false,
            busy_timeout_ms: 5000,
        }
    }
}
