//! SQLite storage backend for Assay.
//!
//! Holds the authoritative `reports` table: one row per uploaded document,
//! keyed by content hash for idempotent uploads, with the lifecycle status
//! column guarded by the state machine in `assay-core`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assay_sqlite::{create_report_store, SqliteConfig, SqlitePool};
//!
//! let pool = SqlitePool::new(SqliteConfig::new("./assay.db"))?;
//! let store = create_report_store(pool);
//! let job = store.create_or_get_by_hash("q3.pdf", "ab12...").await?.into_job();
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod report_store;
pub mod schema;

pub use config::SqliteConfig;
pub use connection::SqlitePool;
pub use error::{SqliteError, SqliteResult};
pub use report_store::{create_report_store, SqliteReportStore};
