//! SQLite storage bootstrap, executor capability and schema migrations.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the depot core.
//! - Apply schema migrations in deterministic order.
//! - Expose the `Executor` capability shared by plain and transactional handles.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.

use rusqlite::ErrorCode;

mod executor;
pub mod migrations;
mod open;

pub use executor::Executor;
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// Returns whether SQLite rejected a write on a UNIQUE, PRIMARY KEY,
    /// FOREIGN KEY, NOT NULL or CHECK constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
        )
    }
}
