//! Database repository shared by the credential, complaint and document stores.
//!
//! Every write is a single statement or a transaction, and ids come from
//! SQLite `AUTOINCREMENT`, so concurrent requests cannot lose each other's
//! updates or be handed the same id.

use sqlx::{Row, SqlitePool};

use crate::errors::AppError;

/// Database repository for all data operations.
///
/// Operations are grouped by store in the sibling `users`, `complaints` and
/// `documents` modules.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the applied schema version.
    pub async fn schema_version(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT schema_version FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("schema_version"))
    }
}

/// True if the error is a UNIQUE constraint failure.
pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// Treat blank optional strings as absent.
pub(super) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Open a repository on a fresh database inside a temp dir.
#[cfg(test)]
pub(crate) async fn test_repository() -> (Repository, tempfile::TempDir) {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let pool = super::init_database(&temp_dir.path().join("test.sqlite"))
        .await
        .expect("Failed to init DB");
    (Repository::new(pool), temp_dir)
}
