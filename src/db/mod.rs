//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for users, complaints and document metadata.

mod complaints;
mod documents;
mod legacy;
mod repository;
mod users;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

/// Ordered schema steps. Each runs once, in its own transaction.
const MIGRATIONS: &[(i64, &str)] = &[
    (
        1,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            role TEXT NOT NULL CHECK (role IN ('citizen', 'official')),
            name TEXT NOT NULL,
            phone TEXT,
            aadhaar TEXT,
            email TEXT,
            address TEXT,
            emp_id TEXT,
            department TEXT,
            category TEXT,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_users_citizen_phone
            ON users(phone) WHERE role = 'citizen';
        CREATE UNIQUE INDEX IF NOT EXISTS idx_users_official_emp_id
            ON users(emp_id) WHERE role = 'official';

        CREATE TABLE IF NOT EXISTS complaints (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            username TEXT,
            sector TEXT NOT NULL,
            subject TEXT NOT NULL,
            description TEXT NOT NULL,
            location TEXT NOT NULL,
            priority TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_complaints_user_id ON complaints(user_id);
        CREATE INDEX IF NOT EXISTS idx_complaints_sector ON complaints(sector COLLATE NOCASE);

        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            original_name TEXT NOT NULL,
            path TEXT NOT NULL,
            doc_type TEXT NOT NULL,
            upload_date TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_user_id ON documents(user_id);
        "#,
    ),
];

/// Latest schema version known to this build.
pub fn latest_schema_version() -> i64 {
    MIGRATIONS.last().map(|(v, _)| *v).unwrap_or(0)
}

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Bring the schema up to the latest version.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 0,
            legacy_imported_at TEXT
        );

        INSERT OR IGNORE INTO meta (id, schema_version) VALUES (1, 0);
        "#,
    )
    .execute(pool)
    .await?;

    let current: i64 = sqlx::query("SELECT schema_version FROM meta WHERE id = 1")
        .fetch_one(pool)
        .await?
        .get("schema_version");

    for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        tracing::info!("Applying schema migration {}", version);

        let mut tx = pool.begin().await?;
        sqlx::query(*sql).execute(&mut *tx).await?;
        sqlx::query("UPDATE meta SET schema_version = ? WHERE id = 1")
            .bind(*version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    Ok(())
}
