//! Query layer for kams-api
//!
//! The API never writes: every connection is opened read-only against a
//! store the loader has already created.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

pub mod records;
pub mod search;
pub mod summary;

pub use records::{fetch_one_record, fetch_records, Record, RecordFilter};
pub use search::{search, SearchResults, SearchTerm};
pub use summary::OrientationSummary;

/// Connect to the database in read-only mode
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        anyhow::bail!(
            "Database not found: {}\nPlease run kams-load first to create and populate the database.",
            db_path.display()
        );
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true)
        .busy_timeout(kams_common::db::BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .context("Failed to connect to database in read-only mode")?;

    // A write must fail on this pool
    #[cfg(debug_assertions)]
    {
        let write_test = sqlx::query("CREATE TABLE _test_write (id INTEGER)")
            .execute(&pool)
            .await;
        if write_test.is_ok() {
            anyhow::bail!("Database connection is not read-only: {}", db_path.display());
        }
    }

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_database_points_at_loader() {
        let dir = tempfile::tempdir().unwrap();
        let err = connect_readonly(&dir.path().join("absent.db")).await.unwrap_err();
        assert!(err.to_string().contains("kams-load"));
    }

    #[tokio::test]
    async fn test_readonly_connection_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("kams.db");
        let writer = kams_common::db::init_database(&db_path).await.unwrap();
        writer.close().await;

        let pool = connect_readonly(&db_path).await.unwrap();
        let result = sqlx::query("INSERT INTO orientasi (quarter) VALUES ('Q1 2025')")
            .execute(&pool)
            .await;
        assert!(result.is_err(), "Write operation should fail in read-only mode");
    }
}
