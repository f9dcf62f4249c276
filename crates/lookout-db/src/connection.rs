//! Connection pool setup.
//!
//! File databases run in WAL mode and are created on first use. The
//! special path `:memory:` opens a single-connection in-memory database,
//! which keeps its data only as long as the pool lives.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Path that selects an in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Open a pool for `path`, creating the file and its parent directory if needed.
pub async fn open_pool(path: &Path) -> Result<SqlitePool> {
    let path_str = path
        .to_str()
        .ok_or_else(|| DatabaseError::Open("invalid database path: not valid UTF-8".to_string()))?;

    if path_str == MEMORY_PATH {
        return open_memory_pool().await;
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Open(format!("{path_str}: {e}")))?;

    tracing::info!("Database pool created at {}", path_str);
    Ok(pool)
}

async fn open_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
        .foreign_keys(true);

    // Every connection to `sqlite::memory:` is a separate database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Open(format!("in-memory database: {e}")))?;

    tracing::debug!("In-memory database pool created");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_file_and_parent() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("nested").join("lookout.db");

        let pool = open_pool(&path).await.expect("open pool");
        sqlx::query("SELECT 1").execute(&pool).await.expect("query");
        pool.close().await;

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_memory_pool_shares_one_database() {
        let pool = open_pool(Path::new(MEMORY_PATH)).await.expect("open pool");
        sqlx::query("CREATE TABLE t (v INTEGER)")
            .execute(&pool)
            .await
            .expect("create table");
        sqlx::query("INSERT INTO t (v) VALUES (1)")
            .execute(&pool)
            .await
            .expect("insert");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 1);
    }
}
