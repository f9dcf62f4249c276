//! Embedded schema migrations.

use crate::error::{DatabaseError, Result};
use sqlx::SqlitePool;

/// Apply every migration under `migrations/` that has not run yet.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    tracing::info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration execution failed: {e}")))?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

/// Highest applied migration version, 0 before the first migration.
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i64> {
    let table_exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?
        > 0;

    if !table_exists {
        return Ok(0);
    }

    let version =
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(version), 0) FROM _sqlx_migrations")
            .fetch_optional(pool)
            .await?
            .unwrap_or(0);

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{open_pool, MEMORY_PATH};
    use std::path::Path;

    async fn memory_pool() -> SqlitePool {
        open_pool(Path::new(MEMORY_PATH)).await.expect("open pool")
    }

    #[tokio::test]
    async fn test_run_migrations_creates_tables() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.expect("run migrations");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .expect("query tables");

        assert_eq!(tables, vec!["leads", "platform_scans", "scan_runs"]);
    }

    #[tokio::test]
    async fn test_schema_version() {
        let pool = memory_pool().await;
        assert_eq!(get_schema_version(&pool).await.expect("version"), 0);

        run_migrations(&pool).await.expect("run migrations");
        assert_eq!(get_schema_version(&pool).await.expect("version"), 2);
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.expect("first run");
        run_migrations(&pool).await.expect("second run");
        assert_eq!(get_schema_version(&pool).await.expect("version"), 2);
    }
}
