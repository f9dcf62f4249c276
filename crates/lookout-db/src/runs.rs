//! Run history: one `scan_runs` row per orchestrator run plus its
//! per-platform outcomes.

use crate::error::{DatabaseError, Result};
use crate::leads::{format_timestamp, parse_timestamp};
use lookout_scanner::{AggregateResult, ScanResult};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use uuid::Uuid;

type RunRow = (String, String, String, i64);
type PlatformRow = (String, i64, i64, bool, Option<String>);

/// Store a finished run. Re-recording the same run id replaces it.
pub async fn record_run(pool: &SqlitePool, result: &AggregateResult) -> Result<()> {
    let mut tx = pool.begin().await?;
    let run_id = result.run_id.to_string();

    sqlx::query("DELETE FROM platform_scans WHERE run_id = ?")
        .bind(&run_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT OR REPLACE INTO scan_runs (id, started_at, finished_at, status, total_posts)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&run_id)
    .bind(format_timestamp(result.started_at))
    .bind(format_timestamp(result.finished_at))
    .bind(result.status().as_str())
    .bind(to_i64(result.total_posts))
    .execute(&mut *tx)
    .await?;

    for scan in result.per_platform.values() {
        sqlx::query(
            "INSERT INTO platform_scans (run_id, platform, candidates, posts_found, rate_limited, error)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&run_id)
        .bind(scan.platform.as_str())
        .bind(to_i64(scan.candidates))
        .bind(to_i64(scan.posts_found))
        .bind(scan.rate_limited)
        .bind(scan.error.as_deref())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::debug!(
        run_id = %result.run_id,
        platforms = result.per_platform.len(),
        "recorded scan run"
    );
    Ok(())
}

/// Load one run by id.
pub async fn get_run(pool: &SqlitePool, run_id: Uuid) -> Result<AggregateResult> {
    let row = sqlx::query_as::<_, RunRow>(
        "SELECT id, started_at, finished_at, total_posts FROM scan_runs WHERE id = ?",
    )
    .bind(run_id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound(format!("scan run {run_id} not found")))?;

    load_run(pool, row).await
}

/// Most recent runs first, at most `limit`.
pub async fn recent_runs(pool: &SqlitePool, limit: u32) -> Result<Vec<AggregateResult>> {
    let rows = sqlx::query_as::<_, RunRow>(
        "SELECT id, started_at, finished_at, total_posts
         FROM scan_runs
         ORDER BY started_at DESC
         LIMIT ?",
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    let mut runs = Vec::with_capacity(rows.len());
    for row in rows {
        runs.push(load_run(pool, row).await?);
    }
    Ok(runs)
}

async fn load_run(pool: &SqlitePool, row: RunRow) -> Result<AggregateResult> {
    let (id, started_at, finished_at, total_posts) = row;

    let platforms = sqlx::query_as::<_, PlatformRow>(
        "SELECT platform, candidates, posts_found, rate_limited, error
         FROM platform_scans
         WHERE run_id = ?",
    )
    .bind(&id)
    .fetch_all(pool)
    .await?;

    let mut per_platform = BTreeMap::new();
    for (platform, candidates, posts_found, rate_limited, error) in platforms {
        let platform = platform
            .parse()
            .map_err(|e| DatabaseError::Decode(format!("{e}")))?;
        per_platform.insert(
            platform,
            ScanResult {
                platform,
                candidates: to_usize(candidates),
                posts_found: to_usize(posts_found),
                rate_limited,
                error,
            },
        );
    }

    Ok(AggregateResult {
        run_id: Uuid::parse_str(&id)
            .map_err(|e| DatabaseError::Decode(format!("invalid run id '{id}': {e}")))?,
        started_at: parse_timestamp(&started_at)?,
        finished_at: parse_timestamp(&finished_at)?,
        total_posts: to_usize(total_posts),
        per_platform,
    })
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn to_usize(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::{Duration, Utc};
    use lookout_core::Platform;
    use lookout_scanner::RunStatus;

    fn sample_run(started_minutes_ago: i64) -> AggregateResult {
        let started_at = Utc::now() - Duration::minutes(started_minutes_ago);
        let mut per_platform = BTreeMap::new();
        per_platform.insert(
            Platform::Reddit,
            ScanResult {
                platform: Platform::Reddit,
                candidates: 12,
                posts_found: 2,
                rate_limited: false,
                error: None,
            },
        );
        per_platform.insert(
            Platform::LinkedIn,
            ScanResult::failed(Platform::LinkedIn, "verification_required"),
        );

        AggregateResult {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: started_at + Duration::minutes(5),
            total_posts: 2,
            per_platform,
        }
    }

    #[tokio::test]
    async fn test_record_and_load_run() {
        let db = Database::open_in_memory().await.expect("open db");
        let run = sample_run(0);

        record_run(db.pool(), &run).await.expect("record run");
        let loaded = get_run(db.pool(), run.run_id).await.expect("load run");

        assert_eq!(loaded.run_id, run.run_id);
        assert_eq!(loaded.total_posts, 2);
        assert_eq!(loaded.per_platform, run.per_platform);
        assert_eq!(loaded.status(), RunStatus::PartiallyFailed);
        assert_eq!(
            loaded.per_platform[&Platform::LinkedIn].error.as_deref(),
            Some("verification_required")
        );
    }

    #[tokio::test]
    async fn test_status_column_matches_result() {
        let db = Database::open_in_memory().await.expect("open db");
        let run = sample_run(0);
        record_run(db.pool(), &run).await.expect("record run");

        let status: String = sqlx::query_scalar("SELECT status FROM scan_runs WHERE id = ?")
            .bind(run.run_id.to_string())
            .fetch_one(db.pool())
            .await
            .expect("query status");
        assert_eq!(status, "partially_failed");
    }

    #[tokio::test]
    async fn test_rerecord_replaces_platform_rows() {
        let db = Database::open_in_memory().await.expect("open db");
        let mut run = sample_run(0);
        record_run(db.pool(), &run).await.expect("record run");

        run.per_platform.remove(&Platform::LinkedIn);
        record_run(db.pool(), &run).await.expect("re-record run");

        let loaded = get_run(db.pool(), run.run_id).await.expect("load run");
        assert_eq!(loaded.per_platform.len(), 1);
        assert_eq!(loaded.status(), RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_recent_runs_ordering() {
        let db = Database::open_in_memory().await.expect("open db");
        let older = sample_run(120);
        let newer = sample_run(10);
        record_run(db.pool(), &older).await.expect("record older");
        record_run(db.pool(), &newer).await.expect("record newer");

        let runs = recent_runs(db.pool(), 5).await.expect("recent runs");
        let ids: Vec<_> = runs.iter().map(|r| r.run_id).collect();
        assert_eq!(ids, vec![newer.run_id, older.run_id]);
    }

    #[tokio::test]
    async fn test_missing_run_not_found() {
        let db = Database::open_in_memory().await.expect("open db");
        let result = get_run(db.pool(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(DatabaseError::NotFound(_))));
    }
}
