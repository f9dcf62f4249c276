//! Append-only storage of accepted posts.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use lookout_core::{LeadRecord, Platform};
use sqlx::SqlitePool;

type LeadRow = (String, String, String, String, String, f64, String, String);

/// Insert one lead and return its row id.
pub async fn insert_lead(pool: &SqlitePool, record: &LeadRecord) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO leads (platform, post_link, profile_link, content, intent_level, confidence, response, timestamp)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.platform.as_str())
    .bind(&record.post_link)
    .bind(&record.profile_link)
    .bind(&record.content)
    .bind(record.intent_level.as_str())
    .bind(f64::from(record.confidence))
    .bind(&record.response)
    .bind(format_timestamp(record.timestamp))
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent leads first, at most `limit`.
pub async fn recent_leads(pool: &SqlitePool, limit: u32) -> Result<Vec<LeadRecord>> {
    let rows = sqlx::query_as::<_, LeadRow>(
        "SELECT platform, post_link, profile_link, content, intent_level, confidence, response, timestamp
         FROM leads
         ORDER BY timestamp DESC, id DESC
         LIMIT ?",
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(decode_lead).collect()
}

/// Leads stored for one platform, most recent first.
pub async fn leads_for_platform(
    pool: &SqlitePool,
    platform: Platform,
    limit: u32,
) -> Result<Vec<LeadRecord>> {
    let rows = sqlx::query_as::<_, LeadRow>(
        "SELECT platform, post_link, profile_link, content, intent_level, confidence, response, timestamp
         FROM leads
         WHERE platform = ?
         ORDER BY timestamp DESC, id DESC
         LIMIT ?",
    )
    .bind(platform.as_str())
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(decode_lead).collect()
}

/// Total number of stored leads.
pub async fn count_leads(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leads")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[allow(clippy::cast_possible_truncation)]
fn decode_lead(row: LeadRow) -> Result<LeadRecord> {
    let (platform, post_link, profile_link, content, intent_level, confidence, response, timestamp) =
        row;

    Ok(LeadRecord {
        platform: platform
            .parse()
            .map_err(|e| DatabaseError::Decode(format!("{e}")))?,
        post_link,
        profile_link,
        content,
        intent_level: intent_level
            .parse()
            .map_err(|e| DatabaseError::Decode(format!("{e}")))?,
        confidence: confidence as f32,
        response,
        timestamp: parse_timestamp(&timestamp)?,
    })
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode(format!("invalid timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::Duration;
    use lookout_core::IntentLevel;

    async fn setup_test_db() -> Database {
        Database::open_in_memory().await.expect("create test database")
    }

    fn lead(platform: Platform, link: &str, age_minutes: i64) -> LeadRecord {
        LeadRecord {
            platform,
            post_link: link.to_string(),
            profile_link: String::new(),
            content: "We need a new website before launch".to_string(),
            intent_level: IntentLevel::Strong,
            confidence: 0.85,
            response: "Happy to help with that.".to_string(),
            timestamp: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = setup_test_db().await;
        let record = lead(Platform::Reddit, "https://www.reddit.com/r/webdev/comments/1", 0);

        let id = insert_lead(db.pool(), &record).await.expect("insert lead");
        assert!(id > 0);

        let stored = recent_leads(db.pool(), 10).await.expect("read leads");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].post_link, record.post_link);
        assert_eq!(stored[0].intent_level, IntentLevel::Strong);
        assert!((stored[0].confidence - 0.85).abs() < 1e-6);
        assert_eq!(stored[0].timestamp.timestamp(), record.timestamp.timestamp());
    }

    #[tokio::test]
    async fn test_recent_leads_newest_first_and_limited() {
        let db = setup_test_db().await;
        for (i, age) in [30, 10, 20].into_iter().enumerate() {
            let link = format!("https://x.com/a/status/{i}");
            insert_lead(db.pool(), &lead(Platform::Twitter, &link, age))
                .await
                .expect("insert lead");
        }

        let stored = recent_leads(db.pool(), 2).await.expect("read leads");
        let links: Vec<_> = stored.iter().map(|l| l.post_link.as_str()).collect();
        assert_eq!(
            links,
            vec!["https://x.com/a/status/1", "https://x.com/a/status/2"]
        );
    }

    #[tokio::test]
    async fn test_duplicate_links_are_appended() {
        let db = setup_test_db().await;
        let record = lead(Platform::Facebook, "https://www.facebook.com/groups/1/posts/2", 0);
        insert_lead(db.pool(), &record).await.expect("first insert");
        insert_lead(db.pool(), &record).await.expect("second insert");

        assert_eq!(count_leads(db.pool()).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn test_leads_for_platform() {
        let db = setup_test_db().await;
        insert_lead(db.pool(), &lead(Platform::Reddit, "https://www.reddit.com/r/a/comments/1", 0))
            .await
            .expect("insert");
        insert_lead(db.pool(), &lead(Platform::YouTube, "https://www.youtube.com/watch?v=a", 0))
            .await
            .expect("insert");

        let reddit = leads_for_platform(db.pool(), Platform::Reddit, 10)
            .await
            .expect("query");
        assert_eq!(reddit.len(), 1);
        assert_eq!(reddit[0].platform, Platform::Reddit);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_decode_error() {
        let db = setup_test_db().await;
        sqlx::query(
            "INSERT INTO leads (platform, post_link, content, intent_level, confidence, response, timestamp)
             VALUES ('myspace', 'https://myspace.com/1', 'text', 'mild', 0.1, '', '2026-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .expect("insert raw row");

        let result = recent_leads(db.pool(), 10).await;
        assert!(matches!(result, Err(DatabaseError::Decode(_))));
    }
}
