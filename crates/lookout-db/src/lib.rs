//! Lookout DB - SQLite persistence for accepted leads and scan history.
//!
//! [`Database`] wraps a `SQLx` pool, applies the embedded migrations on
//! open, and implements [`LeadSink`] so the scan orchestrator can append
//! accepted posts directly.
//!
//! # Example
//!
//! ```rust,no_run
//! use lookout_db::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::open("lookout.db").await?;
//! for lead in db.recent_leads(20).await? {
//!     println!("{} {}", lead.platform, lead.post_link);
//! }
//! db.close().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod leads;
pub mod migrations;
pub mod runs;

// Re-export commonly used types
pub use connection::MEMORY_PATH;
pub use error::{DatabaseError, Result};

use async_trait::async_trait;
use lookout_core::{LeadRecord, LeadSink, Platform};
use lookout_scanner::AggregateResult;
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;

/// Main database handle.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database at `path` and apply migrations.
    ///
    /// Pass [`MEMORY_PATH`] for a throwaway in-memory database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::open_pool(path.as_ref()).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open a migrated in-memory database.
    pub async fn open_in_memory() -> Result<Self> {
        Self::open(MEMORY_PATH).await
    }

    /// Apply pending migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get a reference to the underlying `SQLx` pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }

    /// Append one lead.
    pub async fn insert_lead(&self, record: &LeadRecord) -> Result<i64> {
        leads::insert_lead(&self.pool, record).await
    }

    /// Most recent leads first.
    pub async fn recent_leads(&self, limit: u32) -> Result<Vec<LeadRecord>> {
        leads::recent_leads(&self.pool, limit).await
    }

    /// Most recent leads for one platform.
    pub async fn leads_for_platform(
        &self,
        platform: Platform,
        limit: u32,
    ) -> Result<Vec<LeadRecord>> {
        leads::leads_for_platform(&self.pool, platform, limit).await
    }

    /// Number of stored leads.
    pub async fn lead_count(&self) -> Result<i64> {
        leads::count_leads(&self.pool).await
    }

    /// Store the outcome of an orchestrator run.
    pub async fn record_run(&self, result: &AggregateResult) -> Result<()> {
        runs::record_run(&self.pool, result).await
    }

    /// Load a stored run.
    pub async fn get_run(&self, run_id: Uuid) -> Result<AggregateResult> {
        runs::get_run(&self.pool, run_id).await
    }

    /// Most recent runs first.
    pub async fn run_history(&self, limit: u32) -> Result<Vec<AggregateResult>> {
        runs::recent_runs(&self.pool, limit).await
    }
}

#[async_trait]
impl LeadSink for Database {
    async fn append(&self, record: LeadRecord) -> lookout_core::Result<()> {
        let id = self.insert_lead(&record).await?;
        tracing::debug!(
            platform = %record.platform,
            lead_id = id,
            "stored lead"
        );
        Ok(())
    }
}
