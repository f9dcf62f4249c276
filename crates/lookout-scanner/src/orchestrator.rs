//! Sequential multi-platform scan orchestration.
//!
//! One run walks the configured adapters in order:
//! `login -> discover -> close -> assess each post -> cooldown -> next`.
//! Platforms never run concurrently and each session is closed before the
//! next platform starts. A failing platform is recorded and skipped; only
//! a missing browser aborts the run.

use crate::adapter::SiteAdapter;
use crate::error::{Result, ScanError};
use chrono::{DateTime, Utc};
use lookout_browser::{BrowserContext, HumanTiming, TimingKind};
use lookout_core::{IntentPipeline, LeadRecord, LeadSink, Platform, Post};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of scanning a single platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Platform that was scanned
    pub platform: Platform,
    /// Posts returned by discovery (before the intent gate)
    pub candidates: usize,
    /// Posts accepted by the intent pipeline and persisted
    pub posts_found: usize,
    /// Discovery stopped on throttling text
    pub rate_limited: bool,
    /// Why the platform failed, if it did
    pub error: Option<String>,
}

impl ScanResult {
    /// A platform that produced nothing because of `error`.
    #[must_use]
    pub fn failed(platform: Platform, error: impl Into<String>) -> Self {
        Self {
            platform,
            candidates: 0,
            posts_found: 0,
            rate_limited: false,
            error: Some(error.into()),
        }
    }

    /// Whether the platform completed without error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every platform completed
    Completed,
    /// At least one platform recorded an error
    PartiallyFailed,
}

impl RunStatus {
    /// Stable identifier used in logs and storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::PartiallyFailed => "partially_failed",
        }
    }
}

/// Per-platform results of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Unique run identifier
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Sum of `posts_found` over all platforms
    pub total_posts: usize,
    /// One entry per scanned (or skipped) platform
    pub per_platform: BTreeMap<Platform, ScanResult>,
}

impl AggregateResult {
    /// `PartiallyFailed` as soon as any platform carries an error.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        if self.per_platform.values().all(ScanResult::is_success) {
            RunStatus::Completed
        } else {
            RunStatus::PartiallyFailed
        }
    }

    /// Platforms that recorded an error.
    #[must_use]
    pub fn failed_platforms(&self) -> Vec<Platform> {
        self.per_platform
            .values()
            .filter(|r| !r.is_success())
            .map(|r| r.platform)
            .collect()
    }
}

/// Sequences site adapters and forwards their posts to the intent pipeline.
pub struct ScanOrchestrator {
    /// Adapters in scan order, one per platform
    adapters: Vec<Arc<dyn SiteAdapter>>,
    /// Intent gate for discovered posts
    pipeline: Arc<dyn IntentPipeline>,
    /// Destination of accepted posts
    sink: Arc<dyn LeadSink>,
    /// Post-login, inter-item and cooldown pacing
    timing: Arc<HumanTiming>,
    /// Skip remaining platforms after a rate limit
    halt_on_rate_limit: bool,
    /// Cap on posts handed to the pipeline per platform
    max_items_per_platform: Option<usize>,
}

impl ScanOrchestrator {
    /// Create an orchestrator over `adapters`, scanned in the given order.
    ///
    /// A second adapter for an already-listed platform is dropped.
    #[must_use]
    pub fn new(
        adapters: Vec<Arc<dyn SiteAdapter>>,
        pipeline: Arc<dyn IntentPipeline>,
        sink: Arc<dyn LeadSink>,
        timing: Arc<HumanTiming>,
    ) -> Self {
        let mut seen = HashSet::new();
        let adapters = adapters
            .into_iter()
            .filter(|adapter| {
                let platform = adapter.platform();
                let first = seen.insert(platform);
                if !first {
                    warn!(%platform, "Duplicate adapter ignored");
                }
                first
            })
            .collect();

        Self {
            adapters,
            pipeline,
            sink,
            timing,
            halt_on_rate_limit: false,
            max_items_per_platform: None,
        }
    }

    /// Skip every remaining platform once one reports a rate limit.
    #[must_use]
    pub fn with_halt_on_rate_limit(mut self, halt: bool) -> Self {
        self.halt_on_rate_limit = halt;
        self
    }

    /// Hand at most `max` discovered posts per platform to the pipeline.
    #[must_use]
    pub fn with_max_items_per_platform(mut self, max: Option<usize>) -> Self {
        self.max_items_per_platform = max;
        self
    }

    /// Platforms in scan order.
    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        self.adapters.iter().map(|a| a.platform()).collect()
    }

    /// Run one full scan over every adapter.
    ///
    /// # Errors
    /// Only [`ScanError::Init`], and only while no platform has been scanned:
    /// the browser context is unavailable up front or the first platform
    /// cannot open its page. Losing the browser later marks the current and
    /// remaining platforms as failed and still returns the partial result,
    /// since earlier platforms' leads are already stored. Every other
    /// failure is recorded in that platform's [`ScanResult`].
    pub async fn run(&self, context: &dyn BrowserContext) -> Result<AggregateResult> {
        if !context.is_available() {
            return Err(ScanError::Init("no browser context available".to_string()));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut per_platform = BTreeMap::new();
        let mut total_posts = 0;
        let mut halted_by: Option<Platform> = None;
        let mut browser_lost: Option<String> = None;

        info!(%run_id, platforms = self.adapters.len(), "Scan run started");

        for (index, adapter) in self.adapters.iter().enumerate() {
            let platform = adapter.platform();

            if let Some(reason) = &browser_lost {
                per_platform.insert(platform, ScanResult::failed(platform, reason.clone()));
                continue;
            }

            if let Some(limited) = halted_by {
                let reason = ScanError::RateLimitDetected { platform: limited }.summary();
                info!(%platform, "{}", reason);
                per_platform.insert(platform, ScanResult::failed(platform, reason));
                continue;
            }

            if index > 0 && total_posts > 0 {
                let waited = self.timing.pause(TimingKind::Cooldown).await;
                info!(%platform, secs = waited.as_secs(), "Cooldown finished");
            }

            let result = match self.scan_platform(adapter.as_ref(), context).await {
                Ok(result) => result,
                Err(e) if per_platform.is_empty() => return Err(e),
                Err(e) => {
                    let reason = e.summary();
                    warn!(%platform, "Browser lost mid-run, skipping remaining platforms: {}", reason);
                    browser_lost = Some(reason.clone());
                    ScanResult::failed(platform, reason)
                }
            };

            total_posts += result.posts_found;
            if result.rate_limited && self.halt_on_rate_limit {
                halted_by = Some(platform);
            }
            per_platform.insert(platform, result);
        }

        let aggregate = AggregateResult {
            run_id,
            started_at,
            finished_at: Utc::now(),
            total_posts,
            per_platform,
        };

        info!(
            %run_id,
            total_posts,
            status = aggregate.status().as_str(),
            "Scan run finished"
        );

        Ok(aggregate)
    }

    /// Scan one platform. The session is always closed before returning.
    async fn scan_platform(
        &self,
        adapter: &dyn SiteAdapter,
        context: &dyn BrowserContext,
    ) -> Result<ScanResult> {
        let platform = adapter.platform();
        info!(%platform, "Scanning platform");

        let mut session = match adapter.login(context).await {
            Ok(session) => session,
            Err(e) if e.is_init() => return Err(e),
            Err(e) => {
                warn!(%platform, "Login failed: {}", e);
                return Ok(ScanResult::failed(platform, e.summary()));
            }
        };

        self.timing.pause(TimingKind::PostLogin).await;
        let discovery = adapter.discover(&mut session).await;
        session.close().await;

        let candidates = discovery.posts.len();
        info!(
            %platform,
            candidates,
            rate_limited = discovery.rate_limited,
            "Discovery finished"
        );

        let limit = self.max_items_per_platform.unwrap_or(usize::MAX);
        let mut posts_found = 0;
        for post in discovery.posts.iter().take(limit) {
            self.timing.pause(TimingKind::InterItem).await;
            if self.process_post(post).await {
                posts_found += 1;
            }
        }

        info!(%platform, posts_found, "Platform scan complete");

        Ok(ScanResult {
            platform,
            candidates,
            posts_found,
            rate_limited: discovery.rate_limited,
            error: None,
        })
    }

    /// Gate one post and persist it if accepted. Returns whether it was stored.
    async fn process_post(&self, post: &Post) -> bool {
        let platform = post.platform();

        let assessment = match self.pipeline.assess(post).await {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(%platform, link = post.link(), "{}", ScanError::Intent(e));
                return false;
            }
        };

        if !assessment.high_intent {
            debug!(%platform, link = post.link(), "Below intent threshold");
            return false;
        }

        let record = LeadRecord::from_assessment(post, &assessment);
        match self.sink.append(record).await {
            Ok(()) => {
                info!(
                    %platform,
                    link = post.link(),
                    level = %assessment.intent_level,
                    confidence = assessment.confidence,
                    "Lead stored"
                );
                true
            }
            Err(e) => {
                warn!(%platform, link = post.link(), "{}", ScanError::Sink(e));
                false
            }
        }
    }
}
