//! A [`SiteAdapter`] driven entirely by a [`PlatformDefinition`].

use crate::adapter::{Discovery, SiteAdapter};
use crate::collector::{PaginationCollector, PostAccumulator, PostFilter, PostPredicate};
use crate::definition::{
    CredentialField, ExtractionSpec, FollowSpec, LoginStep, PlatformDefinition, SourceSpec,
};
use crate::error::{LoginFailure, Result, ScanError};
use crate::extraction::{build_follow_script, parse_links};
use async_trait::async_trait;
use lookout_browser::{BrowserContext, BrowserError, HumanTiming, StealthSession, TimingKind};
use lookout_core::{AppConfig, BrowserSettings, Credentials, DelayRange, Platform};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const OUTCOME_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Logs in and crawls one platform by following its definition.
pub struct DefinitionAdapter {
    definition: Arc<PlatformDefinition>,
    credentials: Option<Credentials>,
    browser: BrowserSettings,
    timing: Arc<HumanTiming>,
    min_content_len: usize,
    scroll_viewports: f64,
    predicate: Option<PostPredicate>,
}

impl DefinitionAdapter {
    pub fn new(
        definition: Arc<PlatformDefinition>,
        credentials: Option<Credentials>,
        config: &AppConfig,
        timing: Arc<HumanTiming>,
    ) -> Self {
        Self {
            definition,
            credentials,
            browser: config.browser.clone(),
            timing,
            min_content_len: config.scanning.min_content_len,
            scroll_viewports: config.scanning.scroll_viewports,
            predicate: None,
        }
    }

    /// Add an acceptance test on top of the definition's own filters.
    #[must_use]
    pub fn with_predicate(mut self, predicate: PostPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn definition(&self) -> &PlatformDefinition {
        &self.definition
    }

    async fn run_login(&self, session: &StealthSession, credentials: &Credentials) -> Result<()> {
        let platform = self.platform();
        let flow = &self.definition.login;

        if !matches!(flow.steps.first(), Some(LoginStep::Navigate { .. })) {
            self.open_page(session, &self.definition.platform.login_url)
                .await?;
        }

        for step in &flow.steps {
            match step {
                LoginStep::Navigate { url } => self.open_page(session, url).await?,
                LoginStep::Type { selector, field } => {
                    let value = match field {
                        CredentialField::Username => credentials.username.as_str(),
                        CredentialField::Password => credentials.password.as_str(),
                    };
                    session
                        .human_type(selector, value, true)
                        .await
                        .map_err(|e| step_error(platform, e))?;
                }
                LoginStep::Click { selector } => {
                    session
                        .human_click(selector)
                        .await
                        .map_err(|e| step_error(platform, e))?;
                }
                LoginStep::Pause { min_ms, max_ms } => {
                    session
                        .timing()
                        .pause_range(DelayRange::new(*min_ms, *max_ms))
                        .await;
                }
            }
        }

        self.await_outcome(session).await
    }

    async fn open_page(&self, session: &StealthSession, url: &str) -> Result<()> {
        let platform = self.platform();
        session
            .navigate(url)
            .await
            .map_err(|e| step_error(platform, e))?;
        session.pause(TimingKind::PageLoad).await;
        session.dismiss_popups().await;
        Ok(())
    }

    /// Poll the page until it shows success, a challenge, a refusal, or the deadline passes.
    async fn await_outcome(&self, session: &StealthSession) -> Result<()> {
        let platform = self.platform();
        let flow = &self.definition.login;
        let deadline = Instant::now() + Duration::from_secs(flow.success_timeout_secs);

        loop {
            if session.element_exists(&flow.success_selector).await {
                return Ok(());
            }
            for selector in &flow.verification_selectors {
                if session.element_exists(selector).await {
                    return Err(ScanError::login(
                        platform,
                        LoginFailure::VerificationRequired,
                        format!("challenge element {selector} present"),
                    ));
                }
            }
            for selector in &flow.failure_selectors {
                if session.element_exists(selector).await {
                    return Err(ScanError::login(
                        platform,
                        LoginFailure::CredentialsRejected,
                        format!("error element {selector} present"),
                    ));
                }
            }
            if Instant::now() >= deadline {
                return Err(ScanError::login(
                    platform,
                    LoginFailure::Timeout,
                    format!(
                        "{} did not appear within {}s",
                        flow.success_selector, flow.success_timeout_secs
                    ),
                ));
            }
            tokio::time::sleep(OUTCOME_POLL_INTERVAL).await;
        }
    }

    fn filter_for(&self, spec: &ExtractionSpec) -> PostFilter {
        let filter = PostFilter::from_spec(spec, self.min_content_len);
        match &self.predicate {
            Some(predicate) => filter.with_predicate(Arc::clone(predicate)),
            None => filter,
        }
    }
}

/// A login step that did not complete reads as a `timeout` login failure.
///
/// Only a lost browser escapes as [`ScanError::Init`].
fn step_error(platform: Platform, err: BrowserError) -> ScanError {
    match err {
        BrowserError::Init(msg) => ScanError::Init(msg),
        BrowserError::ElementNotFound(selector) => {
            ScanError::login(platform, LoginFailure::Timeout, format!("{selector} never attached"))
        }
        other => ScanError::login(platform, LoginFailure::Timeout, other.to_string()),
    }
}

#[async_trait]
impl SiteAdapter for DefinitionAdapter {
    fn platform(&self) -> Platform {
        self.definition.id()
    }

    async fn login(&self, context: &dyn BrowserContext) -> Result<StealthSession> {
        let platform = self.platform();
        let Some(credentials) = self.credentials.as_ref() else {
            return Err(ScanError::login(
                platform,
                LoginFailure::CredentialsRejected,
                "no credentials configured",
            ));
        };

        let mut session =
            StealthSession::open(context, platform, &self.browser, Arc::clone(&self.timing))
                .await?;

        match self.run_login(&session, credentials).await {
            Ok(()) => {
                session.mark_logged_in();
                info!(%platform, "Logged in");
                Ok(session)
            }
            Err(e) => {
                warn!(%platform, "Login failed: {}", e);
                session.close().await;
                Err(e)
            }
        }
    }

    async fn discover(&self, session: &mut StealthSession) -> Discovery {
        let platform = self.platform();
        let mut accumulator = PostAccumulator::new();
        let mut rate_limited = false;

        for source in &self.definition.sources {
            let Some(spec) = self.definition.extraction(&source.extraction) else {
                warn!(%platform, extraction = %source.extraction, "Unknown extraction, skipping source");
                continue;
            };

            let visit = match &source.follow {
                None => {
                    self.collect_page(session, source, spec, &source.url, &mut accumulator)
                        .await
                }
                Some(follow) => {
                    self.follow_links(session, source, follow, spec, &mut accumulator)
                        .await
                }
            };

            match visit {
                Visit::Done | Visit::Skipped => {}
                Visit::RateLimited => {
                    rate_limited = true;
                    break;
                }
                Visit::BrowserLost => break,
            }
        }

        Discovery {
            posts: accumulator.into_posts(),
            rate_limited,
        }
    }
}

/// How a page visit during discovery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Done,
    Skipped,
    RateLimited,
    BrowserLost,
}

impl DefinitionAdapter {
    /// Navigate and settle, stopping early on a rate-limit page.
    async fn load(&self, session: &StealthSession, url: &str) -> Visit {
        let platform = self.platform();
        if let Err(e) = session.navigate(url).await {
            warn!(%platform, url, "Skipping page: {}", e);
            return if e.is_fatal() {
                Visit::BrowserLost
            } else {
                Visit::Skipped
            };
        }
        session.pause(TimingKind::PageLoad).await;
        session.dismiss_popups().await;

        if session.detect_rate_limit().await {
            return Visit::RateLimited;
        }
        Visit::Done
    }

    /// Load `url` and run the source's extraction over it.
    async fn collect_page(
        &self,
        session: &StealthSession,
        source: &SourceSpec,
        spec: &ExtractionSpec,
        url: &str,
        accumulator: &mut PostAccumulator,
    ) -> Visit {
        let platform = self.platform();
        let loaded = self.load(session, url).await;
        if loaded != Visit::Done {
            return loaded;
        }

        if let Some(selector) = &source.wait_for {
            let attached = match session.page() {
                Ok(page) => page
                    .wait_for_selector(selector, session.element_timeout_ms())
                    .await
                    .is_ok(),
                Err(_) => false,
            };
            if !attached {
                debug!(%platform, url, selector, "Nothing to collect, skipping page");
                return Visit::Skipped;
            }
        }

        let collector = PaginationCollector::new(
            spec.clone(),
            self.filter_for(spec),
            source.scroll_budget,
            source.settle_range(self.timing.config().settle),
        )
        .with_scroll_viewports(source.scroll_viewports.unwrap_or(self.scroll_viewports));

        let outcome = collector.collect(session, accumulator).await;
        info!(
            %platform,
            url,
            iterations = outcome.iterations,
            added = outcome.added,
            total = accumulator.len(),
            "Source collected"
        );

        if outcome.rate_limited {
            Visit::RateLimited
        } else {
            Visit::Done
        }
    }

    /// Open the listing at `source.url` and collect from the pages it links to.
    async fn follow_links(
        &self,
        session: &StealthSession,
        source: &SourceSpec,
        follow: &FollowSpec,
        spec: &ExtractionSpec,
        accumulator: &mut PostAccumulator,
    ) -> Visit {
        let platform = self.platform();
        let loaded = self.load(session, &source.url).await;
        if loaded != Visit::Done {
            return loaded;
        }

        let links = match session.evaluate(&build_follow_script(follow)).await {
            Ok(value) => match parse_links(value, follow.limit) {
                Ok(links) => links,
                Err(e) => {
                    warn!(%platform, url = %source.url, "Unreadable link list: {}", e);
                    return Visit::Skipped;
                }
            },
            Err(e) => {
                warn!(%platform, url = %source.url, "Link discovery failed: {}", e);
                return if e.is_fatal() {
                    Visit::BrowserLost
                } else {
                    Visit::Skipped
                };
            }
        };
        debug!(%platform, url = %source.url, links = links.len(), "Following links");

        for (index, link) in links.iter().enumerate() {
            if index > 0 {
                session.timing().pause_range(follow.delay()).await;
            }
            match self
                .collect_page(session, source, spec, link, accumulator)
                .await
            {
                Visit::Done | Visit::Skipped => {}
                stop => return stop,
            }
        }
        Visit::Done
    }
}
