//! One authenticated page scoped to a single platform scan.

use crate::actions::{extract_domain, BrowserActions, BrowserContext};
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use crate::stealth::{mentions_rate_limit, stealth_script, ResourceKind, POPUP_DISMISS_SELECTORS};
use crate::timing::{HumanTiming, TimingKind};
use lookout_core::{BrowserSettings, Platform};
use std::sync::Arc;

/// Exclusive owner of one disguised browser page.
///
/// Dropping a session that was never closed schedules the page close on the
/// current tokio runtime; callers should still prefer [`StealthSession::close`].
pub struct StealthSession {
    platform: Platform,
    page: Option<Box<dyn BrowserActions>>,
    logged_in: bool,
    fingerprint: FingerprintConfig,
    timing: Arc<HumanTiming>,
    element_timeout_ms: u64,
}

impl StealthSession {
    /// Allocate a page and disguise it before any navigation happens.
    ///
    /// Fails with [`BrowserError::Init`] when the context is gone or cannot
    /// hand out a page. If disguising fails the page is closed before the
    /// error is returned.
    pub async fn open(
        context: &dyn BrowserContext,
        platform: Platform,
        settings: &BrowserSettings,
        timing: Arc<HumanTiming>,
    ) -> Result<Self> {
        if !context.is_available() {
            return Err(BrowserError::Init("no browser context available".to_string()));
        }

        let page = context.new_page().await.map_err(|e| match e {
            BrowserError::Init(_) => e,
            other => BrowserError::Init(other.to_string()),
        })?;

        let fingerprint = FingerprintConfig::randomized(settings);

        if let Err(e) = disguise(page.as_ref(), &fingerprint, settings, &timing).await {
            tracing::warn!(%platform, "Failed to disguise page: {}", e);
            if let Err(close_err) = page.close().await {
                tracing::debug!(%platform, "Page close after failed disguise: {}", close_err);
            }
            return Err(e);
        }

        tracing::debug!(
            %platform,
            width = fingerprint.viewport_width,
            height = fingerprint.viewport_height,
            "Stealth page opened"
        );

        Ok(Self {
            platform,
            page: Some(page),
            logged_in: false,
            fingerprint,
            timing,
            element_timeout_ms: settings.element_timeout_ms,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn is_open(&self) -> bool {
        self.page.is_some()
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn mark_logged_in(&mut self) {
        self.logged_in = true;
    }

    pub fn fingerprint(&self) -> &FingerprintConfig {
        &self.fingerprint
    }

    pub fn timing(&self) -> &Arc<HumanTiming> {
        &self.timing
    }

    /// How long interaction primitives wait for an element to attach.
    pub fn element_timeout_ms(&self) -> u64 {
        self.element_timeout_ms
    }

    /// The underlying driver, or [`BrowserError::PageClosed`].
    pub fn page(&self) -> Result<&dyn BrowserActions> {
        self.page.as_deref().ok_or(BrowserError::PageClosed)
    }

    pub async fn pause(&self, kind: TimingKind) {
        self.timing.pause(kind).await;
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page()?;
        let domain = extract_domain(url)?;
        tracing::debug!(platform = %self.platform, %domain, "Navigating");
        page.navigate(url).await
    }

    pub async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.page()?.evaluate(script).await
    }

    /// Best-effort presence check; any driver error reads as "absent".
    pub async fn element_exists(&self, selector: &str) -> bool {
        match self.page() {
            Ok(page) => page.element_exists(selector).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Wait for `selector`, hesitate, drift the pointer onto it, then click.
    ///
    /// Failures surface unchanged; retry policy belongs to the caller.
    pub async fn human_click(&self, selector: &str) -> Result<()> {
        let page = self.page()?;

        page.wait_for_selector(selector, self.element_timeout_ms)
            .await
            .map_err(|e| match e {
                BrowserError::Timeout(_) => BrowserError::ElementNotFound(selector.to_string()),
                other => other,
            })?;

        self.timing.pause(TimingKind::Decision).await;

        if let Some(bbox) = page.bounding_box(selector).await? {
            let (cx, cy) = bbox.center();
            let (dx, dy) = self.timing.pointer_offset();
            page.move_mouse(cx + dx, cy + dy).await?;
            self.timing.pause(TimingKind::PointerSettle).await;
        }

        if let Err(e) = page.click(selector).await {
            tracing::warn!(platform = %self.platform, selector, "Click failed: {}", e);
            return Err(e);
        }
        Ok(())
    }

    /// Focus a field and type into it one character at a time.
    ///
    /// The typed text is never logged.
    pub async fn human_type(&self, selector: &str, text: &str, clear_first: bool) -> Result<()> {
        let page = self.page()?;

        page.wait_for_selector(selector, self.element_timeout_ms)
            .await
            .map_err(|e| match e {
                BrowserError::Timeout(_) => BrowserError::ElementNotFound(selector.to_string()),
                other => other,
            })?;

        page.focus(selector).await?;
        self.timing.pause(TimingKind::FieldFocus).await;

        if clear_first {
            page.clear_field(selector).await?;
        }

        let mut buf = [0u8; 4];
        for ch in text.chars() {
            page.insert_text(ch.encode_utf8(&mut buf)).await?;
            self.timing.pause(TimingKind::Keystroke).await;
            if self.timing.roll_think_pause() {
                self.timing.pause(TimingKind::ThinkPause).await;
            }
        }

        tracing::debug!(
            platform = %self.platform,
            selector,
            chars = text.chars().count(),
            "Typed into field"
        );
        Ok(())
    }

    /// Smooth-scroll by `distance` pixels (random when `None`), then pause to "read".
    pub async fn human_scroll(&self, distance: Option<u32>) -> Result<u32> {
        let distance = distance.unwrap_or_else(|| self.timing.scroll_distance());
        self.scroll(distance).await?;
        self.timing.pause(TimingKind::Reading).await;
        Ok(distance)
    }

    /// Smooth-scroll by `distance` pixels without the reading pause.
    ///
    /// For callers that take their own settle delay after scrolling.
    pub async fn scroll(&self, distance: u32) -> Result<()> {
        self.page()?
            .evaluate(&format!(
                "window.scrollBy({{ top: {distance}, left: 0, behavior: 'smooth' }})"
            ))
            .await?;
        Ok(())
    }

    /// Click any visible dismiss/close control. Never fails.
    ///
    /// Returns how many popups were dismissed.
    pub async fn dismiss_popups(&self) -> usize {
        let Ok(page) = self.page() else {
            return 0;
        };

        let mut dismissed = 0;
        for selector in POPUP_DISMISS_SELECTORS {
            if !page.element_exists(selector).await.unwrap_or(false) {
                continue;
            }
            match page.click(selector).await {
                Ok(()) => {
                    dismissed += 1;
                    tracing::debug!(platform = %self.platform, selector, "Dismissed popup");
                    self.timing.pause(TimingKind::PopupDismiss).await;
                }
                Err(e) => {
                    tracing::trace!(platform = %self.platform, selector, "Popup click ignored: {}", e);
                }
            }
        }
        dismissed
    }

    /// Advisory throttling check over the page's visible text.
    ///
    /// Any driver error reads as "not rate limited".
    pub async fn detect_rate_limit(&self) -> bool {
        let Ok(page) = self.page() else {
            return false;
        };
        match page.page_text().await {
            Ok(text) if mentions_rate_limit(&text) => {
                tracing::warn!(platform = %self.platform, "Rate limit detected");
                true
            }
            Ok(_) => false,
            Err(e) => {
                tracing::trace!(platform = %self.platform, "Rate limit check failed: {}", e);
                false
            }
        }
    }

    /// Release the page. Idempotent; close errors are logged, never returned.
    pub async fn close(&mut self) {
        self.logged_in = false;
        let Some(page) = self.page.take() else {
            return;
        };
        match page.close().await {
            Ok(()) => tracing::debug!(platform = %self.platform, "Session closed"),
            Err(e) => tracing::warn!(platform = %self.platform, "Error closing session page: {}", e),
        }
    }
}

impl std::fmt::Debug for StealthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StealthSession")
            .field("platform", &self.platform)
            .field("open", &self.page.is_some())
            .field("logged_in", &self.logged_in)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl Drop for StealthSession {
    fn drop(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        let platform = self.platform;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        tracing::warn!(%platform, "Drop cleanup failed: {}", e);
                    }
                });
            }
            Err(_) => tracing::warn!(%platform, "Session dropped outside a runtime; page leaked"),
        }
    }
}

async fn disguise(
    page: &dyn BrowserActions,
    fingerprint: &FingerprintConfig,
    settings: &BrowserSettings,
    timing: &HumanTiming,
) -> Result<()> {
    page.set_user_agent(&fingerprint.user_agent).await?;
    page.set_viewport(fingerprint.viewport_width, fingerprint.viewport_height)
        .await?;
    page.add_init_script(&stealth_script(timing.config().timer_jitter_ms))
        .await?;
    if settings.block_resources {
        page.block_resources(&ResourceKind::BLOCKED).await?;
    }
    Ok(())
}
