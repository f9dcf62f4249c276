//! The per-platform substitution point.

use crate::error::Result;
use async_trait::async_trait;
use lookout_browser::{BrowserContext, StealthSession};
use lookout_core::{Platform, Post};

/// Best-effort result of crawling one logged-in session.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Posts in first-seen order, unique by link
    pub posts: Vec<Post>,
    /// Discovery stopped because the platform showed throttling text
    pub rate_limited: bool,
}

/// Login and content discovery for one platform.
///
/// Implementations hide every platform specific: selectors, navigation
/// targets and form field names. The orchestrator only sees this contract.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Platform this adapter drives.
    fn platform(&self) -> Platform;

    /// Open a session on `context` and log it in.
    ///
    /// Failures are [`crate::ScanError::Login`] with a
    /// [`crate::LoginFailure`] reason, or [`crate::ScanError::Init`] when no
    /// page could be allocated. A verification challenge is never bypassed.
    /// No page is left open on failure.
    async fn login(&self, context: &dyn BrowserContext) -> Result<StealthSession>;

    /// Collect posts from a logged-in session.
    ///
    /// Never fails: errors end discovery early and whatever was collected
    /// so far is returned.
    async fn discover(&self, session: &mut StealthSession) -> Discovery;
}
