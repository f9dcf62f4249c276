use crate::error::{BrowserError, Result};
use crate::stealth::ResourceKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Interval between DOM checks while waiting for a selector.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Element geometry in CSS pixels, relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Low-level page driver.
///
/// Every method maps to one driver round-trip; pacing and human emulation
/// live in [`crate::StealthSession`], not here.
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Whether at least one element matches the selector right now
    async fn element_exists(&self, selector: &str) -> Result<bool>;

    /// Wait for a selector to attach, polling until `timeout_ms` elapses
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.element_exists(selector).await? {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "{selector} not attached after {timeout_ms}ms"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Bounding box of the first match, `None` when it has no layout
    async fn bounding_box(&self, selector: &str) -> Result<Option<BoundingBox>>;

    /// Move the virtual pointer
    async fn move_mouse(&self, x: f64, y: f64) -> Result<()>;

    /// Click an element by selector
    async fn click(&self, selector: &str) -> Result<()>;

    /// Focus an element by selector
    async fn focus(&self, selector: &str) -> Result<()>;

    /// Clear the value of an input element
    async fn clear_field(&self, selector: &str) -> Result<()>;

    /// Insert text at the focused element as if typed
    async fn insert_text(&self, text: &str) -> Result<()>;

    /// Evaluate a JavaScript expression and return its JSON value
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Extract text from an element
    async fn extract_text(&self, selector: &str) -> Result<String>;

    /// Visible text of the whole document body
    async fn page_text(&self) -> Result<String>;

    async fn set_user_agent(&self, user_agent: &str) -> Result<()>;

    async fn set_viewport(&self, width: u32, height: u32) -> Result<()>;

    /// Register a script that runs before any page script on every new document
    async fn add_init_script(&self, script: &str) -> Result<()>;

    /// Abort requests of the given resource types; everything else proceeds
    async fn block_resources(&self, kinds: &[ResourceKind]) -> Result<()>;

    /// Close the page
    async fn close(&self) -> Result<()>;
}

/// A browser that can hand out fresh pages.
#[async_trait::async_trait]
pub trait BrowserContext: Send + Sync {
    /// Allocate a new blank page
    async fn new_page(&self) -> Result<Box<dyn BrowserActions>>;

    /// Cheap liveness check used before a run starts
    fn is_available(&self) -> bool {
        true
    }
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::Navigation(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| BrowserError::Navigation("No host in URL".to_string()))
        .map(|s| s.to_string())
}
