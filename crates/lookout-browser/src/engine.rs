use crate::actions::{BoundingBox, BrowserActions, BrowserContext};
use crate::error::{BrowserError, Result};
use crate::stealth::ResourceKind;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, InsertTextParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, ResourceType, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Handler;
use chromiumoxide::Page;
use futures::stream::StreamExt;
use lookout_core::BrowserSettings;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Chromium flags that keep a long-lived automated browser quiet and stable.
const LAUNCH_ARGS: [&str; 14] = [
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
    "--disable-extensions",
    "--disable-default-apps",
    "--disable-translate",
    "--disable-software-rasterizer",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-features=TranslateUI",
];

fn chromium(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Chromium(e.to_string())
}

/// JSON string literal for embedding a selector in a script.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Browser automation engine
pub struct BrowserEngine {
    browser: Browser,
    handler_task: JoinHandle<()>,
    alive: Arc<AtomicBool>,
    navigation_timeout: Duration,
}

impl BrowserEngine {
    /// Launch Chromium with the configured settings
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(settings.base_width, settings.base_height)
            .request_timeout(Duration::from_secs(settings.navigation_timeout_secs))
            .args(LAUNCH_ARGS.iter().copied().chain(settings.extra_args.iter().map(String::as_str)));

        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.executable_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(BrowserError::Init)?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Init(e.to_string()))?;

        let alive = Arc::new(AtomicBool::new(true));
        let handler_task = spawn_handler(handler, Arc::clone(&alive));

        tracing::info!(headless = settings.headless, "Chromium launched");

        Ok(Self {
            browser,
            handler_task,
            alive,
            navigation_timeout: Duration::from_secs(settings.navigation_timeout_secs),
        })
    }

    /// Close the browser and stop the CDP handler.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Browser process wait failed: {}", e);
        }
        self.handler_task.abort();
        self.alive.store(false, Ordering::SeqCst);
        tracing::info!("Chromium shut down");
    }
}

fn spawn_handler(mut handler: Handler, alive: Arc<AtomicBool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::warn!("chromiumoxide handler event error: {}", e);
            }
        }
        alive.store(false, Ordering::SeqCst);
        tracing::debug!("chromiumoxide handler exited");
    })
}

#[async_trait::async_trait]
impl BrowserContext for BrowserEngine {
    async fn new_page(&self) -> Result<Box<dyn BrowserActions>> {
        if !self.is_available() {
            return Err(BrowserError::Init("browser connection lost".to_string()));
        }
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Init(e.to_string()))?;

        Ok(Box::new(ChromePage::new(page, self.navigation_timeout)))
    }

    fn is_available(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// A Chromium tab driven over CDP.
pub struct ChromePage {
    page: Page,
    navigation_timeout: Duration,
    closed: AtomicBool,
}

impl ChromePage {
    fn new(page: Page, navigation_timeout: Duration) -> Self {
        Self {
            page,
            navigation_timeout,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::PageClosed);
        }
        Ok(())
    }

    async fn element(&self, selector: &str) -> Result<chromiumoxide::Element> {
        self.ensure_open()?;
        self.page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))
    }
}

#[async_trait::async_trait]
impl BrowserActions for ChromePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.ensure_open()?;
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Navigation(format!("{url}: {e}"))),
            Err(_) => Err(BrowserError::Timeout(format!(
                "navigation to {url} exceeded {}s",
                self.navigation_timeout.as_secs()
            ))),
        }
    }

    async fn element_exists(&self, selector: &str) -> Result<bool> {
        let script = format!("document.querySelector({}) !== null", js_string(selector));
        Ok(self.evaluate(&script).await?.as_bool().unwrap_or(false))
    }

    async fn bounding_box(&self, selector: &str) -> Result<Option<BoundingBox>> {
        let script = format!(
            r#"(() => {{
  const el = document.querySelector({});
  if (!el) return null;
  const r = el.getBoundingClientRect();
  if (r.width === 0 && r.height === 0) return null;
  return {{ x: r.x, y: r.y, width: r.width, height: r.height }};
}})()"#,
            js_string(selector)
        );
        let value = self.evaluate(&script).await?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| BrowserError::Script(format!("bounding box: {e}")))
    }

    async fn move_mouse(&self, x: f64, y: f64) -> Result<()> {
        self.ensure_open()?;
        self.page
            .execute(DispatchMouseEventParams::new(
                DispatchMouseEventType::MouseMoved,
                x,
                y,
            ))
            .await
            .map_err(chromium)?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.element(selector).await?.click().await.map_err(chromium)?;
        Ok(())
    }

    async fn focus(&self, selector: &str) -> Result<()> {
        self.element(selector).await?.focus().await.map_err(chromium)?;
        Ok(())
    }

    async fn clear_field(&self, selector: &str) -> Result<()> {
        let script = format!(
            r#"(() => {{
  const el = document.querySelector({});
  if (!el) return false;
  el.value = '';
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  return true;
}})()"#,
            js_string(selector)
        );
        match self.evaluate(&script).await?.as_bool() {
            Some(true) => Ok(()),
            _ => Err(BrowserError::ElementNotFound(selector.to_string())),
        }
    }

    async fn insert_text(&self, text: &str) -> Result<()> {
        self.ensure_open()?;
        self.page
            .execute(InsertTextParams::new(text))
            .await
            .map_err(chromium)?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.ensure_open()?;
        let result = self
            .page
            .evaluate(script.to_string())
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn extract_text(&self, selector: &str) -> Result<String> {
        let text = self
            .element(selector)
            .await?
            .inner_text()
            .await
            .map_err(chromium)?;
        Ok(text.unwrap_or_default())
    }

    async fn page_text(&self) -> Result<String> {
        let value = self
            .evaluate("document.body ? document.body.innerText : ''")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        self.ensure_open()?;
        self.page
            .execute(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map_err(chromium)?;
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<()> {
        self.ensure_open()?;
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(width),
                i64::from(height),
                1.0,
                false,
            ))
            .await
            .map_err(chromium)?;
        Ok(())
    }

    async fn add_init_script(&self, script: &str) -> Result<()> {
        self.ensure_open()?;
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(script))
            .await
            .map_err(chromium)?;
        Ok(())
    }

    async fn block_resources(&self, kinds: &[ResourceKind]) -> Result<()> {
        self.ensure_open()?;
        if kinds.is_empty() {
            return Ok(());
        }

        // Listener first so no paused request slips through unanswered.
        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(chromium)?;

        let patterns = kinds
            .iter()
            .map(|kind| {
                RequestPattern::builder()
                    .resource_type(resource_type(*kind))
                    .build()
            })
            .collect::<Vec<_>>();

        self.page
            .execute(fetch::EnableParams::builder().patterns(patterns).build())
            .await
            .map_err(chromium)?;

        let page = self.page.clone();
        tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let fail = FailRequestParams::new(
                    event.request_id.clone(),
                    ErrorReason::BlockedByClient,
                );
                if let Err(e) = page.execute(fail).await {
                    tracing::trace!("Could not abort paused request: {}", e);
                    break;
                }
            }
        });

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.page.clone().close().await.map_err(chromium)?;
        Ok(())
    }
}

fn resource_type(kind: ResourceKind) -> ResourceType {
    match kind {
        ResourceKind::Image => ResourceType::Image,
        ResourceKind::Font => ResourceType::Font,
        ResourceKind::Stylesheet => ResourceType::Stylesheet,
    }
}
