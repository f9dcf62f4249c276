//! Scripted in-memory driver.
//!
//! [`MockContext`] hands out [`MockPage`]s that share one state: a set of
//! "present" selectors, a body text, queued responses for scripts, and a
//! log of every call made. Time never passes inside the driver itself, so
//! the only delays in a test are the ones taken by [`crate::HumanTiming`].

use crate::actions::{BoundingBox, BrowserActions, BrowserContext};
use crate::error::{BrowserError, Result};
use crate::stealth::ResourceKind;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Navigate(String),
    MoveMouse(f64, f64),
    Click(String),
    Focus(String),
    Clear(String),
    InsertText(String),
    Evaluate(String),
    SetUserAgent(String),
    SetViewport(u32, u32),
    InitScript(String),
    BlockResources(Vec<ResourceKind>),
    Close,
}

/// Queued outcome for a matching script.
#[derive(Debug, Clone)]
pub enum ScriptResponse {
    Value(Value),
    Fail(String),
}

#[derive(Debug, Default)]
struct MockState {
    present: HashSet<String>,
    reveals: HashMap<String, Vec<String>>,
    scripts: Vec<(String, VecDeque<ScriptResponse>)>,
    failing_urls: Vec<String>,
    body_text: String,
    calls: Vec<MockCall>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockState>,
    pages_opened: AtomicUsize,
    close_count: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: MockCall) {
        self.lock().calls.push(call);
    }
}

/// Browser context backed by shared scripted state.
#[derive(Debug, Clone)]
pub struct MockContext {
    shared: Arc<Shared>,
    available: Arc<AtomicBool>,
    fail_new_page: Arc<AtomicBool>,
}

impl Default for MockContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContext {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            available: Arc::new(AtomicBool::new(true)),
            fail_new_page: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A context whose liveness check fails.
    pub fn unavailable() -> Self {
        let ctx = Self::new();
        ctx.set_available(false);
        ctx
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make `new_page` fail with an init error while still reporting available.
    pub fn fail_new_page(&self, fail: bool) {
        self.fail_new_page.store(fail, Ordering::SeqCst);
    }

    pub fn set_present(&self, selector: &str) {
        self.shared.lock().present.insert(selector.to_string());
    }

    pub fn remove_present(&self, selector: &str) {
        self.shared.lock().present.remove(selector);
    }

    /// Clicking `clicked` makes `revealed` present.
    pub fn reveal_on_click(&self, clicked: &str, revealed: &str) {
        self.shared
            .lock()
            .reveals
            .entry(clicked.to_string())
            .or_default()
            .push(revealed.to_string());
    }

    pub fn set_body_text(&self, text: &str) {
        self.shared.lock().body_text = text.to_string();
    }

    /// Queue responses for scripts containing `needle`.
    ///
    /// Once the queue is drained, matching scripts evaluate to an empty array.
    pub fn on_script(&self, needle: &str, responses: Vec<ScriptResponse>) {
        self.shared
            .lock()
            .scripts
            .push((needle.to_string(), responses.into_iter().collect()));
    }

    /// Navigation to any URL containing `needle` fails.
    pub fn fail_navigation_to(&self, needle: &str) {
        self.shared.lock().failing_urls.push(needle.to_string());
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.shared.lock().calls.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Navigate(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    /// Count of evaluated scripts containing `needle`.
    pub fn evaluations_matching(&self, needle: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Evaluate(s) if s.contains(needle)))
            .count()
    }

    /// Concatenation of every inserted text fragment.
    pub fn typed_text(&self) -> String {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::InsertText(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn pages_opened(&self) -> usize {
        self.shared.pages_opened.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.shared.close_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl BrowserContext for MockContext {
    async fn new_page(&self) -> Result<Box<dyn BrowserActions>> {
        if !self.is_available() || self.fail_new_page.load(Ordering::SeqCst) {
            return Err(BrowserError::Init("mock browser unavailable".to_string()));
        }
        self.shared.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPage {
            shared: Arc::clone(&self.shared),
            closed: AtomicBool::new(false),
        }))
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

/// A page over the shared mock state.
#[derive(Debug)]
pub struct MockPage {
    shared: Arc<Shared>,
    closed: AtomicBool,
}

impl MockPage {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::PageClosed);
        }
        Ok(())
    }

    fn require(&self, selector: &str) -> Result<()> {
        self.ensure_open()?;
        if self.shared.lock().present.contains(selector) {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound(selector.to_string()))
        }
    }
}

#[async_trait::async_trait]
impl BrowserActions for MockPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.ensure_open()?;
        self.shared.record(MockCall::Navigate(url.to_string()));
        let failing = self
            .shared
            .lock()
            .failing_urls
            .iter()
            .any(|needle| url.contains(needle.as_str()));
        if failing {
            return Err(BrowserError::Navigation(format!("{url}: net::ERR_FAILED")));
        }
        Ok(())
    }

    async fn element_exists(&self, selector: &str) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.shared.lock().present.contains(selector))
    }

    async fn bounding_box(&self, selector: &str) -> Result<Option<BoundingBox>> {
        self.require(selector)?;
        Ok(Some(BoundingBox {
            x: 100.0,
            y: 200.0,
            width: 120.0,
            height: 32.0,
        }))
    }

    async fn move_mouse(&self, x: f64, y: f64) -> Result<()> {
        self.ensure_open()?;
        self.shared.record(MockCall::MoveMouse(x, y));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.require(selector)?;
        let mut state = self.shared.lock();
        state.calls.push(MockCall::Click(selector.to_string()));
        if let Some(revealed) = state.reveals.get(selector).cloned() {
            state.present.extend(revealed);
        }
        Ok(())
    }

    async fn focus(&self, selector: &str) -> Result<()> {
        self.require(selector)?;
        self.shared.record(MockCall::Focus(selector.to_string()));
        Ok(())
    }

    async fn clear_field(&self, selector: &str) -> Result<()> {
        self.require(selector)?;
        self.shared.record(MockCall::Clear(selector.to_string()));
        Ok(())
    }

    async fn insert_text(&self, text: &str) -> Result<()> {
        self.ensure_open()?;
        self.shared.record(MockCall::InsertText(text.to_string()));
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        self.ensure_open()?;
        let mut state = self.shared.lock();
        state.calls.push(MockCall::Evaluate(script.to_string()));

        let Some((_, queue)) = state
            .scripts
            .iter_mut()
            .find(|(needle, _)| script.contains(needle.as_str()))
        else {
            return Ok(Value::Null);
        };

        match queue.pop_front() {
            Some(ScriptResponse::Value(value)) => Ok(value),
            Some(ScriptResponse::Fail(message)) => Err(BrowserError::Script(message)),
            None => Ok(Value::Array(Vec::new())),
        }
    }

    async fn extract_text(&self, selector: &str) -> Result<String> {
        self.require(selector)?;
        Ok(String::new())
    }

    async fn page_text(&self) -> Result<String> {
        self.ensure_open()?;
        Ok(self.shared.lock().body_text.clone())
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        self.ensure_open()?;
        self.shared
            .record(MockCall::SetUserAgent(user_agent.to_string()));
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<()> {
        self.ensure_open()?;
        self.shared.record(MockCall::SetViewport(width, height));
        Ok(())
    }

    async fn add_init_script(&self, script: &str) -> Result<()> {
        self.ensure_open()?;
        self.shared.record(MockCall::InitScript(script.to_string()));
        Ok(())
    }

    async fn block_resources(&self, kinds: &[ResourceKind]) -> Result<()> {
        self.ensure_open()?;
        self.shared.record(MockCall::BlockResources(kinds.to_vec()));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shared.close_count.fetch_add(1, Ordering::SeqCst);
        self.shared.record(MockCall::Close);
        Ok(())
    }
}
