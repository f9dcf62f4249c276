//! Browser automation for authenticated, detection-averse crawling.
//!
//! A [`StealthSession`] owns exactly one page and exposes human-like
//! interaction primitives (click, type, scroll) whose pacing comes from a
//! shared [`HumanTiming`] policy. Pages are produced by a [`BrowserContext`];
//! [`BrowserEngine`] is the Chromium implementation, and the `mock` feature
//! adds a scripted in-memory driver for tests.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod session;
pub mod stealth;
pub mod timing;

pub use actions::{BoundingBox, BrowserActions, BrowserContext};
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
pub use session::StealthSession;
pub use stealth::ResourceKind;
pub use timing::{HumanTiming, TimingKind};
