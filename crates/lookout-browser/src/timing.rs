//! Randomized human pacing.
//!
//! All delays the engine takes are drawn from one [`HumanTiming`] instance so
//! that a whole run can be reproduced from a seed and tuned from config.

use lookout_core::{DelayRange, TimingConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// The kind of pause being taken; each maps to one configured range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingKind {
    Decision,
    PointerSettle,
    FieldFocus,
    Keystroke,
    ThinkPause,
    Reading,
    PopupDismiss,
    PageLoad,
    Settle,
    PostLogin,
    InterItem,
    Cooldown,
}

impl TimingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decision => "decision",
            Self::PointerSettle => "pointer_settle",
            Self::FieldFocus => "field_focus",
            Self::Keystroke => "keystroke",
            Self::ThinkPause => "think_pause",
            Self::Reading => "reading",
            Self::PopupDismiss => "popup_dismiss",
            Self::PageLoad => "page_load",
            Self::Settle => "settle",
            Self::PostLogin => "post_login",
            Self::InterItem => "inter_item",
            Self::Cooldown => "cooldown",
        }
    }
}

/// Seedable timing policy shared by sessions, collectors and the orchestrator.
#[derive(Debug)]
pub struct HumanTiming {
    config: TimingConfig,
    rng: Mutex<StdRng>,
}

impl HumanTiming {
    pub fn new(config: TimingConfig) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence for tests and replays.
    pub fn seeded(config: TimingConfig, seed: u64) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    pub fn range(&self, kind: TimingKind) -> DelayRange {
        let c = &self.config;
        match kind {
            TimingKind::Decision => c.decision,
            TimingKind::PointerSettle => c.pointer_settle,
            TimingKind::FieldFocus => c.field_focus,
            TimingKind::Keystroke => c.keystroke,
            TimingKind::ThinkPause => c.think_pause,
            TimingKind::Reading => c.reading,
            TimingKind::PopupDismiss => c.popup_dismiss,
            TimingKind::PageLoad => c.page_load,
            TimingKind::Settle => c.settle,
            TimingKind::PostLogin => c.post_login,
            TimingKind::InterItem => c.inter_item,
            TimingKind::Cooldown => c.cooldown,
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// Draw a duration uniformly from `[min_ms, max_ms]`.
    pub fn sample_range(&self, range: DelayRange) -> Duration {
        if range.min_ms >= range.max_ms {
            return Duration::from_millis(range.min_ms);
        }
        let ms = self.with_rng(|rng| rng.gen_range(range.min_ms..=range.max_ms));
        Duration::from_millis(ms)
    }

    pub fn sample(&self, kind: TimingKind) -> Duration {
        self.sample_range(self.range(kind))
    }

    /// Sleep for a sampled duration and return it.
    pub async fn pause(&self, kind: TimingKind) -> Duration {
        let delay = self.sample(kind);
        tracing::trace!(kind = kind.as_str(), delay_ms = delay.as_millis() as u64, "pausing");
        tokio::time::sleep(delay).await;
        delay
    }

    /// Sleep for a duration drawn from an explicit range (platform-tuned settles).
    pub async fn pause_range(&self, range: DelayRange) -> Duration {
        let delay = self.sample_range(range);
        tokio::time::sleep(delay).await;
        delay
    }

    /// Whether to insert a think pause after the current keystroke.
    pub fn roll_think_pause(&self) -> bool {
        let chance = self.config.think_chance.clamp(0.0, 1.0);
        self.with_rng(|rng| rng.gen_bool(chance))
    }

    /// Random scroll distance in pixels.
    pub fn scroll_distance(&self) -> u32 {
        let (min, max) = (self.config.scroll_min_px, self.config.scroll_max_px);
        if min >= max {
            return min;
        }
        self.with_rng(|rng| rng.gen_range(min..=max))
    }

    /// Random pointer offset from an element's center, in `[-offset, offset]` on each axis.
    ///
    /// A non-finite configured offset means "no offset".
    pub fn pointer_offset(&self) -> (f64, f64) {
        let max = self.config.pointer_offset_px.abs();
        if !max.is_finite() || max == 0.0 {
            return (0.0, 0.0);
        }
        self.with_rng(|rng| (rng.gen_range(-max..=max), rng.gen_range(-max..=max)))
    }

    /// Pick an index into a collection of `len` items; `len` must be non-zero.
    pub fn pick(&self, len: usize) -> usize {
        self.with_rng(|rng| rng.gen_range(0..len.max(1)))
    }
}

impl Default for HumanTiming {
    fn default() -> Self {
        Self::new(TimingConfig::default())
    }
}
