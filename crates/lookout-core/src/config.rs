//! Configuration management for lookout.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Secrets (platform credentials, LLM API
//! keys) never live in the file; they are read from the environment.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Platform;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Longest allowed schedule interval (one week).
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Main application configuration.
///
/// This is loaded from `~/.config/lookout/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser launch and page settings
    pub browser: BrowserSettings,
    /// Human-emulation delay ranges
    pub timing: TimingConfig,
    /// Scan sequencing and collection settings
    pub scanning: ScanningConfig,
    /// Intent classification settings
    pub llm: LlmConfig,
    /// Persistence settings
    pub storage: StorageConfig,
    /// Periodic trigger settings
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error here.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides, then validate.
    ///
    /// Supports the following environment variables:
    /// - `LOOKOUT_HEADLESS`: Override browser headless mode (true/false)
    /// - `LOOKOUT_SCAN_INTERVAL_MINUTES`: Override the schedule interval
    /// - `LOOKOUT_INTENT_THRESHOLD`: Override the intent confidence threshold
    /// - `LOOKOUT_LLM_PROVIDER`: Override the LLM provider
    /// - `LOOKOUT_DATABASE_PATH`: Override the database location
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Unparseable values are ignored, matching how a missing variable is treated.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(headless) = lookup("LOOKOUT_HEADLESS").and_then(|v| v.parse().ok()) {
            self.browser.headless = headless;
            tracing::debug!("Override browser.headless from env: {}", headless);
        }

        if let Some(minutes) =
            lookup("LOOKOUT_SCAN_INTERVAL_MINUTES").and_then(|v| v.parse().ok())
        {
            self.schedule.interval_minutes = minutes;
            tracing::debug!("Override schedule.interval_minutes from env: {}", minutes);
        }

        if let Some(threshold) = lookup("LOOKOUT_INTENT_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.llm.intent_threshold = threshold;
            tracing::debug!("Override llm.intent_threshold from env: {}", threshold);
        }

        if let Some(provider) = lookup("LOOKOUT_LLM_PROVIDER") {
            tracing::debug!("Override llm.provider from env: {}", provider);
            self.llm.provider = provider;
        }

        if let Some(path) = lookup("LOOKOUT_DATABASE_PATH") {
            tracing::debug!("Override storage.database_path from env: {}", path);
            self.storage.database_path = Some(PathBuf::from(path));
        }
    }

    /// Check cross-field constraints the type system cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        self.timing.validate()?;

        if !(0.0..=1.0).contains(&self.llm.intent_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "llm.intent_threshold".to_string(),
                reason: format!("must be within [0, 1], got {}", self.llm.intent_threshold),
            });
        }

        if !(1..=MAX_INTERVAL_MINUTES).contains(&self.schedule.interval_minutes) {
            return Err(ConfigError::InvalidValue {
                field: "schedule.interval_minutes".to_string(),
                reason: format!(
                    "must be within [1, {MAX_INTERVAL_MINUTES}], got {}",
                    self.schedule.interval_minutes
                ),
            });
        }

        let viewports = self.scanning.scroll_viewports;
        if !viewports.is_finite() || viewports <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "scanning.scroll_viewports".to_string(),
                reason: format!("must be a positive number, got {viewports}"),
            });
        }

        if self.scanning.platforms.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scanning.platforms".to_string(),
                reason: "at least one platform is required".to_string(),
            });
        }

        Ok(())
    }

    /// Save configuration to the default location.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/lookout/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/lookout`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.data_dir().to_path_buf())
    }

    /// Resolve the database path, defaulting to `<data_dir>/lookout.db`.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("lookout.db")),
        }
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("com", "lookout", "lookout").ok_or(ConfigError::NoConfigDir)
}

/// Browser launch and page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run browser in headless mode
    pub headless: bool,
    /// Base viewport width before jitter
    pub base_width: u32,
    /// Base viewport height before jitter
    pub base_height: u32,
    /// Viewport jitter upper bound in pixels (exclusive)
    pub viewport_jitter: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// How long interaction primitives wait for an element to attach
    pub element_timeout_ms: u64,
    /// Abort image, font and stylesheet requests
    pub block_resources: bool,
    /// Chromium executable; auto-detected when unset
    pub executable_path: Option<PathBuf>,
    /// Additional Chromium command-line flags
    pub extra_args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            base_width: 1366,
            base_height: 768,
            viewport_jitter: 100,
            navigation_timeout_secs: 30,
            element_timeout_ms: 10_000,
            block_resources: true,
            executable_path: None,
            extra_args: Vec::new(),
        }
    }
}

/// Inclusive delay window in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Lower bound
    pub min_ms: u64,
    /// Upper bound
    pub max_ms: u64,
}

impl DelayRange {
    /// Create a range; bounds are not reordered.
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Whether `ms` falls inside the window.
    #[must_use]
    pub fn contains(&self, ms: u64) -> bool {
        (self.min_ms..=self.max_ms).contains(&ms)
    }

    fn validate(&self, field: &str) -> ConfigResult<()> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                reason: format!("min_ms {} exceeds max_ms {}", self.min_ms, self.max_ms),
            });
        }
        Ok(())
    }
}

/// Human-emulation delay ranges.
///
/// Every randomized pause the engine takes is drawn from one of these
/// windows, so a whole run can be slowed down or sped up from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Hesitation before a click
    pub decision: DelayRange,
    /// Pause after moving the pointer onto a target
    pub pointer_settle: DelayRange,
    /// Pause after focusing a text field
    pub field_focus: DelayRange,
    /// Per-character typing delay
    pub keystroke: DelayRange,
    /// Occasional extra pause while typing
    pub think_pause: DelayRange,
    /// Probability of a think pause after each character
    pub think_chance: f64,
    /// Reading pause after a human scroll
    pub reading: DelayRange,
    /// Pause after dismissing a popup
    pub popup_dismiss: DelayRange,
    /// Pause after a navigation completes
    pub page_load: DelayRange,
    /// Default pagination settle delay (platform-tunable)
    pub settle: DelayRange,
    /// Pause between login and discovery
    pub post_login: DelayRange,
    /// Pause before handing each post to the intent pipeline
    pub inter_item: DelayRange,
    /// Cooldown between platforms once a post has been found
    pub cooldown: DelayRange,
    /// Smallest random scroll distance in pixels
    pub scroll_min_px: u32,
    /// Largest random scroll distance in pixels
    pub scroll_max_px: u32,
    /// Maximum pointer offset from an element's center, in pixels
    pub pointer_offset_px: f64,
    /// Jitter applied to page timers by the stealth script, in milliseconds
    pub timer_jitter_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            decision: DelayRange::new(500, 1500),
            pointer_settle: DelayRange::new(100, 300),
            field_focus: DelayRange::new(200, 500),
            keystroke: DelayRange::new(50, 150),
            think_pause: DelayRange::new(300, 800),
            think_chance: 0.1,
            reading: DelayRange::new(2000, 4000),
            popup_dismiss: DelayRange::new(1000, 2000),
            page_load: DelayRange::new(2000, 4000),
            settle: DelayRange::new(3000, 7000),
            post_login: DelayRange::new(5000, 10_000),
            inter_item: DelayRange::new(3000, 8000),
            cooldown: DelayRange::new(300_000, 900_000),
            scroll_min_px: 400,
            scroll_max_px: 1200,
            pointer_offset_px: 5.0,
            timer_jitter_ms: 50,
        }
    }
}

impl TimingConfig {
    /// Reject inverted ranges, out-of-bounds probabilities and offsets
    /// that cannot be sampled.
    pub fn validate(&self) -> ConfigResult<()> {
        let ranges = [
            ("timing.decision", &self.decision),
            ("timing.pointer_settle", &self.pointer_settle),
            ("timing.field_focus", &self.field_focus),
            ("timing.keystroke", &self.keystroke),
            ("timing.think_pause", &self.think_pause),
            ("timing.reading", &self.reading),
            ("timing.popup_dismiss", &self.popup_dismiss),
            ("timing.page_load", &self.page_load),
            ("timing.settle", &self.settle),
            ("timing.post_login", &self.post_login),
            ("timing.inter_item", &self.inter_item),
            ("timing.cooldown", &self.cooldown),
        ];
        for (field, range) in ranges {
            range.validate(field)?;
        }

        if !(0.0..=1.0).contains(&self.think_chance) {
            return Err(ConfigError::InvalidValue {
                field: "timing.think_chance".to_string(),
                reason: format!("must be within [0, 1], got {}", self.think_chance),
            });
        }

        if !self.pointer_offset_px.is_finite() || self.pointer_offset_px < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "timing.pointer_offset_px".to_string(),
                reason: format!(
                    "must be a finite, non-negative number, got {}",
                    self.pointer_offset_px
                ),
            });
        }

        if self.scroll_min_px > self.scroll_max_px {
            return Err(ConfigError::InvalidValue {
                field: "timing.scroll_min_px".to_string(),
                reason: "exceeds scroll_max_px".to_string(),
            });
        }

        Ok(())
    }

    /// A configuration with every delay set to zero.
    ///
    /// Useful for dry runs against local fixtures.
    #[must_use]
    pub fn instant() -> Self {
        let zero = DelayRange::new(0, 0);
        Self {
            decision: zero,
            pointer_settle: zero,
            field_focus: zero,
            keystroke: zero,
            think_pause: zero,
            think_chance: 0.0,
            reading: zero,
            popup_dismiss: zero,
            page_load: zero,
            settle: zero,
            post_login: zero,
            inter_item: zero,
            cooldown: zero,
            ..Self::default()
        }
    }
}

/// Scan sequencing and collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Platforms to scan, in order
    pub platforms: Vec<Platform>,
    /// Directory holding platform definition TOML files
    pub definitions_dir: Option<PathBuf>,
    /// Minimum sanitised content length for a post to be kept
    pub min_content_len: usize,
    /// How many viewport heights each pagination scroll advances
    pub scroll_viewports: f64,
    /// Skip the remaining platforms once a rate limit has been detected
    pub halt_on_rate_limit: bool,
    /// Cap on posts handed to the intent pipeline per platform
    pub max_items_per_platform: Option<usize>,
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            platforms: Platform::ALL.to_vec(),
            definitions_dir: None,
            min_content_len: 10,
            scroll_viewports: 2.0,
            halt_on_rate_limit: false,
            max_items_per_platform: None,
        }
    }
}

/// Intent classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider: `openai` or `gemini`
    pub provider: String,
    /// Model override; provider default when unset
    pub model: Option<String>,
    /// Minimum confidence for a post to count as high intent
    pub intent_threshold: f32,
    /// Temperature for completions
    pub temperature: f32,
    /// Maximum tokens for completions
    pub max_tokens: u32,
    /// Business description woven into generated replies
    pub business_context: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            intent_threshold: 0.7,
            temperature: 0.3,
            max_tokens: 500,
            business_context: "We help businesses with digital solutions: websites, \
                               marketing automation and business processes. \
                               Emphasize genuine help over immediate sales."
                .to_string(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file; defaults to `<data_dir>/lookout.db`
    pub database_path: Option<PathBuf>,
}

/// Periodic trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Minutes between scheduled scans
    pub interval_minutes: u64,
    /// Run one scan immediately when the daemon starts
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
            run_on_start: true,
        }
    }
}
