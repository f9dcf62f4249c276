use lookout_core::BrowserSettings;
use rand::Rng;

/// Desktop Chrome signatures a session may present.
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Fingerprint configuration for anti-detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub locale: String,
    pub timezone: String,
}

impl FingerprintConfig {
    /// Generate a randomized fingerprint around the configured base viewport
    pub fn randomized(settings: &BrowserSettings) -> Self {
        Self::randomized_with(&mut rand::thread_rng(), settings)
    }

    /// Same as [`FingerprintConfig::randomized`] with a caller-supplied RNG.
    pub fn randomized_with<R: Rng + ?Sized>(rng: &mut R, settings: &BrowserSettings) -> Self {
        let ua_idx = rng.gen_range(0..USER_AGENTS.len());
        let (dx, dy) = if settings.viewport_jitter == 0 {
            (0, 0)
        } else {
            (
                rng.gen_range(0..settings.viewport_jitter),
                rng.gen_range(0..settings.viewport_jitter),
            )
        };

        Self {
            user_agent: USER_AGENTS[ua_idx].to_string(),
            viewport_width: settings.base_width + dx,
            viewport_height: settings.base_height + dy,
            locale: "en-US".to_string(),
            timezone: "America/New_York".to_string(),
        }
    }
}
