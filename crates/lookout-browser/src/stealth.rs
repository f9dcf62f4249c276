//! Page disguises: init script, resource blocking policy, and the fixed
//! selector/phrase lists used by popup dismissal and rate-limit detection.

use serde::{Deserialize, Serialize};

/// Resource types a page can refuse to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
    Font,
    Stylesheet,
}

impl ResourceKind {
    /// Blocked on every stealth page.
    pub const BLOCKED: [ResourceKind; 3] = [Self::Image, Self::Font, Self::Stylesheet];
}

/// Dismiss/close controls common to cookie banners and sign-up nags.
pub const POPUP_DISMISS_SELECTORS: [&str; 6] = [
    r#"button[aria-label="Close"]"#,
    r#"button[aria-label="Dismiss"]"#,
    r#"[data-testid="xMigrationBottomBar"] button"#,
    ".cookie-banner button",
    "[data-cookiebanner] button",
    r#".notification-banner button[aria-label="Dismiss"]"#,
];

/// Lowercase phrases that indicate the platform is throttling us.
pub const RATE_LIMIT_PHRASES: [&str; 4] = [
    "rate limit",
    "too many requests",
    "temporarily blocked",
    "try again later",
];

/// Whether page text contains any throttling phrase (case-insensitive).
pub fn mentions_rate_limit(text: &str) -> bool {
    let lowered = text.to_lowercase();
    RATE_LIMIT_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

/// Script evaluated on every new document before page scripts run.
///
/// Hides `navigator.webdriver`, reports a plausible language and plugin list,
/// jitters `setTimeout` delays by up to `timer_jitter_ms` in either direction,
/// and adds sub-pixel noise to mousemove coordinates seen by listeners.
pub fn stealth_script(timer_jitter_ms: u32) -> String {
    let jitter = timer_jitter_ms;
    format!(
        r#"(() => {{
  Object.defineProperty(navigator, 'webdriver', {{ get: () => undefined }});
  Object.defineProperty(navigator, 'languages', {{ get: () => ['en-US', 'en'] }});
  Object.defineProperty(navigator, 'plugins', {{ get: () => [1, 2, 3, 4, 5] }});

  const originalSetTimeout = window.setTimeout;
  window.setTimeout = function (callback, delay, ...args) {{
    const base = Number(delay) || 0;
    const jittered = base + (Math.random() * {span} - {jitter});
    return originalSetTimeout.call(this, callback, Math.max(0, jittered), ...args);
  }};

  const originalAddEventListener = EventTarget.prototype.addEventListener;
  EventTarget.prototype.addEventListener = function (type, listener, options) {{
    if (type === 'mousemove' && typeof listener === 'function') {{
      const wrapped = function (event) {{
        const noisy = new Proxy(event, {{
          get(target, prop) {{
            if (prop === 'clientX' || prop === 'clientY') {{
              return target[prop] + (Math.random() * 2 - 1);
            }}
            const value = Reflect.get(target, prop, target);
            return typeof value === 'function' ? value.bind(target) : value;
          }}
        }});
        return listener.call(this, noisy);
      }};
      return originalAddEventListener.call(this, type, wrapped, options);
    }}
    return originalAddEventListener.call(this, type, listener, options);
  }};
}})();"#,
        span = u64::from(jitter) * 2,
        jitter = jitter,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_phrases() {
        assert!(mentions_rate_limit("Whoa there! Too Many Requests."));
        assert!(mentions_rate_limit("You have been temporarily blocked"));
        assert!(mentions_rate_limit("Something went wrong. Try again later."));
        assert!(!mentions_rate_limit("Looking for a CRM that doesn't crash"));
        assert!(!mentions_rate_limit(""));
    }

    #[test]
    fn test_stealth_script_contents() {
        let script = stealth_script(50);
        assert!(script.contains("'webdriver'"));
        assert!(script.contains("['en-US', 'en']"));
        assert!(script.contains("Math.random() * 100 - 50"));
        assert!(script.contains("Math.max(0, jittered)"));
        assert!(script.contains("'mousemove'"));
    }

    #[test]
    fn test_blocked_kinds() {
        assert_eq!(ResourceKind::BLOCKED.len(), 3);
        assert!(ResourceKind::BLOCKED.contains(&ResourceKind::Stylesheet));
    }
}
