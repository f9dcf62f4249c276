//! Platform definition types.
//!
//! A definition is the data half of a site adapter: where to log in, how
//! to recognise the outcome, which pages to crawl and how to pull posts out
//! of each. They are loaded from `platform-definitions/<id>.toml`.

use crate::error::{Result, ScanError};
use lookout_core::{DelayRange, Platform, PostKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Allowed range for a source's scroll budget.
pub const SCROLL_BUDGET_RANGE: std::ops::RangeInclusive<u32> = 1..=20;

/// Allowed range for the number of links a source follows.
pub const FOLLOW_LIMIT_RANGE: std::ops::RangeInclusive<usize> = 1..=10;

/// Complete platform definition loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformDefinition {
    /// Core platform metadata
    pub platform: PlatformMetadata,

    /// Login flow and outcome selectors
    pub login: LoginFlow,

    /// Named extraction recipes referenced by sources
    #[serde(default)]
    pub extractions: BTreeMap<String, ExtractionSpec>,

    /// Pages to crawl, in order
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl PlatformDefinition {
    /// Get the platform this definition drives.
    #[must_use]
    pub fn id(&self) -> Platform {
        self.platform.id
    }

    /// Get the human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.platform.name
    }

    /// Look up an extraction recipe by name.
    #[must_use]
    pub fn extraction(&self, name: &str) -> Option<&ExtractionSpec> {
        self.extractions.get(name)
    }

    /// Validate the definition for completeness and correctness.
    ///
    /// `origin` names the file (or other source) for error messages.
    pub fn validate(&self, origin: &str) -> Result<()> {
        let invalid = |reason: String| ScanError::Definition {
            path: origin.to_string(),
            reason,
        };

        if self.platform.name.trim().is_empty() {
            return Err(invalid("platform name cannot be empty".to_string()));
        }

        for (field, value) in [
            ("login_url", &self.platform.login_url),
            ("home_url", &self.platform.home_url),
        ] {
            if !is_http_url(value) {
                return Err(invalid(format!("{field} must be an http(s) URL, got '{value}'")));
            }
        }

        self.login.validate().map_err(invalid)?;

        if self.sources.is_empty() {
            return Err(invalid("at least one source is required".to_string()));
        }

        for (name, extraction) in &self.extractions {
            if extraction.item_selector.trim().is_empty() {
                return Err(invalid(format!("extraction '{name}' has an empty item_selector")));
            }
            if extraction.content_selectors.is_empty() && extraction.title_selector.is_none() {
                return Err(invalid(format!(
                    "extraction '{name}' needs content_selectors or a title_selector"
                )));
            }
        }

        for source in &self.sources {
            if !is_http_url(&source.url) {
                return Err(invalid(format!("source url '{}' is not http(s)", source.url)));
            }
            if !self.extractions.contains_key(&source.extraction) {
                return Err(invalid(format!(
                    "source '{}' references unknown extraction '{}'",
                    source.url, source.extraction
                )));
            }
            if !SCROLL_BUDGET_RANGE.contains(&source.scroll_budget) {
                return Err(invalid(format!(
                    "scroll_budget must be 1-20, got {} for '{}'",
                    source.scroll_budget, source.url
                )));
            }
            if source.scroll_viewports.is_some_and(|v| v <= 0.0) {
                return Err(invalid(format!(
                    "scroll_viewports must be positive for '{}'",
                    source.url
                )));
            }
            if let (Some(min), Some(max)) = (source.settle_min_ms, source.settle_max_ms) {
                if min > max {
                    return Err(invalid(format!(
                        "settle_min_ms {min} exceeds settle_max_ms {max} for '{}'",
                        source.url
                    )));
                }
            }
            if let Some(follow) = &source.follow {
                follow
                    .validate()
                    .map_err(|reason| invalid(format!("{reason} for '{}'", source.url)))?;
            }
        }

        Ok(())
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}

/// Core platform metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformMetadata {
    /// Which platform this is
    pub id: Platform,

    /// Human-readable name
    pub name: String,

    /// Page the login flow starts on
    pub login_url: String,

    /// Landing page once logged in
    pub home_url: String,
}

/// Scripted login flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginFlow {
    /// Steps run in order
    pub steps: Vec<LoginStep>,

    /// Present only once logged in
    pub success_selector: String,

    /// Any of these means a human challenge (2FA, CAPTCHA, PIN)
    #[serde(default)]
    pub verification_selectors: Vec<String>,

    /// Any of these means the credentials were refused
    #[serde(default)]
    pub failure_selectors: Vec<String>,

    /// How long to wait for an outcome after the last step
    #[serde(default = "default_success_timeout_secs")]
    pub success_timeout_secs: u64,
}

fn default_success_timeout_secs() -> u64 {
    15
}

impl LoginFlow {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.steps.is_empty() {
            return Err("login needs at least one step".to_string());
        }
        if self.success_selector.trim().is_empty() {
            return Err("login.success_selector cannot be empty".to_string());
        }
        if self.success_timeout_secs == 0 {
            return Err("login.success_timeout_secs must be positive".to_string());
        }
        for step in &self.steps {
            if let LoginStep::Pause { min_ms, max_ms } = step {
                if min_ms > max_ms {
                    return Err(format!("pause step min_ms {min_ms} exceeds max_ms {max_ms}"));
                }
            }
        }
        let types_password = self.steps.iter().any(|step| {
            matches!(
                step,
                LoginStep::Type {
                    field: CredentialField::Password,
                    ..
                }
            )
        });
        if !types_password {
            return Err("login never types the password".to_string());
        }
        Ok(())
    }
}

/// Which credential a `type` step enters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialField {
    Username,
    Password,
}

/// One login action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum LoginStep {
    /// Load a page
    Navigate { url: String },
    /// Type a credential into a field
    Type {
        selector: String,
        field: CredentialField,
    },
    /// Click a control
    Click { selector: String },
    /// Idle for a random while
    Pause { min_ms: u64, max_ms: u64 },
}

/// How to recover a link when no link element matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkFallback {
    /// Drop the item
    #[default]
    None,
    /// Use the current page URL
    Page,
    /// Use the author's profile URL
    Profile,
}

/// Recipe for turning DOM items into candidate posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSpec {
    /// Matches one element per candidate item
    pub item_selector: String,

    /// Optional heading prepended to the content
    #[serde(default)]
    pub title_selector: Option<String>,

    /// Body text; the first match wins
    #[serde(default)]
    pub content_selectors: Vec<String>,

    /// Post permalink; the first match wins (nearest anchor is followed)
    #[serde(default)]
    pub link_selectors: Vec<String>,

    /// Only accept links whose URL contains this fragment
    #[serde(default)]
    pub link_contains: Option<String>,

    /// What to use when no link matched
    #[serde(default)]
    pub link_fallback: LinkFallback,

    /// Appended to fallback links (e.g. `#comments`)
    #[serde(default)]
    pub link_fragment: Option<String>,

    /// Drop `?query` from post and profile links
    #[serde(default)]
    pub strip_query: bool,

    /// Author profile link; the first match wins
    #[serde(default)]
    pub profile_selectors: Vec<String>,

    /// Cut the profile URL at this marker (e.g. `/posts/`)
    #[serde(default)]
    pub profile_truncate_at: Option<String>,

    /// Presence of any of these marks the item as promoted
    #[serde(default)]
    pub promoted_selectors: Vec<String>,

    /// When set, a promoted selector only counts if its text contains this label
    #[serde(default)]
    pub promoted_label: Option<String>,

    /// Case-insensitive content markers of promotional posts
    #[serde(default)]
    pub promotional_markers: Vec<String>,

    /// Content starting with any of these is skipped (e.g. retweets)
    #[serde(default)]
    pub skip_prefixes: Vec<String>,

    /// Trailing UI text trimmed from content (case-insensitive)
    #[serde(default)]
    pub strip_suffixes: Vec<String>,

    /// Only look at the first N items on the page
    #[serde(default)]
    pub max_items: Option<usize>,

    /// Kind recorded on posts from this recipe
    #[serde(default)]
    pub kind: PostKind,
}

/// One page to crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Page URL
    pub url: String,

    /// Name of the extraction recipe to apply
    pub extraction: String,

    /// Number of extract-and-scroll iterations
    #[serde(default = "default_scroll_budget")]
    pub scroll_budget: u32,

    /// Settle delay override, lower bound
    #[serde(default)]
    pub settle_min_ms: Option<u64>,

    /// Settle delay override, upper bound
    #[serde(default)]
    pub settle_max_ms: Option<u64>,

    /// Skip the source unless this selector attaches after loading
    #[serde(default)]
    pub wait_for: Option<String>,

    /// Viewport heights per scroll; the scanning config value when unset
    #[serde(default)]
    pub scroll_viewports: Option<f64>,

    /// Treat `url` as a listing and collect from the pages it links to
    #[serde(default)]
    pub follow: Option<FollowSpec>,
}

fn default_scroll_budget() -> u32 {
    5
}

/// Links to open from a listing page.
///
/// When a source carries one, its extraction, `wait_for`, scroll budget
/// and settle range apply to each followed page rather than the listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowSpec {
    /// Anchors whose `href` is followed, in document order
    pub selector: String,

    /// Follow at most this many distinct links
    #[serde(default = "default_follow_limit")]
    pub limit: usize,

    /// Pause between followed pages, lower bound
    #[serde(default = "default_follow_delay_min_ms")]
    pub delay_min_ms: u64,

    /// Pause between followed pages, upper bound
    #[serde(default = "default_follow_delay_max_ms")]
    pub delay_max_ms: u64,
}

fn default_follow_limit() -> usize {
    3
}

fn default_follow_delay_min_ms() -> u64 {
    15_000
}

fn default_follow_delay_max_ms() -> u64 {
    25_000
}

impl FollowSpec {
    /// Pause taken before each followed page after the first.
    #[must_use]
    pub fn delay(&self) -> DelayRange {
        DelayRange::new(self.delay_min_ms, self.delay_max_ms)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.selector.trim().is_empty() {
            return Err("follow selector cannot be empty".to_string());
        }
        if !FOLLOW_LIMIT_RANGE.contains(&self.limit) {
            return Err(format!("follow limit must be 1-10, got {}", self.limit));
        }
        if self.delay_min_ms > self.delay_max_ms {
            return Err(format!(
                "follow delay_min_ms {} exceeds delay_max_ms {}",
                self.delay_min_ms, self.delay_max_ms
            ));
        }
        Ok(())
    }
}

impl SourceSpec {
    /// Settle delay for this source, falling back to `default` per bound.
    #[must_use]
    pub fn settle_range(&self, default: DelayRange) -> DelayRange {
        DelayRange::new(
            self.settle_min_ms.unwrap_or(default.min_ms),
            self.settle_max_ms.unwrap_or(default.max_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REDDIT_TOML: &str = r##"
[platform]
id = "reddit"
name = "Reddit"
login_url = "https://www.reddit.com/login"
home_url = "https://www.reddit.com"

[login]
success_selector = '[data-testid="user-menu-button"]'
failure_selectors = [".AnimatedForm__errorMessage"]
steps = [
  { action = "navigate", url = "https://www.reddit.com/login" },
  { action = "type", selector = "#loginUsername", field = "username" },
  { action = "type", selector = "#loginPassword", field = "password" },
  { action = "click", selector = ".AnimatedForm__submitButton" },
]

[extractions.posts]
item_selector = '[data-testid="post-container"]'
title_selector = 'h3[slot="title"]'
content_selectors = ['[data-testid="post-content"] div[slot="text-body"]']
link_selectors = ['a[data-click-id="body"]']
promoted_selectors = ['[data-testid="promoted-label"]']
promotional_markers = ["promoted"]

[[sources]]
url = "https://www.reddit.com/r/smallbusiness/new"
extraction = "posts"
scroll_budget = 5
settle_min_ms = 4000
"##;

    fn parse(toml_str: &str) -> PlatformDefinition {
        toml::from_str(toml_str).expect("parse definition")
    }

    #[test]
    fn test_parse_and_validate() {
        let def = parse(REDDIT_TOML);
        def.validate("reddit.toml").expect("valid definition");

        assert_eq!(def.id(), Platform::Reddit);
        assert_eq!(def.login.success_timeout_secs, 15);
        assert_eq!(def.login.steps.len(), 4);
        assert_eq!(
            def.login.steps[1],
            LoginStep::Type {
                selector: "#loginUsername".to_string(),
                field: CredentialField::Username,
            }
        );

        let extraction = def.extraction("posts").expect("posts extraction");
        assert_eq!(extraction.kind, PostKind::Post);
        assert_eq!(extraction.link_fallback, LinkFallback::None);
    }

    #[test]
    fn test_settle_range_override() {
        let def = parse(REDDIT_TOML);
        let range = def.sources[0].settle_range(DelayRange::new(3000, 7000));
        assert_eq!(range, DelayRange::new(4000, 7000));
    }

    #[test]
    fn test_unknown_extraction_rejected() {
        let mut def = parse(REDDIT_TOML);
        def.sources[0].extraction = "comments".to_string();
        let err = def.validate("reddit.toml").unwrap_err();
        assert!(err.to_string().contains("unknown extraction"));
    }

    #[test]
    fn test_scroll_budget_bounds() {
        let mut def = parse(REDDIT_TOML);
        def.sources[0].scroll_budget = 0;
        assert!(def.validate("reddit.toml").is_err());
        def.sources[0].scroll_budget = 21;
        assert!(def.validate("reddit.toml").is_err());
        def.sources[0].scroll_budget = 20;
        assert!(def.validate("reddit.toml").is_ok());
    }

    #[test]
    fn test_login_without_password_rejected() {
        let mut def = parse(REDDIT_TOML);
        def.login
            .steps
            .retain(|s| !matches!(s, LoginStep::Type { field: CredentialField::Password, .. }));
        let err = def.validate("reddit.toml").unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_non_http_source_rejected() {
        let mut def = parse(REDDIT_TOML);
        def.sources[0].url = "file:///etc/passwd".to_string();
        assert!(def.validate("reddit.toml").is_err());
    }

    #[test]
    fn test_follow_defaults_and_bounds() {
        let mut def = parse(&format!(
            "{REDDIT_TOML}\n[sources.follow]\nselector = \"a.thread\"\n"
        ));
        def.validate("reddit.toml").expect("valid definition");

        let follow = def.sources[0].follow.clone().expect("follow");
        assert_eq!(follow.limit, 3);
        assert_eq!(follow.delay(), DelayRange::new(15_000, 25_000));

        def.sources[0].follow = Some(FollowSpec { limit: 0, ..follow.clone() });
        let err = def.validate("reddit.toml").unwrap_err();
        assert!(err.to_string().contains("follow limit"));

        def.sources[0].follow = Some(FollowSpec {
            delay_min_ms: 30_000,
            ..follow.clone()
        });
        assert!(def.validate("reddit.toml").is_err());

        def.sources[0].follow = Some(FollowSpec {
            selector: " ".to_string(),
            ..follow
        });
        assert!(def.validate("reddit.toml").is_err());
    }
}
