//! Shared types used across the lookout workspace.
//!
//! This module defines the platform and post vocabulary the scan engine
//! speaks, plus the credential holder adapters log in with.

use crate::error::LookoutError;
use crate::text::sanitize_text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Social platforms the scan engine knows how to visit.
///
/// The declaration order is the default scan sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// facebook.com groups and feed
    Facebook,
    /// linkedin.com feed and groups
    LinkedIn,
    /// x.com / twitter.com timeline and search
    Twitter,
    /// reddit.com subreddits and front page
    Reddit,
    /// youtube.com comments and community posts
    YouTube,
}

impl Platform {
    /// All platforms in default scan order.
    pub const ALL: [Platform; 5] = [
        Self::Facebook,
        Self::LinkedIn,
        Self::Twitter,
        Self::Reddit,
        Self::YouTube,
    ];

    /// Stable lowercase identifier, also used in definition file names.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::LinkedIn => "linkedin",
            Self::Twitter => "twitter",
            Self::Reddit => "reddit",
            Self::YouTube => "youtube",
        }
    }

    /// Human-readable platform name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Facebook => "Facebook",
            Self::LinkedIn => "LinkedIn",
            Self::Twitter => "Twitter",
            Self::Reddit => "Reddit",
            Self::YouTube => "YouTube",
        }
    }

    /// Prefix of the environment variables holding this platform's credentials.
    #[must_use]
    pub fn env_prefix(&self) -> String {
        format!("LOOKOUT_{}", self.as_str().to_uppercase())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = LookoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LookoutError::Validation(format!("unknown platform '{s}'")))
    }
}

/// What kind of item a post was scraped from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    /// Top-level feed or group post
    #[default]
    Post,
    /// Reply under a post or video
    Comment,
    /// Channel community post
    CommunityPost,
}

impl PostKind {
    /// Stable snake-case identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::CommunityPost => "community_post",
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostKind {
    type Err = LookoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "post" => Ok(Self::Post),
            "comment" => Ok(Self::Comment),
            "community_post" => Ok(Self::CommunityPost),
            other => Err(LookoutError::Validation(format!(
                "unknown post kind '{other}'"
            ))),
        }
    }
}

/// A candidate post discovered on a platform.
///
/// Posts are immutable once built; `link` is the identity key used for
/// deduplication within a collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    content: String,
    link: String,
    profile_link: String,
    platform: Platform,
    kind: PostKind,
}

impl Post {
    /// Build a validated post.
    ///
    /// Content is sanitised first and must keep at least `min_content_len`
    /// characters. `link` must be an absolute http(s) URL; `profile_link`
    /// may be empty.
    ///
    /// # Errors
    /// Returns `LookoutError::Validation` if the content is too short or
    /// either link is malformed.
    pub fn new(
        content: &str,
        link: &str,
        profile_link: &str,
        platform: Platform,
        kind: PostKind,
        min_content_len: usize,
    ) -> Result<Self, LookoutError> {
        let content = sanitize_text(content);
        let length = content.chars().count();
        if length < min_content_len {
            return Err(LookoutError::Validation(format!(
                "content must be at least {min_content_len} characters, got {length}"
            )));
        }

        let link = validate_link(link)?;
        let profile_link = if profile_link.trim().is_empty() {
            String::new()
        } else {
            validate_link(profile_link)?
        };

        Ok(Self {
            content,
            link,
            profile_link,
            platform,
            kind,
        })
    }

    /// Sanitised post text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Canonical post URL (identity key).
    #[must_use]
    pub fn link(&self) -> &str {
        &self.link
    }

    /// Author profile URL, empty when the page did not expose one.
    #[must_use]
    pub fn profile_link(&self) -> &str {
        &self.profile_link
    }

    /// Platform the post was found on.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Kind of item the post was scraped from.
    #[must_use]
    pub fn kind(&self) -> PostKind {
        self.kind
    }
}

fn validate_link(raw: &str) -> Result<String, LookoutError> {
    let trimmed = raw.trim();
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| LookoutError::Validation(format!("invalid link '{trimmed}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        scheme => Err(LookoutError::Validation(format!(
            "invalid link '{trimmed}': unsupported scheme {scheme}"
        ))),
    }
}

/// Login credentials for one platform account.
///
/// `Debug` redacts the password so credentials can sit inside structs that
/// are logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username or email typed into the login form
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create credentials from owned strings.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read `LOOKOUT_<PLATFORM>_USERNAME` / `LOOKOUT_<PLATFORM>_PASSWORD`.
    ///
    /// Returns `None` when either variable is missing or empty.
    #[must_use]
    pub fn from_env(platform: Platform) -> Option<Self> {
        let prefix = platform.env_prefix();
        let username = std::env::var(format!("{prefix}_USERNAME")).ok()?;
        let password = std::env::var(format!("{prefix}_PASSWORD")).ok()?;

        if username.is_empty() || password.is_empty() {
            return None;
        }

        Some(Self { username, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
