use lookout_browser::BrowserError;
use lookout_core::{LookoutError, Platform};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a login attempt did not produce a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginFailure {
    /// The platform refused the credentials, or none were configured
    CredentialsRejected,
    /// 2FA, CAPTCHA or another challenge needs a human
    VerificationRequired,
    /// Neither success nor a known failure appeared in time
    Timeout,
}

impl LoginFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CredentialsRejected => "credentials_rejected",
            Self::VerificationRequired => "verification_required",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for LoginFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    /// No usable browser context. Aborts the whole run.
    #[error("browser unavailable: {0}")]
    Init(String),

    #[error("login to {platform} failed ({failure}): {detail}")]
    Login {
        platform: Platform,
        failure: LoginFailure,
        detail: String,
    },

    #[error("Browser error: {0}")]
    Browser(BrowserError),

    #[error("invalid platform definition in {path}: {reason}")]
    Definition { path: String, reason: String },

    #[error("platform definition not found: {platform}")]
    DefinitionNotFound { platform: String },

    #[error("platform definitions directory not found at {path}")]
    DirectoryNotFound { path: String },

    #[error("intent pipeline failed: {0}")]
    Intent(#[source] LookoutError),

    #[error("lead sink failed: {0}")]
    Sink(#[source] LookoutError),

    #[error("skipped: rate limit detected on {platform}")]
    RateLimitDetected { platform: Platform },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub fn login(platform: Platform, failure: LoginFailure, detail: impl Into<String>) -> Self {
        Self::Login {
            platform,
            failure,
            detail: detail.into(),
        }
    }

    /// Short form recorded in a platform's scan result.
    ///
    /// Login failures collapse to their reason so callers can match on it.
    pub fn summary(&self) -> String {
        match self {
            Self::Login { failure, .. } => failure.to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_init(&self) -> bool {
        matches!(self, Self::Init(_))
    }
}

impl From<BrowserError> for ScanError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Init(msg) => Self::Init(msg),
            other => Self::Browser(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
