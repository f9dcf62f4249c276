//! Contracts of the collaborators the scan engine hands posts to.
//!
//! The orchestrator treats the intent pipeline as an opaque gate and the
//! lead sink as an append-only log. Both are traits so the engine can be
//! exercised with in-memory fakes and wired to real backends in the binary.

use crate::error::{LookoutError, Result};
use crate::types::{Platform, Post};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How strongly a post expresses buying intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentLevel {
    /// Passing interest
    #[default]
    Mild,
    /// Clear need, no urgency
    Moderate,
    /// Active search, budget or timeline mentioned
    Strong,
    /// Urgent need
    Desperate,
}

impl IntentLevel {
    /// Lowercase identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
            Self::Desperate => "desperate",
        }
    }
}

impl fmt::Display for IntentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentLevel {
    type Err = LookoutError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mild" => Ok(Self::Mild),
            "moderate" => Ok(Self::Moderate),
            "strong" => Ok(Self::Strong),
            "desperate" => Ok(Self::Desperate),
            other => Err(LookoutError::Validation(format!(
                "unknown intent level '{other}'"
            ))),
        }
    }
}

/// Verdict returned by an [`IntentPipeline`] for one post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentAssessment {
    /// Whether the post passed the gate (already thresholded)
    pub high_intent: bool,
    /// Intent strength
    pub intent_level: IntentLevel,
    /// Classifier confidence in `[0, 1]`
    pub confidence: f32,
    /// Free-text explanation
    pub reasoning: String,
    /// Generated reply, present only when `high_intent`
    pub response: Option<String>,
}

impl IntentAssessment {
    /// A verdict that rejects the post.
    #[must_use]
    pub fn rejected(reasoning: impl Into<String>) -> Self {
        Self {
            high_intent: false,
            intent_level: IntentLevel::Mild,
            confidence: 0.0,
            reasoning: reasoning.into(),
            response: None,
        }
    }
}

/// Scores posts for buyer intent.
#[async_trait]
pub trait IntentPipeline: Send + Sync {
    /// Assess one post; a returned error means "could not assess", not "rejected".
    async fn assess(&self, post: &Post) -> Result<IntentAssessment>;
}

/// One accepted post, as handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    /// Platform the post came from
    pub platform: Platform,
    /// Canonical post URL
    pub post_link: String,
    /// Author profile URL (may be empty)
    pub profile_link: String,
    /// Sanitised post text
    pub content: String,
    /// Intent strength
    pub intent_level: IntentLevel,
    /// Classifier confidence
    pub confidence: f32,
    /// Generated reply
    pub response: String,
    /// When the lead was accepted
    pub timestamp: DateTime<Utc>,
}

impl LeadRecord {
    /// Build a record from an accepted post and its assessment.
    #[must_use]
    pub fn from_assessment(post: &Post, assessment: &IntentAssessment) -> Self {
        Self {
            platform: post.platform(),
            post_link: post.link().to_string(),
            profile_link: post.profile_link().to_string(),
            content: post.content().to_string(),
            intent_level: assessment.intent_level,
            confidence: assessment.confidence,
            response: assessment.response.clone().unwrap_or_default(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only destination for accepted posts.
#[async_trait]
pub trait LeadSink: Send + Sync {
    /// Persist one record.
    async fn append(&self, record: LeadRecord) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PostKind;

    #[test]
    fn test_intent_level_ordering() {
        assert!(IntentLevel::Desperate > IntentLevel::Strong);
        assert!(IntentLevel::Moderate > IntentLevel::Mild);
    }

    #[test]
    fn test_intent_level_serde() {
        let level: IntentLevel = serde_json::from_str("\"strong\"").unwrap();
        assert_eq!(level, IntentLevel::Strong);
        assert_eq!("Desperate".parse::<IntentLevel>().unwrap(), IntentLevel::Desperate);
        assert!("lukewarm".parse::<IntentLevel>().is_err());
    }

    #[test]
    fn test_lead_record_from_assessment() {
        let post = Post::new(
            "Budget approved for new marketing software",
            "https://www.linkedin.com/feed/update/urn:li:activity:1",
            "https://www.linkedin.com/in/someone",
            Platform::LinkedIn,
            PostKind::Post,
            10,
        )
        .unwrap();
        let assessment = IntentAssessment {
            high_intent: true,
            intent_level: IntentLevel::Strong,
            confidence: 0.9,
            reasoning: "budget mentioned".to_string(),
            response: Some("Happy to share what worked for us.".to_string()),
        };

        let record = LeadRecord::from_assessment(&post, &assessment);
        assert_eq!(record.platform, Platform::LinkedIn);
        assert_eq!(record.post_link, post.link());
        assert_eq!(record.intent_level, IntentLevel::Strong);
        assert_eq!(record.response, "Happy to share what worked for us.");
    }

    #[test]
    fn test_rejected_assessment() {
        let a = IntentAssessment::rejected("analysis failed");
        assert!(!a.high_intent);
        assert!(a.response.is_none());
    }
}
