//! Parsing of the model's JSON verdict.
//!
//! Models wrap JSON in code fences or chatter more often than not, so the
//! parser looks for the object rather than expecting a clean document.

use crate::error::{IntentError, Result};
use lookout_core::{IntentAssessment, IntentLevel};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("valid fenced JSON regex")
});

/// Raw verdict as returned by the model.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Verdict {
    /// The model's own high-intent call, before thresholding
    pub has_high_intent: bool,
    /// Intent strength as written by the model
    pub intent_level: Option<String>,
    /// Explanation
    pub reasoning: String,
    /// Keywords that drove the decision
    pub keywords: Vec<String>,
    /// Confidence; numbers and numeric strings are accepted
    pub confidence: Value,
}

impl Verdict {
    /// Intent level, `mild` when missing or unrecognised.
    #[must_use]
    pub fn level(&self) -> IntentLevel {
        self.intent_level
            .as_deref()
            .and_then(|level| level.parse().ok())
            .unwrap_or_default()
    }

    /// Confidence clamped to `[0, 1]`; anything unreadable is 0.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn confidence(&self) -> f32 {
        let raw = match &self.confidence {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        };
        if raw.is_nan() {
            return 0.0;
        }
        raw.clamp(0.0, 1.0) as f32
    }

    /// Apply the confidence gate: high intent needs both the model's call
    /// and a confidence at or above `threshold`.
    #[must_use]
    pub fn into_assessment(self, threshold: f32) -> IntentAssessment {
        let confidence = self.confidence();
        IntentAssessment {
            high_intent: self.has_high_intent && confidence >= threshold,
            intent_level: self.level(),
            confidence,
            reasoning: self.reasoning,
            response: None,
        }
    }
}

/// Extract and decode the verdict object from a model reply.
pub fn parse_verdict(text: &str) -> Result<Verdict> {
    let json = FENCED_JSON
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .or_else(|| {
            let start = text.find('{')?;
            let end = text.rfind('}')?;
            (start < end).then(|| &text[start..=end])
        })
        .ok_or_else(|| IntentError::InvalidVerdict(format!("no JSON object in reply: {}", preview(text))))?;

    serde_json::from_str(json).map_err(|e| IntentError::InvalidVerdict(e.to_string()))
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}
