//! Lookout Intent - buyer-intent scoring over hosted language models.
//!
//! [`IntentAnalyzer`] implements the scan engine's
//! [`lookout_core::IntentPipeline`]: it asks a provider for a JSON verdict,
//! applies the configured confidence threshold, and drafts a short reply
//! for posts that pass.
//!
//! # Example
//!
//! ```rust,no_run
//! use lookout_core::LlmConfig;
//! use lookout_intent::IntentAnalyzer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads OPENAI_API_KEY from the environment
//! let analyzer = IntentAnalyzer::from_config(&LlmConfig::default())?;
//! let assessment = analyzer
//!     .analyze("Budget approved for new marketing software, need recommendations")
//!     .await;
//! println!("high intent: {}", assessment.high_intent);
//! # Ok(())
//! # }
//! ```
//!
//! Failures never reject a scan: an unusable verdict reads as "not high
//! intent" and a failed reply falls back to [`prompt::FALLBACK_RESPONSE`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod analyzer;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod verdict;

// Re-export commonly used types
pub use analyzer::IntentAnalyzer;
pub use error::{IntentError, Result};
pub use provider::{CompletionRequest, CompletionResponse, LlmProvider};
pub use providers::{GeminiProvider, OpenAiProvider};
pub use verdict::{parse_verdict, Verdict};
