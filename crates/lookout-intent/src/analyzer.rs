//! The LLM-backed [`IntentPipeline`].

use crate::error::{IntentError, Result};
use crate::prompt::{intent_prompt, response_prompt, FALLBACK_RESPONSE};
use crate::provider::{CompletionRequest, LlmProvider};
use crate::providers::{GeminiProvider, OpenAiProvider};
use crate::verdict::parse_verdict;
use async_trait::async_trait;
use lookout_core::{IntentAssessment, IntentPipeline, LlmConfig, Post};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Scores posts for buyer intent and drafts replies for the ones that pass.
pub struct IntentAnalyzer {
    provider: Arc<dyn LlmProvider>,
    threshold: f32,
    temperature: f32,
    max_tokens: u32,
    business_context: String,
}

impl IntentAnalyzer {
    /// Create an analyzer over an existing provider.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            threshold: config.intent_threshold,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            business_context: config.business_context.clone(),
        }
    }

    /// Build the provider named in `config.provider`, reading its API key
    /// from the environment.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let model = config.model.as_deref();
        let provider: Arc<dyn LlmProvider> = match config.provider.trim().to_ascii_lowercase().as_str() {
            "openai" => Arc::new(OpenAiProvider::from_env(model)?),
            "gemini" => Arc::new(GeminiProvider::from_env(model)?),
            other => return Err(IntentError::UnknownProvider(other.to_string())),
        };

        info!(
            provider = provider.provider_id(),
            model = provider.model(),
            threshold = config.intent_threshold,
            "Intent analyzer initialized"
        );
        Ok(Self::new(provider, config))
    }

    /// Confidence a verdict needs to count as high intent.
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    fn request(&self, prompt: String) -> CompletionRequest {
        CompletionRequest::new(prompt)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }

    /// Ask the model for a verdict and apply the threshold.
    pub async fn try_analyze(&self, content: &str) -> Result<IntentAssessment> {
        let response = self.provider.complete(self.request(intent_prompt(content))).await?;
        let verdict = parse_verdict(&response.content)?;
        debug!(keywords = ?verdict.keywords, "Verdict keywords");
        Ok(verdict.into_assessment(self.threshold))
    }

    /// Like [`Self::try_analyze`], but any failure reads as "not high intent".
    pub async fn analyze(&self, content: &str) -> IntentAssessment {
        match self.try_analyze(content).await {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!("Failed to analyze buyer intent: {}", e);
                IntentAssessment::rejected("Analysis failed")
            }
        }
    }

    /// Draft a reply; falls back to a fixed message on any failure.
    pub async fn generate_response(&self, content: &str, assessment: &IntentAssessment) -> String {
        let prompt = response_prompt(content, assessment, &self.business_context);
        match self.provider.complete(self.request(prompt)).await {
            Ok(response) if !response.content.trim().is_empty() => response.content.trim().to_string(),
            Ok(_) => {
                warn!("Empty response from model, using fallback reply");
                FALLBACK_RESPONSE.to_string()
            }
            Err(e) => {
                warn!("Failed to generate response: {}", e);
                FALLBACK_RESPONSE.to_string()
            }
        }
    }
}

#[async_trait]
impl IntentPipeline for IntentAnalyzer {
    async fn assess(&self, post: &Post) -> lookout_core::Result<IntentAssessment> {
        let mut assessment = self.analyze(post.content()).await;

        debug!(
            platform = %post.platform(),
            high_intent = assessment.high_intent,
            level = %assessment.intent_level,
            confidence = assessment.confidence,
            "Post assessed"
        );

        if assessment.high_intent {
            let reply = self.generate_response(post.content(), &assessment).await;
            assessment.response = Some(reply);
        }
        Ok(assessment)
    }
}
