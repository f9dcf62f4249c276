//! Prompt templates.

use lookout_core::IntentAssessment;

/// Reply used when response generation fails.
pub const FALLBACK_RESPONSE: &str = "I understand your situation and would be happy to help. \
Feel free to reach out if you need any advice.";

/// Prompt asking the model for a JSON buyer-intent verdict on `content`.
#[must_use]
pub fn intent_prompt(content: &str) -> String {
    format!(
        r#"Analyze the following social media post or comment for buyer intent. Look for genuine expressions of need, frustration with a current solution, budget mentions, timeline urgency, or requests for recommendations.

GENUINE HIGH INTENT examples:
- "Our website is terrible, we need to hire someone to rebuild it"
- "Looking for a reliable CRM, our current one crashes daily"
- "Budget approved for new marketing software, need recommendations"
- "Urgent: need a web developer by next month for our launch"

FALSE INTENT examples (ignore these):
- "Need a website? Contact our agency today!"
- "Check out our services for all your needs"
- "DM me for quotes"
- Generic promotional content

Post/Comment to analyze:
{content}

Respond with only a JSON object:
{{
  "hasHighIntent": boolean,
  "intentLevel": "mild" | "moderate" | "strong" | "desperate",
  "reasoning": "explanation of your analysis",
  "keywords": ["relevant", "keywords"],
  "confidence": number between 0 and 1
}}"#,
        content = quoted(content)
    )
}

/// Prompt asking for a short, helpful public reply to a high-intent post.
#[must_use]
pub fn response_prompt(content: &str, assessment: &IntentAssessment, business_context: &str) -> String {
    format!(
        r"You are a helpful professional replying to a social media post that shows buyer intent.

Original post: {content}
Intent analysis: {reasoning}
Intent level: {level}

Write a reply that:
1. Acknowledges their specific pain point or need
2. Offers valuable insight or advice, not just promotion
3. Sounds natural and conversational
4. Builds trust before any sales attempt
5. Is brief: 2-3 sentences at most

About my business:
{business_context}

Reply with the response text only.",
        content = quoted(content),
        reasoning = assessment.reasoning,
        level = assessment.intent_level,
        business_context = business_context.trim(),
    )
}

/// JSON-quote user content so stray quotes cannot end the quoted block.
fn quoted(content: &str) -> String {
    serde_json::to_string(content).unwrap_or_else(|_| format!("\"{content}\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_core::IntentLevel;

    #[test]
    fn test_intent_prompt_quotes_content() {
        let prompt = intent_prompt(r#"we "really" need a CRM"#);
        assert!(prompt.contains(r#""we \"really\" need a CRM""#));
        assert!(prompt.contains("\"hasHighIntent\": boolean"));
    }

    #[test]
    fn test_response_prompt_includes_context() {
        let assessment = IntentAssessment {
            high_intent: true,
            intent_level: IntentLevel::Desperate,
            confidence: 0.95,
            reasoning: "launch deadline next month".to_string(),
            response: None,
        };
        let prompt = response_prompt("need a dev by May", &assessment, "  We build Shopify stores.  ");
        assert!(prompt.contains("Intent level: desperate"));
        assert!(prompt.contains("launch deadline next month"));
        assert!(prompt.contains("About my business:\nWe build Shopify stores."));
    }
}
