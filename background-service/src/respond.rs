use llm_interface::{ContentType, GenerationChain, GenerationRequest};
use outreach_core::Opportunity;
use std::sync::Arc;
use tracing::{debug, warn};

/// Body used if even the template renders blank.
const PLACEHOLDER_RESPONSE: &str = "Response pending: generation unavailable for this post.";

/// Produces the suggested reply for an opportunity through the generation
/// chain. Always yields non-empty text.
#[derive(Clone)]
pub struct ResponseDispatcher {
    chain: Arc<GenerationChain>,
    audience: String,
}

impl ResponseDispatcher {
    pub fn new(chain: Arc<GenerationChain>, audience: impl Into<String>) -> Self {
        Self {
            chain,
            audience: audience.into(),
        }
    }

    pub fn chain(&self) -> &GenerationChain {
        &self.chain
    }

    pub fn request_for(&self, opportunity: &Opportunity, keywords: &[String]) -> GenerationRequest {
        let post = &opportunity.post;
        GenerationRequest {
            content_type: ContentType::RedditResponse,
            topic: post.title.clone(),
            keywords: keywords.to_vec(),
            audience: self.audience.clone(),
            context: format!(
                "Posted in {} by {}.\n\n{}",
                post.origin,
                post.author,
                post.body.trim()
            ),
        }
    }

    /// Returns the reply text and whether the template fallback produced it.
    pub async fn respond(&self, opportunity: &Opportunity, keywords: &[String]) -> (String, bool) {
        let request = self.request_for(opportunity, keywords);
        let outcome = self.chain.generate(&request).await;

        if outcome.fell_back {
            warn!(post_id = %opportunity.id(), "All generation providers failed, using template response");
        } else {
            debug!(post_id = %opportunity.id(), provider = %outcome.provider, "Generated response");
        }

        let body = outcome.content.body.trim();
        if body.is_empty() {
            return (PLACEHOLDER_RESPONSE.to_string(), true);
        }
        (body.to_string(), outcome.fell_back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use llm_interface::{ContentGenerator, GeneratedContent, TemplateGenerator};
    use outreach_core::{CoreError, LlmError, RawPost};
    use std::collections::BTreeSet;
    use std::time::Duration;

    struct Broken;

    #[async_trait]
    impl ContentGenerator for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedContent, CoreError> {
            Err(LlmError::ServiceUnavailable {
                provider: "broken".to_string(),
            }
            .into())
        }
    }

    struct Blank;

    #[async_trait]
    impl ContentGenerator for Blank {
        fn name(&self) -> &str {
            "blank"
        }

        async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedContent, CoreError> {
            Ok(GeneratedContent {
                title: String::new(),
                body: String::new(),
            })
        }
    }

    fn opportunity() -> Opportunity {
        let post = RawPost {
            id: "abc123".to_string(),
            title: "Best API for Solana wallet data".to_string(),
            body: "Which API do you use?".to_string(),
            origin: "solana".to_string(),
            author: "dev".to_string(),
            score: 15,
            num_comments: 4,
            created_at: Utc::now(),
            permalink: "https://www.reddit.com/r/solana/comments/abc123/".to_string(),
        };
        Opportunity::new(post, BTreeSet::from(["wallet api".to_string()]), 61)
    }

    fn dispatcher(providers: Vec<Arc<dyn ContentGenerator>>) -> ResponseDispatcher {
        let chain = GenerationChain::new(
            providers,
            TemplateGenerator::new("Acme Data", "https://acme.dev"),
            Duration::from_millis(200),
        );
        ResponseDispatcher::new(Arc::new(chain), "crypto developers")
    }

    #[tokio::test]
    async fn test_failing_and_blank_providers_still_yield_text() {
        let dispatcher = dispatcher(vec![Arc::new(Broken), Arc::new(Blank)]);
        let (response, fell_back) = dispatcher
            .respond(&opportunity(), &["wallet api".to_string()])
            .await;
        assert!(fell_back);
        assert!(!response.trim().is_empty());
    }

    #[test]
    fn test_request_shape() {
        let dispatcher = dispatcher(Vec::new());
        let request = dispatcher.request_for(&opportunity(), &["wallet api".to_string()]);
        assert_eq!(request.content_type, ContentType::RedditResponse);
        assert_eq!(request.topic, "Best API for Solana wallet data");
        assert_eq!(request.audience, "crypto developers");
        assert!(request.context.contains("Which API do you use?"));
    }
}
