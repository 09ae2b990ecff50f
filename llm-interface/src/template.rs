use crate::{ContentGenerator, ContentType, GeneratedContent, GenerationRequest};
use async_trait::async_trait;
use outreach_core::{CoreError, GenerationConfig};

/// Deterministic last resort of the generation chain. Never fails and never
/// returns an empty body.
#[derive(Debug, Clone)]
pub struct TemplateGenerator {
    product_name: String,
    product_url: String,
}

impl TemplateGenerator {
    pub fn new(product_name: impl Into<String>, product_url: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            product_url: product_url.into(),
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.product_name.clone(), config.product_url.clone())
    }

    pub fn render(&self, request: &GenerationRequest) -> GeneratedContent {
        let topic = match request.topic.trim() {
            "" => "your question",
            topic => topic,
        };
        let keywords = if request.keywords.is_empty() {
            "crypto data".to_string()
        } else {
            request.keywords.join(", ")
        };

        match request.content_type {
            ContentType::RedditResponse => GeneratedContent {
                title: format!("Reply: {}", topic),
                body: format!(
                    "Good question. For {keywords}, it usually pays to pick a provider with \
                     consistent multichain coverage and clear rate limits before building on it. \
                     {name} covers this use case and has a free tier to try it out: {url}",
                    name = self.product_name,
                    url = self.product_url,
                ),
            },
            ContentType::BlogPost => GeneratedContent {
                title: topic.to_string(),
                body: format!(
                    "# {topic}\n\nThis guide covers {keywords} for {audience}.\n\n\
                     ## Getting started\n\nSign up for {name} at {url} and create an API key.\n\n\
                     ## Next steps\n\nDraft pending: expand each section with request examples.",
                    audience = request.audience,
                    name = self.product_name,
                    url = self.product_url,
                ),
            },
            ContentType::SocialPost => GeneratedContent {
                title: format!("Social: {}", topic),
                body: format!("New guide: {} {}", topic, self.product_url),
            },
        }
    }
}

#[async_trait]
impl ContentGenerator for TemplateGenerator {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent, CoreError> {
        Ok(self.render(request))
    }
}
