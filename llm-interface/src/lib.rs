//! Text generation for opportunity responses, blog posts and social posts.
//!
//! Providers implement [`ContentGenerator`]. [`GenerationChain`] tries them in
//! order and finishes with [`TemplateGenerator`], which cannot fail.

pub mod chain;
pub mod claude;
mod http;
pub mod openai;
pub mod parse;
pub mod prompts;
pub mod template;

use async_trait::async_trait;
use outreach_core::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use chain::{GenerationChain, GenerationOutcome};
pub use claude::ClaudeGenerator;
pub use openai::OpenAiGenerator;
pub use template::TemplateGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    RedditResponse,
    BlogPost,
    SocialPost,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentType::RedditResponse => "reddit_response",
            ContentType::BlogPost => "blog_post",
            ContentType::SocialPost => "social_post",
        };
        f.write_str(name)
    }
}

/// The fixed request shape every provider receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub content_type: ContentType,
    pub topic: String,
    pub keywords: Vec<String>,
    pub audience: String,
    /// Free text: the post being answered, or the blog post being promoted.
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub title: String,
    pub body: String,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent, CoreError>;
}
