use crate::http::{check_status, send_error};
use crate::parse::parse_generated;
use crate::prompts::{system_prompt, user_prompt};
use crate::{ContentGenerator, GeneratedContent, GenerationRequest};
use async_trait::async_trait;
use outreach_core::{CoreError, GenerationConfig, LlmError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "openai";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI chat completions provider.
pub struct OpenAiGenerator {
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    system: String,
    http: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(api_key: &str, config: &GenerationConfig) -> Result<Self, CoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key: api_key.to_string(),
            model: config.openai_model.clone(),
            max_tokens: config.max_tokens,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            system: system_prompt(&config.product_name, &config.product_url),
            http,
        })
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent, CoreError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.system.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(request),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(model = %self.model, content_type = %request.content_type, "OpenAI request");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(PROVIDER, e))?;
        let response = check_status(PROVIDER, &self.model, response).await?;

        let parsed: ChatResponse = response.json().await.map_err(|_| {
            CoreError::Llm(LlmError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
            })
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(parse_generated(&text, &request.topic, PROVIDER)?)
    }
}
