use crate::http::{check_status, send_error};
use crate::parse::parse_generated;
use crate::prompts::{system_prompt, user_prompt};
use crate::{ContentGenerator, GeneratedContent, GenerationRequest};
use async_trait::async_trait;
use outreach_core::{CoreError, GenerationConfig, LlmError};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "claude";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Anthropic Messages API provider.
pub struct ClaudeGenerator {
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    system: String,
    http: reqwest::Client,
}

impl ClaudeGenerator {
    pub fn new(api_key: &str, config: &GenerationConfig) -> Result<Self, CoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key: api_key.to_string(),
            model: config.claude_model.clone(),
            max_tokens: config.max_tokens,
            base_url: config.anthropic_base_url.trim_end_matches('/').to_string(),
            system: system_prompt(&config.product_name, &config.product_url),
            http,
        })
    }

    fn headers(&self) -> Result<HeaderMap, CoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key).map_err(|_| {
            CoreError::Llm(LlmError::InvalidApiKey {
                provider: PROVIDER.to_string(),
            })
        })?;
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl ContentGenerator for ClaudeGenerator {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent, CoreError> {
        let url = format!("{}/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: self.system.clone(),
            messages: vec![WireMessage {
                role: "user",
                content: user_prompt(request),
            }],
        };

        debug!(model = %self.model, content_type = %request.content_type, "Claude request");
        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(PROVIDER, e))?;
        let response = check_status(PROVIDER, &self.model, response).await?;

        let parsed: MessagesResponse = response.json().await.map_err(|_| {
            CoreError::Llm(LlmError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
            })
        })?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        Ok(parse_generated(&text, &request.topic, PROVIDER)?)
    }
}
