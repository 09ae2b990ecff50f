use crate::{
    ClaudeGenerator, ContentGenerator, GeneratedContent, GenerationRequest, OpenAiGenerator,
    TemplateGenerator,
};
use outreach_core::{
    CoreError, ErrorExt, ErrorRecovery, GenerationConfig, RecoveryStrategy, Stage,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub content: GeneratedContent,
    /// Name of the provider that produced the content.
    pub provider: String,
    pub fell_back: bool,
}

/// Ordered generation providers ending in the static template.
///
/// Each provider call is bounded by a timeout. A provider that fails with a
/// credential error is skipped until the next [`GenerationChain::begin_run`].
pub struct GenerationChain {
    providers: Vec<Arc<dyn ContentGenerator>>,
    template: TemplateGenerator,
    call_timeout: Duration,
    disabled: Mutex<HashSet<String>>,
}

impl GenerationChain {
    pub fn new(
        providers: Vec<Arc<dyn ContentGenerator>>,
        template: TemplateGenerator,
        call_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            template,
            call_timeout,
            disabled: Mutex::new(HashSet::new()),
        }
    }

    /// Claude, then OpenAI, then the template. Providers without an API key
    /// are left out.
    pub fn from_config(config: &GenerationConfig) -> Self {
        let mut providers: Vec<Arc<dyn ContentGenerator>> = Vec::new();

        match config.anthropic_api_key.as_deref() {
            Some(key) => match ClaudeGenerator::new(key, config) {
                Ok(claude) => providers.push(Arc::new(claude)),
                Err(e) => {
                    e.log_error();
                }
            },
            None => info!("ANTHROPIC_API_KEY not set, Claude generation disabled"),
        }

        match config.openai_api_key.as_deref() {
            Some(key) => match OpenAiGenerator::new(key, config) {
                Ok(openai) => providers.push(Arc::new(openai)),
                Err(e) => {
                    e.log_error();
                }
            },
            None => info!("OPENAI_API_KEY not set, OpenAI generation disabled"),
        }

        Self::new(
            providers,
            TemplateGenerator::from_config(config),
            Duration::from_secs(config.timeout_secs.max(1)),
        )
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Re-enable every provider disabled during the previous run.
    pub fn begin_run(&self) {
        self.lock_disabled().clear();
    }

    pub fn is_disabled(&self, provider: &str) -> bool {
        self.lock_disabled().contains(provider)
    }

    pub async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        for provider in &self.providers {
            let name = provider.name();
            if self.is_disabled(name) {
                continue;
            }

            let result = match timeout(self.call_timeout, provider.generate(request)).await {
                Ok(result) => result,
                Err(_) => Err(CoreError::Timeout {
                    seconds: self.call_timeout.as_secs(),
                }),
            };

            match result {
                Ok(content) if !content.body.trim().is_empty() => {
                    return GenerationOutcome {
                        content,
                        provider: name.to_string(),
                        fell_back: false,
                    };
                }
                Ok(_) => {
                    warn!(provider = name, "Provider returned an empty body, trying next");
                }
                Err(error) => {
                    let strategy = ErrorRecovery::determine_strategy(&error, Stage::Generate);
                    warn!(
                        provider = name,
                        code = %error.error_code(),
                        ?strategy,
                        "Generation failed, trying next provider: {}",
                        error
                    );
                    if strategy == RecoveryStrategy::DisableCollaborator {
                        warn!(provider = name, "Disabling provider for the rest of this run");
                        self.lock_disabled().insert(name.to_string());
                    }
                }
            }
        }

        GenerationOutcome {
            content: self.template.render(request),
            provider: "template".to_string(),
            fell_back: true,
        }
    }

    fn lock_disabled(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.disabled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
