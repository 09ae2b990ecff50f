use crate::error::*;
use std::time::Duration;
use tracing::{error, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;

    /// Missing or rejected credentials. The collaborator that raised it stays
    /// unusable for the rest of the run.
    fn is_credential_error(&self) -> bool {
        false
    }
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!(code = %self.error_code(), "CoreError: {}", self);
        match self {
            CoreError::Source(e) => {
                error!("Source error details: {:?}", e);
            }
            CoreError::Store(e) => {
                error!("Store error details: {:?}", e);
            }
            CoreError::Llm(e) => {
                error!("LLM error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = %self.error_code(), "CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::Source(e) => e.is_retryable(),
            CoreError::Store(e) => e.is_retryable(),
            CoreError::Llm(e) => e.is_retryable(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            CoreError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::Source(e) => e.retry_after(),
            CoreError::Store(e) => e.retry_after(),
            CoreError::Llm(e) => e.retry_after(),
            CoreError::Timeout { seconds } => Some(Duration::from_secs(*seconds)),
            _ if self.is_retryable() => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Source(e) => e.user_friendly_message(),
            CoreError::Store(e) => e.user_friendly_message(),
            CoreError::Llm(e) => e.user_friendly_message(),
            CoreError::Notify(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check connectivity.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            CoreError::Timeout { seconds } => {
                format!("The operation did not complete within {} seconds.", seconds)
            }
            _ => "An unexpected error occurred.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Source(_) => "SOURCE".to_string(),
            CoreError::Store(_) => "STORE".to_string(),
            CoreError::Llm(_) => "LLM".to_string(),
            CoreError::Notify(_) => "NOTIFY".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Timeout { .. } => "TIMEOUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }

    fn is_credential_error(&self) -> bool {
        match self {
            CoreError::Store(e) => e.is_credential_error(),
            CoreError::Llm(e) => e.is_credential_error(),
            CoreError::Config(_) => true,
            _ => false,
        }
    }
}

impl ErrorExt for SourceError {
    fn log_error(&self) -> &Self {
        error!("SourceError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("SourceError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            SourceError::RateLimitExceeded { .. } => true,
            SourceError::RequestTimeout { .. } => true,
            SourceError::ServerError { status_code } => *status_code >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            SourceError::RateLimitExceeded { retry_after, .. } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ if self.is_retryable() => Some(Duration::from_secs(30)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            SourceError::RateLimitExceeded {
                origin,
                retry_after,
            } => format!(
                "Too many requests to {}. Wait {} seconds before trying again.",
                origin, retry_after
            ),
            SourceError::Forbidden { resource } => {
                format!("Access denied to {}.", resource)
            }
            SourceError::OriginNotFound { origin } => {
                format!("Origin '{}' not found or is private.", origin)
            }
            SourceError::RequestTimeout { origin } => {
                format!("Request to {} timed out.", origin)
            }
            _ => "Content source error occurred.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            SourceError::RateLimitExceeded { .. } => "SOURCE_RATE_LIMIT".to_string(),
            SourceError::Forbidden { .. } => "SOURCE_FORBIDDEN".to_string(),
            SourceError::OriginNotFound { .. } => "SOURCE_ORIGIN_NOT_FOUND".to_string(),
            SourceError::RequestTimeout { .. } => "SOURCE_TIMEOUT".to_string(),
            SourceError::InvalidResponse { .. } => "SOURCE_INVALID_RESPONSE".to_string(),
            SourceError::ServerError { .. } => "SOURCE_SERVER_ERROR".to_string(),
        }
    }
}

impl ErrorExt for StoreError {
    fn log_error(&self) -> &Self {
        error!("StoreError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("StoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::RateLimitExceeded { .. }
                | StoreError::ServerError { .. }
                | StoreError::RequestTimeout
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            StoreError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ if self.is_retryable() => Some(Duration::from_secs(1)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StoreError::NotConfigured { missing } => {
                format!("Document store is disabled: {} is not set.", missing)
            }
            StoreError::AuthenticationFailed { .. } => {
                "Document store rejected the integration token.".to_string()
            }
            StoreError::RateLimitExceeded { retry_after } => format!(
                "Document store is throttling requests. Retry in {} seconds.",
                retry_after
            ),
            StoreError::RecordNotFound { page_id } => {
                format!("Record {} no longer exists in the document store.", page_id)
            }
            _ => "Document store error occurred.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            StoreError::NotConfigured { .. } => "STORE_NOT_CONFIGURED".to_string(),
            StoreError::AuthenticationFailed { .. } => "STORE_AUTH_FAILED".to_string(),
            StoreError::RateLimitExceeded { .. } => "STORE_RATE_LIMIT".to_string(),
            StoreError::RequestRejected { .. } => "STORE_REQUEST_REJECTED".to_string(),
            StoreError::ServerError { .. } => "STORE_SERVER_ERROR".to_string(),
            StoreError::RequestTimeout => "STORE_TIMEOUT".to_string(),
            StoreError::RecordNotFound { .. } => "STORE_RECORD_NOT_FOUND".to_string(),
            StoreError::InvalidResponse { .. } => "STORE_INVALID_RESPONSE".to_string(),
            StoreError::Sql(_) => "STORE_SQL_ERROR".to_string(),
        }
    }

    fn is_credential_error(&self) -> bool {
        matches!(
            self,
            StoreError::NotConfigured { .. } | StoreError::AuthenticationFailed { .. }
        )
    }
}

impl ErrorExt for LlmError {
    fn log_error(&self) -> &Self {
        error!("LlmError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("LlmError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimitExceeded { .. }
                | LlmError::ServiceUnavailable { .. }
                | LlmError::RequestTimeout { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimitExceeded { retry_after, .. } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ if self.is_retryable() => Some(Duration::from_secs(10)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            LlmError::AuthenticationFailed { provider } => format!(
                "Authentication failed for {}. Check the API key.",
                provider
            ),
            LlmError::InvalidApiKey { provider } => {
                format!("Invalid or missing API key for {}.", provider)
            }
            LlmError::RateLimitExceeded {
                provider,
                retry_after,
            } => format!(
                "Rate limit exceeded for {}. Wait {} seconds.",
                provider, retry_after
            ),
            LlmError::ModelNotAvailable { model } => {
                format!("Model '{}' is not available.", model)
            }
            LlmError::ContentFiltered { .. } => {
                "Content was filtered by the provider's safety systems.".to_string()
            }
            LlmError::ServiceUnavailable { provider } => {
                format!("{} is temporarily unavailable.", provider)
            }
            LlmError::EmptyResponse { provider } => {
                format!("{} returned no content.", provider)
            }
            _ => "Text generation error occurred.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            LlmError::AuthenticationFailed { .. } => "LLM_AUTH_FAILED".to_string(),
            LlmError::InvalidApiKey { .. } => "LLM_INVALID_API_KEY".to_string(),
            LlmError::RateLimitExceeded { .. } => "LLM_RATE_LIMIT".to_string(),
            LlmError::ModelNotAvailable { .. } => "LLM_MODEL_NOT_AVAILABLE".to_string(),
            LlmError::ContentFiltered { .. } => "LLM_CONTENT_FILTERED".to_string(),
            LlmError::ServiceUnavailable { .. } => "LLM_SERVICE_UNAVAILABLE".to_string(),
            LlmError::RequestTimeout { .. } => "LLM_TIMEOUT".to_string(),
            LlmError::InsufficientCredits { .. } => "LLM_INSUFFICIENT_CREDITS".to_string(),
            LlmError::EmptyResponse { .. } => "LLM_EMPTY_RESPONSE".to_string(),
            LlmError::InvalidResponseFormat { .. } => "LLM_INVALID_RESPONSE".to_string(),
        }
    }

    fn is_credential_error(&self) -> bool {
        matches!(
            self,
            LlmError::AuthenticationFailed { .. }
                | LlmError::InvalidApiKey { .. }
                | LlmError::InsufficientCredits { .. }
        )
    }
}

impl ErrorExt for NotifyError {
    fn log_error(&self) -> &Self {
        error!("NotifyError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("NotifyError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            NotifyError::WebhookRejected { status_code } => {
                format!("Chat webhook rejected the message ({}).", status_code)
            }
            NotifyError::NotConfigured => "Chat notifications are disabled.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            NotifyError::WebhookRejected { .. } => "NOTIFY_WEBHOOK_REJECTED".to_string(),
            NotifyError::NotConfigured => "NOTIFY_NOT_CONFIGURED".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false // Config errors need operator intervention
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "Environment variable '{}' is required but not set.",
                var_name
            ),
            ConfigError::ValidationFailed { reason } => {
                format!("Configuration is invalid: {}", reason)
            }
            ConfigError::Parse(_) => "Configuration file could not be parsed.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }

    fn is_credential_error(&self) -> bool {
        matches!(self, ConfigError::MissingEnvironmentVariable { .. })
    }
}
