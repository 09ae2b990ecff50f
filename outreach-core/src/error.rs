use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Failures talking to a content source (Reddit, HackerNews).
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    #[error("Rate limit exceeded for {origin}. Retry after {retry_after} seconds")]
    RateLimitExceeded { origin: String, retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Origin not found: {origin}")]
    OriginNotFound { origin: String },

    #[error("Request timeout for {origin}")]
    RequestTimeout { origin: String },

    #[error("Invalid source response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },
}

/// Failures of the document store or the seen-post registry backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store not configured: {missing}")]
    NotConfigured { missing: String },

    #[error("Store authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Store rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Store rejected request ({status_code}): {details}")]
    RequestRejected { status_code: u16, details: String },

    #[error("Store server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Store request timeout")]
    RequestTimeout,

    #[error("Record not found: {page_id}")]
    RecordNotFound { page_id: String },

    #[error("Invalid store response: {details}")]
    InvalidResponse { details: String },

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Provider authentication failed: {provider}")]
    AuthenticationFailed { provider: String },

    #[error("API key invalid or missing for {provider}")]
    InvalidApiKey { provider: String },

    #[error("Rate limit exceeded for {provider}. Retry after {retry_after} seconds")]
    RateLimitExceeded { provider: String, retry_after: u64 },

    #[error("Model not available: {model}")]
    ModelNotAvailable { model: String },

    #[error("Content filtered by provider: {reason}")]
    ContentFiltered { reason: String },

    #[error("Provider service unavailable: {provider}")]
    ServiceUnavailable { provider: String },

    #[error("Request timeout for {provider}")]
    RequestTimeout { provider: String },

    #[error("Insufficient credits for {provider}")]
    InsufficientCredits { provider: String },

    #[error("Empty response from {provider}")]
    EmptyResponse { provider: String },

    #[error("Invalid response format from {provider}")]
    InvalidResponseFormat { provider: String },
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Webhook returned {status_code}")]
    WebhookRejected { status_code: u16 },

    #[error("Notifier not configured")]
    NotConfigured,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
