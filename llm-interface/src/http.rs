use outreach_core::{CoreError, LlmError};
use reqwest::{Response, StatusCode};
use tracing::error;

/// Map a failed provider response onto the generation error taxonomy.
pub(crate) fn status_error(provider: &str, model: &str, status: StatusCode, body: &str) -> LlmError {
    let provider = provider.to_string();
    let body_lower = body.to_lowercase();

    match status.as_u16() {
        401 => LlmError::AuthenticationFailed { provider },
        403 => LlmError::InvalidApiKey { provider },
        402 => LlmError::InsufficientCredits { provider },
        429 if body_lower.contains("insufficient_quota") || body_lower.contains("credit") => {
            LlmError::InsufficientCredits { provider }
        }
        429 => LlmError::RateLimitExceeded {
            provider,
            retry_after: 30,
        },
        404 => LlmError::ModelNotAvailable {
            model: model.to_string(),
        },
        400 if body_lower.contains("credit balance") => LlmError::InsufficientCredits { provider },
        400 if body_lower.contains("content_filter") || body_lower.contains("safety") => {
            LlmError::ContentFiltered {
                reason: body.chars().take(200).collect(),
            }
        }
        408 => LlmError::RequestTimeout { provider },
        _ if status.is_server_error() || status.as_u16() == 529 => {
            LlmError::ServiceUnavailable { provider }
        }
        _ => LlmError::InvalidResponseFormat { provider },
    }
}

pub(crate) fn send_error(provider: &str, error: reqwest::Error) -> CoreError {
    if error.is_timeout() {
        CoreError::Llm(LlmError::RequestTimeout {
            provider: provider.to_string(),
        })
    } else {
        CoreError::Network(error)
    }
}

/// Pass a successful response through, or turn a failed one into an error.
pub(crate) async fn check_status(
    provider: &str,
    model: &str,
    response: Response,
) -> Result<Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!(provider, %status, "Generation request failed");
    Err(status_error(provider, model, status, &body).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error("claude", "m", StatusCode::UNAUTHORIZED, ""),
            LlmError::AuthenticationFailed { .. }
        ));
        assert!(matches!(
            status_error("openai", "m", StatusCode::TOO_MANY_REQUESTS, r#"{"error":{"code":"insufficient_quota"}}"#),
            LlmError::InsufficientCredits { .. }
        ));
        assert!(matches!(
            status_error("openai", "m", StatusCode::TOO_MANY_REQUESTS, "slow down"),
            LlmError::RateLimitExceeded { .. }
        ));
        assert!(matches!(
            status_error("claude", "claude-x", StatusCode::NOT_FOUND, ""),
            LlmError::ModelNotAvailable { .. }
        ));
        assert!(matches!(
            status_error("claude", "m", StatusCode::from_u16(529).unwrap(), "overloaded"),
            LlmError::ServiceUnavailable { .. }
        ));
    }
}
