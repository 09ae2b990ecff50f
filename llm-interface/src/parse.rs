use crate::GeneratedContent;
use outreach_core::LlmError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(default)]
    title: String,
    #[serde(default, alias = "content", alias = "response")]
    body: String,
}

/// Strip a surrounding markdown code fence, with or without a language tag.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(newline) if !rest[..newline].contains('{') => &rest[newline + 1..],
        _ => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}

/// Decode provider output into title and body.
///
/// Output that is not a JSON object becomes the body verbatim under
/// `default_title`. Output with nothing usable is an error so the next
/// provider gets a turn.
pub fn parse_generated(
    raw: &str,
    default_title: &str,
    provider: &str,
) -> Result<GeneratedContent, LlmError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(LlmError::EmptyResponse {
            provider: provider.to_string(),
        });
    }

    if let Ok(wire) = serde_json::from_str::<WireContent>(text) {
        let body = wire.body.trim();
        if body.is_empty() {
            return Err(LlmError::InvalidResponseFormat {
                provider: provider.to_string(),
            });
        }
        let title = match wire.title.trim() {
            "" => default_title.to_string(),
            title => title.to_string(),
        };
        return Ok(GeneratedContent {
            title,
            body: body.to_string(),
        });
    }

    Ok(GeneratedContent {
        title: default_title.to_string(),
        body: raw.trim().to_string(),
    })
}
