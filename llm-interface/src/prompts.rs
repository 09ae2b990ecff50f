use crate::{ContentType, GenerationRequest};

pub const JSON_INSTRUCTION: &str =
    "Respond with a single JSON object of the form {\"title\": string, \"body\": string} and nothing else.";

/// System prompt shared by every provider.
pub fn system_prompt(product_name: &str, product_url: &str) -> String {
    format!(
        "You write for developer communities on behalf of {product_name} ({product_url}). \
         Be genuinely helpful first, concrete and technical, and never pushy. \
         Mention the product only where it actually answers the question. {JSON_INSTRUCTION}"
    )
}

pub fn user_prompt(request: &GenerationRequest) -> String {
    let keywords = if request.keywords.is_empty() {
        "none".to_string()
    } else {
        request.keywords.join(", ")
    };

    let task = match request.content_type {
        ContentType::RedditResponse => {
            "Write a reply to the Reddit post below, 80 to 180 words. \
             Answer the question directly, then suggest the product as one option. \
             The title is a short label for the reply."
        }
        ContentType::BlogPost => {
            "Write an SEO blog post of 800 to 1200 words in markdown with an introduction, \
             a few H2 sections with code or request examples, and a conclusion. \
             The title should contain the primary keyword."
        }
        ContentType::SocialPost => {
            "Write a short social media post under 280 characters promoting the blog post \
             below, with one or two relevant hashtags."
        }
    };

    format!(
        "{task}\n\nTopic: {topic}\nKeywords: {keywords}\nAudience: {audience}\n\nContext:\n{context}",
        topic = request.topic,
        audience = request.audience,
        context = request.context.trim(),
    )
}
