use crate::{require_non_empty, FetchQuery, PostSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outreach_core::{CoreError, RawPost, SourceError, TimeWindow};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const HACKERNEWS_ORIGIN: &str = "hackernews";

/// HackerNews search through the hnrss.org RSS feeds.
#[derive(Debug, Clone)]
pub struct HackerNewsClient {
    http_client: Client,
    base_url: Url,
}

impl HackerNewsClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, CoreError> {
        let base_url = Url::parse(base_url).map_err(|e| CoreError::InvalidInput {
            message: format!("invalid hackernews base url {}: {}", base_url, e),
        })?;
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn feed_url(&self, query: &FetchQuery) -> Result<Url, CoreError> {
        let mut url = self
            .base_url
            .join("newest")
            .map_err(|e| CoreError::InvalidInput {
                message: format!("invalid hackernews url: {}", e),
            })?;

        let count = query.limit().to_string();
        match query {
            FetchQuery::Search { term, .. } => {
                require_non_empty(term, "search term")?;
                url.query_pairs_mut()
                    .append_pair("q", term.trim())
                    .append_pair("count", &count);
            }
            FetchQuery::Listing { .. } => {
                url.query_pairs_mut().append_pair("count", &count);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl PostSource for HackerNewsClient {
    fn name(&self) -> &str {
        HACKERNEWS_ORIGIN
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<RawPost>, CoreError> {
        let url = self.feed_url(query)?;
        debug!("Fetching HackerNews feed: {}", url);

        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                CoreError::Source(SourceError::RequestTimeout {
                    origin: HACKERNEWS_ORIGIN.to_string(),
                })
            } else {
                CoreError::Network(e)
            }
        })?;

        if let Some(error) = crate::reddit::status_error(response.status(), None, HACKERNEWS_ORIGIN)
        {
            return Err(error.into());
        }

        let bytes = response.bytes().await?;
        let posts = parse_feed(&bytes, query.window(), Utc::now())?;
        info!("Retrieved {} posts from HackerNews for {}", posts.len(), query);
        Ok(posts)
    }
}

/// Parse an hnrss feed into posts. Points and comment counts come from the
/// item description, and items outside `window` are dropped.
pub fn parse_feed(
    bytes: &[u8],
    window: TimeWindow,
    now: DateTime<Utc>,
) -> Result<Vec<RawPost>, SourceError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| SourceError::InvalidResponse {
        details: format!("hackernews feed: {}", e),
    })?;

    let posts = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let created_at = entry.published.or(entry.updated)?;
            if !window.contains(created_at, now) {
                return None;
            }

            let description = entry
                .summary
                .map(|text| text.content)
                .unwrap_or_default();
            let comments_url = extract_after(&description, "Comments URL:")
                .map(strip_tags)
                .filter(|url| url.starts_with("http"))
                .unwrap_or_else(|| entry.id.clone());
            let item_id = comments_url
                .rsplit_once("id=")
                .map(|(_, id)| id.to_string())
                .unwrap_or_else(|| entry.id.clone());

            Some(RawPost {
                id: format!("hn_{}", item_id),
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                body: story_text(&description),
                origin: HACKERNEWS_ORIGIN.to_string(),
                author: entry
                    .authors
                    .first()
                    .map(|person| person.name.clone())
                    .unwrap_or_default(),
                score: extract_count(&description, "Points:").unwrap_or(0),
                num_comments: extract_count(&description, "# Comments:")
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(0),
                created_at,
                permalink: comments_url,
            })
        })
        .collect();

    Ok(posts)
}

/// Text after `label` up to the end of its paragraph.
fn extract_after<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let start = text.find(label)? + label.len();
    let rest = &text[start..];
    let end = rest.find("</p>").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn extract_count(text: &str, label: &str) -> Option<i64> {
    let value = extract_after(text, label)?;
    let digits: String = value
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Self-post text sits before the `<hr>` that separates it from the
/// metadata block. Link posts have none.
fn story_text(description: &str) -> String {
    match description.find("<hr>") {
        Some(end) => strip_tags(&description[..end]).trim().to_string(),
        None => String::new(),
    }
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
