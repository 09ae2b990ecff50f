//! Notion database as the document store.
//!
//! Every record becomes one page in the configured database. Properties use a
//! fixed mapping (Title, Type, Priority, Status, Keywords, Difficulty,
//! Traffic Potential, URL, Created) and the body is written as paragraph
//! blocks.

use crate::{DocumentStore, RecordQuery};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outreach_core::{
    ContentRecord, CoreError, NotionConfig, PageId, RecordStatus, RecordType, StoreError,
    StoredRecord,
};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

const NOTION_VERSION: &str = "2022-06-28";
/// Notion rejects rich text longer than this.
pub const MAX_TEXT_CHARS: usize = 2000;
/// Notion accepts at most this many children per request.
const MAX_BLOCKS_PER_REQUEST: usize = 100;

pub struct NotionStore {
    http_client: Client,
    api_key: String,
    database_id: String,
    base_url: String,
}

impl NotionStore {
    /// Fails with [`StoreError::NotConfigured`] when the integration token or
    /// the database id is missing.
    pub fn new(config: &NotionConfig) -> Result<Self, CoreError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| StoreError::NotConfigured {
                missing: "NOTION_API_KEY".to_string(),
            })?;
        let database_id = config
            .database_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| StoreError::NotConfigured {
                missing: "NOTION_DATABASE_ID".to_string(),
            })?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            database_id,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send(&self, builder: RequestBuilder, resource: &str) -> Result<Value, CoreError> {
        let response = self.authorized(builder).send().await.map_err(|e| {
            if e.is_timeout() {
                CoreError::Store(StoreError::RequestTimeout)
            } else {
                CoreError::Network(e)
            }
        })?;
        let response = check_status(response, resource).await?;

        response.json::<Value>().await.map_err(|e| {
            CoreError::Store(StoreError::InvalidResponse {
                details: format!("{}: {}", resource, e),
            })
        })
    }
}

async fn check_status(response: Response, resource: &str) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    error!(%status, resource, "Notion request failed");

    Err(match status.as_u16() {
        401 | 403 => StoreError::AuthenticationFailed {
            reason: format!("{} ({})", status, resource),
        },
        404 => StoreError::RecordNotFound {
            page_id: resource.to_string(),
        },
        429 => StoreError::RateLimitExceeded {
            retry_after: retry_after.unwrap_or(1),
        },
        code if status.is_server_error() => StoreError::ServerError { status_code: code },
        code => StoreError::RequestRejected {
            status_code: code,
            details: body.chars().take(300).collect(),
        },
    })
}

/// Split `text` into pieces of at most `max_chars` characters, preferring to
/// break at a newline or space.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        if rest.chars().count() <= max_chars {
            chunks.push(rest.to_string());
            break;
        }

        let hard_end = rest
            .char_indices()
            .nth(max_chars)
            .map(|(index, _)| index)
            .unwrap_or(rest.len());
        let window = &rest[..hard_end];
        let end = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&index| index > 0)
            .unwrap_or(hard_end);

        chunks.push(rest[..end].trim_end().to_string());
        rest = rest[end..].trim_start();
    }
    chunks
}

fn rich_text(content: &str) -> Value {
    json!([{ "type": "text", "text": { "content": content } }])
}

/// Page properties for a record.
pub fn record_properties(record: &ContentRecord) -> Value {
    let title: String = record.title.chars().take(MAX_TEXT_CHARS).collect();
    let keywords: Vec<Value> = record
        .keywords
        .iter()
        .map(|keyword| json!({ "name": keyword.replace(',', " ").chars().take(100).collect::<String>() }))
        .collect();

    json!({
        "Title": { "title": rich_text(&title) },
        "Type": { "select": { "name": record.record_type.as_str() } },
        "Priority": { "number": record.priority },
        "Status": { "select": { "name": record.status.as_str() } },
        "Keywords": { "multi_select": keywords },
        "Difficulty": { "number": record.difficulty },
        "Traffic Potential": { "number": record.traffic_potential },
        "URL": { "url": record.url },
        "Created": { "date": { "start": record.created_at.to_rfc3339() } },
    })
}

fn body_blocks(body: &str) -> Vec<Value> {
    chunk_text(body, MAX_TEXT_CHARS)
        .into_iter()
        .take(MAX_BLOCKS_PER_REQUEST)
        .map(|chunk| {
            json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": rich_text(&chunk) },
            })
        })
        .collect()
}

fn plain_text(property: &Value, kind: &str) -> String {
    property[kind]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["plain_text"].as_str().or(part["text"]["content"].as_str()))
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Rebuild a record from a queried page. Page content is not fetched, so the
/// body is left empty.
pub fn parse_page(page: &Value) -> Option<StoredRecord> {
    let page_id = page["id"].as_str()?.to_string();
    let props = &page["properties"];

    let record_type = RecordType::parse(props["Type"]["select"]["name"].as_str()?)?;
    let status = RecordStatus::parse(props["Status"]["select"]["name"].as_str()?)?;
    let number = |name: &str| props[name]["number"].as_f64().unwrap_or(0.0);

    let created_at = props["Created"]["date"]["start"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            page["created_time"]
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
        })
        .unwrap_or_else(Utc::now);

    let keywords = props["Keywords"]["multi_select"]
        .as_array()
        .map(|options| {
            options
                .iter()
                .filter_map(|option| option["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Some(StoredRecord {
        page_id: PageId(page_id),
        record: ContentRecord {
            title: plain_text(&props["Title"], "title"),
            record_type,
            priority: number("Priority").clamp(0.0, 100.0) as u8,
            status,
            keywords,
            body: String::new(),
            difficulty: number("Difficulty").clamp(0.0, 100.0) as u8,
            traffic_potential: number("Traffic Potential").max(0.0) as u32,
            url: props["URL"]["url"].as_str().map(str::to_string),
            created_at,
        },
    })
}

fn query_filter(query: &RecordQuery) -> Option<Value> {
    let mut conditions = Vec::new();
    if let Some(record_type) = query.record_type {
        conditions.push(json!({ "property": "Type", "select": { "equals": record_type.as_str() } }));
    }
    if let Some(status) = query.status {
        conditions.push(json!({ "property": "Status", "select": { "equals": status.as_str() } }));
    }

    match conditions.len() {
        0 => None,
        1 => conditions.pop(),
        _ => Some(json!({ "and": conditions })),
    }
}

#[async_trait]
impl DocumentStore for NotionStore {
    fn name(&self) -> &str {
        "notion"
    }

    async fn create(&self, record: &ContentRecord) -> Result<PageId, CoreError> {
        let url = format!("{}/pages", self.base_url);
        let payload = json!({
            "parent": { "database_id": self.database_id },
            "properties": record_properties(record),
            "children": body_blocks(&record.body),
        });

        let page = self
            .send(self.http_client.post(&url).json(&payload), "pages")
            .await?;
        let id = page["id"].as_str().ok_or_else(|| StoreError::InvalidResponse {
            details: "created page has no id".to_string(),
        })?;

        debug!(page_id = id, record_type = %record.record_type, "Created Notion page");
        Ok(PageId(id.to_string()))
    }

    async fn query(&self, query: &RecordQuery) -> Result<Vec<StoredRecord>, CoreError> {
        let url = format!("{}/databases/{}/query", self.base_url, self.database_id);
        let mut payload = json!({
            "sorts": [{ "property": "Created", "direction": "descending" }],
            "page_size": query.limit.clamp(1, 100),
        });
        if let Some(filter) = query_filter(query) {
            payload["filter"] = filter;
        }

        let response = self
            .send(self.http_client.post(&url).json(&payload), "database query")
            .await?;
        let results = response["results"]
            .as_array()
            .ok_or_else(|| StoreError::InvalidResponse {
                details: "query response has no results".to_string(),
            })?;

        Ok(results.iter().filter_map(parse_page).collect())
    }

    async fn update_status(&self, page_id: &PageId, status: RecordStatus) -> Result<(), CoreError> {
        let url = format!("{}/pages/{}", self.base_url, page_id);
        let payload = json!({
            "properties": { "Status": { "select": { "name": status.as_str() } } }
        });

        self.send(self.http_client.patch(&url).json(&payload), &page_id.0)
            .await?;
        debug!(%page_id, %status, "Updated Notion page status");
        Ok(())
    }
}
