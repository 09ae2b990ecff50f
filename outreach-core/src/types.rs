use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A fetched candidate post. Lives for one fetch cycle only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    pub id: String,
    pub title: String,
    pub body: String,
    pub origin: String,
    pub author: String,
    pub score: i64,
    pub num_comments: u32,
    pub created_at: DateTime<Utc>,
    pub permalink: String,
}

impl RawPost {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.created_at)
    }

    /// Lower-cased title and body, the text every keyword rule runs against.
    pub fn normalized_text(&self) -> String {
        format!("{} {}", self.title, self.body).to_lowercase()
    }
}

/// A post that passed the relevance filter and the score threshold.
#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    pub post: RawPost,
    pub matched_keywords: BTreeSet<String>,
    pub score: u8,
    pub response: Option<String>,
    pub url: String,
}

impl Opportunity {
    pub fn new(post: RawPost, matched_keywords: BTreeSet<String>, score: u8) -> Self {
        let url = post.permalink.clone();
        Self {
            post,
            matched_keywords,
            score: score.min(100),
            response: None,
            url,
        }
    }

    pub fn id(&self) -> &str {
        &self.post.id
    }
}

/// Static per-origin fetch and filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub origin: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_max_posts")]
    pub max_posts: u32,
    #[serde(default)]
    pub min_score: i64,
    #[serde(default = "default_quality_multiplier")]
    pub quality_multiplier: f64,
}

fn default_max_posts() -> u32 {
    25
}

fn default_quality_multiplier() -> f64 {
    1.0
}

impl SourceConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            keywords: Vec::new(),
            max_posts: default_max_posts(),
            min_score: 0,
            quality_multiplier: default_quality_multiplier(),
        }
    }
}

/// How far back a fetch or a freshness check looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Hours(u32),
    Days(u32),
    Months(u32),
}

impl TimeWindow {
    pub fn to_duration(self) -> Duration {
        match self {
            TimeWindow::Hours(h) => Duration::hours(h as i64),
            TimeWindow::Days(d) => Duration::days(d as i64),
            TimeWindow::Months(m) => Duration::days(30 * m as i64),
        }
    }

    pub fn contains(self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(created_at) <= self.to_duration()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    RedditOpportunity,
    BlogPost,
    SocialPost,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::RedditOpportunity => "reddit_opportunity",
            RecordType::BlogPost => "blog_post",
            RecordType::SocialPost => "social_post",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reddit_opportunity" => Some(RecordType::RedditOpportunity),
            "blog_post" => Some(RecordType::BlogPost),
            "social_post" => Some(RecordType::SocialPost),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Identified,
    Generated,
    ReadyToPublish,
    Published,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Identified => "identified",
            RecordStatus::Generated => "generated",
            RecordStatus::ReadyToPublish => "ready_to_publish",
            RecordStatus::Published => "published",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "identified" => Some(RecordStatus::Identified),
            "generated" => Some(RecordStatus::Generated),
            "ready_to_publish" => Some(RecordStatus::ReadyToPublish),
            "published" => Some(RecordStatus::Published),
            _ => None,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record as written to the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub title: String,
    pub record_type: RecordType,
    pub priority: u8,
    pub status: RecordStatus,
    pub keywords: Vec<String>,
    pub body: String,
    pub difficulty: u8,
    pub traffic_potential: u32,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ContentRecord {
    /// Field mapping for a dispatched Reddit opportunity.
    pub fn from_opportunity(opportunity: &Opportunity) -> Self {
        let post = &opportunity.post;
        let response = opportunity.response.clone().unwrap_or_default();
        let body = format!(
            "r/{} · u/{} · {} points · {} comments\n{}\n\nPost:\n{}\n\nSuggested response:\n{}",
            post.origin,
            post.author,
            post.score,
            post.num_comments,
            opportunity.url,
            post.body.trim(),
            response.trim()
        );

        Self {
            title: post.title.clone(),
            record_type: RecordType::RedditOpportunity,
            priority: opportunity.score,
            status: RecordStatus::Generated,
            keywords: opportunity.matched_keywords.iter().cloned().collect(),
            body,
            difficulty: 0,
            traffic_potential: post.score.max(0) as u32 + post.num_comments,
            url: Some(opportunity.url.clone()),
            created_at: Utc::now(),
        }
    }
}

/// Opaque identifier the document store assigns to a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub String);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub page_id: PageId,
    pub record: ContentRecord,
}
