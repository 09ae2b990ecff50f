use crate::{require_non_empty, FetchQuery, PostSource};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use outreach_core::{CoreError, RawPost, SourceError, TimeWindow};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Permalinks always point at the public site, whatever base URL is used
/// for the JSON endpoints.
const REDDIT_WEB_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default = "deleted_author")]
    pub author: String,
    pub subreddit: String,
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub over_18: bool,
}

fn deleted_author() -> String {
    "[deleted]".to_string()
}

impl RedditPostData {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created_utc as i64, 0).single()
    }

    pub fn into_raw_post(self) -> Option<RawPost> {
        let created_at = self.created_at()?;
        let permalink = if self.permalink.starts_with("http") {
            self.permalink
        } else {
            format!("{}{}", REDDIT_WEB_BASE, self.permalink)
        };

        Some(RawPost {
            id: self.id,
            title: self.title,
            body: self.selftext,
            origin: self.subreddit,
            author: self.author,
            score: self.score,
            num_comments: self.num_comments,
            created_at,
            permalink,
        })
    }
}

/// Decode a listing body. Each child is decoded on its own so one malformed
/// entry costs that entry, not the whole listing. Stickied and NSFW posts and
/// posts outside `window` are dropped.
pub fn parse_listing(
    body: &str,
    window: TimeWindow,
    now: DateTime<Utc>,
) -> Result<Vec<RawPost>, SourceError> {
    let listing: RedditListing<serde_json::Value> =
        serde_json::from_str(body).map_err(|e| SourceError::InvalidResponse {
            details: format!("listing envelope: {}", e),
        })?;

    let total = listing.data.children.len();
    let mut skipped = 0usize;
    let posts: Vec<RawPost> = listing
        .data
        .children
        .into_iter()
        .filter(|child| child.kind == "t3")
        .filter_map(|child| match serde_json::from_value::<RedditPostData>(child.data) {
            Ok(data) => Some(data),
            Err(e) => {
                skipped += 1;
                debug!("Skipping malformed listing child: {}", e);
                None
            }
        })
        .filter(|data| !data.stickied && !data.over_18)
        .filter_map(RedditPostData::into_raw_post)
        .filter(|post| window.contains(post.created_at, now))
        .collect();

    if skipped > 0 {
        warn!(skipped, total, "Listing contained malformed children");
    }
    Ok(posts)
}

/// Reddit's `t` parameter for a window.
fn time_filter(window: TimeWindow) -> &'static str {
    let hours = window.to_duration().num_hours();
    match hours {
        h if h <= 1 => "hour",
        h if h <= 24 => "day",
        h if h <= 24 * 7 => "week",
        h if h <= 24 * 31 => "month",
        h if h <= 24 * 365 => "year",
        _ => "all",
    }
}

/// Map a non-success HTTP status onto the source error taxonomy.
pub(crate) fn status_error(
    status: StatusCode,
    retry_after: Option<u64>,
    resource: &str,
) -> Option<SourceError> {
    if status.is_success() {
        return None;
    }

    let error = match status.as_u16() {
        429 => SourceError::RateLimitExceeded {
            origin: resource.to_string(),
            retry_after: retry_after.unwrap_or(60),
        },
        403 => SourceError::Forbidden {
            resource: resource.to_string(),
        },
        404 => SourceError::OriginNotFound {
            origin: resource.to_string(),
        },
        code if status.is_server_error() => SourceError::ServerError { status_code: code },
        code => SourceError::InvalidResponse {
            details: format!("unexpected status {} for {}", code, resource),
        },
    };
    Some(error)
}

/// Client for Reddit's public JSON listing and search endpoints.
#[derive(Debug, Clone)]
pub struct RedditClient {
    http_client: Client,
    base_url: Url,
}

impl RedditClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, CoreError> {
        let base_url = Url::parse(base_url).map_err(|e| CoreError::InvalidInput {
            message: format!("invalid reddit base url {}: {}", base_url, e),
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

    fn request_for(&self, query: &FetchQuery) -> Result<(Url, String), CoreError> {
        let limit = query.limit().to_string();
        let t = time_filter(query.window());

        let (path, params, resource) = match query {
            FetchQuery::Listing { origin, window, .. } => {
                require_non_empty(origin, "origin")?;
                let origin = origin.trim().trim_start_matches("r/");
                if window.to_duration() <= chrono::Duration::days(7) {
                    (
                        format!("r/{}/new.json", origin),
                        vec![("limit", limit), ("raw_json", "1".to_string())],
                        format!("r/{}", origin),
                    )
                } else {
                    (
                        format!("r/{}/top.json", origin),
                        vec![
                            ("t", t.to_string()),
                            ("limit", limit),
                            ("raw_json", "1".to_string()),
                        ],
                        format!("r/{}", origin),
                    )
                }
            }
            FetchQuery::Search { term, .. } => {
                require_non_empty(term, "search term")?;
                (
                    "search.json".to_string(),
                    vec![
                        ("q", term.trim().to_string()),
                        ("sort", "new".to_string()),
                        ("t", t.to_string()),
                        ("limit", limit),
                        ("raw_json", "1".to_string()),
                    ],
                    format!("search '{}'", term.trim()),
                )
            }
        };

        let mut url = self
            .base_url
            .join(&path)
            .map_err(|e| CoreError::InvalidInput {
                message: format!("invalid reddit path {}: {}", path, e),
            })?;
        url.query_pairs_mut().extend_pairs(params.iter());
        Ok((url, resource))
    }

    async fn get_text(&self, url: Url, resource: &str) -> Result<String, CoreError> {
        debug!("Making Reddit request: GET {}", url);
        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                CoreError::Source(SourceError::RequestTimeout {
                    origin: resource.to_string(),
                })
            } else {
                CoreError::Network(e)
            }
        })?;

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        if let Some(error) = status_error(response.status(), retry_after, resource) {
            error!(
                "Reddit request failed with status {} for {}",
                response.status(),
                resource
            );
            return Err(error.into());
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PostSource for RedditClient {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<RawPost>, CoreError> {
        let (url, resource) = self.request_for(query)?;
        let body = self.get_text(url, &resource).await?;
        let posts = parse_listing(&body, query.window(), Utc::now())?;

        info!("Retrieved {} posts from {}", posts.len(), resource);
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RedditClient {
        RedditClient::new(
            "https://www.reddit.com",
            "outreach-test/1.0",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn child(id: &str, created_utc: i64) -> String {
        format!(
            r#"{{"kind":"t3","data":{{"id":"{id}","title":"Post {id}","selftext":"body","author":"dev",
                "subreddit":"solana","permalink":"/r/solana/comments/{id}/post/",
                "created_utc":{created_utc}.0,"score":12,"num_comments":3}}}}"#
        )
    }

    #[test]
    fn test_listing_url_for_short_window() {
        let query = FetchQuery::listing("solana", 25, TimeWindow::Hours(48));
        let (url, resource) = client().request_for(&query).unwrap();
        assert_eq!(url.path(), "/r/solana/new.json");
        assert!(url.query().unwrap().contains("limit=25"));
        assert_eq!(resource, "r/solana");
    }

    #[test]
    fn test_listing_url_for_backfill_window() {
        let query = FetchQuery::listing("r/ethdev", 100, TimeWindow::Months(3));
        let (url, _) = client().request_for(&query).unwrap();
        assert_eq!(url.path(), "/r/ethdev/top.json");
        assert!(url.query().unwrap().contains("t=year"));
    }

    #[test]
    fn test_search_url_encodes_term() {
        let query = FetchQuery::search("wallet api", 10, TimeWindow::Days(2));
        let (url, _) = client().request_for(&query).unwrap();
        assert_eq!(url.path(), "/search.json");
        let query = url.query().unwrap();
        assert!(query.contains("q=wallet+api"));
        assert!(query.contains("t=week"));
        assert!(query.contains("sort=new"));
    }

    #[test]
    fn test_empty_origin_is_invalid_input() {
        let query = FetchQuery::listing("  ", 10, TimeWindow::Hours(48));
        let result = client().request_for(&query);
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
    }

    #[test]
    fn test_parse_listing_skips_malformed_children() {
        let now = Utc::now();
        let fresh = now.timestamp() - 3600;
        let body = format!(
            r#"{{"kind":"Listing","data":{{"after":null,"before":null,"dist":3,"children":[
                {},
                {{"kind":"t3","data":{{"id":"broken","title":42}}}},
                {}
            ]}}}}"#,
            child("a1", fresh),
            child("a2", fresh)
        );

        let posts = parse_listing(&body, TimeWindow::Hours(48), now).unwrap();
        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2"]);
        assert_eq!(
            posts[0].permalink,
            "https://www.reddit.com/r/solana/comments/a1/post/"
        );
        assert_eq!(posts[0].origin, "solana");
    }

    #[test]
    fn test_parse_listing_drops_posts_outside_window() {
        let now = Utc::now();
        let body = format!(
            r#"{{"kind":"Listing","data":{{"after":null,"before":null,"dist":2,"children":[{},{}]}}}}"#,
            child("fresh", now.timestamp() - 3600),
            child("stale", now.timestamp() - 10 * 24 * 3600)
        );

        let posts = parse_listing(&body, TimeWindow::Hours(48), now).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "fresh");
    }

    #[test]
    fn test_parse_listing_rejects_garbage() {
        let result = parse_listing("<html>blocked</html>", TimeWindow::Hours(48), Utc::now());
        assert!(matches!(result, Err(SourceError::InvalidResponse { .. })));
    }

    #[test]
    fn test_status_mapping() {
        assert!(status_error(StatusCode::OK, None, "r/solana").is_none());
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, Some(7), "r/solana"),
            Some(SourceError::RateLimitExceeded { retry_after: 7, .. })
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, None, "r/private"),
            Some(SourceError::Forbidden { .. })
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, None, "r/gone"),
            Some(SourceError::OriginNotFound { .. })
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, None, "r/solana"),
            Some(SourceError::ServerError { status_code: 502 })
        ));
    }
}
