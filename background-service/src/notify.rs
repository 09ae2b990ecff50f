use async_trait::async_trait;
use outreach_core::{CoreError, ErrorExt, NotifyError, Opportunity};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Chat channel that receives run summaries.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, text: &str) -> Result<(), CoreError>;
}

/// Slack incoming webhook.
pub struct SlackWebhook {
    webhook_url: String,
    http: reqwest::Client,
}

impl SlackWebhook {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self, CoreError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            webhook_url: webhook_url.into(),
            http,
        })
    }
}

#[async_trait]
impl Notifier for SlackWebhook {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, text: &str) -> Result<(), CoreError> {
        let payload = json!({
            "text": text,
            "unfurl_links": false,
        });

        let resp = self.http.post(&self.webhook_url).json(&payload).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Slack webhook returned non-success");
            return Err(NotifyError::WebhookRejected {
                status_code: status.as_u16(),
            }
            .into());
        }
        Ok(())
    }
}

/// Used when no webhook is configured.
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    fn name(&self) -> &str {
        "noop"
    }

    async fn send(&self, text: &str) -> Result<(), CoreError> {
        debug!(chars = text.len(), "Notification dropped, no notifier configured");
        Ok(())
    }
}

pub fn format_summary(opportunities: &[Opportunity]) -> String {
    let mut lines = vec![format!(
        ":mag: *{} new opportunit{} found*",
        opportunities.len(),
        if opportunities.len() == 1 { "y" } else { "ies" }
    )];

    for opportunity in opportunities {
        let post = &opportunity.post;
        lines.push(format!(
            "• *[{}]* <{}|{}> ({}, {} pts, {} comments)",
            opportunity.score,
            opportunity.url,
            post.title.replace(&['<', '>', '|'][..], " "),
            post.origin,
            post.score,
            post.num_comments
        ));
    }
    lines.join("\n")
}

/// Send a summary of `opportunities`. An empty batch sends nothing. Returns
/// whether a message went out; failures are logged only.
pub async fn notify_batch(notifier: &dyn Notifier, opportunities: &[Opportunity]) -> bool {
    if opportunities.is_empty() {
        debug!("No new opportunities, skipping notification");
        return false;
    }

    match notifier.send(&format_summary(opportunities)).await {
        Ok(()) => {
            info!(
                notifier = notifier.name(),
                count = opportunities.len(),
                "Sent opportunity summary"
            );
            true
        }
        Err(error) => {
            error.log_warn();
            false
        }
    }
}
