use chrono::{DateTime, Utc};
use outreach_core::{RawPost, RuleConfig, SourceConfig, TimeWindow};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::trace;

/// A relevance rule as data: a post needs a topic term and an intent term and
/// must not contain a disqualifying term. Terms are stored lower-cased.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub required_any: Vec<String>,
    pub required_intent_any: Vec<String>,
    pub disqualify_any: Vec<String>,
}

fn normalize_terms<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    terms
        .into_iter()
        .map(|term| term.as_ref().trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

impl Rule {
    pub fn new<I, S>(required_any: I, required_intent_any: I, disqualify_any: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            required_any: normalize_terms(required_any),
            required_intent_any: normalize_terms(required_intent_any),
            disqualify_any: normalize_terms(disqualify_any),
        }
    }

    pub fn from_config(config: &RuleConfig) -> Self {
        Self::new(
            &config.topic_terms,
            &config.intent_terms,
            &config.disqualify_terms,
        )
    }

    /// Topic terms of this rule plus the origin's own keywords that occur in
    /// `text`. `text` must already be lower-cased.
    pub fn matched_topics(&self, text: &str, source_keywords: &[String]) -> BTreeSet<String> {
        self.required_any
            .iter()
            .cloned()
            .chain(normalize_terms(source_keywords))
            .filter(|term| text.contains(term.as_str()))
            .collect()
    }

    pub fn has_intent(&self, text: &str) -> bool {
        self.required_intent_any
            .iter()
            .any(|term| text.contains(term.as_str()))
    }

    pub fn disqualifier(&self, text: &str) -> Option<&str> {
        self.disqualify_any
            .iter()
            .find(|term| text.contains(term.as_str()))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum RejectReason {
    LowEngagement { score: i64, min_score: i64 },
    Stale { age_hours: i64 },
    NoTopicMatch,
    NoIntent,
    Disqualified { term: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted { matched: BTreeSet<String> },
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }
}

/// Applies the rule to posts under a freshness window. Live discovery uses
/// 48 hours, backfill a number of months.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    rule: Rule,
    freshness: TimeWindow,
}

impl RelevanceFilter {
    pub fn new(rule: Rule, freshness: TimeWindow) -> Self {
        Self { rule, freshness }
    }

    pub fn with_freshness(&self, freshness: TimeWindow) -> Self {
        Self {
            rule: self.rule.clone(),
            freshness,
        }
    }

    /// Checks run in a fixed order and the first failing one names the
    /// rejection: engagement, freshness, topic, intent, disqualifiers.
    pub fn evaluate(&self, post: &RawPost, source: &SourceConfig, now: DateTime<Utc>) -> Verdict {
        let verdict = self.check(post, source, now);
        if let Verdict::Rejected(reason) = &verdict {
            trace!(post_id = %post.id, origin = %post.origin, ?reason, "Post rejected");
        }
        verdict
    }

    fn check(&self, post: &RawPost, source: &SourceConfig, now: DateTime<Utc>) -> Verdict {
        if post.score < source.min_score {
            return Verdict::Rejected(RejectReason::LowEngagement {
                score: post.score,
                min_score: source.min_score,
            });
        }

        if !self.freshness.contains(post.created_at, now) {
            return Verdict::Rejected(RejectReason::Stale {
                age_hours: post.age(now).num_hours(),
            });
        }

        let text = post.normalized_text();
        let matched = self.rule.matched_topics(&text, &source.keywords);
        if matched.is_empty() {
            return Verdict::Rejected(RejectReason::NoTopicMatch);
        }

        if !self.rule.has_intent(&text) {
            return Verdict::Rejected(RejectReason::NoIntent);
        }

        if let Some(term) = self.rule.disqualifier(&text) {
            return Verdict::Rejected(RejectReason::Disqualified {
                term: term.to_string(),
            });
        }

        Verdict::Accepted { matched }
    }
}
