use chrono::{DateTime, Utc};
use outreach_core::{RawPost, ScoreWeights, SourceConfig};
use std::collections::BTreeSet;

/// Everything the score depends on, extracted from a post up front.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub engagement: i64,
    pub comments: u32,
    pub matched_terms: usize,
    pub origin_multiplier: f64,
    pub has_question: bool,
    pub has_technical: bool,
    pub age_hours: f64,
}

impl FeatureVector {
    pub fn extract(
        post: &RawPost,
        matched: &BTreeSet<String>,
        origin_multiplier: f64,
        weights: &ScoreWeights,
        now: DateTime<Utc>,
    ) -> Self {
        let text = post.normalized_text();
        let contains_any = |terms: &[String]| {
            terms
                .iter()
                .any(|term| !term.is_empty() && text.contains(&term.to_lowercase()))
        };

        Self {
            engagement: post.score,
            comments: post.num_comments,
            matched_terms: matched.len(),
            origin_multiplier,
            has_question: contains_any(&weights.question_terms),
            has_technical: contains_any(&weights.technical_terms),
            age_hours: post.age(now).num_minutes() as f64 / 60.0,
        }
    }
}

/// Score in `0..=100`.
///
/// Engagement and keyword points are scaled by the origin multiplier. The
/// question and technical bonuses are flat, and only apply to posts with at
/// least one matched term. A recency bonus is added last.
pub fn score(features: &FeatureVector, weights: &ScoreWeights) -> u8 {
    let engagement = (features.engagement.max(0) as f64 * weights.engagement_weight)
        .min(weights.engagement_cap)
        + (features.comments as f64 * weights.comment_weight).min(weights.comment_cap);
    let keywords = features.matched_terms as f64 * weights.keyword_weight;

    let mut total = (engagement + keywords) * features.origin_multiplier.max(0.0);

    if features.matched_terms > 0 {
        if features.has_question {
            total += weights.question_bonus;
        }
        if features.has_technical {
            total += weights.technical_bonus;
        }
    }

    total += if features.age_hours < weights.recent_hours as f64 {
        weights.recent_bonus
    } else if features.age_hours < weights.fresh_hours as f64 {
        weights.fresh_bonus
    } else {
        0.0
    };

    if total.is_nan() {
        return 0;
    }
    total.min(100.0).round().max(0.0) as u8
}

/// The single scoring policy shared by every discovery variant: one weight
/// table and one threshold.
#[derive(Debug, Clone)]
pub struct Scorer {
    weights: ScoreWeights,
    threshold: u8,
}

impl Scorer {
    pub fn new(weights: ScoreWeights, threshold: u8) -> Self {
        Self {
            weights,
            threshold: threshold.min(100),
        }
    }

    pub fn score_post(
        &self,
        post: &RawPost,
        matched: &BTreeSet<String>,
        source: &SourceConfig,
        now: DateTime<Utc>,
    ) -> u8 {
        let features =
            FeatureVector::extract(post, matched, source.quality_multiplier, &self.weights, now);
        score(&features, &self.weights)
    }

    /// `Some(score)` when the post clears the threshold.
    pub fn evaluate(
        &self,
        post: &RawPost,
        matched: &BTreeSet<String>,
        source: &SourceConfig,
        now: DateTime<Utc>,
    ) -> Option<u8> {
        let score = self.score_post(post, matched, source, now);
        (score >= self.threshold).then_some(score)
    }
}
