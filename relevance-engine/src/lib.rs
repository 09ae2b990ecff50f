//! Relevance filtering and opportunity scoring.
//!
//! Both halves are pure functions over a post and configuration data, so rule
//! sets and weight tables can be tested without any I/O.

pub mod rules;
pub mod scoring;

pub use outreach_core::{RuleConfig, ScoreWeights};
pub use rules::{RejectReason, RelevanceFilter, Rule, Verdict};
pub use scoring::{score, FeatureVector, Scorer};
