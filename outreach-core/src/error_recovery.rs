//! Error recovery strategies for the discovery pipelines.
//!
//! No error raised while processing one item or one origin may abort a batch.
//! This module decides, per error and per pipeline stage, whether the unit of
//! work is skipped, replaced by a substitute, retried, or whether the whole
//! collaborator is switched off for the rest of the run.

use crate::{CoreError, ErrorExt, LlmError, SourceError, StoreError};
use std::time::Duration;

/// Where in the pipeline an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Generate,
    Persist,
    Notify,
}

/// Recovery strategy for handling errors
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryStrategy {
    /// Retry the operation with exponential backoff
    RetryWithBackoff {
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
    },
    /// Replace the result with an empty set or a templated fallback
    Substitute,
    /// Skip the affected unit of work and continue the batch
    Skip,
    /// Treat the collaborator as unavailable until the next run
    DisableCollaborator,
}

/// Error recovery handler that maps errors onto strategies
pub struct ErrorRecovery;

impl ErrorRecovery {
    /// Determine the appropriate recovery strategy for a given error
    pub fn determine_strategy(error: &CoreError, stage: Stage) -> RecoveryStrategy {
        // Missing or rejected credentials never heal within a run
        if error.is_credential_error() {
            return RecoveryStrategy::DisableCollaborator;
        }

        match stage {
            Stage::Fetch => match error {
                CoreError::Source(SourceError::InvalidResponse { .. })
                | CoreError::Serialization(_) => RecoveryStrategy::Substitute,
                _ => RecoveryStrategy::Skip,
            },
            Stage::Generate => match error {
                CoreError::Llm(LlmError::InvalidResponseFormat { .. })
                | CoreError::Llm(LlmError::EmptyResponse { .. }) => RecoveryStrategy::Substitute,
                _ => RecoveryStrategy::Skip,
            },
            Stage::Persist => match error {
                CoreError::Store(StoreError::RateLimitExceeded { retry_after }) => {
                    RecoveryStrategy::RetryWithBackoff {
                        max_attempts: 3,
                        initial_delay: Duration::from_secs(*retry_after),
                        max_delay: Duration::from_secs(60),
                    }
                }
                _ if error.is_retryable() => RecoveryStrategy::RetryWithBackoff {
                    max_attempts: 3,
                    initial_delay: Duration::from_secs(1),
                    max_delay: Duration::from_secs(8),
                },
                _ => RecoveryStrategy::Skip,
            },
            Stage::Notify => RecoveryStrategy::Skip,
        }
    }
}
