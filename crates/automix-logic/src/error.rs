//! Error types for the AutoMix engine.
//!
//! `AutomixError` is what a caller sees. The `*Exhausted` variants are the
//! only failures the engine itself produces at runtime; the rest come from
//! loading rules, statistics or catalog data. `SoftFailure` describes an
//! operator that declined to act; the pipeline logs it and moves on.

use thiserror::Error;

const RETRY_HINT: &str = "please adjust your layout and try again";

/// Errors surfaced by the engine and its loaders.
#[derive(Debug, Error)]
pub enum AutomixError {
    /// The builder hit its append-iteration cap.
    #[error("AutoMix creation failure after {iterations} iterations; {}", RETRY_HINT)]
    CreationExhausted { iterations: u32 },

    /// The mix pipeline ran out of attempts without a changed, warning-free street.
    #[error("AutoMix failed to generate a valid street layout after {attempts} attempts; {}", RETRY_HINT)]
    MixExhausted { attempts: u32 },

    /// Variant mixing ran out of attempts.
    #[error("AutoMix failed to mix segment variants after {attempts} attempts; {}", RETRY_HINT)]
    VariantMixExhausted { attempts: u32 },

    /// Rules failed validation.
    #[error("invalid rules: {0}")]
    InvalidRules(String),

    /// A statistics key that is neither `type:variant` nor `type:variant->type:variant`.
    #[error("malformed statistics key: {0:?}")]
    MalformedStatsKey(String),

    /// JSON parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading rules or catalog files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AutomixError {
    /// Whether trying again (with a fresh random draw) may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AutomixError::CreationExhausted { .. }
                | AutomixError::MixExhausted { .. }
                | AutomixError::VariantMixExhausted { .. }
        )
    }
}

/// Result type for engine operations.
pub type AutomixResult<T> = Result<T, AutomixError>;

/// Why an operator left the street untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SoftFailure {
    #[error("target segment has no predecessor")]
    NoPredecessor,

    #[error("target is the last segment")]
    LastSegment,

    #[error("segment type {0:?} is never replaced")]
    ProtectedType(String),

    #[error("no candidate in the transition table")]
    NoCandidate,

    #[error("no existing segment to insert before")]
    NoInsertionPoint,

    #[error("candidate {0:?} failed validation")]
    InvalidCandidate(String),
}
