//! Error types for the stream orchestrator
//!
//! Only [`StreamError::NoUnitsExtracted`] means "the response could not be
//! understood". Locator misses and incomplete blocks never surface here.

use crate::state::StateError;
use crate::transport::TransportError;

/// Terminal session failures
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Text arrived (whitespace included), zero deltas applied, and every
    /// fallback extractor came up empty
    #[error("could not understand the response: no patch or page found")]
    NoUnitsExtracted,

    /// The stream source failed; applied patches are kept
    #[error("transport failed after {applied} applied patches: {source}")]
    Transport {
        #[source]
        source: TransportError,
        applied: usize,
    },

    /// No chunk arrived within the idle timeout
    #[error("no chunk received for {timeout_ms}ms ({applied} applied patches kept)")]
    Timeout { timeout_ms: u64, applied: usize },

    /// The caller aborted the stream; applied patches are kept
    #[error("stream cancelled after {applied} applied patches")]
    Cancelled { applied: usize },

    #[error(transparent)]
    State(#[from] StateError),
}

impl StreamError {
    /// Patches applied before the session ended
    #[must_use]
    pub fn applied(&self) -> usize {
        match self {
            Self::Transport { applied, .. }
            | Self::Timeout { applied, .. }
            | Self::Cancelled { applied } => *applied,
            Self::NoUnitsExtracted | Self::State(_) => 0,
        }
    }

    /// Whether the user should be told the response was not understood
    #[inline]
    #[must_use]
    pub fn is_unrecognized_response(&self) -> bool {
        matches!(self, Self::NoUnitsExtracted)
    }
}
