//! Progress reporting

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Snapshot handed to the progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamProgress {
    /// Cumulative chars received
    pub chars: usize,
    /// `chars / chars_per_token`
    pub approx_tokens: usize,
    /// Milliseconds since the session started
    pub elapsed_ms: u64,
    /// `false` only on the final snapshot
    pub streaming: bool,
    /// Delta units (or whole units, in pages mode) applied so far
    pub applied: usize,
}

/// Running counters for one session
#[derive(Debug, Clone)]
pub(crate) struct ProgressTracker {
    started: Instant,
    chars: usize,
    chars_per_token: usize,
}

impl ProgressTracker {
    pub(crate) fn start(chars_per_token: usize) -> Self {
        Self {
            started: Instant::now(),
            chars: 0,
            chars_per_token: chars_per_token.max(1),
        }
    }

    pub(crate) fn record(&mut self, chunk: &str) {
        self.chars += chunk.chars().count();
    }

    pub(crate) fn snapshot(&self, streaming: bool, applied: usize) -> StreamProgress {
        StreamProgress {
            chars: self.chars,
            approx_tokens: self.chars / self.chars_per_token,
            elapsed_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            streaming,
            applied,
        }
    }
}
