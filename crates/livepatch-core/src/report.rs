//! Session reports

use crate::config::SessionMode;
use crate::progress::StreamProgress;
use crate::state::SessionState;
use livepatch_artifact::{ChangeRange, UnitIntent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit written into the collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitWrite {
    pub path: String,
    pub intent: UnitIntent,
    /// `true` when the path was new to the collection
    pub inserted: bool,
    /// Changed lines in the new content
    pub ranges: Vec<ChangeRange>,
    /// Which extractor produced the unit
    pub source: String,
}

/// Outcome of a session, terminal or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub mode: SessionMode,
    pub state: SessionState,
    /// Delta units applied
    pub applied: usize,
    /// Delta units whose locator matched nothing
    pub misses: usize,
    pub units: Vec<UnitWrite>,
    pub progress: StreamProgress,
}

impl SessionReport {
    /// Every range across all written units
    pub fn ranges(&self) -> impl Iterator<Item = &ChangeRange> {
        self.units.iter().flat_map(|u| u.ranges.iter())
    }

    /// Whether the session changed anything
    #[must_use]
    pub fn changed(&self) -> bool {
        self.applied > 0 || !self.units.is_empty()
    }
}
