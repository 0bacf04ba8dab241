//! Per-session state
//!
//! Everything a session accumulates lives here and dies with it: the raw
//! buffer, parser dedup sets, counters. Two sessions never share any of it.

use crate::config::{PipelineConfig, SessionMode};
use crate::progress::{ProgressTracker, StreamProgress};
use crate::report::{SessionReport, UnitWrite};
use crate::state::{validate_transition, SessionState, StateError};
use livepatch_parse::{DeltaChain, IncrementalMarkerParser, MarkerStreamParser};
use livepatch_render::{DeltaApplier, RenderTarget};
use uuid::Uuid;

/// One request/response cycle
#[derive(Debug)]
pub(crate) struct StreamSession {
    id: Uuid,
    mode: SessionMode,
    state: SessionState,
    pub(crate) active_path: Option<String>,
    pub(crate) buffer: String,
    progress: ProgressTracker,
    deltas: DeltaChain,
    pub(crate) markers: IncrementalMarkerParser,
    applier: DeltaApplier,
    pub(crate) writes: Vec<UnitWrite>,
}

impl StreamSession {
    pub(crate) fn new(config: &PipelineConfig, active_path: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode: config.mode,
            state: SessionState::Idle,
            active_path: active_path.map(str::to_string),
            buffer: String::new(),
            progress: ProgressTracker::start(config.chars_per_token),
            deltas: DeltaChain::standard(config.legacy_fallback),
            markers: IncrementalMarkerParser::new(MarkerStreamParser::new(
                config.min_unit_content_len,
            )),
            applier: DeltaApplier::new(),
            writes: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn transition(&mut self, to: SessionState) -> Result<(), StateError> {
        validate_transition(self.state, to)?;
        tracing::debug!(from = %self.state, to = %to, "session transition");
        self.state = to;
        Ok(())
    }

    /// Append a chunk to the buffer
    pub(crate) fn push(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
        self.progress.record(chunk);
    }

    /// Parse the buffer for new deltas and apply them in detection order
    pub(crate) fn apply_deltas<R: RenderTarget + ?Sized>(&mut self, target: &mut R) {
        for unit in self.deltas.feed(&self.buffer) {
            self.applier.apply(&unit, target);
        }
    }

    /// Delta units applied so far
    #[inline]
    pub(crate) fn deltas_applied(&self) -> usize {
        self.applier.applied()
    }

    /// Patches of any kind applied so far
    pub(crate) fn applied(&self) -> usize {
        self.applier.applied() + self.writes.len()
    }

    /// Whether the model sent anything at all
    pub(crate) fn has_content(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub(crate) fn snapshot(&self, streaming: bool) -> StreamProgress {
        self.progress.snapshot(streaming, self.applied())
    }

    pub(crate) fn into_report(self) -> SessionReport {
        let progress = self.snapshot(self.state == SessionState::Streaming);
        SessionReport {
            session_id: self.id,
            mode: self.mode,
            state: self.state,
            applied: self.applier.applied(),
            misses: self.applier.misses(),
            units: self.writes,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livepatch_render::MemoryDocument;

    #[test]
    fn starts_idle_with_fresh_id() {
        let config = PipelineConfig::default();
        let a = StreamSession::new(&config, Some("index.html"));
        let b = StreamSession::new(&config, None);
        assert_eq!(a.state, SessionState::Idle);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn rejects_skipping_streaming() {
        let mut session = StreamSession::new(&PipelineConfig::default(), None);
        assert!(session.transition(SessionState::Completed).is_err());
        assert!(session.transition(SessionState::Streaming).is_ok());
        assert!(session.transition(SessionState::Completed).is_ok());
        assert!(session.transition(SessionState::Failed).is_err());
    }

    #[test]
    fn deltas_apply_once_across_pushes() {
        let mut session = StreamSession::new(&PipelineConfig::default(), None);
        let mut doc = MemoryDocument::new();
        session.push("/* @style-start */ a{} /* @style-end */");
        session.apply_deltas(&mut doc);
        session.push(" trailing words");
        session.apply_deltas(&mut doc);
        assert_eq!(session.deltas_applied(), 1);
        assert_eq!(doc.stylesheet(), "a{}");
    }

    #[test]
    fn report_reflects_counters() {
        let mut session = StreamSession::new(&PipelineConfig::default(), None);
        session.transition(SessionState::Streaming).unwrap();
        session.push("abcdefgh");
        session.transition(SessionState::Completed).unwrap();
        let report = session.into_report();
        assert_eq!(report.state, SessionState::Completed);
        assert_eq!(report.progress.chars, 8);
        assert_eq!(report.progress.approx_tokens, 2);
        assert!(!report.progress.streaming);
        assert!(!report.changed());
    }
}
