//! Stream orchestrator
//!
//! Drives one session per [`StreamOrchestrator::run`] call:
//!
//! 1. `Idle -> Streaming`: fresh buffer, fresh dedup sets.
//! 2. Per chunk: append, parse, apply, report progress. Nothing here awaits;
//!    the next chunk is the only suspension point.
//! 3. End of stream: `Completed`, after the whole-unit fallback when no delta
//!    was applied. Transport errors and timeouts end in `Failed`, an abort in
//!    `Cancelled`. Applied mutations are never rolled back.

use crate::config::{PipelineConfig, SessionMode};
use crate::error::StreamError;
use crate::progress::StreamProgress;
use crate::report::{SessionReport, UnitWrite};
use crate::session::StreamSession;
use crate::state::SessionState;
use crate::transport::{TransportError, TransportEvent};
use futures::stream::{AbortHandle, AbortRegistration, Abortable};
use futures::{Stream, StreamExt};
use livepatch_artifact::{Unit, UnitCollection, Upsert};
use livepatch_diff::compute_changed_ranges;
use livepatch_parse::{Extraction, ExtractorChain, UnitExtractor};
use livepatch_render::RenderTarget;
use std::time::Duration;
use tracing::Instrument;

/// Why the chunk loop stopped
enum StreamEnd {
    Finished,
    Cancelled,
    Transport(TransportError),
    TimedOut(Duration),
}

/// Turns chunked model output into applied patches and written units
pub struct StreamOrchestrator<R> {
    config: PipelineConfig,
    target: R,
    units: UnitCollection,
    extractors: ExtractorChain,
    abort: Option<AbortRegistration>,
    last_report: Option<SessionReport>,
}

impl<R: std::fmt::Debug> std::fmt::Debug for StreamOrchestrator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamOrchestrator")
            .field("config", &self.config)
            .field("target", &self.target)
            .field("units", &self.units.len())
            .field("extractors", &self.extractors)
            .finish_non_exhaustive()
    }
}

impl<R: RenderTarget> StreamOrchestrator<R> {
    /// Orchestrator over `target` with an empty unit collection
    #[must_use]
    pub fn new(config: PipelineConfig, target: R) -> Self {
        let extractors =
            ExtractorChain::standard(config.min_unit_content_len, config.default_page_path.clone());
        Self {
            config,
            target,
            units: UnitCollection::new(),
            extractors,
            abort: None,
            last_report: None,
        }
    }

    /// Builder: start from an existing collection
    #[must_use]
    pub fn with_units(mut self, units: UnitCollection) -> Self {
        self.units = units;
        self
    }

    /// Add a fallback extractor (runs by its priority)
    pub fn register_extractor<E: UnitExtractor + 'static>(&mut self, extractor: E) {
        self.extractors.register(extractor);
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &R {
        &self.target
    }

    #[inline]
    pub fn target_mut(&mut self) -> &mut R {
        &mut self.target
    }

    #[inline]
    #[must_use]
    pub fn units(&self) -> &UnitCollection {
        &self.units
    }

    /// Report of the most recent session, whatever its outcome
    #[inline]
    #[must_use]
    pub fn last_report(&self) -> Option<&SessionReport> {
        self.last_report.as_ref()
    }

    /// Tear down into the render target and the unit collection
    #[must_use]
    pub fn into_parts(self) -> (R, UnitCollection) {
        (self.target, self.units)
    }

    /// Handle that cancels the next session
    ///
    /// Aborting stops reading at the next chunk boundary; the session ends
    /// `Cancelled` with everything applied so far kept.
    pub fn abort_handle(&mut self) -> AbortHandle {
        let (handle, registration) = AbortHandle::new_pair();
        self.abort = Some(registration);
        handle
    }

    /// Run one session over `stream`
    ///
    /// `active_path` is the unit being edited, if any. `on_progress` is called
    /// after every chunk and once more at the end with `streaming == false`.
    ///
    /// # Errors
    /// - [`StreamError::NoUnitsExtracted`] when nothing in a non-empty
    ///   response could be applied or extracted
    /// - [`StreamError::Transport`], [`StreamError::Timeout`],
    ///   [`StreamError::Cancelled`] when the stream ends abnormally
    pub async fn run<S, F>(
        &mut self,
        stream: S,
        active_path: Option<&str>,
        mut on_progress: F,
    ) -> Result<SessionReport, StreamError>
    where
        S: Stream<Item = TransportEvent>,
        F: FnMut(&StreamProgress),
    {
        let registration = self
            .abort
            .take()
            .unwrap_or_else(|| AbortHandle::new_pair().1);
        let session = StreamSession::new(&self.config, active_path);
        let span = tracing::info_span!(
            "stream_session",
            session_id = %session.id(),
            mode = %self.config.mode,
        );
        self.drive(Abortable::new(stream, registration), session, &mut on_progress)
            .instrument(span)
            .await
    }

    async fn drive<S>(
        &mut self,
        stream: Abortable<S>,
        mut session: StreamSession,
        on_progress: &mut dyn FnMut(&StreamProgress),
    ) -> Result<SessionReport, StreamError>
    where
        S: Stream<Item = TransportEvent>,
    {
        let mut stream = std::pin::pin!(stream);
        session.transition(SessionState::Streaming)?;
        tracing::info!(active = ?session.active_path, "stream started");

        let idle_timeout = self.config.idle_timeout();
        let end = loop {
            let next = match idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                    Ok(next) => next,
                    Err(_) => break StreamEnd::TimedOut(limit),
                },
                None => stream.next().await,
            };
            match next {
                Some(TransportEvent::Chunk(text)) => {
                    self.on_chunk(&mut session, &text);
                    on_progress(&session.snapshot(true));
                }
                Some(TransportEvent::Error(e)) => break StreamEnd::Transport(e),
                None if stream.is_aborted() => break StreamEnd::Cancelled,
                None => break StreamEnd::Finished,
            }
        };

        let applied = session.applied();
        let outcome = match end {
            StreamEnd::Finished => self.finish(&mut session),
            StreamEnd::Cancelled => Err(StreamError::Cancelled { applied }),
            StreamEnd::Transport(source) => Err(StreamError::Transport { source, applied }),
            StreamEnd::TimedOut(limit) => Err(StreamError::Timeout {
                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                applied,
            }),
        };

        let terminal = match &outcome {
            Ok(()) => SessionState::Completed,
            Err(StreamError::Cancelled { .. }) => SessionState::Cancelled,
            Err(_) => SessionState::Failed,
        };
        session.transition(terminal)?;
        on_progress(&session.snapshot(false));

        let report = session.into_report();
        match &outcome {
            Ok(()) => tracing::info!(
                applied = report.applied,
                misses = report.misses,
                units = report.units.len(),
                "stream completed"
            ),
            Err(e) => tracing::warn!(state = %report.state, error = %e, "stream ended early"),
        }
        self.last_report = Some(report.clone());
        outcome.map(|()| report)
    }

    fn on_chunk(&mut self, session: &mut StreamSession, chunk: &str) {
        session.push(chunk);
        match self.config.mode {
            SessionMode::Delta => session.apply_deltas(&mut self.target),
            SessionMode::Pages => {
                let units = session.markers.scan(&session.buffer);
                for unit in units {
                    let path = unit.path.clone();
                    self.write_unit(session, &path, unit, "markers");
                }
            }
        }
    }

    /// `Streaming -> Completed` work; an error ends the session `Failed`
    fn finish(&mut self, session: &mut StreamSession) -> Result<(), StreamError> {
        match self.config.mode {
            SessionMode::Delta => {
                if session.deltas_applied() > 0 || !session.has_content() {
                    return Ok(());
                }
                let found = self.fallback(session)?;
                let path = self
                    .replacement_target(session.active_path.as_deref())
                    .unwrap_or_else(|| found.unit.path.clone());
                self.write_unit(session, &path, found.unit, found.extractor);
            }
            SessionMode::Pages => {
                let trailing = session.markers.finish_with(&session.buffer);
                for unit in trailing {
                    let path = unit.path.clone();
                    self.write_unit(session, &path, unit, "markers");
                }
                if session.writes.is_empty() && session.has_content() {
                    let found = self.fallback(session)?;
                    let path = found.unit.path.clone();
                    self.write_unit(session, &path, found.unit, found.extractor);
                }
            }
        }
        Ok(())
    }

    fn fallback(&self, session: &StreamSession) -> Result<Extraction, StreamError> {
        self.extractors
            .run(&session.buffer, session.active_path.as_deref())
            .ok_or_else(|| {
                tracing::warn!(
                    chars = session.buffer.len(),
                    extractors = ?self.extractors.names(),
                    "no patch or unit found in response"
                );
                StreamError::NoUnitsExtracted
            })
    }

    /// Unit a fallback replacement lands on: the active path when the
    /// collection has it, else the first unit
    fn replacement_target(&self, active_path: Option<&str>) -> Option<String> {
        active_path
            .filter(|path| self.units.get(path).is_some())
            .map(str::to_string)
            .or_else(|| self.units.first().map(|u| u.path.clone()))
    }

    fn write_unit(&mut self, session: &mut StreamSession, path: &str, unit: Unit, source: &str) {
        let Unit { content, intent, .. } = unit;

        let shows_in_target = match self.config.mode {
            SessionMode::Delta => true,
            SessionMode::Pages => session.active_path.as_deref() == Some(path),
        };
        if shows_in_target && intent.is_page() {
            self.target.load_document(&content);
        }

        let upsert = self.units.upsert(Unit::new(path, content.as_str(), intent));
        let ranges = compute_changed_ranges(upsert.previous().unwrap_or(""), &content);
        tracing::debug!(path, %intent, source, ranges = ranges.len(), "unit written");
        session.writes.push(UnitWrite {
            path: path.to_string(),
            intent,
            inserted: matches!(upsert, Upsert::Inserted { .. }),
            ranges,
            source: source.to_string(),
        });
    }
}
