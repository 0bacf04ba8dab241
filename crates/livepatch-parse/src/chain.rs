//! Ordered parser chains
//!
//! Two chains decide which parser's output to trust:
//! - [`DeltaChain`] runs while the response streams. A lower-priority stage is
//!   consulted only while every higher-priority stage has produced nothing for
//!   the whole buffer. The decision is made per chunk, so a response mixing
//!   grammars is approximate: a legacy block that completes before the first
//!   structured block is applied when streamed, but not when the whole
//!   response arrives as one chunk. Responses in a single grammar are
//!   unaffected by chunking.
//! - [`ExtractorChain`] runs once at end of stream when no delta was applied.
//!   Extractors are tried in priority order; the first non-empty result wins.

use crate::delta::DeltaStreamParser;
use crate::document::extract_bare_document;
use crate::marker::MarkerStreamParser;
use livepatch_artifact::{DeltaUnit, Unit, UnitIntent};

/// One stage of a [`DeltaChain`]
#[derive(Debug)]
struct DeltaStage {
    parser: DeltaStreamParser,
    priority: i32,
}

/// Streaming delta parsers tried in priority order
#[derive(Debug, Default)]
pub struct DeltaChain {
    stages: Vec<DeltaStage>,
}

impl DeltaChain {
    /// Empty chain
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Structured grammar, then (optionally) the legacy comment grammar
    #[must_use]
    pub fn standard(legacy_fallback: bool) -> Self {
        let mut chain = Self::new();
        chain.register(DeltaStreamParser::structured(), 20);
        if legacy_fallback {
            chain.register(DeltaStreamParser::legacy(), 10);
        }
        chain
    }

    /// Register a parser (higher priority is consulted first)
    pub fn register(&mut self, parser: DeltaStreamParser, priority: i32) {
        self.stages.push(DeltaStage { parser, priority });
        self.stages.sort_by_key(|s| std::cmp::Reverse(s.priority));
    }

    /// New units for the current buffer
    ///
    /// Returns the first stage's fresh units if it has ever emitted anything;
    /// otherwise falls through to the next stage.
    pub fn feed(&mut self, buffer: &str) -> Vec<DeltaUnit> {
        for stage in &mut self.stages {
            let units = stage.parser.parse_buffer(buffer);
            if !units.is_empty() || stage.parser.emitted() > 0 {
                return units;
            }
        }
        Vec::new()
    }

    /// Grammar names in consultation order
    #[must_use]
    pub fn grammars(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.parser.grammar()).collect()
    }

    /// Distinct units emitted across all stages
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.stages.iter().map(|s| s.parser.emitted()).sum()
    }
}

/// End-of-stream whole-unit extraction strategy
pub trait UnitExtractor: Send + Sync {
    /// Strategy name for logs and reports
    fn name(&self) -> &'static str;

    /// Extract one replacement unit from the finished buffer
    ///
    /// `active_path` is the unit the session is editing, if any.
    fn extract(&self, buffer: &str, active_path: Option<&str>) -> Option<Unit>;

    /// Higher runs first
    fn priority(&self) -> i32 {
        0
    }
}

impl UnitExtractor for MarkerStreamParser {
    fn name(&self) -> &'static str {
        "markers"
    }

    fn extract(&self, buffer: &str, active_path: Option<&str>) -> Option<Unit> {
        match active_path {
            Some(path) => self.extract_unit_once(buffer, path),
            None => self.finalize(buffer).into_iter().next(),
        }
    }

    fn priority(&self) -> i32 {
        20
    }
}

/// Finds a bare `<!DOCTYPE html> … </html>` span
#[derive(Debug, Clone)]
pub struct BareDocumentExtractor {
    default_path: String,
}

impl BareDocumentExtractor {
    /// `default_path` names the unit when the session has no active path
    #[inline]
    #[must_use]
    pub fn new(default_path: impl Into<String>) -> Self {
        Self {
            default_path: default_path.into(),
        }
    }
}

impl UnitExtractor for BareDocumentExtractor {
    fn name(&self) -> &'static str {
        "bare-document"
    }

    fn extract(&self, buffer: &str, active_path: Option<&str>) -> Option<Unit> {
        let document = extract_bare_document(buffer)?;
        let path = active_path.unwrap_or(&self.default_path);
        Some(Unit::new(path, document, UnitIntent::Bare))
    }

    fn priority(&self) -> i32 {
        10
    }
}

/// The winning extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Name of the extractor that produced it
    pub extractor: &'static str,
    /// Extracted unit
    pub unit: Unit,
}

/// End-of-stream extractors tried in priority order
#[derive(Default)]
pub struct ExtractorChain {
    extractors: Vec<Box<dyn UnitExtractor>>,
}

impl std::fmt::Debug for ExtractorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorChain")
            .field("extractors", &self.names())
            .finish()
    }
}

impl ExtractorChain {
    /// Empty chain
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marker extraction, then bare-document extraction
    #[must_use]
    pub fn standard(min_content_len: usize, default_path: impl Into<String>) -> Self {
        let mut chain = Self::new();
        chain.register(MarkerStreamParser::new(min_content_len));
        chain.register(BareDocumentExtractor::new(default_path));
        chain
    }

    /// Register an extractor
    pub fn register<E: UnitExtractor + 'static>(&mut self, extractor: E) {
        self.extractors.push(Box::new(extractor));
        self.extractors
            .sort_by_key(|e| std::cmp::Reverse(e.priority()));
    }

    /// First non-empty extraction
    #[must_use]
    pub fn run(&self, buffer: &str, active_path: Option<&str>) -> Option<Extraction> {
        self.extractors.iter().find_map(|extractor| {
            let unit = extractor.extract(buffer, active_path)?;
            if unit.content.trim().is_empty() {
                return None;
            }
            tracing::debug!(extractor = extractor.name(), path = %unit.path, "fallback extraction");
            Some(Extraction {
                extractor: extractor.name(),
                unit,
            })
        })
    }

    /// Extractor names in run order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }
}
