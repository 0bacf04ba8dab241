//! Livepatch Parsers
//!
//! Streaming-tolerant parsers over a growing model response. Every parser
//! accepts a buffer that is a prefix of the eventual response and only ever
//! reports blocks whose closing marker has arrived.
//!
//! # Parsers
//!
//! - [`MarkerStreamParser`]: whole-unit headers (`START_TITLE path END_TITLE`)
//! - [`IncrementalMarkerParser`]: emits each unit revision once
//! - [`DeltaStreamParser`]: structured or legacy delta blocks, at most once
//! - [`DeltaChain`] / [`ExtractorChain`]: priority-ordered parser fallbacks
//!
//! # Example
//!
//! ```rust
//! use livepatch_parse::DeltaStreamParser;
//!
//! let mut parser = DeltaStreamParser::structured();
//! assert!(parser.parse_chunk("/* @style-start */ .btn{color:").is_empty());
//! let units = parser.parse_chunk("red} /* @style-end */");
//! assert_eq!(units[0].content(), ".btn{color:red}");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod chain;
mod delta;
mod document;
pub mod grammar;
mod marker;

pub use chain::{BareDocumentExtractor, DeltaChain, Extraction, ExtractorChain, UnitExtractor};
pub use delta::{
    infer_operation, DeltaGrammar, DeltaStreamParser, LegacyGrammar, LocatedDelta,
    StructuredGrammar,
};
pub use document::{
    extract_bare_document, has_preamble, strip_fences, trim_dangling_marker, truncate_after_close,
};
pub use marker::{IncrementalMarkerParser, MarkerStreamParser, DEFAULT_MIN_CONTENT_LEN};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
