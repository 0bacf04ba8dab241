//! Whole-unit marker parser
//!
//! Scans a growing buffer for `START_TITLE path END_TITLE` style headers (and
//! the new-page, update-page, and file variants) and cuts the text between
//! consecutive headers into [`Unit`]s.
//!
//! # Completion rule
//!
//! A unit body runs until the next header or the end of the buffer. The last
//! unit in the buffer may still be streaming, so [`MarkerStreamParser::extract_units`]
//! leaves it out; [`MarkerStreamParser::finalize`] includes it once the stream
//! has ended.

use crate::document::{has_preamble, strip_fences, trim_dangling_marker, truncate_after_close};
use crate::grammar::{marker_for_start, UNIT_HEADER};
use livepatch_artifact::{ContentHash, Unit, UnitIntent};
use std::collections::HashSet;

/// Bodies shorter than this (in chars) are treated as not yet complete
pub const DEFAULT_MIN_CONTENT_LEN: usize = 20;

/// A header found in the buffer
#[derive(Debug, Clone)]
struct Header {
    /// Byte offset where the header starts
    start: usize,
    /// Byte offset just past the header
    end: usize,
    path: String,
    intent: UnitIntent,
}

/// Stateless whole-unit extractor
#[derive(Debug, Clone, Copy)]
pub struct MarkerStreamParser {
    min_content_len: usize,
}

impl Default for MarkerStreamParser {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONTENT_LEN)
    }
}

impl MarkerStreamParser {
    /// Create parser with a minimum body length
    #[inline]
    #[must_use]
    pub fn new(min_content_len: usize) -> Self {
        Self { min_content_len }
    }

    /// Minimum body length in chars
    #[inline]
    #[must_use]
    pub fn min_content_len(&self) -> usize {
        self.min_content_len
    }

    /// Complete units in first-seen order, excluding the trailing unit
    #[must_use]
    pub fn extract_units(&self, buffer: &str) -> Vec<Unit> {
        self.scan(buffer, false)
    }

    /// All units including the trailing one; call once the stream has ended
    #[must_use]
    pub fn finalize(&self, buffer: &str) -> Vec<Unit> {
        self.scan(buffer, true)
    }

    /// The single best unit for `path` at end of stream
    ///
    /// Exact path match wins; otherwise the first unit in the buffer, since a
    /// page-scoped edit expects exactly one unit back whatever the model
    /// named it.
    #[must_use]
    pub fn extract_unit_once(&self, buffer: &str, path: &str) -> Option<Unit> {
        let mut units = self.finalize(buffer);
        match units.iter().position(|u| u.path == path) {
            Some(index) => Some(units.swap_remove(index)),
            None => units.into_iter().next(),
        }
    }

    fn scan(&self, buffer: &str, include_trailing: bool) -> Vec<Unit> {
        let headers = headers(buffer);
        let mut units: Vec<Unit> = Vec::new();

        for (i, header) in headers.iter().enumerate() {
            let next = headers.get(i + 1);
            if next.is_none() && !include_trailing {
                break;
            }
            let body_end = next.map_or(buffer.len(), |h| h.start);
            let Some(content) = self.body(&buffer[header.end..body_end], header.intent) else {
                tracing::trace!(path = %header.path, "unit body not complete yet");
                continue;
            };

            // Same path twice: later body wins, first position kept.
            match units.iter_mut().find(|u| u.path == header.path) {
                Some(existing) => {
                    existing.content = content;
                    existing.intent = header.intent;
                }
                None => units.push(Unit::new(header.path.clone(), content, header.intent)),
            }
        }

        units
    }

    /// Clean and validate a raw body
    fn body(&self, raw: &str, intent: UnitIntent) -> Option<String> {
        let text = strip_fences(trim_dangling_marker(raw));
        let text = if intent.is_page() {
            if !has_preamble(text) {
                return None;
            }
            truncate_after_close(text)
        } else {
            text
        };
        if text.chars().count() < self.min_content_len {
            return None;
        }
        Some(text.to_string())
    }
}

/// Every complete header in buffer order; mismatched token pairs are skipped
fn headers(buffer: &str) -> Vec<Header> {
    UNIT_HEADER
        .captures_iter(buffer)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let marker = marker_for_start(caps.get(1)?.as_str())?;
            if marker.end != caps.get(3)?.as_str() {
                return None;
            }
            let path = caps.get(2)?.as_str().trim();
            if path.is_empty() {
                return None;
            }
            Some(Header {
                start: whole.start(),
                end: whole.end(),
                path: path.to_string(),
                intent: marker.intent,
            })
        })
        .collect()
}

/// Stateful wrapper that emits each stable unit once
///
/// Owns its buffer. A path is re-emitted only when its content changed, so
/// callers upserting into a collection see every revision exactly once.
#[derive(Debug, Default)]
pub struct IncrementalMarkerParser {
    parser: MarkerStreamParser,
    buffer: String,
    emitted: HashSet<ContentHash>,
}

impl IncrementalMarkerParser {
    /// Wrap a parser
    #[inline]
    #[must_use]
    pub fn new(parser: MarkerStreamParser) -> Self {
        Self {
            parser,
            buffer: String::new(),
            emitted: HashSet::new(),
        }
    }

    /// Append a chunk and return units completed by it
    pub fn push(&mut self, chunk: &str) -> Vec<Unit> {
        self.buffer.push_str(chunk);
        let units = self.parser.extract_units(&self.buffer);
        self.fresh(units)
    }

    /// Scan an externally owned buffer and return units not seen before
    pub fn scan(&mut self, buffer: &str) -> Vec<Unit> {
        let units = self.parser.extract_units(buffer);
        self.fresh(units)
    }

    /// Close the trailing unit of an externally owned buffer
    pub fn finish_with(&mut self, buffer: &str) -> Vec<Unit> {
        let units = self.parser.finalize(buffer);
        self.fresh(units)
    }

    /// Close the trailing unit of the owned buffer
    pub fn finish(&mut self) -> Vec<Unit> {
        let buffer = std::mem::take(&mut self.buffer);
        let units = self.finish_with(&buffer);
        self.buffer = buffer;
        units
    }

    /// Accumulated text
    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Number of distinct unit revisions emitted
    #[inline]
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted.len()
    }

    fn fresh(&mut self, units: Vec<Unit>) -> Vec<Unit> {
        units
            .into_iter()
            .filter(|unit| self.emitted.insert(unit.identity()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = "<!DOCTYPE html>\n<html><body><h1>Home</h1></body></html>";
    const ABOUT: &str = "<!DOCTYPE html>\n<html><body><h1>About</h1></body></html>";

    fn titled(path: &str, body: &str) -> String {
        format!("<<<<<<< START_TITLE {path} >>>>>>> END_TITLE\n```html\n{body}\n```\n")
    }

    #[test]
    fn trailing_unit_waits_for_next_marker() {
        let parser = MarkerStreamParser::default();
        let buffer = titled("index.html", PAGE);
        assert!(parser.extract_units(&buffer).is_empty());

        let units = parser.finalize(&buffer);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].path, "index.html");
        assert_eq!(units[0].content, PAGE);
    }

    #[test]
    fn next_marker_closes_previous() {
        let parser = MarkerStreamParser::default();
        let buffer = format!("{}{}", titled("index.html", PAGE), titled("about.html", ABOUT));
        let units = parser.extract_units(&buffer);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].path, "index.html");
        assert_eq!(units[0].content, PAGE);
    }

    #[test]
    fn leading_prose_is_discarded() {
        let parser = MarkerStreamParser::default();
        let buffer = format!("I'll build two pages.\n\n{}", titled("index.html", PAGE));
        let units = parser.finalize(&buffer);
        assert_eq!(units.len(), 1);
        assert!(units[0].content.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn page_without_preamble_is_invalid() {
        let parser = MarkerStreamParser::default();
        let buffer = titled("index.html", "Sorry, I can't produce that page right now.");
        assert!(parser.finalize(&buffer).is_empty());
    }

    #[test]
    fn short_body_is_incomplete() {
        let parser = MarkerStreamParser::default();
        let buffer = "START_TITLE index.html END_TITLE\n<html>";
        assert!(parser.finalize(buffer).is_empty());
    }

    #[test]
    fn file_units_take_any_text() {
        let parser = MarkerStreamParser::default();
        let buffer = "<<<<<<< START_FILE js/app.js >>>>>>> END_FILE\nconsole.log('ready to go');\n";
        let units = parser.finalize(buffer);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].path, "js/app.js");
        assert_eq!(units[0].intent, UnitIntent::File);
        assert_eq!(units[0].content, "console.log('ready to go');");
    }

    #[test]
    fn fenced_file_body_ends_at_closing_fence() {
        let parser = MarkerStreamParser::default();
        let buffer = "<<<<<<< START_FILE js/app.js >>>>>>> END_FILE\n```js\nconsole.log('ready to go');\n```\n\nThis script logs on load.\n";
        let units = parser.finalize(buffer);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].content, "console.log('ready to go');");
    }

    #[test]
    fn mixed_intents() {
        let parser = MarkerStreamParser::default();
        let buffer = format!(
            "<<<<<<< NEW_PAGE_START contact.html >>>>>>> NEW_PAGE_END\n{PAGE}\n\
             <<<<<<< UPDATE_PAGE_START index.html >>>>>>> UPDATE_PAGE_END\n{ABOUT}\n"
        );
        let units = parser.finalize(&buffer);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].intent, UnitIntent::New);
        assert_eq!(units[1].intent, UnitIntent::Update);
    }

    #[test]
    fn mismatched_pair_is_ignored() {
        let parser = MarkerStreamParser::default();
        let buffer = format!("<<<<<<< START_TITLE index.html >>>>>>> NEW_PAGE_END\n{PAGE}");
        assert!(headers(&buffer).is_empty());
        assert!(parser.finalize(&buffer).is_empty());
    }

    #[test]
    fn repeated_path_keeps_first_position() {
        let parser = MarkerStreamParser::default();
        let buffer = format!(
            "{}{}{}",
            titled("index.html", PAGE),
            titled("about.html", ABOUT),
            titled("index.html", ABOUT)
        );
        let units = parser.finalize(&buffer);
        let paths: Vec<&str> = units.iter().map(|u| u.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "about.html"]);
        assert_eq!(units[0].content, ABOUT);
    }

    #[test]
    fn trailing_prose_after_page_is_cut() {
        let parser = MarkerStreamParser::default();
        let buffer = format!("START_TITLE index.html END_TITLE\n{PAGE}\n\nLet me know what else you need!");
        assert_eq!(parser.finalize(&buffer)[0].content, PAGE);
    }

    #[test]
    fn half_written_header_is_not_content() {
        let parser = MarkerStreamParser::default();
        let buffer = format!("{}<<<<<<< START_TITLE abo", titled("index.html", PAGE));
        let units = parser.finalize(&buffer);
        assert_eq!(units[0].content, PAGE);
    }

    #[test]
    fn extract_once_prefers_exact_path() {
        let parser = MarkerStreamParser::default();
        let buffer = format!("{}{}", titled("index.html", PAGE), titled("about.html", ABOUT));
        assert_eq!(parser.extract_unit_once(&buffer, "about.html").unwrap().content, ABOUT);
        assert_eq!(parser.extract_unit_once(&buffer, "missing.html").unwrap().path, "index.html");
        assert!(parser.extract_unit_once("no markers", "index.html").is_none());
    }

    #[test]
    fn no_markers_no_units() {
        let parser = MarkerStreamParser::default();
        assert!(parser.finalize(PAGE).is_empty());
        assert!(headers(PAGE).is_empty());
    }

    #[test]
    fn incremental_emits_once() {
        let mut parser = IncrementalMarkerParser::default();
        let full = format!("{}{}", titled("index.html", PAGE), titled("about.html", ABOUT));
        let (a, b) = full.split_at(full.len() / 2);

        let mut seen = parser.push(a);
        seen.extend(parser.push(b));
        seen.extend(parser.push(""));
        seen.extend(parser.finish());
        seen.extend(parser.finish());

        let paths: Vec<&str> = seen.iter().map(|u| u.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "about.html"]);
        assert_eq!(parser.emitted(), 2);
    }
}
