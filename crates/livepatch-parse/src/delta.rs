//! Delta parsers
//!
//! A [`DeltaGrammar`] is a stateless scanner that finds every complete delta
//! block in a buffer. [`DeltaStreamParser`] wraps a grammar with the state a
//! stream needs: the accumulated buffer and the set of identity hashes already
//! emitted, so a closed block that stays in the buffer is emitted only once.

use crate::document::strip_fences;
use crate::grammar::{BEHAVIOR_BLOCK, LEGACY_BLOCK, MARKUP_BLOCK, STYLE_BLOCK};
use livepatch_artifact::{ContentHash, DeltaOperation, DeltaUnit};
use std::collections::HashSet;

/// A delta block located in a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedDelta {
    /// Byte offset just past the block's end marker
    pub end: usize,
    /// Parsed unit
    pub unit: DeltaUnit,
}

/// Stateless scanner for one delta wire grammar
pub trait DeltaGrammar: Send + Sync + std::fmt::Debug {
    /// Grammar name for logs
    fn name(&self) -> &'static str;

    /// Every complete block in `buffer`
    ///
    /// Unterminated or malformed blocks are skipped, never guessed at.
    fn scan(&self, buffer: &str) -> Vec<LocatedDelta>;
}

/// The structured grammar: one marker pair per kind
///
/// ```text
/// /* @style-start */ … /* @style-end */
/// <!-- @markup-start #hero --> … <!-- @markup-end -->
/// // @behavior-start toggleMenu
/// … // @behavior-end
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredGrammar;

impl DeltaGrammar for StructuredGrammar {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn scan(&self, buffer: &str) -> Vec<LocatedDelta> {
        let mut found = Vec::new();

        for caps in STYLE_BLOCK.captures_iter(buffer) {
            let (Some(whole), Some(args), Some(body)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            if let Some(unit) = style_unit(args.as_str(), body.as_str()) {
                found.push(LocatedDelta { end: whole.end(), unit });
            }
        }

        for caps in MARKUP_BLOCK.captures_iter(buffer) {
            let (Some(whole), Some(token), Some(body)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            if let Some(unit) = markup_unit(token.as_str(), body.as_str()) {
                found.push(LocatedDelta { end: whole.end(), unit });
            }
        }

        for caps in BEHAVIOR_BLOCK.captures_iter(buffer) {
            let (Some(whole), Some(name), Some(body)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            if let Some(unit) = behavior_unit(name.as_str(), body.as_str()) {
                found.push(LocatedDelta { end: whole.end(), unit });
            }
        }

        found.sort_by_key(|d| d.end);
        found
    }
}

/// The legacy grammar: one comment pair, kind carried in the start marker
///
/// ```text
/// <!-- UPDATE:CSS --> … <!-- END_UPDATE -->
/// <!-- UPDATE:HTML #hero --> … <!-- END_UPDATE -->
/// <!-- UPDATE:JS toggleMenu --> … <!-- END_UPDATE -->
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyGrammar;

impl DeltaGrammar for LegacyGrammar {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn scan(&self, buffer: &str) -> Vec<LocatedDelta> {
        LEGACY_BLOCK
            .captures_iter(buffer)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let args = caps.get(2)?.as_str();
                let body = caps.get(3)?.as_str();
                let unit = match caps.get(1)?.as_str() {
                    "CSS" => style_unit(args, body),
                    "HTML" => markup_unit(args, body),
                    "JS" => behavior_unit(args, body),
                    _ => None,
                }?;
                Some(LocatedDelta { end: whole.end(), unit })
            })
            .collect()
    }
}

fn style_unit(args: &str, body: &str) -> Option<DeltaUnit> {
    let content = strip_fences(body);
    if content.is_empty() {
        return None;
    }
    let operation = args
        .split_whitespace()
        .find_map(DeltaOperation::from_keyword)
        .filter(|op| *op != DeltaOperation::Delete)
        .unwrap_or(DeltaOperation::Append);
    Some(DeltaUnit::style(operation, content))
}

fn markup_unit(token: &str, body: &str) -> Option<DeltaUnit> {
    let token = token.trim();
    let (locator, operation) = infer_operation(token);
    if locator.is_empty() {
        return None;
    }
    let content = strip_fences(body);
    if content.is_empty() && operation != DeltaOperation::Delete {
        return None;
    }
    Some(DeltaUnit::markup(locator, token, operation, content))
}

fn behavior_unit(name: &str, body: &str) -> Option<DeltaUnit> {
    let name = name.trim();
    let content = strip_fences(body);
    if name.is_empty() || name.contains(char::is_whitespace) || content.is_empty() {
        return None;
    }
    Some(DeltaUnit::behavior(name, content))
}

/// Split a markup target token into `(locator, operation)`
///
/// An intent keyword may lead (`delete #promo`, `append:#list`) or trail
/// (`#promo remove`, `#list:add`) the locator. Without one the operation is
/// replace. Colons inside the locator (`a:hover`) are left alone unless the
/// word after them is a keyword.
#[must_use]
pub fn infer_operation(token: &str) -> (&str, DeltaOperation) {
    let token = token.trim();
    let is_sep = |c: char| c.is_whitespace() || c == ':';

    // Separators may be multi-byte whitespace, so slice by their real width.
    if let Some((at, sep)) = token.char_indices().find(|&(_, c)| is_sep(c)) {
        if let Some(op) = DeltaOperation::from_keyword(&token[..at]) {
            let rest = &token[at + sep.len_utf8()..];
            return (rest.trim_start_matches(is_sep).trim(), op);
        }
    }
    if let Some((at, sep)) = token.char_indices().rev().find(|&(_, c)| is_sep(c)) {
        if let Some(op) = DeltaOperation::from_keyword(&token[at + sep.len_utf8()..]) {
            return (token[..at].trim_end_matches(is_sep).trim(), op);
        }
    }
    (token, DeltaOperation::Replace)
}

/// Stateful, at-most-once delta parser over one grammar
#[derive(Debug)]
pub struct DeltaStreamParser {
    grammar: Box<dyn DeltaGrammar>,
    buffer: String,
    seen: HashSet<ContentHash>,
}

impl Default for DeltaStreamParser {
    fn default() -> Self {
        Self::structured()
    }
}

impl DeltaStreamParser {
    /// Parser over any grammar
    #[must_use]
    pub fn new(grammar: impl DeltaGrammar + 'static) -> Self {
        Self {
            grammar: Box::new(grammar),
            buffer: String::new(),
            seen: HashSet::new(),
        }
    }

    /// Parser over [`StructuredGrammar`]
    #[inline]
    #[must_use]
    pub fn structured() -> Self {
        Self::new(StructuredGrammar)
    }

    /// Parser over [`LegacyGrammar`]
    #[inline]
    #[must_use]
    pub fn legacy() -> Self {
        Self::new(LegacyGrammar)
    }

    /// Grammar name
    #[inline]
    #[must_use]
    pub fn grammar(&self) -> &'static str {
        self.grammar.name()
    }

    /// Append `chunk` to the owned buffer and return newly completed units
    pub fn parse_chunk(&mut self, chunk: &str) -> Vec<DeltaUnit> {
        self.buffer.push_str(chunk);
        let found = self.grammar.scan(&self.buffer);
        self.fresh(found)
    }

    /// Scan a buffer owned by the caller and return units not emitted before
    ///
    /// The caller must pass a buffer that only ever grows between calls.
    pub fn parse_buffer(&mut self, buffer: &str) -> Vec<DeltaUnit> {
        let found = self.grammar.scan(buffer);
        self.fresh(found)
    }

    /// Number of distinct units emitted so far
    #[inline]
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.seen.len()
    }

    /// Owned buffer (empty when only [`Self::parse_buffer`] is used)
    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    fn fresh(&mut self, found: Vec<LocatedDelta>) -> Vec<DeltaUnit> {
        let mut units = Vec::new();
        for LocatedDelta { unit, .. } in found {
            if self.seen.insert(unit.hash()) {
                tracing::debug!(
                    grammar = self.grammar.name(),
                    kind = %unit.kind(),
                    hash = %unit.hash().short(),
                    "delta unit completed"
                );
                units.push(unit);
            }
        }
        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livepatch_artifact::DeltaKind;
    use pretty_assertions::assert_eq;

    fn kinds(units: &[DeltaUnit]) -> Vec<DeltaKind> {
        units.iter().map(DeltaUnit::kind).collect()
    }

    #[test]
    fn infer_default_replace() {
        assert_eq!(infer_operation("#hero"), ("#hero", DeltaOperation::Replace));
        assert_eq!(infer_operation(" section.cta "), ("section.cta", DeltaOperation::Replace));
    }

    #[test]
    fn infer_leading_keyword() {
        assert_eq!(infer_operation("delete #promo"), ("#promo", DeltaOperation::Delete));
        assert_eq!(infer_operation("REMOVE:#promo"), ("#promo", DeltaOperation::Delete));
        assert_eq!(infer_operation("append: ul.items"), ("ul.items", DeltaOperation::Append));
        assert_eq!(infer_operation("new #features"), ("#features", DeltaOperation::Append));
    }

    #[test]
    fn infer_trailing_keyword() {
        assert_eq!(infer_operation("#promo delete"), ("#promo", DeltaOperation::Delete));
        assert_eq!(infer_operation("#list:add"), ("#list", DeltaOperation::Append));
    }

    #[test]
    fn pseudo_class_is_not_intent() {
        assert_eq!(infer_operation("a:hover"), ("a:hover", DeltaOperation::Replace));
    }

    #[test]
    fn structured_kinds() {
        let buffer = "\
/* @style-start */
.btn{color:red}
/* @style-end */
<!-- @markup-start #hero -->
<section id=\"hero\"><h1>Hi</h1></section>
<!-- @markup-end -->
// @behavior-start toggleMenu
function toggleMenu() { document.body.classList.toggle('open'); }
// @behavior-end
";
        let units = DeltaStreamParser::structured().parse_chunk(buffer);
        assert_eq!(
            kinds(&units),
            vec![DeltaKind::Style, DeltaKind::Markup, DeltaKind::Behavior]
        );
        assert_eq!(units[0].content(), ".btn{color:red}");
        assert_eq!(units[0].operation(), DeltaOperation::Append);
        assert_eq!(units[1].target(), Some("#hero"));
        assert_eq!(units[2].target(), Some("toggleMenu"));
    }

    #[test]
    fn style_replace_argument() {
        let units = DeltaStreamParser::structured()
            .parse_chunk("/* @style-start replace */ body{margin:0} /* @style-end */");
        assert_eq!(units[0].operation(), DeltaOperation::Replace);
    }

    #[test]
    fn detection_order_follows_end_marker() {
        let buffer = "\
<!-- @markup-start #a -->
<div id=\"a\">
/* @style-start */ p{} /* @style-end */
</div>
<!-- @markup-end -->";
        let units = StructuredGrammar.scan(buffer);
        assert_eq!(units[0].unit.kind(), DeltaKind::Style);
        assert_eq!(units[1].unit.kind(), DeltaKind::Markup);
    }

    #[test]
    fn repeated_blocks_match_individually() {
        let buffer = "\
<!-- @markup-start #a --><p>a</p><!-- @markup-end -->
<!-- @markup-start #b --><p>b</p><!-- @markup-end -->";
        let units = DeltaStreamParser::structured().parse_chunk(buffer);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].content(), "<p>a</p>");
        assert_eq!(units[1].content(), "<p>b</p>");
    }

    #[test]
    fn unterminated_block_is_not_emitted() {
        let mut parser = DeltaStreamParser::structured();
        assert!(parser.parse_chunk("/* @style-start */ .btn{color:").is_empty());
        let units = parser.parse_chunk("red} /* @style-end */");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].content(), ".btn{color:red}");
    }

    #[test]
    fn completed_block_is_emitted_once() {
        let mut parser = DeltaStreamParser::structured();
        assert_eq!(parser.parse_chunk("/* @style-start */.btn{color:red}/* @style-end */").len(), 1);
        assert!(parser.parse_chunk("\nmore prose").is_empty());
        assert!(parser.parse_chunk("\n").is_empty());
        assert_eq!(parser.emitted(), 1);
    }

    #[test]
    fn identical_block_repeated_later_is_deduplicated() {
        let block = "/* @style-start */.btn{color:red}/* @style-end */";
        let units = DeltaStreamParser::structured().parse_chunk(&format!("{block}\n{block}"));
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn markup_without_locator_is_skipped() {
        let units = StructuredGrammar.scan("<!-- @markup-start --><p>x</p><!-- @markup-end -->");
        assert!(units.is_empty());
    }

    #[test]
    fn delete_needs_no_body() {
        let units = StructuredGrammar.scan("<!-- @markup-start delete #promo --><!-- @markup-end -->");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit.operation(), DeltaOperation::Delete);
        assert_eq!(units[0].unit.target(), Some("#promo"));
    }

    #[test]
    fn legacy_kinds() {
        let buffer = "\
<!-- UPDATE:CSS -->
.hero{padding:2rem}
<!-- END_UPDATE -->
<!-- UPDATE:HTML remove #banner -->
<!-- END_UPDATE -->
<!-- UPDATE:JS init -->
function init() {}
<!-- END_UPDATE -->";
        let mut parser = DeltaStreamParser::legacy();
        assert_eq!(parser.grammar(), "legacy");
        let units = parser.parse_chunk(buffer);
        assert_eq!(
            kinds(&units),
            vec![DeltaKind::Style, DeltaKind::Markup, DeltaKind::Behavior]
        );
        assert_eq!(units[1].operation(), DeltaOperation::Delete);
        assert_eq!(units[2].content(), "function init() {}");
    }

    #[test]
    fn non_ascii_whitespace_separates_keywords() {
        assert_eq!(infer_operation("delete\u{a0}#promo"), ("#promo", DeltaOperation::Delete));
        assert_eq!(infer_operation("#promo\u{2003}remove"), ("#promo", DeltaOperation::Delete));
        assert_eq!(infer_operation("#hero\u{a0}x"), ("#hero\u{a0}x", DeltaOperation::Replace));

        let mut parser = DeltaStreamParser::structured();
        let units = parser.parse_chunk(
            "<!-- @markup-start #hero\u{a0}x --><p>hi there</p><!-- @markup-end -->",
        );
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].target(), Some("#hero\u{a0}x"));
        assert_eq!(units[0].operation(), DeltaOperation::Replace);
    }

    #[test]
    fn grammars_do_not_overlap() {
        let legacy = "<!-- UPDATE:CSS -->a{}<!-- END_UPDATE -->";
        let structured = "/* @style-start */a{}/* @style-end */";
        assert!(StructuredGrammar.scan(legacy).is_empty());
        assert!(LegacyGrammar.scan(structured).is_empty());
    }

    #[test]
    fn parse_buffer_uses_caller_buffer() {
        let mut parser = DeltaStreamParser::structured();
        let mut buffer = String::from("// @behavior-start go\nfunction go(){}\n");
        assert!(parser.parse_buffer(&buffer).is_empty());
        buffer.push_str("// @behavior-end\n");
        assert_eq!(parser.parse_buffer(&buffer).len(), 1);
        assert!(parser.parse_buffer(&buffer).is_empty());
        assert!(parser.buffer().is_empty());
    }
}
