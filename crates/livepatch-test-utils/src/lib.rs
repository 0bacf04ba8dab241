//! Testing utilities for the livepatch workspace
//!
//! Shared fixtures, chunk splitters and a recording render target.

#![allow(missing_docs)]

use livepatch_artifact::{Unit, UnitCollection, UnitIntent};
use livepatch_render::{MemoryDocument, RenderTarget};

/// A small page with addressable nodes
pub const SAMPLE_PAGE: &str = "<!DOCTYPE html>
<html>
<head>
<title>Sample</title>
</head>
<body>
<section id=\"hero\"><h1>Welcome</h1></section>
<ul class=\"items\"><li>one</li></ul>
<div class=\"promo\">Limited offer</div>
</body>
</html>";

/// A different full page
pub const REPLACEMENT_PAGE: &str = "<!DOCTYPE html>
<html>
<head>
<title>Sample</title>
</head>
<body>
<section id=\"hero\"><h1>Rebuilt</h1></section>
<footer>bye</footer>
</body>
</html>";

/// A response the model sends when it refuses or rambles
pub const PROSE_RESPONSE: &str =
    "I'm not able to make that change, but here are some general thoughts about button colors.";

/// One mutation observed by [`RecordingTarget`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Style(String),
    Replace { locator: String, matched: usize },
    Append { locator: String, matched: usize },
    Remove { locator: String, matched: usize },
    Behavior(String),
    Load,
}

/// Wraps a [`MemoryDocument`] and records every call
#[derive(Debug, Clone, Default)]
pub struct RecordingTarget {
    pub document: MemoryDocument,
    pub log: Vec<Mutation>,
}

impl RecordingTarget {
    pub fn new(html: &str) -> Self {
        Self {
            document: MemoryDocument::from_html(html),
            log: Vec::new(),
        }
    }

    /// Number of recorded style writes
    pub fn style_writes(&self) -> usize {
        self.log
            .iter()
            .filter(|m| matches!(m, Mutation::Style(_)))
            .count()
    }
}

impl RenderTarget for RecordingTarget {
    fn style_text(&self) -> &str {
        self.document.style_text()
    }

    fn replace_style(&mut self, css: &str) {
        self.log.push(Mutation::Style(css.to_string()));
        self.document.replace_style(css);
    }

    fn replace_nodes(&mut self, locator: &str, html: &str) -> usize {
        let matched = self.document.replace_nodes(locator, html);
        self.log.push(Mutation::Replace {
            locator: locator.to_string(),
            matched,
        });
        matched
    }

    fn append_to_nodes(&mut self, locator: &str, html: &str) -> usize {
        let matched = self.document.append_to_nodes(locator, html);
        self.log.push(Mutation::Append {
            locator: locator.to_string(),
            matched,
        });
        matched
    }

    fn remove_nodes(&mut self, locator: &str) -> usize {
        let matched = self.document.remove_nodes(locator);
        self.log.push(Mutation::Remove {
            locator: locator.to_string(),
            matched,
        });
        matched
    }

    fn define_behavior(&mut self, name: &str, source: &str) {
        self.log.push(Mutation::Behavior(name.to_string()));
        self.document.define_behavior(name, source);
    }

    fn load_document(&mut self, html: &str) {
        self.log.push(Mutation::Load);
        self.document.load_document(html);
    }
}

/// Split `text` into chunks of at most `size` chars
pub fn split_every(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// Split `text` into exactly `parts` chunks (fewer if it is too short)
pub fn split_into(text: &str, parts: usize) -> Vec<String> {
    let len = text.chars().count();
    let size = len.div_ceil(parts.max(1));
    split_every(text, size)
}

/// Split at char offsets; out-of-range and duplicate offsets are ignored
pub fn split_at_offsets(text: &str, offsets: &[usize]) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut cuts: Vec<usize> = offsets
        .iter()
        .copied()
        .filter(|&o| o > 0 && o < chars.len())
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut last = 0;
    for cut in cuts {
        chunks.push(chars[last..cut].iter().collect());
        last = cut;
    }
    chunks.push(chars[last..].iter().collect());
    chunks
}

/// Collection holding [`SAMPLE_PAGE`] at `path`
pub fn sample_collection(path: &str) -> UnitCollection {
    let mut units = UnitCollection::new();
    units.upsert(Unit::new(path, SAMPLE_PAGE, UnitIntent::Title));
    units
}

/// Wrap a page body in a title marker
pub fn titled(path: &str, body: &str) -> String {
    format!("<<<<<<< START_TITLE {path} >>>>>>> END_TITLE\n```html\n{body}\n```\n")
}
