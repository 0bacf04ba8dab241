//! Delta units: small, targeted patches applied while a response streams
//!
//! Unlike a whole [`Unit`](crate::Unit) replacement, a [`DeltaUnit`] touches a
//! single stylesheet, node, or named behavior in a live document.

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a delta patches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    /// Stylesheet text
    Style,
    /// Markup fragment addressed by a locator
    Markup,
    /// Named executable unit (a script function)
    Behavior,
}

impl DeltaKind {
    /// Stable tag used in identity hashes and logs
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Style => "style",
            Self::Markup => "markup",
            Self::Behavior => "behavior",
        }
    }
}

impl fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a delta mutates its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaOperation {
    /// Swap the target's content
    #[default]
    Replace,
    /// Add content after the target's existing content
    Append,
    /// Remove the target
    Delete,
}

impl DeltaOperation {
    /// Map an intent keyword to an operation
    ///
    /// Keywords are matched case-insensitively as whole words.
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "delete" | "remove" => Some(Self::Delete),
            "add" | "new" | "append" => Some(Self::Append),
            "replace" | "update" => Some(Self::Replace),
            _ => None,
        }
    }
}

impl fmt::Display for DeltaOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Replace => "replace",
            Self::Append => "append",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A kind-tagged, targeted patch
///
/// # Invariants
/// - `target` is `Some` for markup and behavior units, `None` for style
/// - `hash` is derived from `(kind, raw target token, content)`; two units with
///   equal hashes are the same patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaUnit {
    kind: DeltaKind,
    target: Option<String>,
    operation: DeltaOperation,
    content: String,
    hash: ContentHash,
}

impl DeltaUnit {
    /// Style unit
    #[must_use]
    pub fn style(operation: DeltaOperation, content: impl Into<String>) -> Self {
        Self::build(DeltaKind::Style, None, "", operation, content.into())
    }

    /// Markup unit for `locator`
    ///
    /// `token` is the raw target token as it appeared on the wire (locator plus
    /// any intent keyword); it is part of the identity key.
    #[must_use]
    pub fn markup(
        locator: impl Into<String>,
        token: &str,
        operation: DeltaOperation,
        content: impl Into<String>,
    ) -> Self {
        Self::build(
            DeltaKind::Markup,
            Some(locator.into()),
            token,
            operation,
            content.into(),
        )
    }

    /// Behavior unit named `name`
    #[must_use]
    pub fn behavior(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let token = name.clone();
        Self::build(
            DeltaKind::Behavior,
            Some(name),
            &token,
            DeltaOperation::Replace,
            content.into(),
        )
    }

    fn build(
        kind: DeltaKind,
        target: Option<String>,
        token: &str,
        operation: DeltaOperation,
        content: String,
    ) -> Self {
        let hash = ContentHash::of_parts([kind.as_str(), token, content.as_str()]);
        Self {
            kind,
            target,
            operation,
            content,
            hash,
        }
    }

    /// Kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> DeltaKind {
        self.kind
    }

    /// Locator (markup) or name (behavior)
    #[inline]
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Operation
    #[inline]
    #[must_use]
    pub fn operation(&self) -> DeltaOperation {
        self.operation
    }

    /// Patch body
    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Identity hash over `(kind, target, content)`
    #[inline]
    #[must_use]
    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    /// One-line description for logs
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.target {
            Some(target) => format!("{} {} {}", self.operation, self.kind, target),
            None => format!("{} {}", self.operation, self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_map_to_operations() {
        assert_eq!(DeltaOperation::from_keyword("DELETE"), Some(DeltaOperation::Delete));
        assert_eq!(DeltaOperation::from_keyword("remove"), Some(DeltaOperation::Delete));
        assert_eq!(DeltaOperation::from_keyword("new"), Some(DeltaOperation::Append));
        assert_eq!(DeltaOperation::from_keyword("Append"), Some(DeltaOperation::Append));
        assert_eq!(DeltaOperation::from_keyword("update"), Some(DeltaOperation::Replace));
        assert_eq!(DeltaOperation::from_keyword("#hero"), None);
    }

    #[test]
    fn default_operation_is_replace() {
        assert_eq!(DeltaOperation::default(), DeltaOperation::Replace);
    }

    #[test]
    fn style_has_no_target() {
        let unit = DeltaUnit::style(DeltaOperation::Append, ".btn{color:red}");
        assert_eq!(unit.kind(), DeltaKind::Style);
        assert_eq!(unit.target(), None);
        assert_eq!(unit.describe(), "append style");
    }

    #[test]
    fn same_triple_same_hash() {
        let a = DeltaUnit::markup("#hero", "#hero", DeltaOperation::Replace, "<h1>A</h1>");
        let b = DeltaUnit::markup("#hero", "#hero", DeltaOperation::Replace, "<h1>A</h1>");
        let c = DeltaUnit::markup("#hero", "#hero", DeltaOperation::Replace, "<h1>B</h1>");
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn kind_separates_hashes() {
        let markup = DeltaUnit::markup("x", "x", DeltaOperation::Replace, "body");
        let behavior = DeltaUnit::behavior("x", "body");
        assert_ne!(markup.hash(), behavior.hash());
    }

    #[test]
    fn intent_token_separates_hashes() {
        let replace = DeltaUnit::markup("#promo", "#promo", DeltaOperation::Replace, "");
        let delete = DeltaUnit::markup("#promo", "delete #promo", DeltaOperation::Delete, "");
        assert_ne!(replace.hash(), delete.hash());
    }

    #[test]
    fn behavior_is_replace() {
        let unit = DeltaUnit::behavior("toggleMenu", "function toggleMenu() {}");
        assert_eq!(unit.operation(), DeltaOperation::Replace);
        assert_eq!(unit.target(), Some("toggleMenu"));
    }
}
