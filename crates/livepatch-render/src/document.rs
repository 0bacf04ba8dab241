//! In-memory render host
//!
//! [`MemoryDocument`] is the reference [`RenderTarget`]: an html5ever tree
//! (through `scraper`), a stream stylesheet kept apart from the page's own
//! styles, and a namespace of named behaviors. Locators are CSS selectors.
//! [`MemoryDocument::render_html`] writes it all back out, injecting the
//! stylesheet into `<head>` and behaviors at the end of `<body>`.
//!
//! Input that opens with a doctype, `<html>`, `<head>` or `<body>` is parsed
//! as a whole document; anything else stays a fragment and renders without
//! the implied `<html>` shell.

use crate::target::RenderTarget;
use ego_tree::{NodeId, NodeRef, Tree};
use indexmap::IndexMap;
use scraper::node::Text;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;

/// Attribute marking nodes injected by the stream
pub const STREAM_ATTR: &str = "data-livepatch";

const DOCUMENT_OPENERS: [&str; 4] = ["<!doctype", "<html", "<head", "<body"];

/// In-memory document
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    dom: Html,
    stylesheet: String,
    behaviors: IndexMap<String, String>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::from_html("")
    }
}

#[derive(Clone, Copy)]
enum Edit<'a> {
    Replace(&'a Html),
    Append(&'a Html),
    Remove,
}

impl MemoryDocument {
    /// Empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document or fragment
    #[must_use]
    pub fn from_html(html: &str) -> Self {
        Self {
            dom: parse(html),
            stylesheet: String::new(),
            behaviors: IndexMap::new(),
        }
    }

    /// Text content of the first element matching `locator`
    #[must_use]
    pub fn text_of(&self, locator: &str) -> Option<String> {
        let selector = Selector::parse(locator).ok()?;
        self.dom
            .select(&selector)
            .next()
            .map(|el| el.text().collect())
    }

    /// Number of elements matching `locator`
    #[must_use]
    pub fn count(&self, locator: &str) -> usize {
        Selector::parse(locator).map_or(0, |selector| self.dom.select(&selector).count())
    }

    /// Whether any element matches `locator`
    #[must_use]
    pub fn contains(&self, locator: &str) -> bool {
        self.count(locator) > 0
    }

    /// Stream stylesheet
    #[inline]
    #[must_use]
    pub fn stylesheet(&self) -> &str {
        &self.stylesheet
    }

    /// Source of a named behavior
    #[must_use]
    pub fn behavior(&self, name: &str) -> Option<&str> {
        self.behaviors.get(name).map(String::as_str)
    }

    /// Behavior names in definition order
    pub fn behavior_names(&self) -> impl Iterator<Item = &str> {
        self.behaviors.keys().map(String::as_str)
    }

    /// Document markup without stream additions
    #[must_use]
    pub fn body_html(&self) -> String {
        serialize(&self.dom)
    }

    /// Full markup with the stream stylesheet and behaviors injected
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut dom = self.dom.clone();
        if !self.stylesheet.is_empty() {
            inject(&mut dom, "head", "style", "stream", &self.stylesheet);
        }
        for (name, source) in &self.behaviors {
            inject(&mut dom, "body", "script", name, source);
        }
        serialize(&dom)
    }

    fn edit(&mut self, locator: &str, edit: Edit<'_>) -> usize {
        let selector = match Selector::parse(locator) {
            Ok(selector) => selector,
            Err(e) => {
                tracing::debug!(locator, error = ?e, "locator not understood");
                return 0;
            }
        };

        let targets = self.outermost_matches(&selector);
        let tree = &mut self.dom.tree;
        for &target in &targets {
            match edit {
                Edit::Replace(fragment) => {
                    for source in fragment.root_element().children() {
                        let id = copy_subtree(tree, source);
                        if let Some(mut node) = tree.get_mut(target) {
                            node.insert_id_before(id);
                        }
                    }
                    if let Some(mut node) = tree.get_mut(target) {
                        node.detach();
                    }
                }
                Edit::Append(fragment) => {
                    for source in fragment.root_element().children() {
                        let id = copy_subtree(tree, source);
                        if let Some(mut node) = tree.get_mut(target) {
                            node.append_id(id);
                        }
                    }
                }
                Edit::Remove => {
                    if let Some(mut node) = tree.get_mut(target) {
                        node.detach();
                    }
                }
            }
        }
        targets.len()
    }

    /// Matches in document order, minus the root element and anything
    /// nested inside another match
    fn outermost_matches(&self, selector: &Selector) -> Vec<NodeId> {
        let root = node_id(self.dom.root_element());
        let matched: Vec<NodeId> = self
            .dom
            .select(selector)
            .map(node_id)
            .filter(|id| *id != root)
            .collect();
        let set: HashSet<NodeId> = matched.iter().copied().collect();
        matched
            .into_iter()
            .filter(|id| {
                self.dom
                    .tree
                    .get(*id)
                    .is_some_and(|node| !node.ancestors().any(|a| set.contains(&a.id())))
            })
            .collect()
    }
}

fn parse(html: &str) -> Html {
    let opening: String = html
        .trim_start()
        .chars()
        .take(9)
        .collect::<String>()
        .to_ascii_lowercase();
    if DOCUMENT_OPENERS.iter().any(|p| opening.starts_with(p)) {
        Html::parse_document(html)
    } else {
        Html::parse_fragment(html)
    }
}

fn node_id(el: ElementRef<'_>) -> NodeId {
    (*el).id()
}

fn serialize(dom: &Html) -> String {
    match dom.tree.root().value() {
        Node::Fragment => dom.root_element().inner_html(),
        _ => dom.html(),
    }
}

/// Deep-copy `source` (from another tree) into `tree` as an orphan
fn copy_subtree(tree: &mut Tree<Node>, source: NodeRef<'_, Node>) -> NodeId {
    let id = tree.orphan(source.value().clone()).id();
    for child in source.children() {
        let child_id = copy_subtree(tree, child);
        if let Some(mut node) = tree.get_mut(id) {
            node.append_id(child_id);
        }
    }
    id
}

/// Append `<tag data-livepatch=name>text</tag>` to the first `container`,
/// or to the top level when there is none
fn inject(dom: &mut Html, container: &str, tag: &str, name: &str, text: &str) {
    let shell = Html::parse_fragment(&format!(
        "<{tag} {STREAM_ATTR}=\"{}\"></{tag}>",
        escape_attr(name)
    ));
    let Some(source) = shell.root_element().first_child() else {
        return;
    };
    let element = copy_subtree(&mut dom.tree, source);
    let body = dom
        .tree
        .orphan(Node::Text(Text { text: text.into() }))
        .id();
    if let Some(mut node) = dom.tree.get_mut(element) {
        node.append_id(body);
    }

    let parent = Selector::parse(container)
        .ok()
        .and_then(|selector| dom.select(&selector).next().map(node_id))
        .unwrap_or_else(|| node_id(dom.root_element()));
    if let Some(mut node) = dom.tree.get_mut(parent) {
        node.append_id(element);
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

impl RenderTarget for MemoryDocument {
    fn style_text(&self) -> &str {
        &self.stylesheet
    }

    fn replace_style(&mut self, css: &str) {
        css.clone_into(&mut self.stylesheet);
    }

    fn replace_nodes(&mut self, locator: &str, html: &str) -> usize {
        let replacement = Html::parse_fragment(html);
        self.edit(locator, Edit::Replace(&replacement))
    }

    fn append_to_nodes(&mut self, locator: &str, html: &str) -> usize {
        let addition = Html::parse_fragment(html);
        self.edit(locator, Edit::Append(&addition))
    }

    fn remove_nodes(&mut self, locator: &str) -> usize {
        self.edit(locator, Edit::Remove)
    }

    fn define_behavior(&mut self, name: &str, source: &str) {
        self.behaviors.insert(name.to_string(), source.to_string());
    }

    fn load_document(&mut self, html: &str) {
        *self = Self::from_html(html);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = "<!DOCTYPE html><html><head><title>T</title></head>\
<body><section id=\"hero\"><h1>Old</h1></section><ul class=\"items\"><li>a</li></ul>\
<div class=\"promo\">Sale</div></body></html>";

    #[test]
    fn replace_by_id() {
        let mut doc = MemoryDocument::from_html(PAGE);
        let n = doc.replace_nodes("#hero", "<section id=\"hero\"><h1>New</h1></section>");
        assert_eq!(n, 1);
        assert_eq!(doc.text_of("#hero").as_deref(), Some("New"));
        assert_eq!(doc.count("section"), 1);
    }

    #[test]
    fn append_children() {
        let mut doc = MemoryDocument::from_html(PAGE);
        assert_eq!(doc.append_to_nodes("ul.items", "<li>b</li>"), 1);
        assert_eq!(doc.text_of(".items").as_deref(), Some("ab"));
        assert_eq!(doc.count(".items li"), 2);
    }

    #[test]
    fn remove_by_class() {
        let mut doc = MemoryDocument::from_html(PAGE);
        assert_eq!(doc.remove_nodes(".promo"), 1);
        assert!(!doc.contains(".promo"));
        assert_eq!(doc.remove_nodes(".promo"), 0);
    }

    #[test]
    fn implied_end_tags_keep_siblings_apart() {
        let mut doc =
            MemoryDocument::from_html("<body><ul><li id=\"a\">one<li id=\"b\">two</ul></body>");
        assert_eq!(doc.remove_nodes("#a"), 1);
        assert_eq!(doc.text_of("#b").as_deref(), Some("two"));
        assert_eq!(doc.count("li"), 1);
    }

    #[test]
    fn nested_matches_are_edited_once() {
        let mut doc = MemoryDocument::from_html("<div class=\"x\"><div class=\"x\">in</div></div>");
        assert_eq!(doc.remove_nodes(".x"), 1);
        assert_eq!(doc.body_html(), "");
    }

    #[test]
    fn unknown_or_invalid_locator_is_zero() {
        let mut doc = MemoryDocument::from_html(PAGE);
        assert_eq!(doc.replace_nodes("#missing", "<p></p>"), 0);
        assert_eq!(doc.remove_nodes("div > p"), 0);
        assert_eq!(doc.remove_nodes("###"), 0);
        assert_eq!(doc.remove_nodes(""), 0);
        assert_eq!(doc.body_html(), PAGE);
    }

    #[test]
    fn root_element_is_never_edited() {
        let mut doc = MemoryDocument::from_html(PAGE);
        assert_eq!(doc.remove_nodes("html"), 0);
        assert_eq!(doc.body_html(), PAGE);
    }

    #[test]
    fn stream_additions_render_in_place() {
        let mut doc = MemoryDocument::from_html(PAGE);
        doc.replace_style(".btn > a{color:red}");
        doc.define_behavior("init", "init();");
        doc.define_behavior("init", "if (a < b) start();");

        let html = doc.render_html();
        assert!(html.contains(
            "<style data-livepatch=\"stream\">.btn > a{color:red}</style></head>"
        ));
        assert!(html.contains(
            "<script data-livepatch=\"init\">if (a < b) start();</script></body>"
        ));
        assert_eq!(doc.behavior_names().count(), 1);
        assert_eq!(doc.body_html(), PAGE);
    }

    #[test]
    fn fragment_without_head() {
        let mut doc = MemoryDocument::from_html("<p>x</p>");
        doc.replace_style("p{}");
        assert_eq!(
            doc.render_html(),
            "<p>x</p><style data-livepatch=\"stream\">p{}</style>"
        );
    }

    #[test]
    fn load_document_resets_stream_state() {
        let mut doc = MemoryDocument::from_html(PAGE);
        doc.replace_style("a{}");
        doc.define_behavior("go", "go()");
        doc.load_document("<html><body><p>fresh</p></body></html>");
        assert_eq!(doc.stylesheet(), "");
        assert!(doc.behavior("go").is_none());
        assert!(doc.contains("p"));
        assert!(!doc.contains("#hero"));
    }
}
