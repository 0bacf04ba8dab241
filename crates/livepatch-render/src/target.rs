//! Render target abstraction

/// A live document that delta units can be applied to
///
/// Implementations must not panic on unknown locators: a locator that matches
/// nothing returns `0` and the caller decides what a miss means.
pub trait RenderTarget {
    /// Current text of the stream stylesheet
    fn style_text(&self) -> &str;

    /// Replace the whole stream stylesheet
    fn replace_style(&mut self, css: &str);

    /// Replace every node matched by `locator`; returns the match count
    fn replace_nodes(&mut self, locator: &str, html: &str) -> usize;

    /// Append `html` as last children of every node matched by `locator`
    fn append_to_nodes(&mut self, locator: &str, html: &str) -> usize;

    /// Remove every node matched by `locator`
    fn remove_nodes(&mut self, locator: &str) -> usize;

    /// Register or replace the named behavior (last write wins)
    fn define_behavior(&mut self, name: &str, source: &str);

    /// Swap in a whole new document
    ///
    /// Called when a stream produced a full replacement page instead of
    /// deltas. Stream styles and behaviors belong to the old document and are
    /// discarded.
    fn load_document(&mut self, html: &str);
}

impl<T: RenderTarget + ?Sized> RenderTarget for &mut T {
    fn style_text(&self) -> &str {
        (**self).style_text()
    }

    fn replace_style(&mut self, css: &str) {
        (**self).replace_style(css);
    }

    fn replace_nodes(&mut self, locator: &str, html: &str) -> usize {
        (**self).replace_nodes(locator, html)
    }

    fn append_to_nodes(&mut self, locator: &str, html: &str) -> usize {
        (**self).append_to_nodes(locator, html)
    }

    fn remove_nodes(&mut self, locator: &str) -> usize {
        (**self).remove_nodes(locator)
    }

    fn define_behavior(&mut self, name: &str, source: &str) {
        (**self).define_behavior(name, source);
    }

    fn load_document(&mut self, html: &str) {
        (**self).load_document(html);
    }
}
