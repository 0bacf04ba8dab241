//! Document body helpers: fence stripping, preamble checks, bare extraction

use crate::grammar::{CODE_FENCE, DOCTYPE_PREAMBLE, HTML_CLOSE, HTML_OPEN, OPEN_FENCE};

/// Strip an optional code fence wrapped around a unit body
///
/// The opening fence line (with its language hint) is dropped, and the body
/// ends at the first line that is just a closing fence; whatever follows it
/// is commentary. Without an opening fence, a closing fence is dropped only
/// when it is the last line. The result is trimmed.
#[must_use]
pub fn strip_fences(body: &str) -> &str {
    let mut text = body.trim();
    if text.starts_with(CODE_FENCE) {
        text = match text.find('\n') {
            Some(newline) => &text[newline + 1..],
            // Fence line still streaming; nothing after it yet.
            None => "",
        };
        return match closing_fence(text) {
            Some(at) => text[..at].trim(),
            None => text.trim(),
        };
    }
    let trimmed = text.trim_end();
    if let Some(before) = trimmed.strip_suffix(CODE_FENCE) {
        if before.is_empty() || before.ends_with('\n') {
            text = before;
        }
    }
    text.trim()
}

/// Byte offset of the first line consisting of a bare closing fence
fn closing_fence(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim() == CODE_FENCE {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

/// Whether `text` starts with a document preamble (case-insensitive)
#[must_use]
pub fn has_preamble(text: &str) -> bool {
    let head = text.trim_start();
    starts_with_ignore_case(head, DOCTYPE_PREAMBLE) || starts_with_ignore_case(head, HTML_OPEN)
}

/// Cut everything after the last closing `</html>`
///
/// Trailing prose after a finished page ("Let me know if…") is not content.
#[must_use]
pub fn truncate_after_close(text: &str) -> &str {
    match rfind_ignore_case(text, HTML_CLOSE) {
        Some(at) => &text[..at + HTML_CLOSE.len()],
        None => text,
    }
}

/// Drop a half-written unit header at the tail of a body
///
/// Complete headers are consumed as unit boundaries before a body is cut,
/// so any remaining open fence is a header still streaming in.
#[must_use]
pub fn trim_dangling_marker(body: &str) -> &str {
    match body.find(OPEN_FENCE) {
        Some(at) => &body[..at],
        None => body,
    }
}

/// Find a bare `preamble … </html>` span anywhere in `buffer`
///
/// The last-resort extraction when the model ignored every marker. Needs the
/// closing tag: an unterminated document is never returned.
#[must_use]
pub fn extract_bare_document(buffer: &str) -> Option<&str> {
    let start = find_ignore_case(buffer, DOCTYPE_PREAMBLE)
        .or_else(|| find_ignore_case(buffer, HTML_OPEN))?;
    let tail = &buffer[start..];
    let end = rfind_ignore_case(tail, HTML_CLOSE)?;
    Some(&tail[..end + HTML_CLOSE.len()])
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

fn rfind_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().rfind(needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_stripped() {
        let body = "\n```html\n<!DOCTYPE html>\n<html></html>\n```\n";
        assert_eq!(strip_fences(body), "<!DOCTYPE html>\n<html></html>");
    }

    #[test]
    fn commentary_after_closing_fence_is_dropped() {
        let body = "```js\nconsole.log(1);\n```\n\nThis logs on load.\n";
        assert_eq!(strip_fences(body), "console.log(1);");
        let nested = "```md\nsee ```inline``` here\n```\nbye";
        assert_eq!(strip_fences(nested), "see ```inline``` here");
    }

    #[test]
    fn unfenced_body_is_trimmed() {
        assert_eq!(strip_fences("\n  <p>hi</p>  \n"), "<p>hi</p>");
    }

    #[test]
    fn opening_fence_still_streaming() {
        assert_eq!(strip_fences("```ht"), "");
        assert_eq!(strip_fences("```html\n<!DOCTYPE html>\n<ht"), "<!DOCTYPE html>\n<ht");
    }

    #[test]
    fn inline_backticks_are_kept() {
        assert_eq!(strip_fences("let s = ```"), "let s = ```");
    }

    #[test]
    fn preamble_is_case_insensitive() {
        assert!(has_preamble("  <!DOCTYPE html>"));
        assert!(has_preamble("<!doctype html>"));
        assert!(has_preamble("<html lang=\"en\">"));
        assert!(!has_preamble("Here is your page"));
        assert!(!has_preamble("<!DOC"));
    }

    #[test]
    fn close_truncation() {
        assert_eq!(
            truncate_after_close("<html></html>\n\nHope this helps!"),
            "<html></html>"
        );
        assert_eq!(truncate_after_close("<html><body>"), "<html><body>");
    }

    #[test]
    fn dangling_marker() {
        assert_eq!(trim_dangling_marker("<p>a</p>\n<<<<<<< START_TI"), "<p>a</p>\n");
        assert_eq!(trim_dangling_marker("<p>a</p>"), "<p>a</p>");
    }

    #[test]
    fn bare_document_span() {
        let buffer = "Sure! Here it is:\n<!DOCTYPE html><html><body>x</body></HTML>\nEnjoy.";
        assert_eq!(
            extract_bare_document(buffer),
            Some("<!DOCTYPE html><html><body>x</body></HTML>")
        );
    }

    #[test]
    fn bare_document_without_doctype() {
        let buffer = "<html><body></body></html>";
        assert_eq!(extract_bare_document(buffer), Some(buffer));
    }

    #[test]
    fn bare_document_needs_close() {
        assert_eq!(extract_bare_document("<!DOCTYPE html><html><body>"), None);
        assert_eq!(extract_bare_document("just words"), None);
    }
}
