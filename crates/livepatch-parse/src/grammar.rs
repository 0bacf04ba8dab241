//! Wire grammar shared with the model prompt
//!
//! These tokens must match the prompt byte for byte. Changing one breaks
//! interop with every prompt that already asks the model to emit it.

use livepatch_artifact::UnitIntent;
use once_cell::sync::Lazy;
use regex::Regex;

/// Fence written around a marker's start token (`<<<<<<< START_TITLE path`)
pub const OPEN_FENCE: &str = "<<<<<<<";
/// Fence written before a marker's end token (`path >>>>>>> END_TITLE`)
pub const CLOSE_FENCE: &str = ">>>>>>>";

/// Page marker, main form
pub const TITLE_START: &str = "START_TITLE";
/// End of [`TITLE_START`]
pub const TITLE_END: &str = "END_TITLE";
/// Page marker for a page that did not exist before
pub const NEW_PAGE_START: &str = "NEW_PAGE_START";
/// End of [`NEW_PAGE_START`]
pub const NEW_PAGE_END: &str = "NEW_PAGE_END";
/// Page marker for a rewrite of an existing page
pub const UPDATE_PAGE_START: &str = "UPDATE_PAGE_START";
/// End of [`UPDATE_PAGE_START`]
pub const UPDATE_PAGE_END: &str = "UPDATE_PAGE_END";
/// File marker; body is arbitrary text
pub const FILE_START: &str = "START_FILE";
/// End of [`FILE_START`]
pub const FILE_END: &str = "END_FILE";

/// Document preamble a page body must start with
pub const DOCTYPE_PREAMBLE: &str = "<!doctype html";
/// Accepted preamble when the doctype is missing
pub const HTML_OPEN: &str = "<html";
/// Closing tag of a complete document
pub const HTML_CLOSE: &str = "</html>";

/// Code fence
pub const CODE_FENCE: &str = "```";

/// A start/end token pair and the intent it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitMarker {
    /// Start token
    pub start: &'static str,
    /// Matching end token
    pub end: &'static str,
    /// Intent of units it delimits
    pub intent: UnitIntent,
}

/// Every whole-unit marker pair
pub const UNIT_MARKERS: [UnitMarker; 4] = [
    UnitMarker {
        start: TITLE_START,
        end: TITLE_END,
        intent: UnitIntent::Title,
    },
    UnitMarker {
        start: NEW_PAGE_START,
        end: NEW_PAGE_END,
        intent: UnitIntent::New,
    },
    UnitMarker {
        start: UPDATE_PAGE_START,
        end: UPDATE_PAGE_END,
        intent: UnitIntent::Update,
    },
    UnitMarker {
        start: FILE_START,
        end: FILE_END,
        intent: UnitIntent::File,
    },
];

/// Look up the marker pair for a start token
#[must_use]
pub fn marker_for_start(token: &str) -> Option<&'static UnitMarker> {
    UNIT_MARKERS.iter().find(|m| m.start == token)
}

/// Unit header: `[<<<<<<<] START path [>>>>>>>] END` on one line
pub(crate) static UNIT_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?:<{7}[ \t]*)?",
        r"\b(START_TITLE|NEW_PAGE_START|UPDATE_PAGE_START|START_FILE)[ \t]+",
        r"([^\r\n]*?)",
        r"[ \t]*(?:>{7}[ \t]*)?",
        r"\b(END_TITLE|NEW_PAGE_END|UPDATE_PAGE_END|END_FILE)\b",
    ))
    .expect("unit header pattern is valid")
});

/// Structured style delta: `/* @style-start [op] */ … /* @style-end */`
pub(crate) static STYLE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)/\*[ \t]*@style-start\b([^*]*?)\*/(.*?)/\*[ \t]*@style-end[ \t]*\*/")
        .expect("style block pattern is valid")
});

/// Structured markup delta: `<!-- @markup-start target --> … <!-- @markup-end -->`
pub(crate) static MARKUP_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--[ \t]*@markup-start\b(.*?)-->(.*?)<!--[ \t]*@markup-end[ \t]*-->")
        .expect("markup block pattern is valid")
});

/// Structured behavior delta: `// @behavior-start name` … `// @behavior-end`
pub(crate) static BEHAVIOR_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)//[ \t]*@behavior-start[ \t]+([^\r\n]+?)[ \t]*\r?\n(.*?)//[ \t]*@behavior-end\b",
    )
    .expect("behavior block pattern is valid")
});

/// Legacy single-grammar delta: `<!-- UPDATE:KIND [target] --> … <!-- END_UPDATE -->`
pub(crate) static LEGACY_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--[ \t]*UPDATE:(CSS|HTML|JS)\b(.*?)-->(.*?)<!--[ \t]*END_UPDATE[ \t]*-->")
        .expect("legacy block pattern is valid")
});
