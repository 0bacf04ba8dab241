//! Whole units (pages and files) and the ordered collection they live in

use crate::hash::ContentHash;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which marker pair introduced a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitIntent {
    /// `START_TITLE` page
    Title,
    /// `NEW_PAGE_START` page
    New,
    /// `UPDATE_PAGE_START` page
    Update,
    /// `START_FILE` file with arbitrary content
    File,
    /// Bare document found without any markers
    Bare,
}

impl UnitIntent {
    /// Whether the body must start with a document preamble
    #[inline]
    #[must_use]
    pub fn is_page(self) -> bool {
        !matches!(self, Self::File)
    }
}

impl fmt::Display for UnitIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Title => "title",
            Self::New => "new",
            Self::Update => "update",
            Self::File => "file",
            Self::Bare => "bare",
        };
        f.write_str(s)
    }
}

/// A complete named content blob (one page or one source file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique key within a collection
    pub path: String,
    /// Source text
    pub content: String,
    /// Marker that produced this unit
    pub intent: UnitIntent,
}

impl Unit {
    /// Create a unit
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>, intent: UnitIntent) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            intent,
        }
    }

    /// Hash over `(path, content)`
    #[inline]
    #[must_use]
    pub fn identity(&self) -> ContentHash {
        ContentHash::of_parts([self.path.as_str(), self.content.as_str()])
    }
}

/// Result of [`UnitCollection::upsert`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// New path appended at `index`
    Inserted { index: usize },
    /// Existing path overwritten in place
    Replaced { index: usize, previous: String },
}

impl Upsert {
    /// Position of the unit after the upsert
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Inserted { index } | Self::Replaced { index, .. } => *index,
        }
    }

    /// Content that was overwritten, if any
    #[inline]
    #[must_use]
    pub fn previous(&self) -> Option<&str> {
        match self {
            Self::Inserted { .. } => None,
            Self::Replaced { previous, .. } => Some(previous),
        }
    }
}

/// Ordered page/file collection keyed by path
///
/// # Invariants
/// - paths are unique
/// - replacing an existing path keeps its position
/// - new paths append at the end
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitCollection {
    entries: IndexMap<String, Unit>,
}

impl UnitCollection {
    /// Empty collection
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by exact path
    pub fn upsert(&mut self, unit: Unit) -> Upsert {
        let (index, previous) = self.entries.insert_full(unit.path.clone(), unit);
        match previous {
            Some(old) => Upsert::Replaced {
                index,
                previous: old.content,
            },
            None => Upsert::Inserted { index },
        }
    }

    /// Lookup by path
    #[inline]
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Unit> {
        self.entries.get(path)
    }

    /// Unit at a position
    #[inline]
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&Unit> {
        self.entries.get_index(index).map(|(_, unit)| unit)
    }

    /// First unit in collection order
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&Unit> {
        self.get_index(0)
    }

    /// Number of units
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in collection order
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.entries.values()
    }

    /// Paths in collection order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl FromIterator<Unit> for UnitCollection {
    fn from_iter<I: IntoIterator<Item = Unit>>(iter: I) -> Self {
        let mut collection = Self::new();
        for unit in iter {
            collection.upsert(unit);
        }
        collection
    }
}
