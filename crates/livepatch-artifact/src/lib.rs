//! Livepatch Artifacts
//!
//! Value types shared by every stage of the streaming patch pipeline.
//!
//! # Core Concepts
//!
//! - [`Unit`]: a complete page or file, keyed by path
//! - [`UnitCollection`]: ordered, path-unique collection with upsert semantics
//! - [`DeltaUnit`]: a kind-tagged patch (style / markup / behavior)
//! - [`ChangeRange`]: inclusive span of changed lines in a new document
//! - [`ContentHash`]: 32-byte Blake3 hash used for at-most-once application
//!
//! # Example
//!
//! ```rust
//! use livepatch_artifact::{Unit, UnitCollection, UnitIntent};
//!
//! let mut pages = UnitCollection::new();
//! pages.upsert(Unit::new("index.html", "<!DOCTYPE html>", UnitIntent::Title));
//! let replaced = pages.upsert(Unit::new("index.html", "<!DOCTYPE html><p>", UnitIntent::Update));
//! assert_eq!(replaced.index(), 0);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod delta;
mod hash;
mod range;
mod unit;

pub use delta::{DeltaKind, DeltaOperation, DeltaUnit};
pub use hash::{ContentHash, HashError};
pub use range::ChangeRange;
pub use unit::{Unit, UnitCollection, UnitIntent, Upsert};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
