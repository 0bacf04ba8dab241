//! Livepatch Render
//!
//! Where delta units land.
//!
//! - [`RenderTarget`]: the mutations a live document must support
//! - [`MemoryDocument`]: in-memory reference host used by tests and the CLI,
//!   addressed with CSS selectors
//! - [`DeltaApplier`]: maps each delta kind and operation onto a target
//!
//! # Example
//!
//! ```rust
//! use livepatch_artifact::{DeltaOperation, DeltaUnit};
//! use livepatch_render::{DeltaApplier, MemoryDocument};
//!
//! let mut doc = MemoryDocument::from_html("<body><p class=\"promo\">Sale</p></body>");
//! let mut applier = DeltaApplier::new();
//! let unit = DeltaUnit::markup(".promo", "delete .promo", DeltaOperation::Delete, "");
//! assert!(applier.apply(&unit, &mut doc));
//! assert!(!doc.contains(".promo"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod applier;
mod document;
mod target;

pub use applier::DeltaApplier;
pub use document::{MemoryDocument, STREAM_ATTR};
pub use target::RenderTarget;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
