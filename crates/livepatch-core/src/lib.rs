//! Livepatch Core
//!
//! Turns a chunked model response into live patches.
//!
//! # Architecture
//!
//! ```text
//! TransportEvent stream
//!        │
//!        ▼
//! ┌────────────────────┐   delta mode   ┌────────────┐   ┌──────────────┐
//! │ StreamOrchestrator │ ─────────────▶ │ DeltaChain │ ─▶│ DeltaApplier │─▶ RenderTarget
//! │   (one session)    │                └────────────┘   └──────────────┘
//! │                    │   pages mode   ┌──────────────────────┐
//! │                    │ ─────────────▶ │ IncrementalMarker    │─▶ UnitCollection
//! │                    │                │ Parser + line diff   │   + ChangeRanges
//! └────────────────────┘                └──────────────────────┘
//!        │ end of stream, nothing applied
//!        ▼
//!   ExtractorChain (markers, then bare document)
//! ```
//!
//! # Example
//!
//! ```rust
//! use livepatch_core::prelude::*;
//!
//! # tokio_test_block(async {
//! let mut orchestrator = StreamOrchestrator::new(
//!     PipelineConfig::default(),
//!     MemoryDocument::from_html("<body><h1 id=\"title\">Old</h1></body>"),
//! );
//! let chunks = ["<!-- @markup-start #title -->", "<h1 id=\"title\">New</h1><!-- @markup-end -->"];
//! let report = orchestrator.run(from_chunks(chunks), None, |_| {}).await.unwrap();
//! assert_eq!(report.applied, 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod error;
mod orchestrator;
mod progress;
mod report;
mod session;
mod state;
mod transport;

pub use config::{ConfigError, PipelineConfig, SessionMode};
pub use error::StreamError;
pub use orchestrator::StreamOrchestrator;
pub use progress::StreamProgress;
pub use report::{SessionReport, UnitWrite};
pub use state::{allowed_transitions, validate_transition, SessionState, StateError};
pub use transport::{channel, from_chunks, TransportError, TransportEvent};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        from_chunks, PipelineConfig, SessionMode, SessionReport, SessionState, StreamError,
        StreamOrchestrator, StreamProgress, TransportError, TransportEvent,
    };
    pub use livepatch_artifact::{ChangeRange, Unit, UnitCollection, UnitIntent};
    pub use livepatch_render::{MemoryDocument, RenderTarget};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
