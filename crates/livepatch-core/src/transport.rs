//! Chunk sources
//!
//! The model stream is any [`Stream`] of [`TransportEvent`]s. End of stream
//! is the end of the sequence; a failure is an explicit [`TransportEvent::Error`],
//! never a sentinel string inside a chunk.

use futures::channel::mpsc;
use futures::Stream;

/// Transport failure reported by the stream source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("stream interrupted: {0}")]
    Interrupted(String),
}

/// One item of a model stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Next slice of response text
    Chunk(String),
    /// The source failed; no further events follow
    Error(TransportError),
}

impl TransportEvent {
    /// Chunk event
    #[inline]
    #[must_use]
    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk(text.into())
    }
}

impl From<Result<String, TransportError>> for TransportEvent {
    fn from(result: Result<String, TransportError>) -> Self {
        match result {
            Ok(text) => Self::Chunk(text),
            Err(e) => Self::Error(e),
        }
    }
}

/// A finished stream over pre-split chunks
pub fn from_chunks<I>(chunks: I) -> impl Stream<Item = TransportEvent> + Unpin
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let events: Vec<TransportEvent> = chunks.into_iter().map(TransportEvent::chunk).collect();
    futures::stream::iter(events)
}

/// Bounded channel for a producer task feeding a session
///
/// Dropping every sender ends the stream.
#[must_use]
pub fn channel(capacity: usize) -> (mpsc::Sender<TransportEvent>, mpsc::Receiver<TransportEvent>) {
    mpsc::channel(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};

    #[tokio::test]
    async fn chunks_in_order() {
        let events: Vec<_> = from_chunks(["a", "b"]).collect().await;
        assert_eq!(events, vec![TransportEvent::chunk("a"), TransportEvent::chunk("b")]);
    }

    #[tokio::test]
    async fn channel_ends_when_senders_drop() {
        let (mut tx, rx) = channel(4);
        tokio::spawn(async move {
            tx.send(TransportEvent::chunk("x")).await.ok();
            let failed: Result<String, _> = Err(TransportError::Interrupted("reset".into()));
            tx.send(failed.into()).await.ok();
        });
        let events: Vec<_> = rx.collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], TransportEvent::Error(TransportError::Interrupted(_))));
    }
}
