//! Envelope transports.

use async_trait::async_trait;
use futures::Stream;
use parking_lot::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::envelope::{Envelope, EventKind};
use crate::errors::SinkError;

/// Where the bridge pushes envelopes.
#[async_trait]
pub trait EnvelopeSink: Send + Sync {
    /// Sends one envelope. An error closes the stream for the rest of the run.
    async fn send(&self, envelope: &Envelope) -> Result<(), SinkError>;
}

/// Pushes envelopes into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl ChannelSink {
    /// Wraps an existing sender.
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { tx }
    }

    /// Creates a sink and the stream of envelopes it produces.
    ///
    /// The stream ends once the sink (and every clone of it) is dropped.
    #[must_use]
    pub fn channel() -> (Self, impl Stream<Item = Envelope> + Send) {
        let (tx, rx) = mpsc::unbounded_channel();
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|envelope| (envelope, rx))
        });
        (Self::new(tx), stream)
    }
}

#[async_trait]
impl EnvelopeSink for ChannelSink {
    async fn send(&self, envelope: &Envelope) -> Result<(), SinkError> {
        self.tx.send(envelope.clone()).map_err(|_| SinkError::Closed)
    }
}

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct NdjsonSink<W> {
    writer: tokio::sync::Mutex<W>,
}

impl<W> NdjsonSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wraps a writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: tokio::sync::Mutex::new(writer),
        }
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> EnvelopeSink for NdjsonSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, envelope: &Envelope) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(envelope)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        match writer.write_all(&line).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => return Err(SinkError::Closed),
            Err(e) => return Err(e.into()),
        }
        writer.flush().await?;
        Ok(())
    }
}

/// Keeps envelopes in memory, optionally failing after a number of sends.
#[derive(Debug, Default)]
pub struct CollectingSink {
    envelopes: Mutex<Vec<Envelope>>,
    fail_after: Option<usize>,
    attempts: Mutex<usize>,
}

impl CollectingSink {
    /// Creates a sink that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that accepts `accepted` envelopes, then reports the
    /// consumer as gone.
    #[must_use]
    pub fn failing_after(accepted: usize) -> Self {
        Self {
            fail_after: Some(accepted),
            ..Self::default()
        }
    }

    /// Returns all accepted envelopes.
    #[must_use]
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.envelopes.lock().clone()
    }

    /// Returns the kinds of all accepted envelopes, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.envelopes.lock().iter().map(|e| e.kind).collect()
    }

    /// Returns accepted envelopes of one kind.
    #[must_use]
    pub fn of_kind(&self, kind: EventKind) -> Vec<Envelope> {
        self.envelopes
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Returns how many sends were attempted, including rejected ones.
    #[must_use]
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

#[async_trait]
impl EnvelopeSink for CollectingSink {
    async fn send(&self, envelope: &Envelope) -> Result<(), SinkError> {
        let attempt = {
            let mut attempts = self.attempts.lock();
            *attempts += 1;
            *attempts
        };
        if self.fail_after.is_some_and(|limit| attempt > limit) {
            return Err(SinkError::Closed);
        }
        self.envelopes.lock().push(envelope.clone());
        Ok(())
    }
}
