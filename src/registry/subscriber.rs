//! Subscriber connection
//!
//! One actor per accepted socket: a bounded FIFO frame queue feeding a
//! strictly sequential write loop. At most one write is outstanding per
//! connection; on completion the next queued frame starts immediately, so
//! frames reach each subscriber in exact publish order.

use std::net::SocketAddr;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::protocol::framing::Frame;
use crate::registry::store::Command;

/// Stable identity of a subscriber within the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub(crate) u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of handing a frame to a subscriber's queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnqueueOutcome {
    /// Frame accepted; the write loop will deliver it in order
    Queued,
    /// Queue full; the subscriber is not draining fast enough
    Lagged,
    /// The write loop has already terminated
    Closed,
}

/// Handle to one connected subscriber
///
/// The registry holds the only strong ownership; the spawned write loop
/// keeps the socket alive for exactly as long as it runs.
pub(crate) struct Subscriber {
    id: SubscriberId,
    peer_addr: SocketAddr,
    frames: mpsc::Sender<Frame>,
    writer: JoinHandle<()>,
}

impl Subscriber {
    /// Take ownership of an accepted socket and start its write loop
    pub(crate) fn spawn<S>(
        id: SubscriberId,
        peer_addr: SocketAddr,
        stream: S,
        queue_capacity: usize,
        registry: mpsc::UnboundedSender<Command>,
    ) -> Self
    where
        S: AsyncWrite + Unpin + Send + 'static,
    {
        let (frames, queue) = mpsc::channel(queue_capacity);
        let writer = tokio::spawn(write_loop(id, stream, queue, registry));

        Self {
            id,
            peer_addr,
            frames,
            writer,
        }
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Append a frame to the outbound queue
    ///
    /// Never blocks and never performs I/O; delivery happens on the write
    /// loop.
    pub(crate) fn enqueue(&self, frame: Frame) -> EnqueueOutcome {
        match self.frames.try_send(frame) {
            Ok(()) => EnqueueOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => EnqueueOutcome::Lagged,
            Err(mpsc::error::TrySendError::Closed(_)) => EnqueueOutcome::Closed,
        }
    }

    /// Tear the connection down, discarding any queued frames
    ///
    /// Dropping the write loop closes the socket. Idempotent: closing an
    /// already-terminated subscriber is a no-op.
    pub(crate) fn close(self) {
        self.writer.abort();
    }
}

/// Sequential write pipeline for one subscriber
///
/// Pops the queue head, writes it fully, then starts the next frame. On
/// write failure the queue is closed, the registry is asked to remove this
/// subscriber, and remaining frames are discarded; there is no retry.
async fn write_loop<S>(
    id: SubscriberId,
    mut stream: S,
    mut queue: mpsc::Receiver<Frame>,
    registry: mpsc::UnboundedSender<Command>,
) where
    S: AsyncWrite + Unpin,
{
    while let Some(frame) = queue.recv().await {
        if let Err(e) = stream.write_all(frame.as_bytes()).await {
            tracing::debug!(subscriber = %id, error = %e, "Write failed, dropping subscriber");
            queue.close();
            let _ = registry.send(Command::Leave(id));
            break;
        }
    }

    let _ = stream.shutdown().await;
}
