//! Broadcast server
//!
//! Top-level lifetime owner: binds the listener, runs the registry's event
//! loop on a dedicated worker thread, and exposes a non-blocking `publish`
//! entry point to the producer.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::detections::DetectionList;
use crate::error::{Error, Result};
use crate::registry::{RegistryHandle, SubscriberRegistry};
use crate::server::config::ServerConfig;
use crate::stats::BroadcastStats;

/// Detection broadcast server
///
/// Construction binds the listening socket and starts the event loop; the
/// producer then calls [`publish`](Self::publish) once per processed frame,
/// from any thread, without ever blocking on subscriber I/O. Dropping the
/// server shuts it down: accepts stop, every subscriber is closed, the
/// port is released, and the worker is joined, so no registry callback runs
/// after the server value is gone.
pub struct BroadcastServer {
    handle: RegistryHandle,
    local_addr: SocketAddr,
    stats: Arc<BroadcastStats>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl BroadcastServer {
    /// Bind the listener and start the broadcast worker
    ///
    /// Returns once the socket is bound, so bind errors surface here rather
    /// than on the worker. The event loop runs on a current-thread runtime
    /// owned by a dedicated worker thread; all subscriber and registry
    /// state stays confined to it.
    pub fn start(config: ServerConfig) -> Result<Self> {
        let stats = Arc::new(BroadcastStats::default());
        let worker_stats = Arc::clone(&stats);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let worker = std::thread::Builder::new()
            .name("detcast-worker".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(Error::Io(e)));
                        return;
                    }
                };

                runtime.block_on(async move {
                    let registry = match SubscriberRegistry::bind(config, worker_stats).await {
                        Ok(registry) => registry,
                        Err(e) => {
                            let _ = ready_tx.send(Err(Error::Io(e)));
                            return;
                        }
                    };

                    let _ = ready_tx.send(Ok((registry.local_addr(), registry.handle())));
                    registry.run().await;
                });
            })
            .map_err(Error::Io)?;

        let (local_addr, handle) = match ready_rx.recv() {
            Ok(Ok(ready)) => ready,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(Error::WorkerUnavailable);
            }
        };

        Ok(Self {
            handle,
            local_addr,
            stats,
            worker: Some(worker),
        })
    }

    /// Convenience constructor: listen on all interfaces at `port`,
    /// admitting at most `max_subscribers` at a time
    pub fn bind(port: u16, max_subscribers: usize) -> Result<Self> {
        Self::start(ServerConfig::with_port(port).max_subscribers(max_subscribers))
    }

    /// Broadcast one detection snapshot to all connected subscribers
    ///
    /// Fire-and-forget: the snapshot is posted onto the event loop and the
    /// call returns immediately, regardless of subscriber count or queue
    /// depths. A snapshot that serializes past the frame limit is dropped
    /// whole; see [`stats`](Self::stats) for the drop count.
    pub fn publish(&self, list: DetectionList) {
        self.handle.publish(list);
    }

    /// Get an additional producer handle, usable from any thread
    pub fn handle(&self) -> RegistryHandle {
        self.handle.clone()
    }

    /// The bound listen address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Broadcast counters for this server
    pub fn stats(&self) -> &Arc<BroadcastStats> {
        &self.stats
    }

    /// Stop accepting, close every subscriber, and release the port
    ///
    /// Idempotent; also runs on drop. Blocks until the worker has exited,
    /// after which no subscriber or registry code runs anymore.
    pub fn shutdown(&mut self) {
        self.handle.shutdown();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Broadcast worker panicked");
            }
        }
    }
}

impl Drop for BroadcastServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
